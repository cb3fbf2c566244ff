use anyhow::{Context, Result};
use clap::Parser;
use meshtree_store::{Array, ContainerReader, DType, Node};
use std::fmt::Debug;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about = "List the groups and datasets of a mesh container")]
struct Args {
    container: PathBuf,
    /// Also print the leading rows of every dataset
    #[arg(long)]
    data: bool,
    #[arg(long, default_value_t = 4)]
    max_rows: usize,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let reader = ContainerReader::open(&args.container)
        .with_context(|| format!("Failed to open container: {}", args.container.display()))?;
    println!(
        "{} ({} datasets)",
        reader.path().display(),
        reader.dataset_count()
    );

    for (path, node) in reader.walk() {
        let depth = path.matches('/').count();
        let indent = "  ".repeat(depth);
        let name = path.rsplit('/').next().unwrap_or(&path);
        match node {
            Node::Group(group) => {
                println!("{indent}{name}/");
                for (key, value) in &group.attrs {
                    println!("{indent}  @{key} = {value:?}");
                }
            }
            Node::Dataset(meta) => {
                println!(
                    "{indent}{name}  {} {:?}  {} chunks, {} bytes stored",
                    meta.dtype,
                    meta.shape,
                    meta.chunks.len(),
                    meta.stored_bytes()
                );
                if args.data {
                    let rows = match meta.dtype {
                        DType::F32 => preview(&reader.read::<f32>(&path)?, args.max_rows),
                        DType::I32 => preview(&reader.read::<i32>(&path)?, args.max_rows),
                        DType::I64 => preview(&reader.read::<i64>(&path)?, args.max_rows),
                    };
                    for row in rows {
                        println!("{indent}  {row}");
                    }
                }
            }
        }
    }
    Ok(())
}

fn preview<T: Copy + Debug>(array: &Array<T>, max_rows: usize) -> Vec<String> {
    let rows = array.rows();
    let mut out: Vec<String> = (0..rows.min(max_rows))
        .filter_map(|i| array.row(i).map(|row| format!("{row:?}")))
        .collect();
    if rows > max_rows {
        out.push(format!("... {} more rows", rows - max_rows));
    }
    out
}
