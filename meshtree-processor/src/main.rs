use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use meshtree_processor::{
    BuildOptions, Compression, DatasetBuilder, ErrorPolicy, FacePolicy, StorageOptions,
};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(version, about = "Pack a directory tree of OBJ meshes into a single container file")]
struct Args {
    /// Directory scanned recursively for mesh files
    input: PathBuf,
    /// Container file to create; an existing file is overwritten
    output: PathBuf,
    /// Mesh file extension (case-sensitive)
    #[arg(long, default_value = "obj")]
    extension: String,
    /// Handling of faces with differing vertex counts
    #[arg(long, value_enum, default_value_t = FaceArg::Strict)]
    faces: FaceArg,
    /// Reject face references below 1 or past the last vertex
    #[arg(long)]
    validate_indices: bool,
    /// Skip files that fail to convert instead of stopping
    #[arg(long)]
    keep_going: bool,
    #[arg(long, value_enum, default_value_t = CompressionArg::Zstd)]
    compression: CompressionArg,
    /// Target uncompressed chunk size in KiB
    #[arg(long, default_value_t = 64)]
    chunk_kib: usize,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FaceArg {
    Strict,
    Ragged,
    Triangulate,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum CompressionArg {
    Zstd,
    None,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let options = BuildOptions {
        extension: args.extension,
        face_policy: match args.faces {
            FaceArg::Strict => FacePolicy::Strict,
            FaceArg::Ragged => FacePolicy::Ragged,
            FaceArg::Triangulate => FacePolicy::Triangulate,
        },
        validate_indices: args.validate_indices,
        error_policy: if args.keep_going {
            ErrorPolicy::Continue
        } else {
            ErrorPolicy::Abort
        },
        storage: StorageOptions {
            compression: match args.compression {
                CompressionArg::Zstd => Compression::Zstd,
                CompressionArg::None => Compression::None,
            },
            chunk_bytes: args.chunk_kib.max(1) * 1024,
        },
        cancel: None,
    };

    let start = Instant::now();
    let report = DatasetBuilder::new(options)
        .build(&args.input, &args.output)
        .with_context(|| {
            format!(
                "Failed to convert {} into {}",
                args.input.display(),
                args.output.display()
            )
        })?;

    println!(
        "Saved {} meshes in {} groups to {} ({:.2} MB) in {:.2}s",
        report.converted,
        report.summary.groups,
        args.output.display(),
        report.summary.bytes as f64 / 1024.0 / 1024.0,
        start.elapsed().as_secs_f32()
    );

    if !report.is_success() {
        for failure in &report.failed {
            eprintln!("  {}: {}", failure.path, failure.reason);
        }
        bail!(
            "{} of {} mesh files failed to convert",
            report.failed.len(),
            report.failed.len() + report.converted
        );
    }
    Ok(())
}
