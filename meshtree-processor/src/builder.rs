use crate::error::{BuildError, BuildResult};
use crate::walk::{self, MeshSource};
use meshtree_core::{FacePolicy, Mesh, ObjParser};
use meshtree_store::{ContainerSummary, ContainerWriter, Node, StorageOptions, StoreError};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Dataset names written into every mesh record.
pub const VERTICES: &str = "vertices";
pub const FACES: &str = "faces";
pub const FACE_OFFSETS: &str = "face_offsets";

/// How a failing mesh file affects the rest of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Stop at the first failure. The container keeps what was written before it.
    #[default]
    Abort,
    /// Log and record the failure, then move on to the next file.
    Continue,
}

#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Mesh file extension, matched case-sensitively.
    pub extension: String,
    pub face_policy: FacePolicy,
    /// Reject face references below 1 or past the last vertex.
    pub validate_indices: bool,
    pub error_policy: ErrorPolicy,
    pub storage: StorageOptions,
    /// Checked between files; setting it stops the run early.
    pub cancel: Option<Arc<AtomicBool>>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            extension: "obj".to_owned(),
            face_policy: FacePolicy::default(),
            validate_indices: false,
            error_policy: ErrorPolicy::default(),
            storage: StorageOptions::default(),
            cancel: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFailure {
    /// Path relative to the input root.
    pub path: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
    pub converted: usize,
    pub failed: Vec<FileFailure>,
    pub summary: ContainerSummary,
}

impl BuildReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Converts `input_root` into a container at `output` with default options.
pub fn build<P: AsRef<Path>, Q: AsRef<Path>>(input_root: P, output: Q) -> BuildResult<BuildReport> {
    DatasetBuilder::new(BuildOptions::default()).build(input_root, output)
}

/// Mirrors a directory of mesh files into a container.
///
/// Every `a/b/c.obj` under the input root becomes the record `/a/b/c` holding a
/// `vertices` (V, 3) float32 dataset and a `faces` (F, K) int32 dataset.
pub struct DatasetBuilder {
    options: BuildOptions,
    parser: ObjParser,
}

impl DatasetBuilder {
    pub fn new(options: BuildOptions) -> Self {
        let parser =
            ObjParser::new(options.face_policy).with_index_validation(options.validate_indices);
        Self { options, parser }
    }

    pub fn build<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        input_root: P,
        output: Q,
    ) -> BuildResult<BuildReport> {
        let (input_root, output) = (input_root.as_ref(), output.as_ref());
        let sources = walk::discover(input_root, &self.options.extension)?;
        log::info!(
            "Converting {} mesh files from {}",
            sources.len(),
            input_root.display()
        );

        // Dropping the writer on an early return still finalizes the file.
        let mut writer = ContainerWriter::create(output, self.options.storage)?;
        let mut converted = 0;
        let mut failed = Vec::new();

        for source in &sources {
            if self.cancelled() {
                log::warn!("Cancelled after {} files", converted);
                writer.finish()?;
                return Err(BuildError::Cancelled { converted });
            }

            match self.convert(&mut writer, source) {
                Ok(()) => {
                    converted += 1;
                    log::info!("Stored {} in {}", source.relative, output.display());
                }
                Err(e) => match self.options.error_policy {
                    ErrorPolicy::Abort => return Err(e),
                    ErrorPolicy::Continue => {
                        log::warn!("Skipping {}: {}", source.relative, e);
                        failed.push(FileFailure {
                            path: source.relative.clone(),
                            reason: e.to_string(),
                        });
                    }
                },
            }
        }

        let summary = writer.finish()?;
        log::info!("Finished creating dataset at {}", output.display());
        Ok(BuildReport {
            converted,
            failed,
            summary,
        })
    }

    fn cancelled(&self) -> bool {
        self.options
            .cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    /// Parses first so a malformed file never leaves a record behind.
    fn convert(&self, writer: &mut ContainerWriter, source: &MeshSource) -> BuildResult<()> {
        let mesh = self.parser.parse_file(&source.path)?;
        let record = source.record_path();
        write_record(writer, &record, &mesh, &source.relative).map_err(|e| BuildError::Record {
            record: source.relative.clone(),
            source: e,
        })
    }
}

fn write_record(
    writer: &mut ContainerWriter,
    record: &[&str],
    mesh: &Mesh,
    source: &str,
) -> Result<(), StoreError> {
    let record_path = record.join("/");
    if let Some(Node::Group(existing)) = writer.root().resolve(&record_path) {
        for name in [VERTICES, FACES, FACE_OFFSETS] {
            if existing.get(name).is_some() {
                return Err(StoreError::AlreadyExists(format!("/{record_path}/{name}")));
            }
        }
    }
    writer.require_group(record)?;

    let vertices: &[f32] = bytemuck::cast_slice(&mesh.vertices);
    writer.write_dataset(record, VERTICES, &[mesh.vertices.len() as u64, 3], vertices)?;

    let faces = &mesh.faces;
    match faces.uniform_arity() {
        Some(arity) => {
            let shape = [faces.len() as u64, arity as u64];
            writer.write_dataset(record, FACES, &shape, faces.indices())?
        }
        None if faces.is_empty() => writer.write_dataset::<i32, _>(record, FACES, &[0, 0], &[])?,
        None => {
            let indices = faces.indices();
            let offsets: Vec<i64> = faces.offsets().iter().map(|&o| o as i64).collect();
            writer.write_dataset(record, FACES, &[indices.len() as u64], indices)?;
            writer.write_dataset(record, FACE_OFFSETS, &[offsets.len() as u64], &offsets)?;
        }
    }

    writer.set_attr(record, "source", source)
}
