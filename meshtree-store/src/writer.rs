use crate::chunk;
use crate::error::{StoreError, StoreResult};
use crate::format::{Element, FileHeader, HEADER_LEN, MAGIC, StorageOptions, VERSION, validate_name};
use crate::tree::{ChunkRef, DatasetMeta, Group, Node, join_path, require_group};
use bytemuck::Zeroable;
use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerSummary {
    pub groups: usize,
    pub datasets: u64,
    pub bytes: u64,
}

/// Builds a container file.
///
/// The file is truncated on creation. Dataset payloads go to disk as they are
/// written; the group tree is kept in memory and written by [`finish`]. If the
/// writer is dropped without `finish`, it finalizes itself so the file stays
/// readable with whatever was written so far.
///
/// A payload write that fails leaves the file position unknown. The writer is
/// then poisoned: later writes are refused and the header is never rewritten,
/// so readers see an unfinalized file instead of a wrong index.
///
/// [`finish`]: ContainerWriter::finish
pub struct ContainerWriter {
    path: PathBuf,
    out: BufWriter<File>,
    cursor: u64,
    root: Group,
    options: StorageOptions,
    datasets: u64,
    finalized: bool,
    poisoned: bool,
}

impl ContainerWriter {
    pub fn create<P: AsRef<Path>>(path: P, options: StorageOptions) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;
        let mut out = BufWriter::with_capacity(1024 * 1024, file);
        out.write_all(bytemuck::bytes_of(&FileHeader::zeroed()))
            .map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;

        log::debug!("created container {}", path.display());
        Ok(Self {
            path,
            out,
            cursor: HEADER_LEN,
            root: Group::default(),
            options,
            datasets: 0,
            finalized: false,
            poisoned: false,
        })
    }

    pub fn root(&self) -> &Group {
        &self.root
    }

    /// Creates every missing group along `path`; existing groups are reused.
    pub fn require_group<S: AsRef<str>>(&mut self, path: &[S]) -> StoreResult<()> {
        require_group(&mut self.root, path).map(|_| ())
    }

    pub fn set_attr<S: AsRef<str>>(
        &mut self,
        path: &[S],
        key: &str,
        value: impl Into<String>,
    ) -> StoreResult<()> {
        let group = require_group(&mut self.root, path)?;
        group.attrs.insert(key.to_owned(), value.into());
        Ok(())
    }

    /// Stores `data` as a chunked dataset `name` inside the group at `group_path`.
    ///
    /// `data` is row-major and `shape` must account for every element.
    pub fn write_dataset<T: Element, S: AsRef<str>>(
        &mut self,
        group_path: &[S],
        name: &str,
        shape: &[u64],
        data: &[T],
    ) -> StoreResult<()> {
        if self.poisoned {
            return Err(StoreError::Poisoned(self.path.clone()));
        }
        if !validate_name(name) {
            return Err(StoreError::InvalidName(name.to_owned()));
        }
        let expected: u64 = shape.iter().product();
        if expected != data.len() as u64 {
            return Err(StoreError::ShapeMismatch {
                name: name.to_owned(),
                expected,
                found: data.len(),
            });
        }

        let group = require_group(&mut self.root, group_path)?;
        if group.children.contains_key(name) {
            let mut full = join_path(group_path);
            if !full.ends_with('/') {
                full.push('/');
            }
            full.push_str(name);
            return Err(StoreError::AlreadyExists(full));
        }

        let row_elems: u64 = shape.iter().skip(1).product();
        let row_bytes = row_elems as usize * T::DTYPE.size();
        let chunk_rows = chunk::rows_per_chunk(row_bytes, self.options.chunk_bytes);
        let raw: &[u8] = bytemuck::cast_slice(data);

        let mut chunks = Vec::new();
        if row_bytes > 0 {
            for piece in raw.chunks(chunk_rows as usize * row_bytes) {
                let stored = chunk::encode(piece, self.options.compression);
                if let Err(source) = self.out.write_all(&stored) {
                    self.poisoned = true;
                    return Err(StoreError::Io {
                        path: self.path.clone(),
                        source,
                    });
                }
                chunks.push(ChunkRef {
                    offset: self.cursor,
                    stored_len: stored.len() as u64,
                    raw_len: piece.len() as u64,
                });
                self.cursor += stored.len() as u64;
            }
        }

        group.children.insert(
            name.to_owned(),
            Node::Dataset(DatasetMeta {
                dtype: T::DTYPE,
                shape: shape.to_vec(),
                chunk_rows,
                compression: self.options.compression,
                chunks,
            }),
        );
        self.datasets += 1;
        Ok(())
    }

    /// Writes the group tree and header and syncs the file.
    pub fn finish(mut self) -> StoreResult<ContainerSummary> {
        self.finalize()
    }

    fn finalize(&mut self) -> StoreResult<ContainerSummary> {
        self.finalized = true;
        if self.poisoned {
            return Err(StoreError::Poisoned(self.path.clone()));
        }
        let io = |source: std::io::Error| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        let index = bincode::serialize(&self.root)?;
        self.out.write_all(&index).map_err(io)?;
        self.out.flush().map_err(io)?;

        let header = FileHeader {
            magic: MAGIC,
            version: VERSION,
            index_offset: self.cursor,
            index_len: index.len() as u64,
            dataset_count: self.datasets,
        };
        let file = self.out.get_mut();
        file.seek(SeekFrom::Start(0)).map_err(io)?;
        file.write_all(bytemuck::bytes_of(&header)).map_err(io)?;
        file.sync_all().map_err(io)?;

        let summary = ContainerSummary {
            groups: self.root.group_count(),
            datasets: self.datasets,
            bytes: self.cursor + index.len() as u64,
        };
        log::debug!(
            "finalized {}: {} groups, {} datasets, {} bytes",
            self.path.display(),
            summary.groups,
            summary.datasets,
            summary.bytes
        );
        Ok(summary)
    }
}

impl Drop for ContainerWriter {
    fn drop(&mut self) {
        if self.finalized {
            return;
        }
        if let Err(e) = self.finalize() {
            log::error!("failed to finalize {}: {}", self.path.display(), e);
        }
    }
}
