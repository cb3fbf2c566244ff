use crate::chunk;
use crate::error::{StoreError, StoreResult};
use crate::format::{Element, FileHeader, HEADER_LEN, MAGIC, VERSION};
use crate::tree::{DatasetMeta, Group, Node};
use memmap2::Mmap;
use std::fs::File;
use std::path::{Path, PathBuf};

/// A dataset read back into memory.
#[derive(Debug, Clone, PartialEq)]
pub struct Array<T> {
    pub shape: Vec<u64>,
    pub data: Vec<T>,
}

impl<T: Copy> Array<T> {
    /// Length of the first axis.
    pub fn rows(&self) -> usize {
        self.shape.first().copied().unwrap_or(1) as usize
    }

    pub fn row(&self, i: usize) -> Option<&[T]> {
        let width = self.shape.iter().skip(1).product::<u64>() as usize;
        let start = i.checked_mul(width)?;
        self.data.get(start..start + width)
    }
}

/// Read-only view of a finalized container, backed by a memory map.
pub struct ContainerReader {
    path: PathBuf,
    mmap: Mmap,
    header: FileHeader,
    root: Group,
}

impl ContainerReader {
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;
        let mmap = unsafe { Mmap::map(&file) }.map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;
        let corrupt = |reason: &str| StoreError::Corrupt {
            path: path.clone(),
            reason: reason.to_owned(),
        };

        if (mmap.len() as u64) < HEADER_LEN {
            return Err(corrupt("file too small for a header"));
        }
        let header: FileHeader = bytemuck::pod_read_unaligned(&mmap[..HEADER_LEN as usize]);
        if header.magic != MAGIC {
            return Err(corrupt("bad magic"));
        }
        if header.version != VERSION {
            return Err(corrupt("unsupported version"));
        }
        if header.index_len == 0 {
            return Err(corrupt("container was not finalized"));
        }
        let end = header
            .index_offset
            .checked_add(header.index_len)
            .filter(|&end| header.index_offset >= HEADER_LEN && end <= mmap.len() as u64)
            .ok_or_else(|| corrupt("index out of bounds"))?;

        let root: Group = bincode::deserialize(&mmap[header.index_offset as usize..end as usize])?;

        Ok(Self {
            path,
            mmap,
            header,
            root,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn root(&self) -> &Group {
        &self.root
    }

    pub fn dataset_count(&self) -> u64 {
        self.header.dataset_count
    }

    pub fn node(&self, path: &str) -> StoreResult<&Node> {
        self.root
            .resolve(path)
            .ok_or_else(|| StoreError::NotFound(path.to_owned()))
    }

    /// The root group for `""` or `"/"`, otherwise the group at `path`.
    pub fn group(&self, path: &str) -> StoreResult<&Group> {
        if path.trim_matches('/').is_empty() {
            return Ok(&self.root);
        }
        match self.node(path)? {
            Node::Group(g) => Ok(g),
            Node::Dataset(_) => Err(StoreError::NotAGroup(path.to_owned())),
        }
    }

    pub fn dataset(&self, path: &str) -> StoreResult<&DatasetMeta> {
        match self.node(path)? {
            Node::Dataset(d) => Ok(d),
            Node::Group(_) => Err(StoreError::NotADataset(path.to_owned())),
        }
    }

    pub fn walk(&self) -> Vec<(String, &Node)> {
        self.root.walk()
    }

    /// Decompresses every chunk of the dataset at `path`.
    pub fn read<T: Element>(&self, path: &str) -> StoreResult<Array<T>> {
        let meta = self.dataset(path)?;
        if meta.dtype != T::DTYPE {
            return Err(StoreError::DTypeMismatch {
                path: path.to_owned(),
                stored: meta.dtype,
                requested: T::DTYPE,
            });
        }

        let count = meta.element_count() as usize;
        let mut bytes = Vec::with_capacity(count * T::DTYPE.size());
        for c in &meta.chunks {
            let start = c.offset;
            let end = start.checked_add(c.stored_len).filter(|&end| {
                start >= HEADER_LEN && end <= self.header.index_offset
            });
            let Some(end) = end else {
                return Err(StoreError::Corrupt {
                    path: self.path.clone(),
                    reason: format!("chunk of `{path}` out of bounds"),
                });
            };
            let stored = &self.mmap[start as usize..end as usize];
            bytes.extend(chunk::decode(stored, meta.compression, c.raw_len as usize)?);
        }

        if bytes.len() != count * T::DTYPE.size() {
            return Err(StoreError::Corrupt {
                path: self.path.clone(),
                reason: format!(
                    "`{path}` holds {} bytes, shape needs {}",
                    bytes.len(),
                    count * T::DTYPE.size()
                ),
            });
        }

        let data = bytes
            .chunks_exact(T::DTYPE.size())
            .map(bytemuck::pod_read_unaligned::<T>)
            .collect();
        Ok(Array {
            shape: meta.shape.clone(),
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{Compression, DType, StorageOptions};
    use crate::writer::ContainerWriter;
    use tempfile::tempdir;

    #[test]
    fn datasets_survive_a_round_trip() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("out.mtc");

        let vertices: Vec<f32> = (0..30).map(|i| i as f32 * 0.5).collect();
        let faces: Vec<i32> = vec![0, 1, 2, 2, 3, 4];
        let mut writer = ContainerWriter::create(&file, StorageOptions::default()).unwrap();
        writer.write_dataset(&["a", "m"], "vertices", &[10, 3], &vertices).unwrap();
        writer.write_dataset(&["a", "m"], "faces", &[2, 3], &faces).unwrap();
        writer.set_attr(&["a", "m"], "source", "a/m.obj").unwrap();
        let summary = writer.finish().unwrap();
        assert_eq!(summary.groups, 2);
        assert_eq!(summary.datasets, 2);
        assert_eq!(summary.bytes, std::fs::metadata(&file).unwrap().len());

        let reader = ContainerReader::open(&file).unwrap();
        assert_eq!(reader.dataset_count(), 2);
        let v = reader.read::<f32>("/a/m/vertices").unwrap();
        assert_eq!(v.shape, vec![10, 3]);
        assert_eq!(v.data, vertices);
        assert_eq!(v.row(1), Some(&[1.5, 2.0, 2.5][..]));
        let f = reader.read::<i32>("a/m/faces").unwrap();
        assert_eq!(f.rows(), 2);
        assert_eq!(f.data, faces);
        assert_eq!(reader.group("/a/m").unwrap().attr("source"), Some("a/m.obj"));
    }

    #[test]
    fn small_chunks_split_rows() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("chunks.mtc");
        let options = StorageOptions {
            compression: Compression::None,
            chunk_bytes: 24,
        };

        let data: Vec<f32> = (0..21).map(|i| i as f32).collect();
        let mut writer = ContainerWriter::create(&file, options).unwrap();
        writer.write_dataset::<f32, &str>(&[], "v", &[7, 3], &data).unwrap();
        writer.finish().unwrap();

        let reader = ContainerReader::open(&file).unwrap();
        let meta = reader.dataset("v").unwrap();
        assert_eq!(meta.chunk_rows, 2);
        assert_eq!(meta.chunks.len(), 4);
        assert_eq!(meta.chunks[3].raw_len, 12);
        assert_eq!(reader.read::<f32>("v").unwrap().data, data);
    }

    #[test]
    fn empty_datasets_keep_their_shape() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("empty.mtc");
        let mut writer = ContainerWriter::create(&file, StorageOptions::default()).unwrap();
        writer.write_dataset::<f32, _>(&["e"], "vertices", &[0, 3], &[]).unwrap();
        writer.finish().unwrap();

        let reader = ContainerReader::open(&file).unwrap();
        let meta = reader.dataset("e/vertices").unwrap();
        assert!(meta.chunks.is_empty());
        let v = reader.read::<f32>("e/vertices").unwrap();
        assert_eq!(v.shape, vec![0, 3]);
        assert_eq!(v.rows(), 0);
        assert!(v.data.is_empty());
    }

    #[test]
    fn writer_rejects_conflicts() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("conflict.mtc");
        let mut writer = ContainerWriter::create(&file, StorageOptions::default()).unwrap();
        writer.write_dataset(&["g"], "d", &[2], &[1i64, 2]).unwrap();

        let err = writer.write_dataset(&["g"], "d", &[1], &[3i64]).unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(ref p) if p == "/g/d"));
        let err = writer.write_dataset(&["g", "d"], "x", &[1], &[3i64]).unwrap_err();
        assert!(matches!(err, StoreError::NotAGroup(_)));
        let err = writer.write_dataset(&["g"], "y", &[2, 2], &[3i64]).unwrap_err();
        assert!(matches!(err, StoreError::ShapeMismatch { expected: 4, found: 1, .. }));
        let err = writer.write_dataset(&["g"], "a/b", &[1], &[3i64]).unwrap_err();
        assert!(matches!(err, StoreError::InvalidName(_)));
    }

    #[test]
    fn reader_checks_types_and_paths() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("types.mtc");
        let mut writer = ContainerWriter::create(&file, StorageOptions::default()).unwrap();
        writer.write_dataset(&["g"], "d", &[1], &[7i32]).unwrap();
        writer.finish().unwrap();

        let reader = ContainerReader::open(&file).unwrap();
        let err = reader.read::<f32>("g/d").unwrap_err();
        assert!(matches!(
            err,
            StoreError::DTypeMismatch { stored: DType::I32, requested: DType::F32, .. }
        ));
        assert!(matches!(reader.read::<i32>("g/missing"), Err(StoreError::NotFound(_))));
        assert!(matches!(reader.dataset("g"), Err(StoreError::NotADataset(_))));
        assert!(matches!(reader.group("g/d"), Err(StoreError::NotAGroup(_))));
        assert_eq!(reader.group("/").unwrap().children.len(), 1);
    }

    #[test]
    fn dropped_writer_still_finalizes() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("dropped.mtc");
        {
            let mut writer = ContainerWriter::create(&file, StorageOptions::default()).unwrap();
            writer.write_dataset(&["kept"], "d", &[3], &[1.0f32, 2.0, 3.0]).unwrap();
        }
        let reader = ContainerReader::open(&file).unwrap();
        assert_eq!(reader.read::<f32>("kept/d").unwrap().data, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn create_truncates_existing_files() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("again.mtc");
        let mut writer = ContainerWriter::create(&file, StorageOptions::default()).unwrap();
        writer.write_dataset(&["old"], "d", &[1], &[1i32]).unwrap();
        writer.finish().unwrap();

        ContainerWriter::create(&file, StorageOptions::default())
            .unwrap()
            .finish()
            .unwrap();
        let reader = ContainerReader::open(&file).unwrap();
        assert!(reader.root().children.is_empty());
        assert_eq!(reader.dataset_count(), 0);
    }

    #[test]
    fn garbage_is_rejected() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("garbage.mtc");
        std::fs::write(&file, b"definitely not a container, just some bytes").unwrap();
        assert!(matches!(
            ContainerReader::open(&file),
            Err(StoreError::Corrupt { .. })
        ));
    }
}
