use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};
use std::fmt;

#[cfg(target_endian = "big")]
compile_error!("container payloads are little-endian; big-endian targets are unsupported");

pub const MAGIC: [u8; 4] = *b"MTC\0";
pub const VERSION: u32 = 1;
pub const HEADER_LEN: u64 = std::mem::size_of::<FileHeader>() as u64;

/// Fixed header at offset 0, rewritten once the index has been appended.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct FileHeader {
    pub magic: [u8; 4],
    pub version: u32,
    pub index_offset: u64,
    pub index_len: u64, // 0 until finalized
    pub dataset_count: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DType {
    F32,
    I32,
    I64,
}

impl DType {
    pub fn size(self) -> usize {
        match self {
            DType::F32 | DType::I32 => 4,
            DType::I64 => 8,
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DType::F32 => "float32",
            DType::I32 => "int32",
            DType::I64 => "int64",
        };
        f.write_str(name)
    }
}

/// Element types that can be stored in a dataset.
pub trait Element: Pod {
    const DTYPE: DType;
}

impl Element for f32 {
    const DTYPE: DType = DType::F32;
}

impl Element for i32 {
    const DTYPE: DType = DType::I32;
}

impl Element for i64 {
    const DTYPE: DType = DType::I64;
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    None,
    #[default]
    Zstd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageOptions {
    pub compression: Compression,
    /// Target uncompressed size of one chunk.
    pub chunk_bytes: usize,
}

impl Default for StorageOptions {
    fn default() -> Self {
        Self {
            compression: Compression::Zstd,
            chunk_bytes: 64 * 1024,
        }
    }
}

/// Names may not be empty, contain `/`, or be `.` / `..`.
pub fn validate_name(name: &str) -> bool {
    !name.is_empty() && !name.contains('/') && name != "." && name != ".."
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_is_packed() {
        assert_eq!(HEADER_LEN, 32);
    }

    #[test]
    fn names() {
        assert!(validate_name("mesh_01"));
        assert!(validate_name(".hidden"));
        assert!(!validate_name(""));
        assert!(!validate_name("a/b"));
        assert!(!validate_name(".."));
    }
}
