//! Single-file hierarchical container for numeric arrays.
//!
//! A container is a tree of named groups whose leaves are datasets. Dataset
//! payloads are split into row chunks, compressed individually and appended
//! after the header; the group tree itself is serialized at the end of the file
//! and located through the header.

pub mod chunk;
pub mod error;
pub mod format;
pub mod reader;
pub mod tree;
pub mod writer;

pub use error::{StoreError, StoreResult};
pub use format::{Compression, DType, Element, FileHeader, StorageOptions};
pub use reader::{Array, ContainerReader};
pub use tree::{ChunkRef, DatasetMeta, Group, Node};
pub use writer::{ContainerSummary, ContainerWriter};
