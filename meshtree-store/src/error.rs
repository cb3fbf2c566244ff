use crate::format::DType;
use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid node name `{0}`")]
    InvalidName(String),

    #[error("`{0}` is a dataset, not a group")]
    NotAGroup(String),

    #[error("`{0}` is a group, not a dataset")]
    NotADataset(String),

    #[error("no node at `{0}`")]
    NotFound(String),

    #[error("`{0}` already exists")]
    AlreadyExists(String),

    #[error("dataset `{name}`: shape holds {expected} elements but {found} were given")]
    ShapeMismatch { name: String, expected: u64, found: usize },

    #[error("dataset `{path}` stores {stored}, requested {requested}")]
    DTypeMismatch {
        path: String,
        stored: DType,
        requested: DType,
    },

    #[error("corrupt container {}: {reason}", .path.display())]
    Corrupt { path: PathBuf, reason: String },

    #[error("an earlier write to {} failed; container left unfinalized", .0.display())]
    Poisoned(PathBuf),

    #[error("chunk compression failed: {0}")]
    Compression(String),

    #[error("index encoding failed: {0}")]
    Index(#[from] bincode::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;
