use meshtree_core::ParseError;
use meshtree_store::StoreError;
use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("cannot read input directory {}: {source}", .path.display())]
    InputRoot {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to scan {}: {source}", .path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("path {} is not valid UTF-8", .0.display())]
    InvalidPath(PathBuf),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("failed to store {record}: {source}")]
    Record {
        record: String,
        #[source]
        source: StoreError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("cancelled after {converted} files")]
    Cancelled { converted: usize },
}

pub type BuildResult<T> = Result<T, BuildError>;
