use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{}:{line}: vertex needs 3 coordinates, found {found}", .path.display())]
    TruncatedVertex { path: PathBuf, line: usize, found: usize },

    #[error("{}:{line}: invalid number `{token}`", .path.display())]
    InvalidNumber { path: PathBuf, line: usize, token: String },

    #[error("{}:{line}: invalid vertex reference `{token}`", .path.display())]
    InvalidReference { path: PathBuf, line: usize, token: String },

    #[error("{}:{line}: face has no vertex references", .path.display())]
    EmptyFace { path: PathBuf, line: usize },

    #[error("{}:{line}: face has {found} vertices, expected {expected}", .path.display())]
    InconsistentArity {
        path: PathBuf,
        line: usize,
        found: usize,
        expected: usize,
    },

    #[error("{}:{line}: cannot triangulate a face with {found} vertices", .path.display())]
    DegenerateFace { path: PathBuf, line: usize, found: usize },

    #[error("{}: face references vertex {index} but only {count} vertices exist", .path.display())]
    IndexOutOfRange { path: PathBuf, index: i64, count: usize },
}

impl ParseError {
    /// Source file the error was raised for.
    pub fn path(&self) -> &std::path::Path {
        match self {
            ParseError::Io { path, .. }
            | ParseError::TruncatedVertex { path, .. }
            | ParseError::InvalidNumber { path, .. }
            | ParseError::InvalidReference { path, .. }
            | ParseError::EmptyFace { path, .. }
            | ParseError::InconsistentArity { path, .. }
            | ParseError::DegenerateFace { path, .. }
            | ParseError::IndexOutOfRange { path, .. } => path,
        }
    }
}

pub type ParseResult<T> = Result<T, ParseError>;
