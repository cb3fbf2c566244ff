pub mod builder;
pub mod error;
pub mod walk;

pub use builder::{BuildOptions, BuildReport, DatasetBuilder, ErrorPolicy, FileFailure, build};
pub use error::{BuildError, BuildResult};
pub use walk::{MeshSource, discover, mesh_name};

pub use meshtree_core::FacePolicy;
pub use meshtree_store::{Compression, StorageOptions};
