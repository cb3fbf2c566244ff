pub mod error;
pub mod mesh;
pub mod obj;

pub use error::{ParseError, ParseResult};
pub use mesh::{FacePolicy, Faces, Mesh};
pub use obj::{ObjParser, parse_obj};
