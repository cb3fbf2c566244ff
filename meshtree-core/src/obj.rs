use crate::error::{ParseError, ParseResult};
use crate::mesh::{FacePolicy, Mesh};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str::SplitAsciiWhitespace;

/// Line scanner for the position/face subset of Wavefront OBJ.
///
/// Only `v` and `f` records are read. Normals, texture coordinates, groups,
/// materials and anything else are skipped. Face references are converted to
/// zero-based indices as written; [`with_index_validation`] additionally
/// rejects references below 1 or past the last vertex.
///
/// [`with_index_validation`]: ObjParser::with_index_validation
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjParser {
    policy: FacePolicy,
    validate_indices: bool,
}

/// Parses `path` with [`FacePolicy::Strict`].
pub fn parse_obj<P: AsRef<Path>>(path: P) -> ParseResult<Mesh> {
    ObjParser::default().parse_file(path)
}

impl ObjParser {
    pub fn new(policy: FacePolicy) -> Self {
        Self {
            policy,
            validate_indices: false,
        }
    }

    pub fn with_index_validation(mut self, validate: bool) -> Self {
        self.validate_indices = validate;
        self
    }

    pub fn parse_file<P: AsRef<Path>>(&self, path: P) -> ParseResult<Mesh> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| ParseError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.parse_reader(BufReader::new(file), path)
    }

    /// `source` is only used to label errors.
    pub fn parse_reader<R: BufRead>(&self, reader: R, source: &Path) -> ParseResult<Mesh> {
        let mut scan = Scan {
            source,
            policy: self.policy,
            validate: self.validate_indices,
            mesh: Mesh::default(),
            arity: None,
            max_reference: 0,
            face: Vec::new(),
        };

        for (i, line) in reader.lines().enumerate() {
            let line = line.map_err(|source| ParseError::Io {
                path: scan.source.to_path_buf(),
                source,
            })?;
            scan.line(&line, i + 1)?;
        }

        scan.finish()
    }
}

struct Scan<'a> {
    source: &'a Path,
    policy: FacePolicy,
    validate: bool,
    mesh: Mesh,
    // arity of the first face, enforced under `Strict`
    arity: Option<usize>,
    // largest one-based reference seen
    max_reference: i64,
    face: Vec<i32>,
}

impl Scan<'_> {
    fn line(&mut self, line: &str, line_no: usize) -> ParseResult<()> {
        let content = line.split_once('#').map_or(line, |(head, _)| head);
        let mut tokens = content.split_ascii_whitespace();
        match tokens.next() {
            Some("v") => {
                let vertex = self.vertex(tokens, line_no)?;
                self.mesh.vertices.push(vertex);
            }
            Some("f") => {
                self.face.clear();
                for token in tokens {
                    let index = self.reference(token, line_no)?;
                    self.face.push(index);
                }
                self.push_face(line_no)?;
            }
            _ => {}
        }
        Ok(())
    }

    fn vertex(
        &self,
        mut tokens: SplitAsciiWhitespace<'_>,
        line_no: usize,
    ) -> ParseResult<[f32; 3]> {
        let mut vertex = [0.0f32; 3];
        for (axis, slot) in vertex.iter_mut().enumerate() {
            let token = tokens.next().ok_or_else(|| ParseError::TruncatedVertex {
                path: self.source.to_path_buf(),
                line: line_no,
                found: axis,
            })?;
            *slot = token.parse().map_err(|_| ParseError::InvalidNumber {
                path: self.source.to_path_buf(),
                line: line_no,
                token: token.to_owned(),
            })?;
        }
        Ok(vertex)
    }

    /// `"5"`, `"5/2"`, `"5//3"` and `"5/2/1"` all resolve to zero-based 4.
    fn reference(&mut self, token: &str, line_no: usize) -> ParseResult<i32> {
        let head = token.split_once('/').map_or(token, |(head, _)| head);
        let invalid = || ParseError::InvalidReference {
            path: self.source.to_path_buf(),
            line: line_no,
            token: token.to_owned(),
        };
        let one_based: i64 = head.parse().map_err(|_| invalid())?;
        if self.validate && one_based < 1 {
            return Err(invalid());
        }
        let index = one_based
            .checked_sub(1)
            .and_then(|i| i32::try_from(i).ok())
            .ok_or_else(invalid)?;
        self.max_reference = self.max_reference.max(one_based);
        Ok(index)
    }

    fn push_face(&mut self, line_no: usize) -> ParseResult<()> {
        let found = self.face.len();
        if found == 0 {
            return Err(ParseError::EmptyFace {
                path: self.source.to_path_buf(),
                line: line_no,
            });
        }

        match self.policy {
            FacePolicy::Strict => {
                let expected = *self.arity.get_or_insert(found);
                if found != expected {
                    return Err(ParseError::InconsistentArity {
                        path: self.source.to_path_buf(),
                        line: line_no,
                        found,
                        expected,
                    });
                }
                self.mesh.faces.push(&self.face);
            }
            FacePolicy::Ragged => self.mesh.faces.push(&self.face),
            FacePolicy::Triangulate => {
                if found < 3 {
                    return Err(ParseError::DegenerateFace {
                        path: self.source.to_path_buf(),
                        line: line_no,
                        found,
                    });
                }
                let anchor = self.face[0];
                for pair in self.face[1..].windows(2) {
                    self.mesh.faces.push(&[anchor, pair[0], pair[1]]);
                }
            }
        }
        Ok(())
    }

    fn finish(self) -> ParseResult<Mesh> {
        let count = self.mesh.vertices.len();
        if self.validate && self.max_reference > count as i64 {
            return Err(ParseError::IndexOutOfRange {
                path: self.source.to_path_buf(),
                index: self.max_reference,
                count,
            });
        }
        log::debug!(
            "parsed {}: {} vertices, {} faces",
            self.source.display(),
            count,
            self.mesh.faces.len()
        );
        Ok(self.mesh)
    }
}
