/// What to do with faces whose vertex counts differ within one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FacePolicy {
    /// Every face must have the arity of the first face.
    #[default]
    Strict,
    /// Keep faces as written, mixed arities allowed.
    Ragged,
    /// Fan-triangulate every face into triples.
    Triangulate,
}

/// Face index lists in compressed-row form.
///
/// Face `i` is `indices[offsets[i]..offsets[i + 1]]`; `offsets` always starts with 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Faces {
    indices: Vec<i32>,
    offsets: Vec<usize>,
}

impl Default for Faces {
    fn default() -> Self {
        Self {
            indices: Vec::new(),
            offsets: vec![0],
        }
    }
}

impl Faces {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, face: &[i32]) {
        self.indices.extend_from_slice(face);
        self.offsets.push(self.indices.len());
    }

    pub fn len(&self) -> usize {
        self.offsets.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, i: usize) -> Option<&[i32]> {
        let start = *self.offsets.get(i)?;
        let end = *self.offsets.get(i + 1)?;
        Some(&self.indices[start..end])
    }

    pub fn iter(&self) -> impl Iterator<Item = &[i32]> + '_ {
        self.offsets
            .windows(2)
            .map(|w| &self.indices[w[0]..w[1]])
    }

    /// Flat index buffer of all faces in order.
    pub fn indices(&self) -> &[i32] {
        &self.indices
    }

    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    /// Arity shared by every face, `None` when empty or ragged.
    pub fn uniform_arity(&self) -> Option<usize> {
        let first = self.get(0)?.len();
        self.iter().all(|f| f.len() == first).then_some(first)
    }
}

/// Geometry read from one mesh file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub vertices: Vec<[f32; 3]>,
    pub faces: Faces,
}

impl Mesh {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }
}
