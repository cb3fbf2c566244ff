use crate::error::{StoreError, StoreResult};
use crate::format::{Compression, DType, validate_name};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Location of one compressed chunk in the file.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkRef {
    pub offset: u64,
    pub stored_len: u64,
    pub raw_len: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DatasetMeta {
    pub dtype: DType,
    pub shape: Vec<u64>,
    /// Rows of the first axis per chunk.
    pub chunk_rows: u64,
    pub compression: Compression,
    pub chunks: Vec<ChunkRef>,
}

impl DatasetMeta {
    pub fn element_count(&self) -> u64 {
        self.shape.iter().product()
    }

    pub fn stored_bytes(&self) -> u64 {
        self.chunks.iter().map(|c| c.stored_len).sum()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum Node {
    Group(Group),
    Dataset(DatasetMeta),
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Group {
    pub attrs: BTreeMap<String, String>,
    pub children: BTreeMap<String, Node>,
}

impl Group {
    pub fn get(&self, name: &str) -> Option<&Node> {
        self.children.get(name)
    }

    pub fn group(&self, name: &str) -> Option<&Group> {
        match self.children.get(name)? {
            Node::Group(g) => Some(g),
            Node::Dataset(_) => None,
        }
    }

    pub fn dataset(&self, name: &str) -> Option<&DatasetMeta> {
        match self.children.get(name)? {
            Node::Dataset(d) => Some(d),
            Node::Group(_) => None,
        }
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(String::as_str)
    }

    pub fn groups(&self) -> impl Iterator<Item = (&str, &Group)> + '_ {
        self.children.iter().filter_map(|(name, node)| match node {
            Node::Group(g) => Some((name.as_str(), g)),
            Node::Dataset(_) => None,
        })
    }

    /// Resolves a `/`-separated path relative to this group.
    pub fn resolve(&self, path: &str) -> Option<&Node> {
        let mut parts = split_path(path);
        let first = parts.next()?;
        let mut node = self.children.get(first)?;
        for part in parts {
            node = match node {
                Node::Group(g) => g.children.get(part)?,
                Node::Dataset(_) => return None,
            };
        }
        Some(node)
    }

    /// Number of groups below this one, not counting itself.
    pub fn group_count(&self) -> usize {
        self.groups().map(|(_, g)| 1 + g.group_count()).sum()
    }

    /// Depth-first listing of every node with its full path.
    pub fn walk(&self) -> Vec<(String, &Node)> {
        let mut out = Vec::new();
        walk_into(self, "", &mut out);
        out
    }
}

fn walk_into<'a>(group: &'a Group, prefix: &str, out: &mut Vec<(String, &'a Node)>) {
    for (name, node) in &group.children {
        let path = format!("{prefix}/{name}");
        out.push((path.clone(), node));
        if let Node::Group(g) = node {
            walk_into(g, &path, out);
        }
    }
}

pub fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|part| !part.is_empty())
}

pub fn join_path<S: AsRef<str>>(parts: &[S]) -> String {
    let mut out = String::new();
    for part in parts {
        out.push('/');
        out.push_str(part.as_ref());
    }
    if out.is_empty() {
        out.push('/');
    }
    out
}

/// Walks `path` from `root`, creating missing groups and reusing existing ones.
pub fn require_group<'a, S: AsRef<str>>(
    root: &'a mut Group,
    path: &[S],
) -> StoreResult<&'a mut Group> {
    let mut group = root;
    for (depth, name) in path.iter().enumerate() {
        let name = name.as_ref();
        if !validate_name(name) {
            return Err(StoreError::InvalidName(name.to_owned()));
        }
        group = match group
            .children
            .entry(name.to_owned())
            .or_insert_with(|| Node::Group(Group::default()))
        {
            Node::Group(g) => g,
            Node::Dataset(_) => return Err(StoreError::NotAGroup(join_path(&path[..=depth]))),
        };
    }
    Ok(group)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_group_reuses_existing_groups() {
        let mut root = Group::default();
        require_group(&mut root, &["a", "b"]).unwrap();
        require_group(&mut root, &["a", "c"]).unwrap();
        require_group(&mut root, &["a", "b"])
            .unwrap()
            .attrs
            .insert("k".into(), "v".into());

        assert_eq!(root.children.len(), 1);
        let a = root.group("a").unwrap();
        assert_eq!(a.children.len(), 2);
        assert_eq!(a.group("b").unwrap().attr("k"), Some("v"));
        assert_eq!(root.group_count(), 3);
    }

    #[test]
    fn require_group_rejects_datasets_and_bad_names() {
        let mut root = Group::default();
        require_group(&mut root, &["a"]).unwrap().children.insert(
            "d".into(),
            Node::Dataset(DatasetMeta {
                dtype: DType::F32,
                shape: vec![0],
                chunk_rows: 1,
                compression: Compression::None,
                chunks: Vec::new(),
            }),
        );

        let err = require_group(&mut root, &["a", "d", "e"]).unwrap_err();
        assert!(matches!(err, StoreError::NotAGroup(ref p) if p == "/a/d"));
        let err = require_group(&mut root, &["a", ""]).unwrap_err();
        assert!(matches!(err, StoreError::InvalidName(_)));
    }

    #[test]
    fn resolve_and_walk() {
        let mut root = Group::default();
        require_group(&mut root, &["x", "y"]).unwrap();
        require_group(&mut root, &["z"]).unwrap();

        assert!(matches!(root.resolve("/x/y"), Some(Node::Group(_))));
        assert!(matches!(root.resolve("x//y/"), Some(Node::Group(_))));
        assert!(root.resolve("x/q").is_none());
        assert!(root.resolve("").is_none());

        let paths: Vec<_> = root.walk().into_iter().map(|(p, _)| p).collect();
        assert_eq!(paths, vec!["/x", "/x/y", "/z"]);
        assert_eq!(join_path::<&str>(&[]), "/");
    }
}
