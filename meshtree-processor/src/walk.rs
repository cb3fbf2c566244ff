use crate::error::{BuildError, BuildResult};
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// A mesh file found under the input root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeshSource {
    pub path: PathBuf,
    /// Path relative to the input root, `/`-separated.
    pub relative: String,
    /// Directory components between the root and the file.
    pub groups: Vec<String>,
    /// File name without the mesh extension.
    pub name: String,
}

impl MeshSource {
    /// Container path of the mesh record: its groups followed by its name.
    pub fn record_path(&self) -> Vec<&str> {
        self.groups
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(self.name.as_str()))
            .collect()
    }
}

/// Record name for `file_name` if it carries `extension` (case-sensitive).
///
/// The extension is kept when stripping it would leave nothing but dots, so
/// `.obj` names a record `.obj`.
pub fn mesh_name<'a>(file_name: &'a str, extension: &str) -> Option<&'a str> {
    let stem = file_name.strip_suffix(extension)?.strip_suffix('.')?;
    if stem.chars().all(|c| c == '.') {
        Some(file_name)
    } else {
        Some(stem)
    }
}

/// Recursively collects every `*.{extension}` file under `root`.
///
/// Entries are visited in file-name order. Symlinked files are included,
/// symlinked directories are not followed.
pub fn discover(root: &Path, extension: &str) -> BuildResult<Vec<MeshSource>> {
    let meta = fs::metadata(root).map_err(|source| BuildError::InputRoot {
        path: root.to_path_buf(),
        source,
    })?;
    if !meta.is_dir() {
        return Err(BuildError::InputRoot {
            path: root.to_path_buf(),
            source: io::Error::other("not a directory"),
        });
    }

    let extension = extension.trim_start_matches('.');
    let mut out = Vec::new();
    visit(root, &mut Vec::new(), extension, &mut out)?;
    log::debug!("found {} mesh files under {}", out.len(), root.display());
    Ok(out)
}

fn visit(
    dir: &Path,
    groups: &mut Vec<OsString>,
    extension: &str,
    out: &mut Vec<MeshSource>,
) -> BuildResult<()> {
    let walk_err = |source: io::Error| BuildError::Walk {
        path: dir.to_path_buf(),
        source,
    };
    let mut entries = fs::read_dir(dir)
        .and_then(|entries| entries.collect::<io::Result<Vec<_>>>())
        .map_err(walk_err)?;
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let path = entry.path();
        let file_type = entry.file_type().map_err(walk_err)?;

        if file_type.is_dir() {
            groups.push(entry.file_name());
            visit(&path, groups, extension, out)?;
            groups.pop();
            continue;
        }

        let is_file = file_type.is_file()
            || (file_type.is_symlink() && fs::metadata(&path).is_ok_and(|m| m.is_file()));
        if !is_file {
            log::debug!("skipping {}", path.display());
            continue;
        }

        let file_name = entry.file_name();
        let bytes = file_name.as_encoded_bytes();
        if !bytes.ends_with(extension.as_bytes()) {
            continue;
        }
        let Some(file_name) = file_name.to_str() else {
            return Err(BuildError::InvalidPath(path));
        };
        let Some(name) = mesh_name(file_name, extension) else {
            continue;
        };

        let group_names = groups
            .iter()
            .map(|g| g.to_str().map(str::to_owned))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| BuildError::InvalidPath(path.clone()))?;
        let relative = group_names
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(file_name))
            .collect::<Vec<_>>()
            .join("/");

        out.push(MeshSource {
            name: name.to_owned(),
            path,
            relative,
            groups: group_names,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn mesh_names_strip_one_extension() {
        assert_eq!(mesh_name("bunny.obj", "obj"), Some("bunny"));
        assert_eq!(mesh_name("a.b.obj", "obj"), Some("a.b"));
        assert_eq!(mesh_name("x..obj", "obj"), Some("x."));
        assert_eq!(mesh_name(".obj", "obj"), Some(".obj"));
        assert_eq!(mesh_name("..obj", "obj"), Some("..obj"));
        assert_eq!(mesh_name("bunny.OBJ", "obj"), None);
        assert_eq!(mesh_name("bunnyobj", "obj"), None);
        assert_eq!(mesh_name("bunny.obj.bak", "obj"), None);
    }

    #[test]
    fn discovers_nested_files_in_order() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("b/inner")).unwrap();
        fs::create_dir_all(root.join("a")).unwrap();
        fs::create_dir_all(root.join("empty")).unwrap();
        for file in ["b/inner/z.obj", "b/y.obj", "a/x.obj", "top.obj", "a/notes.txt", "a/X.OBJ"] {
            fs::write(root.join(file), "").unwrap();
        }

        let found = discover(root, "obj").unwrap();
        let relative: Vec<_> = found.iter().map(|s| s.relative.as_str()).collect();
        assert_eq!(relative, vec!["a/x.obj", "b/inner/z.obj", "b/y.obj", "top.obj"]);

        let z = &found[1];
        assert_eq!(z.groups, vec!["b", "inner"]);
        assert_eq!(z.name, "z");
        assert_eq!(z.record_path(), vec!["b", "inner", "z"]);
        assert_eq!(z.path, root.join("b/inner/z.obj"));
        assert!(found[3].groups.is_empty());
    }

    #[test]
    fn extension_may_carry_a_dot() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("m.ply"), "").unwrap();
        fs::write(dir.path().join("m.obj"), "").unwrap();
        let found = discover(dir.path(), ".ply").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "m");
    }

    #[test]
    fn missing_root_is_an_error() {
        let dir = tempdir().unwrap();
        let err = discover(&dir.path().join("nope"), "obj").unwrap_err();
        assert!(matches!(err, BuildError::InputRoot { .. }));

        let file = dir.path().join("file.obj");
        fs::write(&file, "").unwrap();
        assert!(matches!(discover(&file, "obj"), Err(BuildError::InputRoot { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_subdirectory_is_a_walk_error() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let locked = dir.path().join("locked");
        fs::create_dir(&locked).unwrap();
        fs::write(locked.join("m.obj"), "").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // Privileged users read through the mode bits; nothing to check then.
        let readable = fs::read_dir(&locked).is_ok();
        let result = discover(dir.path(), "obj");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        if readable {
            return;
        }

        match result {
            Err(BuildError::Walk { path, .. }) => assert_eq!(path, locked),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_names_are_rejected() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = tempdir().unwrap();
        let file = dir.path().join(OsStr::from_bytes(b"bad\xff.obj"));
        if fs::write(&file, "").is_err() {
            return;
        }
        match discover(dir.path(), "obj") {
            Err(BuildError::InvalidPath(path)) => assert_eq!(path, file),
            other => panic!("unexpected result: {other:?}"),
        }

        let nested = tempdir().unwrap();
        let group = nested.path().join(OsStr::from_bytes(b"dir\xfe"));
        fs::create_dir(&group).unwrap();
        fs::write(group.join("m.obj"), "").unwrap();
        match discover(nested.path(), "obj") {
            Err(BuildError::InvalidPath(path)) => assert_eq!(path, group.join("m.obj")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_directories_are_not_followed() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir(root.join("real")).unwrap();
        fs::write(root.join("real/m.obj"), "").unwrap();
        std::os::unix::fs::symlink(root.join("real"), root.join("loop")).unwrap();
        std::os::unix::fs::symlink(root.join("real/m.obj"), root.join("alias.obj")).unwrap();

        let found = discover(root, "obj").unwrap();
        let relative: Vec<_> = found.iter().map(|s| s.relative.as_str()).collect();
        assert_eq!(relative, vec!["alias.obj", "real/m.obj"]);
    }
}
