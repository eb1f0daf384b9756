use std::{
    ffi::OsString,
    fs, io,
    path::{Component, Path, PathBuf},
};

/// Drop `.` components and let `..` pop the previous one, without touching
/// the filesystem. `..` at the root stays at the root.
pub(crate) fn collapse(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {},
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                },
                Some(Component::RootDir | Component::Prefix(_)) => {},
                _ => out.push(Component::ParentDir),
            },
            other => out.push(other),
        }
    }
    out
}

/// Canonicalize a path that may not exist yet.
///
/// The path is collapsed first, then its longest existing ancestor is
/// resolved through the filesystem and the missing tail re-appended.
pub(crate) fn canonicalize_lenient(path: &Path) -> io::Result<PathBuf> {
    let collapsed = collapse(path);
    let mut existing = collapsed.as_path();
    let mut missing: Vec<OsString> = Vec::new();

    loop {
        match fs::canonicalize(existing) {
            Ok(mut resolved) => {
                resolved.extend(missing.iter().rev());
                return Ok(resolved);
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                let (Some(parent), Some(name)) = (existing.parent(), existing.file_name()) else {
                    return Err(e);
                };
                missing.push(name.to_os_string());
                existing = parent;
            },
            Err(e) => return Err(e),
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapse_removes_dots() {
        assert_eq!(
            collapse(Path::new("/sandbox/./a/../b/c/..")),
            PathBuf::from("/sandbox/b")
        );
        assert_eq!(collapse(Path::new("/../x")), PathBuf::from("/x"));
        assert_eq!(collapse(Path::new("a/../../x")), PathBuf::from("../x"));
        assert_eq!(collapse(Path::new("../../x")), PathBuf::from("../../x"));
    }

    #[test]
    fn canonicalizes_missing_tail() {
        let dir = tempfile::tempdir().unwrap();
        let base = fs::canonicalize(dir.path()).unwrap();

        let resolved = canonicalize_lenient(&dir.path().join("missing/deeper/file.txt")).unwrap();
        assert_eq!(resolved, base.join("missing/deeper/file.txt"));
    }

    #[test]
    fn canonicalizes_existing_path() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("real")).unwrap();
        let base = fs::canonicalize(dir.path()).unwrap();

        let resolved = canonicalize_lenient(&dir.path().join("real/./x/..")).unwrap();
        assert_eq!(resolved, base.join("real"));
    }

    #[cfg(unix)]
    #[test]
    fn resolves_symlinks_in_existing_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("target");
        fs::create_dir(&target).unwrap();
        std::os::unix::fs::symlink(&target, dir.path().join("link")).unwrap();

        let resolved = canonicalize_lenient(&dir.path().join("link/new.txt")).unwrap();
        assert_eq!(resolved, fs::canonicalize(&target).unwrap().join("new.txt"));
    }

    #[cfg(unix)]
    #[test]
    fn file_in_the_middle_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("plain"), "").unwrap();

        assert!(canonicalize_lenient(&dir.path().join("plain/child")).is_err());
    }
}
