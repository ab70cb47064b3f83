use crate::error::StorageError;
use std::path::{Component, Path, PathBuf};

fn escape(path: &Path, reason: &'static str) -> StorageError {
    StorageError::PathTraversalAttempt {
        message: path.display().to_string().into(),
        context: Some(reason.into()),
    }
}

/// Folds `.` and `..` lexically. A `..` that would climb above the root is rejected.
fn normalize_relative(path: &Path) -> Result<PathBuf, StorageError> {
    let mut out = PathBuf::new();

    for component in path.components() {
        match component {
            Component::CurDir => {},
            Component::Normal(segment) => out.push(segment),
            Component::ParentDir if out.pop() => {},
            Component::ParentDir => return Err(escape(path, "'..' climbs above the root")),
            Component::RootDir | Component::Prefix(_) => {
                return Err(escape(path, "Absolute paths are not accepted"));
            },
        }
    }

    if out.as_os_str().is_empty() {
        return Err(escape(path, "Path resolves to the root itself"));
    }
    Ok(out)
}

/// Joins `path` onto the canonical `root`, refusing anything that lands outside it.
///
/// Existing targets are canonicalized so symlinks are followed before the check. For targets
/// that do not exist yet the nearest existing ancestor is checked instead.
pub(crate) fn resolve_path(root: &Path, path: impl AsRef<Path>) -> Result<PathBuf, StorageError> {
    let path = path.as_ref();
    let joined = root.join(normalize_relative(path)?);

    match joined.canonicalize() {
        Ok(canonical) if canonical.starts_with(root) => Ok(canonical),
        Ok(_) => Err(escape(path, "Target is a link outside the root")),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => check_ancestors(root, joined),
        Err(e) => Err(StorageError::Io { source: e, context: Some("Resolving path".into()) }),
    }
}

fn check_ancestors(root: &Path, joined: PathBuf) -> Result<PathBuf, StorageError> {
    let mut current = joined.parent();

    while let Some(dir) = current {
        if dir == root {
            return Ok(joined);
        }
        if dir.exists() {
            let canonical = dir.canonicalize().map_err(|e| StorageError::Io {
                source: e,
                context: Some("Verifying parent directory".into()),
            })?;
            return if canonical.starts_with(root) {
                Ok(joined)
            } else {
                Err(escape(dir, "Parent directory is a link outside the root"))
            };
        }
        current = dir.parent();
    }

    Err(escape(&joined, "No ancestor inside the root"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_folds_dots() {
        let out = normalize_relative(Path::new("a/./b/../c.json")).unwrap();
        assert_eq!(out, PathBuf::from("a/c.json"));
    }

    #[test]
    fn test_normalize_rejects_escape_and_empty() {
        assert!(normalize_relative(Path::new("../x")).is_err());
        assert!(normalize_relative(Path::new("a/../..")).is_err());
        assert!(normalize_relative(Path::new(".")).is_err());
    }

    #[test]
    fn test_absolute_rejected() {
        let root = std::env::temp_dir();
        assert!(matches!(
            resolve_path(&root, "/etc/passwd"),
            Err(StorageError::PathTraversalAttempt { .. })
        ));
    }
}
