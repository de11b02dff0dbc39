//! Validated member path (the extraction path guard).

use crate::PipelineError;
use crate::Result;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

use super::ExtractRoot;

/// A member path that has been proven to resolve inside an [`ExtractRoot`].
///
/// `SafePath` rejects:
/// - Parent directory traversal (`..`)
/// - Absolute paths and Windows prefixes
/// - Null bytes
/// - Empty paths
/// - Paths whose nearest existing ancestor resolves, through symlinks, to a
///   location outside the root
///
/// The stored path is relative and normalized (`.` components removed).
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use zipfold_core::types::ExtractRoot;
/// use zipfold_core::types::SafePath;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let root = ExtractRoot::new("/tmp")?;
///
/// let safe = SafePath::validate(Path::new("foo/bar.txt"), &root)?;
/// assert!(SafePath::validate(Path::new("../etc/passwd"), &root).is_err());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SafePath(PathBuf);

impl SafePath {
    /// Validates `path` against `root`.
    ///
    /// Performs no writes. Existing ancestors of the target are canonicalized
    /// so that a previously extracted symlink cannot redirect later members.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::PathTraversal` if the target would land outside
    /// the root, and `PipelineError::Io` if an existing ancestor cannot be
    /// canonicalized.
    pub fn validate(path: &Path, root: &ExtractRoot) -> Result<Self> {
        let traversal = || PipelineError::PathTraversal {
            path: path.to_path_buf(),
        };

        if has_null_bytes(path) {
            return Err(traversal());
        }

        let mut normalized = PathBuf::new();
        for component in path.components() {
            match component {
                Component::Normal(part) => normalized.push(part),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(traversal());
                }
            }
        }

        if normalized.as_os_str().is_empty() {
            return Err(traversal());
        }

        let resolved = root.as_path().join(&normalized);
        if !resolved.starts_with(root.as_path()) {
            return Err(traversal());
        }

        // Walk up to the nearest ancestor that exists and make sure it
        // resolves inside the root.
        let mut probe = resolved.as_path();
        loop {
            match probe.canonicalize() {
                Ok(canonical) => {
                    if !canonical.starts_with(root.as_path()) {
                        return Err(traversal());
                    }
                    break;
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    match probe.parent() {
                        Some(parent) if parent.starts_with(root.as_path()) => probe = parent,
                        _ => break,
                    }
                }
                Err(e) => {
                    return Err(PipelineError::Io(std::io::Error::new(
                        e.kind(),
                        format!("failed to canonicalize {}: {e}", probe.display()),
                    )));
                }
            }
        }

        Ok(Self(normalized))
    }

    /// Returns the relative path.
    #[inline]
    #[must_use]
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// Converts into the inner `PathBuf`.
    #[inline]
    #[must_use]
    pub fn into_path_buf(self) -> PathBuf {
        self.0
    }
}

#[cfg(unix)]
fn has_null_bytes(path: &Path) -> bool {
    use std::os::unix::ffi::OsStrExt;
    path.as_os_str().as_bytes().contains(&b'\0')
}

#[cfg(not(unix))]
fn has_null_bytes(path: &Path) -> bool {
    path.to_str().is_none_or(|s| s.contains('\0'))
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_root() -> (TempDir, ExtractRoot) {
        let temp = TempDir::new().expect("failed to create temp dir");
        let root = ExtractRoot::new(temp.path()).expect("failed to create root");
        (temp, root)
    }

    #[test]
    fn test_empty_path() {
        let (_temp, root) = create_test_root();
        let result = SafePath::validate(Path::new(""), &root);
        assert!(matches!(result, Err(PipelineError::PathTraversal { .. })));
    }

    #[test]
    fn test_safe_path_valid_relative() {
        let (_temp, root) = create_test_root();
        let path = Path::new("foo/bar/baz.txt");
        let safe = SafePath::validate(path, &root).expect("should be valid");
        assert_eq!(safe.as_path(), path);
    }

    #[test]
    fn test_safe_path_unicode() {
        let (_temp, root) = create_test_root();
        let path = Path::new("connect/バイナリ/コネクト_v1.0.0.zip");
        let safe = SafePath::validate(path, &root).unwrap();
        assert_eq!(safe.as_path(), path);
    }

    #[test]
    fn test_safe_path_normalizes_current_dir() {
        let (_temp, root) = create_test_root();
        let safe = SafePath::validate(Path::new("./foo/./bar.txt"), &root).unwrap();
        assert_eq!(safe.as_path(), Path::new("foo/bar.txt"));
    }

    #[test]
    fn test_safe_path_reject_parent_traversal() {
        let (_temp, root) = create_test_root();

        for path in ["../etc/passwd", "foo/../../etc/passwd", "../../etc/passwd"] {
            let result = SafePath::validate(Path::new(path), &root);
            assert!(
                matches!(result, Err(PipelineError::PathTraversal { .. })),
                "path should be rejected: {path}"
            );
        }
    }

    #[test]
    fn test_safe_path_reject_inner_parent_even_when_harmless() {
        let (_temp, root) = create_test_root();
        let result = SafePath::validate(Path::new("a/b/../c.txt"), &root);
        assert!(result.is_err());
    }

    #[test]
    #[cfg(unix)]
    fn test_safe_path_reject_absolute_unix() {
        let (_temp, root) = create_test_root();
        let result = SafePath::validate(Path::new("/etc/passwd"), &root);
        assert!(matches!(result, Err(PipelineError::PathTraversal { .. })));
    }

    #[test]
    #[cfg(unix)]
    fn test_safe_path_reject_null_byte() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let (_temp, root) = create_test_root();
        let path = Path::new(OsStr::from_bytes(b"foo\0bar"));
        assert!(SafePath::validate(path, &root).is_err());
    }

    #[test]
    #[cfg(unix)]
    fn test_safe_path_reject_symlinked_ancestor_escape() {
        let (temp, root) = create_test_root();
        let outside = TempDir::new().unwrap();
        std::os::unix::fs::symlink(outside.path(), temp.path().join("escape")).unwrap();

        let result = SafePath::validate(Path::new("escape/new/file.txt"), &root);
        assert!(matches!(result, Err(PipelineError::PathTraversal { .. })));
    }

    #[test]
    #[cfg(unix)]
    fn test_safe_path_allows_internal_symlinked_ancestor() {
        let (temp, root) = create_test_root();
        std::fs::create_dir(temp.path().join("real")).unwrap();
        std::os::unix::fs::symlink("real", temp.path().join("alias")).unwrap();

        assert!(SafePath::validate(Path::new("alias/file.txt"), &root).is_ok());
    }
}
