//! Validated extraction root directory.

use crate::PipelineError;
use crate::Result;
use std::path::Path;
use std::path::PathBuf;

use super::SafePath;

/// A canonical, existing directory that archive members are extracted into.
///
/// All member paths are checked against this canonical form, so a root that
/// is itself reached through a symlink (for example `/tmp` on macOS) still
/// compares correctly.
///
/// # Examples
///
/// ```no_run
/// use zipfold_core::types::ExtractRoot;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let root = ExtractRoot::new("/tmp/extraction")?;
/// println!("Extracting to: {}", root.as_path().display());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractRoot(PathBuf);

impl ExtractRoot {
    /// Validates `path` and canonicalizes it.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::Io` if the path does not exist, is not a
    /// directory, or cannot be canonicalized.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if !path.is_dir() {
            return Err(PipelineError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("extraction root is not a directory: {}", path.display()),
            )));
        }

        let canonical = path.canonicalize().map_err(|e| {
            PipelineError::Io(std::io::Error::new(
                e.kind(),
                format!("failed to canonicalize {}: {e}", path.display()),
            ))
        })?;

        Ok(Self(canonical))
    }

    /// Creates the directory (and parents) if needed, then validates it.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        std::fs::create_dir_all(&path)?;
        Self::new(path)
    }

    /// Returns the canonical root path.
    #[inline]
    #[must_use]
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// Joins a validated member path onto the root.
    #[inline]
    #[must_use]
    pub fn join(&self, safe_path: &SafePath) -> PathBuf {
        self.0.join(safe_path.as_path())
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_extract_root_canonical() {
        let temp = TempDir::new().expect("failed to create temp dir");
        let root = ExtractRoot::new(temp.path()).expect("root should be valid");
        assert!(root.as_path().is_absolute());
        assert_eq!(root.as_path(), temp.path().canonicalize().unwrap());
    }

    #[test]
    fn test_extract_root_nonexistent() {
        let result = ExtractRoot::new("/nonexistent/directory/that/does/not/exist");
        assert!(matches!(result, Err(PipelineError::Io(_))));
    }

    #[test]
    fn test_extract_root_rejects_file() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("file.txt");
        fs::write(&file, "x").unwrap();
        assert!(ExtractRoot::new(&file).is_err());
    }

    #[test]
    fn test_extract_root_create_makes_parents() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("a/b/c");
        let root = ExtractRoot::create(&nested).unwrap();
        assert!(nested.is_dir());
        assert!(root.as_path().ends_with("a/b/c"));
    }
}
