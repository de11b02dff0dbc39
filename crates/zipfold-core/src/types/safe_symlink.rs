//! Validated symlink member.

use crate::PipelineError;
use crate::Result;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

use super::ExtractRoot;
use super::SafePath;

/// A symlink member whose target stays inside the extraction root.
///
/// Framework bundles commonly carry relative links such as
/// `Versions/Current -> A`; those pass. Absolute targets and targets that
/// climb out of the root are rejected.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use zipfold_core::types::ExtractRoot;
/// use zipfold_core::types::SafePath;
/// use zipfold_core::types::SafeSymlink;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let root = ExtractRoot::new("/tmp/out")?;
/// let link = SafePath::validate(Path::new("Versions/Current"), &root)?;
/// let symlink = SafeSymlink::validate(&link, Path::new("A"), &root)?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafeSymlink {
    link_path: PathBuf,
    target_path: PathBuf,
}

impl SafeSymlink {
    /// Validates a link target relative to the link's parent directory.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::SymlinkEscape` if the target is absolute or
    /// resolves outside the root.
    pub fn validate(link: &SafePath, target: &Path, root: &ExtractRoot) -> Result<Self> {
        let escape = || PipelineError::SymlinkEscape {
            path: link.as_path().to_path_buf(),
            target: target.to_path_buf(),
        };

        if target.as_os_str().is_empty() || target.has_root() {
            return Err(escape());
        }

        let parent = link.as_path().parent().unwrap_or_else(|| Path::new(""));
        let mut depth: usize = parent.components().count();
        for component in target.components() {
            match component {
                Component::Normal(_) => depth += 1,
                Component::CurDir => {}
                Component::ParentDir => {
                    depth = depth.checked_sub(1).ok_or_else(escape)?;
                }
                Component::RootDir | Component::Prefix(_) => return Err(escape()),
            }
        }

        Ok(Self {
            link_path: link.as_path().to_path_buf(),
            target_path: target.to_path_buf(),
        })
    }

    /// Returns the link path, relative to the root.
    #[inline]
    #[must_use]
    pub fn link_path(&self) -> &Path {
        &self.link_path
    }

    /// Returns the stored (unresolved) target.
    #[inline]
    #[must_use]
    pub fn target_path(&self) -> &Path {
        &self.target_path
    }

    /// Creates the link on disk under `root`.
    ///
    /// On platforms without symlinks the target text is written to a regular
    /// file instead.
    pub fn create(&self, root: &ExtractRoot) -> Result<PathBuf> {
        let link = root.as_path().join(&self.link_path);
        if let Some(parent) = link.parent() {
            std::fs::create_dir_all(parent)?;
        }

        #[cfg(unix)]
        std::os::unix::fs::symlink(&self.target_path, &link)?;

        #[cfg(not(unix))]
        std::fs::write(&link, self.target_path.to_string_lossy().as_bytes())?;

        Ok(link)
    }
}
