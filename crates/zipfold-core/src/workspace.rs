//! Scratch workspace for one pipeline run.

use crate::Result;
use std::cell::Cell;
use std::path::Path;
use std::path::PathBuf;
use tempfile::TempDir;

/// A run-owned scratch directory.
///
/// Every extraction root of a run is allocated under the workspace. The whole
/// tree is removed when the workspace is dropped, on success, on error, and
/// during unwinding.
///
/// # Examples
///
/// ```
/// use zipfold_core::Workspace;
///
/// # fn main() -> zipfold_core::Result<()> {
/// let workspace = Workspace::new(None)?;
/// let root = workspace.allocate(0, "20260105_test")?;
/// assert!(root.starts_with(workspace.path()));
/// let scratch = workspace.path().to_path_buf();
/// drop(workspace);
/// assert!(!scratch.exists());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Workspace {
    root: TempDir,
    counter: Cell<u32>,
}

impl Workspace {
    /// Creates a workspace under `parent`, or under the system temporary
    /// directory when `parent` is `None`.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the directory cannot be created.
    pub fn new(parent: Option<&Path>) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("zipfold-");
        let root = match parent {
            Some(parent) => {
                std::fs::create_dir_all(parent)?;
                builder.tempdir_in(parent)?
            }
            None => builder.tempdir()?,
        };
        log::debug!("workspace at {}", root.path().display());
        Ok(Self {
            root,
            counter: Cell::new(0),
        })
    }

    /// Returns the workspace root.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.root.path()
    }

    /// Creates a fresh, empty directory for one extraction.
    ///
    /// Names are `L{depth}-{counter}-{stem}`. The counter is local to this
    /// workspace, so names never collide within a run and are short enough to
    /// keep deep archive paths manageable.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the directory cannot be created.
    pub fn allocate(&self, depth: usize, stem: &str) -> Result<PathBuf> {
        let n = self.counter.get() + 1;
        self.counter.set(n);
        let dir = self.root.path().join(format!("L{depth}-{n}-{stem}"));
        std::fs::create_dir(&dir)?;
        Ok(dir)
    }

    /// Removes an extraction directory once its contents are folded up.
    ///
    /// A failure is logged and otherwise ignored; the directory goes away with
    /// the workspace anyway.
    pub fn release(&self, dir: &Path) {
        make_owner_writable(dir);
        if let Err(e) = std::fs::remove_dir_all(dir) {
            log::warn!("cannot remove {}: {e}", dir.display());
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        // Runs before the TempDir field removes the tree.
        make_owner_writable(self.root.path());
    }
}

/// Gives the owner full access to `dir` and every directory below it, so
/// that removal cannot trip over a read-only directory a transform left.
#[cfg(unix)]
fn make_owner_writable(dir: &Path) {
    use std::os::unix::fs::PermissionsExt;

    let Ok(metadata) = std::fs::symlink_metadata(dir) else {
        return;
    };
    if !metadata.is_dir() {
        return;
    }
    let mode = metadata.permissions().mode();
    if mode & 0o700 != 0o700
        && let Err(e) =
            std::fs::set_permissions(dir, std::fs::Permissions::from_mode(mode | 0o700))
    {
        log::debug!("cannot chmod {}: {e}", dir.display());
        return;
    }
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        if entry.file_type().is_ok_and(|t| t.is_dir()) {
            make_owner_writable(&entry.path());
        }
    }
}

#[cfg(not(unix))]
fn make_owner_writable(_dir: &Path) {}
