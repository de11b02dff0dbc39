//! Directory tree enumeration for repacking.
//!
//! Produces the sorted list of entries an archive will contain: every regular
//! file, every symlink (not followed), and every directory that has no
//! children. Directories with children are implied by their members' names.

use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::time::SystemTime;
use walkdir::WalkDir;

/// A source tree entry with its archive name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    /// Full filesystem path to the entry.
    pub path: PathBuf,

    /// Name inside the archive: relative to the source root, `/`-separated,
    /// without a trailing slash.
    pub archive_name: String,

    /// Kind of entry.
    pub entry_type: EntryType,

    /// Size in bytes (0 for directories and symlinks).
    pub size: u64,

    /// Unix permission bits, when the platform provides them.
    pub mode: Option<u32>,

    /// Last modification time.
    pub modified: Option<SystemTime>,
}

/// Kind of tree entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryType {
    /// Regular file.
    File,

    /// Directory with no children.
    EmptyDirectory,

    /// Symbolic link with its stored target.
    Symlink {
        /// Target of the symlink, as read from disk.
        target: PathBuf,
    },
}

/// Collects the entries under `root`, sorted by archive name.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use zipfold_core::creation::walker::collect_entries;
///
/// let entries = collect_entries(Path::new("./leaf"))?;
/// for entry in &entries {
///     println!("{}", entry.archive_name);
/// }
/// # Ok::<(), std::io::Error>(())
/// ```
///
/// # Errors
///
/// Returns an error if traversal fails, metadata cannot be read, or a path
/// under `root` is not valid UTF-8.
pub fn collect_entries(root: &Path) -> io::Result<Vec<TreeEntry>> {
    let mut entries = Vec::new();

    for entry in WalkDir::new(root).follow_links(false).min_depth(1) {
        let entry = entry.map_err(io::Error::from)?;
        let path = entry.path();
        let metadata = entry.metadata().map_err(io::Error::from)?;

        let entry_type = if metadata.file_type().is_symlink() {
            EntryType::Symlink {
                target: std::fs::read_link(path)?,
            }
        } else if metadata.is_dir() {
            if std::fs::read_dir(path)?.next().is_some() {
                continue;
            }
            EntryType::EmptyDirectory
        } else {
            EntryType::File
        };

        let relative = path.strip_prefix(root).map_err(io::Error::other)?;
        let size = if entry_type == EntryType::File {
            metadata.len()
        } else {
            0
        };

        entries.push(TreeEntry {
            path: path.to_path_buf(),
            archive_name: normalize_archive_name(relative)?,
            entry_type,
            size,
            mode: unix_mode(&metadata),
            modified: metadata.modified().ok(),
        });
    }

    entries.sort_by(|a, b| a.archive_name.cmp(&b.archive_name));
    Ok(entries)
}

/// Joins the components of a relative path with `/`.
///
/// # Errors
///
/// Returns `InvalidData` if any component is not valid UTF-8.
pub fn normalize_archive_name(relative: &Path) -> io::Result<String> {
    let mut parts = Vec::new();
    for component in relative.components() {
        let part = component.as_os_str().to_str().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("path is not valid UTF-8: {}", relative.display()),
            )
        })?;
        parts.push(part.replace('\\', "/"));
    }
    Ok(parts.join("/"))
}

#[cfg(unix)]
fn unix_mode(metadata: &std::fs::Metadata) -> Option<u32> {
    use std::os::unix::fs::PermissionsExt;
    Some(metadata.permissions().mode() & 0o777)
}

#[cfg(not(unix))]
fn unix_mode(_metadata: &std::fs::Metadata) -> Option<u32> {
    None
}
