//! Archive listing without extraction.

use crate::PipelineError;
use crate::Result;
use crate::inspection::headers::CentralEntry;
use crate::inspection::headers::read_central_directory;
use std::path::Path;
use std::path::PathBuf;

/// Kind of a listed entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Regular file.
    File,
    /// Directory entry (name ends with `/`).
    Directory,
    /// Symbolic link (Unix `S_IFLNK` mode).
    Symlink,
}

impl EntryKind {
    fn of(entry: &CentralEntry) -> Self {
        if entry.is_dir() {
            Self::Directory
        } else if entry.is_symlink() {
            Self::Symlink
        } else {
            Self::File
        }
    }
}

/// One entry of an archive listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedEntry {
    /// Stored name, with invalid UTF-8 replaced.
    pub name: String,
    /// Entry kind.
    pub kind: EntryKind,
    /// Uncompressed size in bytes.
    pub size: u64,
    /// Compressed size in bytes.
    pub compressed_size: u64,
    /// ZIP compression method number.
    pub method: u16,
    /// Unix mode bits, when the entry was written on a Unix host.
    pub mode: Option<u32>,
    /// Modification time as seconds since the Unix epoch (UTC).
    pub modified: Option<i64>,
    /// Whether the UTF-8 name flag (bit 11) is set.
    pub utf8_flag: bool,
}

impl ListedEntry {
    /// Returns the human-readable name of the compression method.
    #[must_use]
    pub const fn method_name(&self) -> &'static str {
        method_name(self.method)
    }
}

/// Entries of one archive in central directory order.
#[derive(Debug, Clone, Default)]
pub struct ArchiveListing {
    /// The archive listed.
    pub archive: PathBuf,
    /// Entries in stored order.
    pub entries: Vec<ListedEntry>,
}

impl ArchiveListing {
    /// Returns the sum of uncompressed sizes.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.entries.iter().map(|e| e.size).sum()
    }

    /// Returns the sum of compressed sizes.
    #[must_use]
    pub fn total_compressed(&self) -> u64 {
        self.entries.iter().map(|e| e.compressed_size).sum()
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the archive has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Returns the name of a ZIP compression method number.
#[must_use]
pub const fn method_name(method: u16) -> &'static str {
    match method {
        0 => "stored",
        8 => "deflate",
        9 => "deflate64",
        12 => "bzip2",
        14 => "lzma",
        93 => "zstd",
        95 => "xz",
        99 => "aes",
        _ => "unknown",
    }
}

/// Lists an archive's entries from its central directory.
///
/// Nothing is decompressed, so a listing succeeds even when entry data is
/// corrupt. Use [`verify_archive`](crate::inspection::verify_archive) to
/// check data.
///
/// # Errors
///
/// Returns `ArchiveRead` if the file cannot be read or has no valid central
/// directory.
///
/// # Examples
///
/// ```no_run
/// use zipfold_core::inspection::list_archive;
///
/// # fn main() -> zipfold_core::Result<()> {
/// let listing = list_archive("20260105_test.zip")?;
/// for entry in &listing.entries {
///     println!("{} {}", entry.size, entry.name);
/// }
/// # Ok(())
/// # }
/// ```
pub fn list_archive<P: AsRef<Path>>(archive: P) -> Result<ArchiveListing> {
    let archive = archive.as_ref();
    let data = std::fs::read(archive).map_err(|e| PipelineError::read(archive, e))?;
    list_bytes(archive, &data)
}

/// Lists an in-memory archive. `archive` only names it in errors.
fn list_bytes(archive: &Path, data: &[u8]) -> Result<ArchiveListing> {
    let entries = read_central_directory(archive, data)?
        .iter()
        .map(|entry| ListedEntry {
            name: entry.name_lossy(),
            kind: EntryKind::of(entry),
            size: entry.size,
            compressed_size: entry.compressed_size,
            method: entry.method,
            mode: entry.unix_mode(),
            modified: entry.modified(),
            utf8_flag: entry.has_utf8_flag(),
        })
        .collect();

    Ok(ArchiveListing {
        archive: archive.to_path_buf(),
        entries,
    })
}
