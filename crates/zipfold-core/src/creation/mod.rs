//! Archive creation.
//!
//! [`ArchiveWriter`] walks a directory tree and writes a ZIP archive with
//! UTF-8, `/`-separated entry names. Output is written to a temporary sibling
//! file and renamed into place only on success.

pub mod atomic;
pub mod config;
pub mod report;
pub mod walker;
pub mod zip;

pub use self::zip::ArchiveWriter;
pub use config::CompressionMethod;
pub use config::CompressionOptions;
pub use report::CreationReport;
pub use walker::EntryType;
pub use walker::TreeEntry;

use crate::Result;
use std::path::Path;

/// Writes `source_root` into `output` with no cancellation checkpoint.
///
/// # Errors
///
/// See [`ArchiveWriter::compress`].
pub fn compress(
    source_root: &Path,
    output: &Path,
    options: &CompressionOptions,
) -> Result<CreationReport> {
    ArchiveWriter::new().compress(source_root, output, options)
}
