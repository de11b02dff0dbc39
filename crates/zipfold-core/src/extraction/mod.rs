//! Archive extraction.
//!
//! [`ArchiveReader`] unpacks a ZIP archive into a directory, validating every
//! member with the path guard before any write.

pub mod zip;

pub use self::zip::ArchiveReader;
pub use self::zip::decode_member_name;

use crate::Result;
use crate::report::ExtractionReport;
use std::path::Path;

/// Extracts `archive` into `destination` with no cancellation checkpoint.
///
/// # Errors
///
/// See [`ArchiveReader::extract`].
pub fn extract(archive: &Path, destination: &Path) -> Result<ExtractionReport> {
    ArchiveReader::new().extract(archive, destination)
}
