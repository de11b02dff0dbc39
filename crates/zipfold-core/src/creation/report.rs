//! Archive creation reporting.

use std::time::Duration;

/// Report of writing one archive.
///
/// # Examples
///
/// ```
/// use zipfold_core::creation::CreationReport;
///
/// let mut report = CreationReport::default();
/// report.files_added = 10;
/// report.bytes_written = 1024;
/// report.bytes_compressed = 512;
///
/// assert_eq!(report.compression_ratio(), 2.0);
/// assert_eq!(report.total_items(), 10);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CreationReport {
    /// Entry names written, in archive order.
    pub entries: Vec<String>,

    /// Number of regular files added.
    pub files_added: usize,

    /// Number of explicit (empty) directory entries added.
    pub directories_added: usize,

    /// Number of symlinks added.
    pub symlinks_added: usize,

    /// Total uncompressed bytes read from the source tree.
    pub bytes_written: u64,

    /// Size of the finished archive.
    pub bytes_compressed: u64,

    /// Duration of the write.
    pub duration: Duration,
}

impl CreationReport {
    /// Creates a new empty creation report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the compression ratio (uncompressed / compressed).
    ///
    /// Returns 0.0 if either side is 0.
    #[must_use]
    pub fn compression_ratio(&self) -> f64 {
        if self.bytes_compressed == 0 || self.bytes_written == 0 {
            return 0.0;
        }
        self.bytes_written as f64 / self.bytes_compressed as f64
    }

    /// Returns total number of entries added.
    #[must_use]
    pub fn total_items(&self) -> usize {
        self.files_added + self.directories_added + self.symlinks_added
    }
}
