//! Extraction and run reporting.

use crate::ErrorKind;
use crate::PipelineError;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

/// Report of a single archive extraction.
///
/// `entries` holds the relative paths in the order they were written, using
/// `/` separators.
#[derive(Debug, Clone, Default)]
pub struct ExtractionReport {
    /// Relative paths extracted, in archive order.
    pub entries: Vec<String>,

    /// Number of regular files written.
    pub files_extracted: usize,

    /// Number of directories created from explicit directory members.
    pub directories_created: usize,

    /// Number of symlinks created.
    pub symlinks_created: usize,

    /// Total uncompressed bytes written to disk.
    pub bytes_written: u64,

    /// Duration of the extraction.
    pub duration: Duration,

    /// Non-fatal problems encountered (for example an mtime that could not be
    /// restored).
    pub warnings: Vec<String>,
}

impl ExtractionReport {
    /// Creates a new empty extraction report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a warning message to the report.
    pub fn add_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// Returns total number of members written.
    #[must_use]
    pub fn total_items(&self) -> usize {
        self.files_extracted + self.directories_created + self.symlinks_created
    }

    /// Returns whether any warnings were generated.
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Summary of one successful pipeline run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// The input archive.
    pub input: PathBuf,

    /// The produced archive. `None` for dry runs.
    pub output: Option<PathBuf>,

    /// Number of nesting levels below the outer archive.
    pub levels: usize,

    /// Nested archives repacked, relative to the root they were found in.
    pub archives_repacked: Vec<String>,

    /// Leaf directories handed to the transform (or that would be, in a dry
    /// run), relative to their leaf extraction root.
    pub leaf_targets: Vec<String>,

    /// Whether the run skipped transform and repacking.
    pub dry_run: bool,

    /// Wall-clock time of the run.
    pub duration: Duration,
}

/// A classified failure for one input of a batch.
#[derive(Debug)]
pub struct RunFailure {
    /// The input archive that failed.
    pub input: PathBuf,

    /// The underlying error.
    pub error: PipelineError,
}

impl RunFailure {
    /// Returns the failure classification.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }

    /// Returns the member or archive path named by the error, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.error.path()
    }
}

/// Outcome of one input of a batch.
pub type RunOutcome = std::result::Result<RunReport, RunFailure>;

/// Outcomes of a batch, in input order.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// One outcome per input archive.
    pub outcomes: Vec<RunOutcome>,

    /// Wall-clock time of the whole batch.
    pub duration: Duration,
}

impl BatchReport {
    /// Returns the number of inputs that completed.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_ok()).count()
    }

    /// Returns the number of inputs that failed.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_err()).count()
    }

    /// Returns `true` when every input succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    /// Iterates over the failures only.
    pub fn failures(&self) -> impl Iterator<Item = &RunFailure> {
        self.outcomes.iter().filter_map(|o| o.as_ref().err())
    }
}
