//! Pipeline configuration.

use crate::PipelineError;
use crate::Result;
use crate::creation::CompressionOptions;
use crate::nesting::NestingSpec;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

/// Configuration shared by every run of a batch.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use zipfold_core::PipelineConfig;
///
/// let config = PipelineConfig::default()
///     .with_jobs(4)
///     .with_timeout(Some(Duration::from_secs(600)));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Layout of the nested archives.
    ///
    /// Default: [`NestingSpec::default`].
    pub nesting: NestingSpec,

    /// Compression applied at every level when repacking.
    ///
    /// Default: Deflate, level 6.
    pub compression: CompressionOptions,

    /// Extract and locate only; no transform, repack or output.
    ///
    /// Default: `false`.
    pub dry_run: bool,

    /// Number of inputs processed in parallel.
    ///
    /// Default: 1.
    pub jobs: usize,

    /// Per-run deadline, measured from the start of each run.
    ///
    /// Default: `None` (no deadline).
    pub timeout: Option<Duration>,

    /// Directory under which run workspaces are created.
    ///
    /// Default: `None` (system temporary directory).
    pub scratch_parent: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            nesting: NestingSpec::default(),
            compression: CompressionOptions::default(),
            dry_run: false,
            jobs: 1,
            timeout: None,
            scratch_parent: None,
        }
    }
}

impl PipelineConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the nesting layout.
    #[must_use]
    pub fn with_nesting(mut self, nesting: NestingSpec) -> Self {
        self.nesting = nesting;
        self
    }

    /// Sets compression options.
    #[must_use]
    pub fn with_compression(mut self, compression: CompressionOptions) -> Self {
        self.compression = compression;
        self
    }

    /// Enables or disables dry-run mode.
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Sets the number of parallel workers.
    #[must_use]
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs;
        self
    }

    /// Sets the per-run deadline.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the parent directory for run workspaces.
    #[must_use]
    pub fn with_scratch_parent(mut self, parent: Option<PathBuf>) -> Self {
        self.scratch_parent = parent;
        self
    }

    /// Returns the scratch parent as a path, if set.
    #[must_use]
    pub fn scratch_parent(&self) -> Option<&Path> {
        self.scratch_parent.as_deref()
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if `jobs` is 0, the timeout is zero, the
    /// compression level is out of range, or the nesting layout is malformed.
    pub fn validate(&self) -> Result<()> {
        if self.jobs == 0 {
            return Err(PipelineError::InvalidConfig(
                "jobs must be at least 1".into(),
            ));
        }
        if self.timeout.is_some_and(|t| t.is_zero()) {
            return Err(PipelineError::InvalidConfig(
                "timeout must be greater than zero".into(),
            ));
        }
        self.compression.validate()?;
        self.nesting.validate()
    }
}
