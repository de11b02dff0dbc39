//! Error types for the nested archive pipeline.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias using `PipelineError`.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Classification of a pipeline failure.
///
/// Used in batch reports so callers can tell failures apart without matching
/// on the full error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A member path resolved outside the extraction root.
    PathTraversal,
    /// A symlink member pointed outside the extraction root.
    SymlinkEscape,
    /// A member name was not valid UTF-8.
    Decode,
    /// An archive could not be read or was corrupt.
    ArchiveRead,
    /// An archive could not be written.
    ArchiveWrite,
    /// An expected nested member was absent.
    StructureMismatch,
    /// The leaf transform failed.
    Transform,
    /// The run exceeded its deadline.
    DeadlineExceeded,
    /// The run was cancelled.
    Cancelled,
    /// The configuration was rejected before any run started.
    InvalidConfig,
    /// A filesystem operation failed.
    Io,
}

impl ErrorKind {
    /// Returns a stable, kebab-case identifier for this kind.
    ///
    /// # Examples
    ///
    /// ```
    /// use zipfold_core::ErrorKind;
    ///
    /// assert_eq!(ErrorKind::StructureMismatch.as_str(), "structure-mismatch");
    /// ```
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PathTraversal => "path-traversal",
            Self::SymlinkEscape => "symlink-escape",
            Self::Decode => "decode",
            Self::ArchiveRead => "archive-read",
            Self::ArchiveWrite => "archive-write",
            Self::StructureMismatch => "structure-mismatch",
            Self::Transform => "transform",
            Self::DeadlineExceeded => "deadline-exceeded",
            Self::Cancelled => "cancelled",
            Self::InvalidConfig => "invalid-config",
            Self::Io => "io",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur while unpacking, transforming or repacking archives.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Path traversal attempt detected.
    #[error("path traversal detected: {path}")]
    PathTraversal {
        /// The member path that attempted traversal.
        path: PathBuf,
    },

    /// Symlink points outside the extraction root.
    #[error("symlink target outside extraction root: {path} -> {target}")]
    SymlinkEscape {
        /// The symlink member path.
        path: PathBuf,
        /// The stored link target.
        target: PathBuf,
    },

    /// Member name is not valid UTF-8.
    #[error("member name in {archive} is not valid UTF-8: {}", lossy(.raw_name))]
    Decode {
        /// Archive containing the member.
        archive: PathBuf,
        /// Raw name bytes as stored in the archive.
        raw_name: Vec<u8>,
    },

    /// Archive is unreadable or corrupt.
    #[error("cannot read archive {archive}: {reason}")]
    ArchiveRead {
        /// The archive being read.
        archive: PathBuf,
        /// Underlying cause.
        reason: String,
    },

    /// Archive could not be written.
    #[error("cannot write archive {archive}: {reason}")]
    ArchiveWrite {
        /// The archive being written.
        archive: PathBuf,
        /// Underlying cause.
        reason: String,
    },

    /// Expected nested member is absent.
    #[error(
        "unexpected structure in {archive}: expected {expected}, found [{}]",
        .found.join(", ")
    )]
    StructureMismatch {
        /// Archive whose extracted tree was searched.
        archive: PathBuf,
        /// Pattern that was expected to match.
        expected: String,
        /// Relative paths actually present (bounded listing).
        found: Vec<String>,
    },

    /// The leaf transform reported a failure.
    #[error("transform failed for {target}: {reason}")]
    Transform {
        /// Directory handed to the transform.
        target: PathBuf,
        /// Failure description.
        reason: String,
    },

    /// Run deadline elapsed.
    #[error("deadline exceeded after {elapsed:?}")]
    DeadlineExceeded {
        /// Time spent before the run was abandoned.
        elapsed: Duration,
    },

    /// Run was cancelled.
    #[error("run cancelled")]
    Cancelled,

    /// Configuration rejected.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

fn lossy(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}

impl PipelineError {
    /// Returns the classification of this error.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::path::PathBuf;
    /// use zipfold_core::ErrorKind;
    /// use zipfold_core::PipelineError;
    ///
    /// let err = PipelineError::PathTraversal {
    ///     path: PathBuf::from("../etc/passwd"),
    /// };
    /// assert_eq!(err.kind(), ErrorKind::PathTraversal);
    /// ```
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(_) => ErrorKind::Io,
            Self::PathTraversal { .. } => ErrorKind::PathTraversal,
            Self::SymlinkEscape { .. } => ErrorKind::SymlinkEscape,
            Self::Decode { .. } => ErrorKind::Decode,
            Self::ArchiveRead { .. } => ErrorKind::ArchiveRead,
            Self::ArchiveWrite { .. } => ErrorKind::ArchiveWrite,
            Self::StructureMismatch { .. } => ErrorKind::StructureMismatch,
            Self::Transform { .. } => ErrorKind::Transform,
            Self::DeadlineExceeded { .. } => ErrorKind::DeadlineExceeded,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::InvalidConfig(_) => ErrorKind::InvalidConfig,
        }
    }

    /// Returns `true` if this error came from validating an archive member.
    #[must_use]
    pub const fn is_security_violation(&self) -> bool {
        matches!(
            self,
            Self::PathTraversal { .. } | Self::SymlinkEscape { .. }
        )
    }

    /// Returns the relative or absolute path most relevant to this error.
    ///
    /// The CLI uses this to name the failing member in diagnostics.
    #[must_use]
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            Self::PathTraversal { path } | Self::SymlinkEscape { path, .. } => Some(path),
            Self::Decode { archive, .. }
            | Self::ArchiveRead { archive, .. }
            | Self::ArchiveWrite { archive, .. }
            | Self::StructureMismatch { archive, .. } => Some(archive),
            Self::Transform { target, .. } => Some(target),
            _ => None,
        }
    }

    /// Replaces the archive named by archive-level errors.
    ///
    /// Nested archives are read from scratch copies; this swaps the scratch
    /// path for the logical one (`outer.zip/inner/member.zip`).
    pub(crate) fn with_archive(mut self, logical: &std::path::Path) -> Self {
        match &mut self {
            Self::Decode { archive, .. }
            | Self::ArchiveRead { archive, .. }
            | Self::ArchiveWrite { archive, .. }
            | Self::StructureMismatch { archive, .. } => *archive = logical.to_path_buf(),
            _ => {}
        }
        self
    }

    pub(crate) fn read(archive: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        Self::ArchiveRead {
            archive: archive.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn write(archive: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        Self::ArchiveWrite {
            archive: archive.into(),
            reason: reason.to_string(),
        }
    }
}
