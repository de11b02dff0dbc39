//! Error conversion utilities for CLI.
//!
//! Converts zipfold-core's typed errors (thiserror) into user-friendly
//! contextual errors (anyhow) with actionable guidance.

use anyhow::anyhow;
use std::path::Path;
use zipfold_core::ErrorKind;
use zipfold_core::PipelineError;

/// Returns the guidance printed after a failure of `kind`, if any.
pub const fn hint(kind: ErrorKind) -> Option<&'static str> {
    match kind {
        ErrorKind::PathTraversal | ErrorKind::SymlinkEscape => {
            Some("This archive may be malicious. Do not process archives from untrusted sources.")
        }
        ErrorKind::Decode => Some(
            "Member names must be UTF-8. Repack the archive with a tool that writes UTF-8 names.",
        ),
        ErrorKind::ArchiveRead => Some("The archive may be corrupted or not a ZIP file."),
        ErrorKind::ArchiveWrite => {
            Some("Check free space and write permissions for the output directory.")
        }
        ErrorKind::StructureMismatch => {
            Some("Use --layout to describe the nesting of this archive.")
        }
        ErrorKind::Transform => Some("Check the sign command and its arguments."),
        ErrorKind::DeadlineExceeded => Some("Use --timeout to allow more time per archive."),
        ErrorKind::InvalidConfig => Some("Run with --help to see valid options."),
        ErrorKind::Cancelled | ErrorKind::Io => None,
    }
}

/// Converts `PipelineError` to user-friendly anyhow error with context.
pub fn convert_pipeline_error(err: PipelineError, context: &Path) -> anyhow::Error {
    let kind = err.kind();
    let message = match kind {
        ErrorKind::PathTraversal | ErrorKind::SymlinkEscape => {
            format!("Security violation in '{}': {err}", context.display())
        }
        ErrorKind::InvalidConfig => format!("{err}"),
        _ => format!("Error processing '{}': {err}", context.display()),
    };
    match hint(kind) {
        Some(hint) => anyhow!("{message}\nHINT: {hint}"),
        None => anyhow!("{message}"),
    }
}
