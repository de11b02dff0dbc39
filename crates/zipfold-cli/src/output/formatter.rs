//! Output formatter trait for CLI results.

use anyhow::Result;
use serde::Serialize;
use std::path::Path;
use zipfold_core::BatchReport;
use zipfold_core::inspection::ArchiveListing;
use zipfold_core::inspection::VerificationReport;

/// Common output formatter trait
pub trait OutputFormatter {
    /// Format the outcomes of a `process` batch
    fn format_batch_report(&self, report: &BatchReport) -> Result<()>;

    /// Format an archive listing
    fn format_listing(
        &self,
        listing: &ArchiveListing,
        long: bool,
        human_readable: bool,
    ) -> Result<()>;

    /// Format a verification report
    fn format_verification_report(&self, report: &VerificationReport, strict: bool) -> Result<()>;

    /// Format the path of a generated fixture
    fn format_fixture_created(&self, path: &Path) -> Result<()>;

    /// Format warning message
    fn format_warning(&self, message: &str);
}

/// Generic JSON output structure
#[derive(Debug, Serialize)]
pub struct JsonOutput<T> {
    pub operation: String,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

impl<T: Serialize> JsonOutput<T> {
    pub fn success(operation: impl Into<String>, data: T) -> Self {
        Self {
            operation: operation.into(),
            status: Status::Success,
            data: Some(data),
            error: None,
        }
    }

    /// An error result that still carries its data, such as a batch with
    /// some failed runs.
    pub fn failure(operation: impl Into<String>, data: T, error: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            status: Status::Error,
            data: Some(data),
            error: Some(error.into()),
        }
    }
}
