//! JSON output formatter for machine-readable results.

use super::formatter::JsonOutput;
use super::formatter::OutputFormatter;
use anyhow::Result;
use serde::Serialize;
use std::io::Write;
use std::io::{self};
use std::path::Path;
use zipfold_core::BatchReport;
use zipfold_core::RunOutcome;
use zipfold_core::inspection::ArchiveListing;
use zipfold_core::inspection::EntryKind;
use zipfold_core::inspection::IssueSeverity;
use zipfold_core::inspection::VerificationReport;

pub struct JsonFormatter;

impl JsonFormatter {
    fn output<T: Serialize>(value: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(value)?;
        writeln!(io::stdout(), "{json}")?;
        Ok(())
    }
}

#[derive(Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
enum RunOutput {
    Ok {
        input: String,
        output: Option<String>,
        dry_run: bool,
        levels: usize,
        leaf_targets: Vec<String>,
        archives_repacked: Vec<String>,
        duration_ms: u128,
    },
    Failed {
        input: String,
        kind: &'static str,
        path: Option<String>,
        message: String,
    },
}

impl From<&RunOutcome> for RunOutput {
    fn from(outcome: &RunOutcome) -> Self {
        match outcome {
            Ok(report) => Self::Ok {
                input: report.input.display().to_string(),
                output: report.output.as_ref().map(|p| p.display().to_string()),
                dry_run: report.dry_run,
                levels: report.levels,
                leaf_targets: report.leaf_targets.clone(),
                archives_repacked: report.archives_repacked.clone(),
                duration_ms: report.duration.as_millis(),
            },
            Err(failure) => Self::Failed {
                input: failure.input.display().to_string(),
                kind: failure.kind().as_str(),
                path: failure.path().map(|p| p.display().to_string()),
                message: failure.error.to_string(),
            },
        }
    }
}

impl OutputFormatter for JsonFormatter {
    fn format_batch_report(&self, report: &BatchReport) -> Result<()> {
        #[derive(Serialize)]
        struct BatchOutput {
            total: usize,
            succeeded: usize,
            failed: usize,
            duration_ms: u128,
            results: Vec<RunOutput>,
        }

        let data = BatchOutput {
            total: report.outcomes.len(),
            succeeded: report.succeeded(),
            failed: report.failed(),
            duration_ms: report.duration.as_millis(),
            results: report.outcomes.iter().map(RunOutput::from).collect(),
        };

        let output = if report.is_success() {
            JsonOutput::success("process", data)
        } else {
            let error = format!(
                "{} of {} archive(s) failed",
                report.failed(),
                report.outcomes.len()
            );
            JsonOutput::failure("process", data, error)
        };
        Self::output(&output)
    }

    fn format_listing(
        &self,
        listing: &ArchiveListing,
        _long: bool,
        _human_readable: bool,
    ) -> Result<()> {
        #[derive(Serialize)]
        struct EntryOutput<'a> {
            name: &'a str,
            kind: &'static str,
            size: u64,
            compressed_size: u64,
            method: &'static str,
            mode: Option<u32>,
            modified: Option<i64>,
            utf8_flag: bool,
        }

        #[derive(Serialize)]
        struct ListingOutput<'a> {
            archive: String,
            total_entries: usize,
            total_size: u64,
            total_compressed: u64,
            entries: Vec<EntryOutput<'a>>,
        }

        let data = ListingOutput {
            archive: listing.archive.display().to_string(),
            total_entries: listing.len(),
            total_size: listing.total_size(),
            total_compressed: listing.total_compressed(),
            entries: listing
                .entries
                .iter()
                .map(|e| EntryOutput {
                    name: &e.name,
                    kind: match e.kind {
                        EntryKind::File => "file",
                        EntryKind::Directory => "directory",
                        EntryKind::Symlink => "symlink",
                    },
                    size: e.size,
                    compressed_size: e.compressed_size,
                    method: e.method_name(),
                    mode: e.mode,
                    modified: e.modified,
                    utf8_flag: e.utf8_flag,
                })
                .collect(),
        };

        Self::output(&JsonOutput::success("list", data))
    }

    fn format_verification_report(&self, report: &VerificationReport, strict: bool) -> Result<()> {
        #[derive(Serialize)]
        struct IssueOutput<'a> {
            severity: &'static str,
            archive: &'a str,
            entry: Option<&'a str>,
            message: &'a str,
        }

        #[derive(Serialize)]
        struct VerifyOutput<'a> {
            archive: String,
            result: String,
            strict: bool,
            archives_checked: usize,
            entries_checked: usize,
            issues: Vec<IssueOutput<'a>>,
        }

        let data = VerifyOutput {
            archive: report.archive.display().to_string(),
            result: report.status.to_string(),
            strict,
            archives_checked: report.archives_checked,
            entries_checked: report.entries_checked,
            issues: report
                .issues
                .iter()
                .map(|i| IssueOutput {
                    severity: match i.severity {
                        IssueSeverity::Warning => "warning",
                        IssueSeverity::Error => "error",
                    },
                    archive: &i.archive,
                    entry: i.entry.as_deref(),
                    message: &i.message,
                })
                .collect(),
        };

        let output = if report.passed(strict) {
            JsonOutput::success("verify", data)
        } else {
            JsonOutput::failure("verify", data, "archive verification failed")
        };
        Self::output(&output)
    }

    fn format_fixture_created(&self, path: &Path) -> Result<()> {
        #[derive(Serialize)]
        struct FixtureOutput {
            path: String,
        }

        let data = FixtureOutput {
            path: path.display().to_string(),
        };
        Self::output(&JsonOutput::success("fixture", data))
    }

    fn format_warning(&self, message: &str) {
        #[derive(Serialize)]
        struct WarningData {
            message: String,
        }

        let output = JsonOutput::success(
            "warning",
            WarningData {
                message: message.to_string(),
            },
        );
        let _ = Self::output(&output);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use zipfold_core::PipelineError;
    use zipfold_core::RunFailure;
    use zipfold_core::RunReport;

    #[test]
    fn test_run_output_success_is_tagged() {
        let outcome: RunOutcome = Ok(RunReport {
            input: PathBuf::from("a.zip"),
            output: Some(PathBuf::from("signed/a.zip")),
            levels: 2,
            ..RunReport::default()
        });
        let json = serde_json::to_value(RunOutput::from(&outcome)).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["output"], "signed/a.zip");
        assert_eq!(json["levels"], 2);
    }

    #[test]
    fn test_run_output_failure_carries_kind() {
        let outcome: RunOutcome = Err(RunFailure {
            input: PathBuf::from("b.zip"),
            error: PipelineError::PathTraversal {
                path: PathBuf::from("../x"),
            },
        });
        let json = serde_json::to_value(RunOutput::from(&outcome)).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["kind"], "path-traversal");
        assert_eq!(json["path"], "../x");
    }
}
