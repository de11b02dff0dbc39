//! Human-readable output formatter with colors and styling.

use super::formatter::OutputFormatter;
use crate::error::hint;
use anyhow::Result;
use console::Term;
use console::style;
use std::path::Path;
use time::OffsetDateTime;
use zipfold_core::BatchReport;
use zipfold_core::RunFailure;
use zipfold_core::RunReport;
use zipfold_core::inspection::ArchiveListing;
use zipfold_core::inspection::EntryKind;
use zipfold_core::inspection::IssueSeverity;
use zipfold_core::inspection::VerificationReport;
use zipfold_core::inspection::VerificationStatus;

pub struct HumanFormatter {
    verbose: bool,
    quiet: bool,
    use_colors: bool,
    term: Term,
    err_term: Term,
}

impl HumanFormatter {
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self {
            verbose,
            quiet,
            use_colors: console::colors_enabled(),
            term: Term::stdout(),
            err_term: Term::stderr(),
        }
    }

    fn format_size(bytes: u64) -> String {
        const KB: u64 = 1024;
        const MB: u64 = KB * 1024;
        const GB: u64 = MB * 1024;

        if bytes >= GB {
            format!("{:.1} GB", bytes as f64 / GB as f64)
        } else if bytes >= MB {
            format!("{:.1} MB", bytes as f64 / MB as f64)
        } else if bytes >= KB {
            format!("{:.1} KB", bytes as f64 / KB as f64)
        } else {
            format!("{bytes} B")
        }
    }

    fn format_number(n: usize) -> String {
        let s = n.to_string();
        let mut result = String::new();
        let mut count = 0;

        for c in s.chars().rev() {
            if count == 3 {
                result.push(',');
                count = 0;
            }
            result.push(c);
            count += 1;
        }

        result.chars().rev().collect()
    }

    /// `YYYY-MM-DD HH:MM` in UTC, or `-` when unknown.
    fn format_timestamp(seconds: Option<i64>) -> String {
        seconds
            .and_then(|s| OffsetDateTime::from_unix_timestamp(s).ok())
            .map_or_else(
                || "-".to_string(),
                |t| {
                    format!(
                        "{:04}-{:02}-{:02} {:02}:{:02}",
                        t.year(),
                        u8::from(t.month()),
                        t.day(),
                        t.hour(),
                        t.minute()
                    )
                },
            )
    }

    fn mark(&self, ok: bool) -> String {
        match (ok, self.use_colors) {
            (true, true) => style("✓").green().bold().to_string(),
            (false, true) => style("✗").red().bold().to_string(),
            (true, false) => "OK".to_string(),
            (false, false) => "FAILED".to_string(),
        }
    }

    fn write_success(&self, report: &RunReport) {
        if self.quiet {
            return;
        }
        let line = match &report.output {
            Some(output) => format!(
                "{} {} → {} ({} leaves, {} archives repacked)",
                self.mark(true),
                report.input.display(),
                output.display(),
                report.leaf_targets.len(),
                report.archives_repacked.len()
            ),
            None => format!(
                "{} {} (dry run, {} leaves found)",
                self.mark(true),
                report.input.display(),
                report.leaf_targets.len()
            ),
        };
        let _ = self.term.write_line(&line);

        if self.verbose || report.dry_run {
            for target in &report.leaf_targets {
                let _ = self.term.write_line(&format!("    leaf: {target}"));
            }
        }
        if self.verbose {
            for archive in &report.archives_repacked {
                let _ = self.term.write_line(&format!("    repacked: {archive}"));
            }
            let _ = self
                .term
                .write_line(&format!("    duration: {:.2?}", report.duration));
        }
    }

    fn write_failure(&self, failure: &RunFailure) {
        // Always show errors, even in quiet mode
        let kind = failure.kind();
        let kind = if self.use_colors {
            style(kind.as_str()).red().to_string()
        } else {
            kind.as_str().to_string()
        };
        let _ = self.err_term.write_line(&format!(
            "{} {} [{kind}] {}",
            self.mark(false),
            failure.input.display(),
            failure.error
        ));
        if let Some(hint) = hint(failure.kind()) {
            let _ = self.err_term.write_line(&format!("    HINT: {hint}"));
        }
    }
}

impl OutputFormatter for HumanFormatter {
    fn format_batch_report(&self, report: &BatchReport) -> Result<()> {
        for outcome in &report.outcomes {
            match outcome {
                Ok(run) => self.write_success(run),
                Err(failure) => self.write_failure(failure),
            }
        }

        if self.quiet {
            return Ok(());
        }

        let _ = self.term.write_line("");
        let _ = self.term.write_line(&format!(
            "Processed {} archive(s): {} succeeded, {} failed ({:.1?})",
            Self::format_number(report.outcomes.len()),
            Self::format_number(report.succeeded()),
            Self::format_number(report.failed()),
            report.duration
        ));
        Ok(())
    }

    fn format_listing(
        &self,
        listing: &ArchiveListing,
        long: bool,
        human_readable: bool,
    ) -> Result<()> {
        if self.quiet {
            return Ok(());
        }

        if !long {
            for entry in &listing.entries {
                let _ = self.term.write_line(&entry.name);
            }
            return Ok(());
        }

        for entry in &listing.entries {
            let size_str = if human_readable {
                Self::format_size(entry.size)
            } else {
                entry.size.to_string()
            };

            let mode_str = entry
                .mode
                .map_or_else(|| "-".to_string(), |m| format!("{m:o}"));

            let type_char = match entry.kind {
                EntryKind::File => "-",
                EntryKind::Directory => "d",
                EntryKind::Symlink => "l",
            };

            let _ = self.term.write_line(&format!(
                "{}{:<6} {:>10} {:<8} {:<16} {}{}",
                type_char,
                mode_str,
                size_str,
                entry.method_name(),
                Self::format_timestamp(entry.modified),
                if entry.utf8_flag { "" } else { "* " },
                entry.name
            ));
        }

        let _ = self.term.write_line("");
        let _ = self.term.write_line(&format!(
            "Total: {} entries, {} ({} compressed)",
            Self::format_number(listing.len()),
            Self::format_size(listing.total_size()),
            Self::format_size(listing.total_compressed())
        ));
        if listing.entries.iter().any(|e| !e.utf8_flag) {
            let _ = self.term.write_line("* UTF-8 flag not set");
        }

        Ok(())
    }

    fn format_verification_report(&self, report: &VerificationReport, strict: bool) -> Result<()> {
        if self.quiet {
            return Ok(());
        }

        let status = if strict && report.status == VerificationStatus::Warn {
            VerificationStatus::Fail
        } else {
            report.status
        };
        if self.use_colors {
            let status_str = match status {
                VerificationStatus::Pass => style("PASS").green().bold(),
                VerificationStatus::Warn => style("WARN").yellow().bold(),
                VerificationStatus::Fail => style("FAIL").red().bold(),
            };
            let _ = self.term.write_line(&format!(
                "Archive verification: {status_str} {}",
                report.archive.display()
            ));
        } else {
            let _ = self.term.write_line(&format!(
                "Archive verification: {status} {}",
                report.archive.display()
            ));
        }

        let _ = self.term.write_line(&format!(
            "  Archives checked: {}",
            Self::format_number(report.archives_checked)
        ));
        let _ = self.term.write_line(&format!(
            "  Entries checked: {}",
            Self::format_number(report.entries_checked)
        ));

        if !report.issues.is_empty() {
            let _ = self.term.write_line("");
            let _ = self.term.write_line("Issues:");

            for issue in &report.issues {
                let severity_str = if self.use_colors {
                    match issue.severity {
                        IssueSeverity::Error => style("FAIL").red().bold().to_string(),
                        IssueSeverity::Warning => style("WARN").yellow().to_string(),
                    }
                } else {
                    format!("[{}]", issue.severity)
                };

                let location = issue.entry.as_ref().map_or_else(
                    || issue.archive.clone(),
                    |entry| format!("{}: {entry}", issue.archive),
                );
                let _ = self.term.write_line(&format!(
                    "  {severity_str} {location}: {}",
                    issue.message
                ));
            }
        }

        Ok(())
    }

    fn format_fixture_created(&self, path: &Path) -> Result<()> {
        if self.quiet {
            return Ok(());
        }
        let _ = self.term.write_line(&format!(
            "{} Fixture written: {}",
            self.mark(true),
            path.display()
        ));
        Ok(())
    }

    fn format_warning(&self, message: &str) {
        if self.quiet {
            return;
        }

        if self.use_colors {
            let _ = self
                .err_term
                .write_line(&format!("{} {message}", style("⚠").yellow().bold()));
        } else {
            let _ = self.err_term.write_line(&format!("WARNING: {message}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(HumanFormatter::format_size(0), "0 B");
        assert_eq!(HumanFormatter::format_size(1023), "1023 B");
        assert_eq!(HumanFormatter::format_size(1536), "1.5 KB");
        assert_eq!(HumanFormatter::format_size(2 * 1024 * 1024), "2.0 MB");
        assert_eq!(HumanFormatter::format_size(1024 * 1024 * 1024), "1.0 GB");
    }

    #[test]
    fn test_format_number() {
        assert_eq!(HumanFormatter::format_number(0), "0");
        assert_eq!(HumanFormatter::format_number(999), "999");
        assert_eq!(HumanFormatter::format_number(1000), "1,000");
        assert_eq!(HumanFormatter::format_number(1_234_567), "1,234,567");
    }

    #[test]
    fn test_format_timestamp() {
        // 2026-01-05 09:30:14 UTC
        assert_eq!(
            HumanFormatter::format_timestamp(Some(1_767_605_414)),
            "2026-01-05 09:30"
        );
        assert_eq!(HumanFormatter::format_timestamp(None), "-");
    }
}
