//! Archive verification.
//!
//! Checks the properties repacked archives must have to open cleanly on any
//! host: a local header at offset 0, `/` separators, UTF-8 names flagged with
//! bit 11, supported compression methods and intact data. Nested `.zip`
//! members can be verified in memory without extraction.

use crate::Result;
use crate::extraction::decode_member_name;
use crate::inspection::headers::CentralEntry;
use crate::inspection::headers::read_central_directory;
use crate::inspection::headers::starts_with_local_header;
use std::fmt;
use std::io::Cursor;
use std::io::Read;
use std::path::Path;
use std::path::PathBuf;
use zip::ZipArchive;

/// Nested archives deeper than this are not opened.
const MAX_DEPTH: usize = 16;

/// Options for [`verify_archive`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VerifyOptions {
    /// Verify `.zip` members as archives too.
    ///
    /// Default: `false`.
    pub recursive: bool,
}

impl VerifyOptions {
    /// Creates default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables descending into nested archives.
    #[must_use]
    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }
}

/// Severity of a verification issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IssueSeverity {
    /// The archive works but may not be portable.
    Warning,
    /// The archive is broken or violates the format contract.
    Error,
}

impl fmt::Display for IssueSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => f.write_str("WARN"),
            Self::Error => f.write_str("FAIL"),
        }
    }
}

/// One finding of a verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationIssue {
    /// How serious the finding is.
    pub severity: IssueSeverity,
    /// Archive the finding belongs to, as a path through its parents.
    pub archive: String,
    /// Entry name, when the finding concerns one entry.
    pub entry: Option<String>,
    /// Description.
    pub message: String,
}

/// Overall result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationStatus {
    /// No issues.
    Pass,
    /// Warnings only.
    Warn,
    /// At least one error.
    Fail,
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pass => f.write_str("PASS"),
            Self::Warn => f.write_str("WARN"),
            Self::Fail => f.write_str("FAIL"),
        }
    }
}

/// Result of verifying an archive and, optionally, its nested archives.
#[derive(Debug, Clone)]
pub struct VerificationReport {
    /// The archive verified.
    pub archive: PathBuf,
    /// Overall status.
    pub status: VerificationStatus,
    /// Findings, errors first.
    pub issues: Vec<VerificationIssue>,
    /// Archives opened, including the outer one.
    pub archives_checked: usize,
    /// Entries checked across all archives.
    pub entries_checked: usize,
}

impl VerificationReport {
    /// Returns whether the result is acceptable.
    ///
    /// With `strict`, warnings count as failures.
    #[must_use]
    pub fn passed(&self, strict: bool) -> bool {
        match self.status {
            VerificationStatus::Pass => true,
            VerificationStatus::Warn => !strict,
            VerificationStatus::Fail => false,
        }
    }

    /// Returns the number of issues with the given severity.
    #[must_use]
    pub fn count(&self, severity: IssueSeverity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }
}

/// Verifies an archive without extracting it.
///
/// # Errors
///
/// Returns `ArchiveRead` only if the outer archive cannot be read or has no
/// central directory. Every other problem, including broken nested
/// archives, is reported as an issue.
///
/// # Examples
///
/// ```no_run
/// use zipfold_core::inspection::VerifyOptions;
/// use zipfold_core::inspection::verify_archive;
///
/// # fn main() -> zipfold_core::Result<()> {
/// let options = VerifyOptions::new().with_recursive(true);
/// let report = verify_archive("signed/20260105_test.zip", &options)?;
/// println!("{}", report.status);
/// # Ok(())
/// # }
/// ```
pub fn verify_archive<P: AsRef<Path>>(
    archive: P,
    options: &VerifyOptions,
) -> Result<VerificationReport> {
    let archive = archive.as_ref();
    let data = std::fs::read(archive).map_err(|e| crate::PipelineError::read(archive, e))?;
    let entries = read_central_directory(archive, &data)?;

    let mut verifier = Verifier {
        options: *options,
        issues: Vec::new(),
        archives_checked: 0,
        entries_checked: 0,
    };
    let label = archive.display().to_string();
    verifier.check_archive(&label, &data, &entries, 0);

    let mut issues = verifier.issues;
    issues.sort_by(|a, b| b.severity.cmp(&a.severity));
    let status = determine_status(&issues);
    log::debug!("{label}: {status} ({} issue(s))", issues.len());

    Ok(VerificationReport {
        archive: archive.to_path_buf(),
        status,
        issues,
        archives_checked: verifier.archives_checked,
        entries_checked: verifier.entries_checked,
    })
}

struct Verifier {
    options: VerifyOptions,
    issues: Vec<VerificationIssue>,
    archives_checked: usize,
    entries_checked: usize,
}

impl Verifier {
    fn issue(
        &mut self,
        severity: IssueSeverity,
        archive: &str,
        entry: Option<&str>,
        message: impl Into<String>,
    ) {
        self.issues.push(VerificationIssue {
            severity,
            archive: archive.to_string(),
            entry: entry.map(str::to_string),
            message: message.into(),
        });
    }

    fn check_archive(&mut self, label: &str, data: &[u8], entries: &[CentralEntry], depth: usize) {
        self.archives_checked += 1;

        if !entries.is_empty() && !starts_with_local_header(data) {
            self.issue(
                IssueSeverity::Error,
                label,
                None,
                "does not start with a local file header (PK\\x03\\x04)",
            );
        }

        for entry in entries {
            self.entries_checked += 1;
            self.check_header(label, entry);
        }

        self.check_data(label, data, depth);
    }

    fn check_header(&mut self, label: &str, entry: &CentralEntry) {
        let name = entry.name_lossy();
        let path = Path::new(label);

        if let Err(e) = decode_member_name(path, &entry.raw_name) {
            self.issue(IssueSeverity::Error, label, Some(&name), e.to_string());
        } else if !entry.raw_name.is_ascii() && !entry.has_utf8_flag() {
            self.issue(
                IssueSeverity::Warning,
                label,
                Some(&name),
                "non-ASCII name without the UTF-8 flag (bit 11)",
            );
        }

        if entry.raw_name.contains(&b'\\') {
            self.issue(
                IssueSeverity::Error,
                label,
                Some(&name),
                "name contains a backslash separator",
            );
        }

        if name.starts_with('/') || name.split('/').any(|part| part == "..") {
            self.issue(
                IssueSeverity::Error,
                label,
                Some(&name),
                "name escapes the extraction root",
            );
        }

        if !matches!(entry.method, 0 | 8) {
            self.issue(
                IssueSeverity::Error,
                label,
                Some(&name),
                format!(
                    "unsupported compression method {} ({})",
                    entry.method,
                    crate::inspection::list::method_name(entry.method)
                ),
            );
        }
    }

    /// Decompresses every entry, which checks its CRC, and descends into
    /// nested archives when enabled.
    fn check_data(&mut self, label: &str, data: &[u8], depth: usize) {
        let mut zip = match ZipArchive::new(Cursor::new(data)) {
            Ok(zip) => zip,
            Err(e) => {
                self.issue(IssueSeverity::Error, label, None, e.to_string());
                return;
            }
        };

        let mut buffer = Vec::new();
        for index in 0..zip.len() {
            let mut member = match zip.by_index(index) {
                Ok(member) => member,
                Err(e) => {
                    self.issue(IssueSeverity::Error, label, None, e.to_string());
                    continue;
                }
            };
            if member.is_dir() {
                continue;
            }
            let name = String::from_utf8_lossy(member.name_raw()).into_owned();
            log::trace!("{label}: checking {name}");

            buffer.clear();
            if let Err(e) = member.read_to_end(&mut buffer) {
                self.issue(
                    IssueSeverity::Error,
                    label,
                    Some(&name),
                    format!("data error: {e}"),
                );
                continue;
            }
            drop(member);

            if self.options.recursive && is_nested_archive(&name) {
                let nested = format!("{label}/{name}");
                if depth + 1 >= MAX_DEPTH {
                    self.issue(
                        IssueSeverity::Warning,
                        &nested,
                        None,
                        "nesting too deep, not verified",
                    );
                    continue;
                }
                let bytes = std::mem::take(&mut buffer);
                match read_central_directory(Path::new(&nested), &bytes) {
                    Ok(entries) => self.check_archive(&nested, &bytes, &entries, depth + 1),
                    Err(e) => self.issue(IssueSeverity::Error, &nested, None, e.to_string()),
                }
            }
        }
    }
}

fn is_nested_archive(name: &str) -> bool {
    Path::new(name)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"))
}

fn determine_status(issues: &[VerificationIssue]) -> VerificationStatus {
    match issues.iter().map(|i| i.severity).max() {
        None => VerificationStatus::Pass,
        Some(IssueSeverity::Warning) => VerificationStatus::Warn,
        Some(IssueSeverity::Error) => VerificationStatus::Fail,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::ZipWriter;
    use zip::write::SimpleFileOptions;

    fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, data) in entries {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    fn write(temp: &TempDir, name: &str, data: &[u8]) -> PathBuf {
        let path = temp.path().join(name);
        std::fs::write(&path, data).unwrap();
        path
    }

    #[test]
    fn test_determine_status() {
        assert_eq!(determine_status(&[]), VerificationStatus::Pass);
        let warning = VerificationIssue {
            severity: IssueSeverity::Warning,
            archive: "a.zip".into(),
            entry: None,
            message: String::new(),
        };
        let error = VerificationIssue {
            severity: IssueSeverity::Error,
            ..warning.clone()
        };
        assert_eq!(
            determine_status(std::slice::from_ref(&warning)),
            VerificationStatus::Warn
        );
        assert_eq!(determine_status(&[warning, error]), VerificationStatus::Fail);
    }

    #[test]
    fn test_verify_clean_archive() {
        let temp = TempDir::new().unwrap();
        let path = write(&temp, "ok.zip", &zip_bytes(&[("署名済み.txt", b"ok")]));
        let report = verify_archive(&path, &VerifyOptions::default()).unwrap();
        assert_eq!(report.status, VerificationStatus::Pass);
        assert_eq!(report.entries_checked, 1);
        assert!(report.passed(true));
    }

    #[test]
    fn test_verify_flags_backslash() {
        let temp = TempDir::new().unwrap();
        let path = write(&temp, "bs.zip", &zip_bytes(&[("dir\\file.txt", b"x")]));
        let report = verify_archive(&path, &VerifyOptions::default()).unwrap();
        assert_eq!(report.status, VerificationStatus::Fail);
        assert!(report.issues[0].message.contains("backslash"));
    }

    #[test]
    fn test_verify_warns_on_missing_utf8_flag() {
        let temp = TempDir::new().unwrap();
        let mut data = zip_bytes(&[("名前.txt", b"x")]);
        clear_utf8_flags(&mut data);
        let path = write(&temp, "legacy.zip", &data);

        let report = verify_archive(&path, &VerifyOptions::default()).unwrap();
        assert_eq!(report.status, VerificationStatus::Warn);
        assert!(report.passed(false));
        assert!(!report.passed(true));
    }

    #[test]
    fn test_verify_detects_crc_mismatch() {
        let temp = TempDir::new().unwrap();
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
        writer.start_file("a.txt", options).unwrap();
        writer.write_all(b"hello world").unwrap();
        let mut data = writer.finish().unwrap().into_inner();
        let at = data.windows(11).position(|w| w == b"hello world").unwrap();
        data[at] ^= 0xFF;
        let path = write(&temp, "crc.zip", &data);

        let report = verify_archive(&path, &VerifyOptions::default()).unwrap();
        assert_eq!(report.status, VerificationStatus::Fail);
    }

    #[test]
    fn test_verify_recursive() {
        let temp = TempDir::new().unwrap();
        let inner = zip_bytes(&[("a\\b.txt", b"x")]);
        let outer = zip_bytes(&[("nested/inner.zip", &inner)]);
        let path = write(&temp, "outer.zip", &outer);

        let flat = verify_archive(&path, &VerifyOptions::default()).unwrap();
        assert_eq!(flat.status, VerificationStatus::Pass);
        assert_eq!(flat.archives_checked, 1);

        let deep = verify_archive(&path, &VerifyOptions::new().with_recursive(true)).unwrap();
        assert_eq!(deep.status, VerificationStatus::Fail);
        assert_eq!(deep.archives_checked, 2);
        assert!(deep.issues[0].archive.ends_with("outer.zip/nested/inner.zip"));
    }

    #[test]
    fn test_verify_broken_nested_archive_is_an_issue() {
        let temp = TempDir::new().unwrap();
        let outer = zip_bytes(&[("inner.zip", b"not a zip")]);
        let path = write(&temp, "outer.zip", &outer);
        let report = verify_archive(&path, &VerifyOptions::new().with_recursive(true)).unwrap();
        assert_eq!(report.status, VerificationStatus::Fail);
    }

    #[test]
    fn test_verify_unreadable_outer_is_an_error() {
        let temp = TempDir::new().unwrap();
        let path = write(&temp, "bad.zip", b"garbage");
        assert!(verify_archive(&path, &VerifyOptions::default()).is_err());
    }

    /// Clears bit 11 in every local and central header.
    fn clear_utf8_flags(data: &mut [u8]) {
        let mut at = 0;
        while at + 4 <= data.len() {
            match &data[at..at + 4] {
                b"PK\x03\x04" => data[at + 7] &= !0x08,
                b"PK\x01\x02" => data[at + 9] &= !0x08,
                _ => {}
            }
            at += 1;
        }
    }
}
