//! Archive inspection without extraction.
//!
//! Listing reads the central directory only. Verification also decompresses
//! every entry and can descend into nested `.zip` members in memory.
//!
//! # Examples
//!
//! ```no_run
//! use zipfold_core::inspection::VerifyOptions;
//! use zipfold_core::inspection::list_archive;
//! use zipfold_core::inspection::verify_archive;
//!
//! # fn main() -> zipfold_core::Result<()> {
//! let listing = list_archive("signed/20260105_test.zip")?;
//! println!("{} entries", listing.len());
//!
//! let report = verify_archive(
//!     "signed/20260105_test.zip",
//!     &VerifyOptions::new().with_recursive(true),
//! )?;
//! if !report.passed(true) {
//!     for issue in &report.issues {
//!         eprintln!("[{}] {}: {}", issue.severity, issue.archive, issue.message);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod headers;
pub mod list;
pub mod verify;

pub use list::ArchiveListing;
pub use list::EntryKind;
pub use list::ListedEntry;
pub use list::list_archive;
pub use verify::IssueSeverity;
pub use verify::VerificationIssue;
pub use verify::VerificationReport;
pub use verify::VerificationStatus;
pub use verify::VerifyOptions;
pub use verify::verify_archive;
