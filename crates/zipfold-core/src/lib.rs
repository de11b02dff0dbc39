//! Nested ZIP transform pipeline with UTF-8 safe repacking.
//!
//! `zipfold-core` unpacks an archive of archives, applies a transform to the
//! innermost directories and folds every level back into an archive. Entry
//! names are validated against the extraction root on the way in and written
//! as UTF-8 with `/` separators and the UTF-8 flag on the way out, so the
//! result opens correctly on any host.
//!
//! # Examples
//!
//! ```no_run
//! use zipfold_core::MarkerInjector;
//! use zipfold_core::PipelineConfig;
//! use zipfold_core::find_input_archives;
//! use zipfold_core::process_all;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let inputs = find_input_archives("unsign")?;
//! let config = PipelineConfig::default().with_jobs(4);
//! let report = process_all(
//!     &inputs,
//!     "signed".as_ref(),
//!     &config,
//!     &MarkerInjector::default(),
//! )?;
//! println!("{} succeeded, {} failed", report.succeeded(), report.failed());
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod api;
pub mod config;
pub mod creation;
pub mod error;
pub mod extraction;
pub mod fixture;
pub mod inspection;
pub mod nesting;
pub mod pipeline;
pub mod report;
mod timestamp;
pub mod transform;
pub mod types;
pub mod workspace;

// Re-export main API types
pub use api::create_archive;
pub use api::extract_archive;
pub use api::find_input_archives;
pub use api::process_all;
pub use api::process_archive;
pub use config::PipelineConfig;
pub use error::ErrorKind;
pub use error::PipelineError;
pub use error::Result;
pub use nesting::LevelSpec;
pub use nesting::NestingSpec;
pub use pipeline::CancelToken;
pub use report::BatchReport;
pub use report::ExtractionReport;
pub use report::RunFailure;
pub use report::RunOutcome;
pub use report::RunReport;
pub use transform::CommandTransform;
pub use transform::DirectoryTransform;
pub use transform::MarkerInjector;
pub use workspace::Workspace;

// Re-export types module for easier access
pub use types::ExtractRoot;
pub use types::SafePath;
pub use types::SafeSymlink;
