//! Verify command implementation

use crate::cli::VerifyArgs;
use crate::error::convert_pipeline_error;
use crate::output::OutputFormatter;
use anyhow::Result;
use anyhow::bail;
use zipfold_core::inspection::VerifyOptions;
use zipfold_core::inspection::verify_archive;

pub fn execute(args: &VerifyArgs, formatter: &dyn OutputFormatter) -> Result<()> {
    let options = VerifyOptions::new().with_recursive(args.recursive);

    let report = verify_archive(&args.archive, &options)
        .map_err(|e| convert_pipeline_error(e, &args.archive))?;

    formatter.format_verification_report(&report, args.strict)?;

    // Warnings pass unless --strict
    if !report.passed(args.strict) {
        bail!("Archive verification failed: {}", args.archive.display());
    }
    Ok(())
}
