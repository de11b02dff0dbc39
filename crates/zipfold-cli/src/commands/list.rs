//! List command implementation

use crate::cli::ListArgs;
use crate::error::convert_pipeline_error;
use crate::output::OutputFormatter;
use anyhow::Result;
use zipfold_core::inspection::list_archive;

pub fn execute(args: &ListArgs, formatter: &dyn OutputFormatter) -> Result<()> {
    let listing =
        list_archive(&args.archive).map_err(|e| convert_pipeline_error(e, &args.archive))?;

    formatter.format_listing(&listing, args.long, args.human_readable)
}
