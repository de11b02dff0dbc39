//! Fixture command implementation

use crate::cli::FixtureArgs;
use crate::error::convert_pipeline_error;
use crate::output::OutputFormatter;
use anyhow::Result;
use zipfold_core::fixture::create_fixture;

pub fn execute(args: &FixtureArgs, formatter: &dyn OutputFormatter) -> Result<()> {
    let path =
        create_fixture(&args.output_dir).map_err(|e| convert_pipeline_error(e, &args.output_dir))?;

    formatter.format_fixture_created(&path)
}
