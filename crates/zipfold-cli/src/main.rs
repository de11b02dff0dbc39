//! zipfold CLI - Command-line utility for signing and repacking nested ZIP
//! archives.

mod cli;
mod commands;
mod error;
mod logger;
mod output;
mod progress;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    logger::init(cli.verbose, cli.quiet)?;
    let formatter = output::create_formatter(cli.json, cli.verbose, cli.quiet);
    let show_progress = !cli.quiet && !cli.json && progress::CliProgress::should_show();

    match &cli.command {
        cli::Commands::Process(args) => {
            commands::process::execute(args, &*formatter, show_progress)
        }
        cli::Commands::Verify(args) => commands::verify::execute(args, &*formatter),
        cli::Commands::List(args) => commands::list::execute(args, &*formatter),
        cli::Commands::Fixture(args) => commands::fixture::execute(args, &*formatter),
        cli::Commands::Completion(args) => {
            commands::completion::execute(args);
            Ok(())
        }
    }
}
