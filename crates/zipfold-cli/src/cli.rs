//! CLI argument parsing using clap.

use clap::Parser;
use clap::Subcommand;
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "zipfold")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Output results in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sign and repack nested archives
    Process(ProcessArgs),
    /// Verify archive encoding and integrity
    Verify(VerifyArgs),
    /// List archive contents without extraction
    List(ListArgs),
    /// Write the synthetic nested test archive
    Fixture(FixtureArgs),
    /// Print a shell completion script
    Completion(CompletionArgs),
}

#[derive(clap::Args)]
pub struct ProcessArgs {
    /// Archive, or directory of *.zip archives
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Output directory
    #[arg(value_name = "OUTPUT_DIR", default_value = "signed")]
    pub output_dir: PathBuf,

    /// JSON file describing the nesting layout
    #[arg(long, value_name = "FILE")]
    pub layout: Option<PathBuf>,

    /// Extract and locate only; transform and write nothing
    #[arg(long)]
    pub dry_run: bool,

    /// Deflate level (1-9)
    #[arg(short = 'l', long, value_parser = clap::value_parser!(u8).range(1..=9))]
    pub compression_level: Option<u8>,

    /// Store entries without compression
    #[arg(long, conflicts_with = "compression_level")]
    pub store: bool,

    /// Number of archives processed in parallel
    #[arg(long, default_value = "1", value_parser = clap::value_parser!(u16).range(1..))]
    pub jobs: u16,

    /// Per-archive deadline in seconds
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

    /// Marker file written into each leaf directory
    #[arg(long, value_name = "NAME", conflicts_with = "sign_command")]
    pub marker_name: Option<String>,

    /// Program run on each leaf directory instead of writing a marker
    #[arg(long, value_name = "PROGRAM")]
    pub sign_command: Option<PathBuf>,

    /// Argument passed to the sign command before the directory (repeatable)
    #[arg(
        long = "sign-arg",
        value_name = "ARG",
        requires = "sign_command",
        allow_hyphen_values = true
    )]
    pub sign_args: Vec<String>,

    /// Directory for scratch workspaces (default: system temp)
    #[arg(long, value_name = "DIR")]
    pub scratch_dir: Option<PathBuf>,
}

#[derive(clap::Args)]
pub struct VerifyArgs {
    /// Path to the archive file
    #[arg(value_name = "ARCHIVE")]
    pub archive: PathBuf,

    /// Also verify nested .zip members
    #[arg(short, long)]
    pub recursive: bool,

    /// Treat warnings as failures
    #[arg(long)]
    pub strict: bool,
}

#[derive(clap::Args)]
pub struct ListArgs {
    /// Path to the archive file
    #[arg(value_name = "ARCHIVE")]
    pub archive: PathBuf,

    /// Show detailed file information
    #[arg(short, long)]
    pub long: bool,

    /// Show sizes in human-readable format
    #[arg(short = 'H', long)]
    pub human_readable: bool,
}

#[derive(clap::Args)]
pub struct FixtureArgs {
    /// Directory to write the fixture into
    #[arg(value_name = "OUTPUT_DIR", default_value = "unsign")]
    pub output_dir: PathBuf,
}

#[derive(clap::Args)]
pub struct CompletionArgs {
    /// Target shell
    #[arg(value_enum)]
    pub shell: Shell,
}
