//! Process command implementation

use crate::cli::ProcessArgs;
use crate::error::convert_pipeline_error;
use crate::output::OutputFormatter;
use crate::progress::CliProgress;
use anyhow::Context;
use anyhow::Result;
use anyhow::bail;
use std::time::Duration;
use zipfold_core::CommandTransform;
use zipfold_core::DirectoryTransform;
use zipfold_core::MarkerInjector;
use zipfold_core::NestingSpec;
use zipfold_core::PipelineConfig;
use zipfold_core::creation::CompressionMethod;
use zipfold_core::creation::CompressionOptions;
use zipfold_core::find_input_archives;
use zipfold_core::pipeline::CancelToken;
use zipfold_core::pipeline::NoopObserver;
use zipfold_core::pipeline::PipelineObserver;
use zipfold_core::pipeline::process_batch;

pub fn execute(
    args: &ProcessArgs,
    formatter: &dyn OutputFormatter,
    show_progress: bool,
) -> Result<()> {
    let config = build_config(args)?;
    let transform = build_transform(args)?;

    let inputs =
        find_input_archives(&args.input).map_err(|e| convert_pipeline_error(e, &args.input))?;
    log::info!("found {} input archive(s)", inputs.len());

    if config.dry_run {
        formatter.format_warning("dry run: no transform is applied and no output is written");
    }

    let progress = show_progress.then(|| CliProgress::new(inputs.len(), "Signing"));
    let observer: &dyn PipelineObserver = match &progress {
        Some(progress) => progress,
        None => &NoopObserver,
    };

    let report = process_batch(
        &inputs,
        &args.output_dir,
        &config,
        transform.as_ref(),
        observer,
        &CancelToken::new(),
    )
    .map_err(|e| convert_pipeline_error(e, &args.input))?;
    drop(progress);

    formatter.format_batch_report(&report)?;

    if !report.is_success() {
        bail!(
            "{} of {} archive(s) failed",
            report.failed(),
            report.outcomes.len()
        );
    }
    Ok(())
}

fn build_config(args: &ProcessArgs) -> Result<PipelineConfig> {
    let mut compression = CompressionOptions::default();
    if args.store {
        compression = compression.with_method(CompressionMethod::Stored);
    } else if let Some(level) = args.compression_level {
        compression = compression.with_level(level);
    }

    let mut config = PipelineConfig::default()
        .with_compression(compression)
        .with_dry_run(args.dry_run)
        .with_jobs(usize::from(args.jobs))
        .with_timeout(args.timeout.map(Duration::from_secs))
        .with_scratch_parent(args.scratch_dir.clone());

    if let Some(layout) = &args.layout {
        config = config.with_nesting(load_layout(layout)?);
    }

    Ok(config)
}

fn load_layout(path: &std::path::Path) -> Result<NestingSpec> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read layout file '{}'", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("Invalid layout file '{}'", path.display()))
}

fn build_transform(args: &ProcessArgs) -> Result<Box<dyn DirectoryTransform>> {
    if let Some(program) = &args.sign_command {
        let transform = CommandTransform::new(program).args(&args.sign_args);
        return Ok(Box::new(transform));
    }

    let mut marker = MarkerInjector::default();
    if let Some(name) = &args.marker_name {
        marker = marker.with_file_name(name);
    }
    marker
        .validate()
        .map_err(|e| convert_pipeline_error(e, &args.input))?;
    Ok(Box::new(marker))
}
