//! Parallel processing of independent inputs.

use crate::PipelineConfig;
use crate::PipelineError;
use crate::Result;
use crate::pipeline::context::CancelToken;
use crate::pipeline::context::RunContext;
use crate::pipeline::run::run;
use crate::pipeline::state::PipelineObserver;
use crate::report::BatchReport;
use crate::report::RunFailure;
use crate::report::RunOutcome;
use crate::transform::DirectoryTransform;
use rayon::prelude::*;
use std::path::Path;
use std::path::PathBuf;
use std::time::Instant;

/// Processes every input into `output_dir`.
///
/// Runs are independent: each owns its workspace, deadline and outcome, and a
/// failed run leaves the outputs of other runs untouched. Outcomes are
/// returned in input order regardless of completion order.
///
/// # Errors
///
/// Only configuration problems fail the batch itself: an invalid
/// [`PipelineConfig`], an `output_dir` that is the directory holding an
/// input, or a thread pool that cannot be built. Per-input errors are
/// reported in [`BatchReport::outcomes`].
pub fn process_batch(
    inputs: &[PathBuf],
    output_dir: &Path,
    config: &PipelineConfig,
    transform: &dyn DirectoryTransform,
    observer: &dyn PipelineObserver,
    cancel: &CancelToken,
) -> Result<BatchReport> {
    config.validate()?;
    check_output_dir(inputs, output_dir)?;

    let started = Instant::now();
    log::info!(
        "processing {} input(s) with {} worker(s)",
        inputs.len(),
        config.jobs
    );

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.jobs)
        .build()
        .map_err(|e| PipelineError::Io(std::io::Error::other(e)))?;

    let outcomes: Vec<RunOutcome> = pool.install(|| {
        inputs
            .par_iter()
            .map(|input| {
                let ctx = RunContext::new(config, transform, observer, cancel.clone());
                run(&ctx, input, output_dir).map_err(|error| RunFailure {
                    input: input.clone(),
                    error,
                })
            })
            .collect()
    });

    let report = BatchReport {
        outcomes,
        duration: started.elapsed(),
    };
    log::info!(
        "batch finished: {} succeeded, {} failed",
        report.succeeded(),
        report.failed()
    );
    Ok(report)
}

/// Rejects an output directory that would overwrite an input in place.
fn check_output_dir(inputs: &[PathBuf], output_dir: &Path) -> Result<()> {
    let Ok(output) = output_dir.canonicalize() else {
        return Ok(());
    };
    for input in inputs {
        let parent = match input.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        if parent.canonicalize().is_ok_and(|p| p == output) {
            return Err(PipelineError::InvalidConfig(format!(
                "output directory {} contains input {}",
                output_dir.display(),
                input.display()
            )));
        }
    }
    Ok(())
}
