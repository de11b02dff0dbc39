//! Progress bar for batch runs.

use console::Term;
use indicatif::ProgressBar;
use indicatif::ProgressStyle;
use std::path::Path;
use zipfold_core::pipeline::PipelineObserver;
use zipfold_core::pipeline::PipelineState;

/// CLI progress bar wrapper implementing `PipelineObserver`.
///
/// Counts finished archives and shows the latest state transition. Cleans up
/// on drop.
pub struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    /// Creates a bar for `total` input archives.
    #[must_use]
    pub fn new(total: usize, message: &str) -> Self {
        let bar = ProgressBar::new(total as u64);

        // Template: "Signing [████████░░░░] 2/5 archives (3s) a.zip: repacking-level(2)"
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{prefix} [{bar:40.cyan/blue}] {pos}/{len} archives ({elapsed}) {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓░"),
        );
        bar.set_prefix(message.to_string());

        Self { bar }
    }

    /// Checks if we should show progress (TTY detection).
    #[must_use]
    pub fn should_show() -> bool {
        Term::stdout().is_term()
    }
}

impl Drop for CliProgress {
    fn drop(&mut self) {
        self.bar.finish_and_clear();
    }
}

impl PipelineObserver for CliProgress {
    fn on_state(&self, input: &Path, state: PipelineState) {
        self.bar.set_message(status_line(input, state));
    }

    fn on_run_finished(&self, _input: &Path, _succeeded: bool) {
        self.bar.inc(1);
    }
}

fn status_line(input: &Path, state: PipelineState) -> String {
    let name = input
        .file_name()
        .map_or_else(|| input.display().to_string(), |n| n.to_string_lossy().into_owned());
    format!("{name}: {state}")
}
