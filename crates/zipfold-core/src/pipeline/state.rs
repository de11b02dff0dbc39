//! Pipeline states and observation.

use std::fmt;
use std::path::Path;

/// State of a single pipeline run.
///
/// A run moves through
/// `Idle → ExtractingOuter → DescendingLevel(n) → ApplyingTransform →
/// RepackingLevel(n) → FoldingUp(n) → Done`, or to `Failed` from anywhere.
/// Levels are numbered from 0 (the outer archive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineState {
    /// Not started.
    Idle,
    /// Unpacking the input archive.
    ExtractingOuter,
    /// Locating and unpacking the archives of level `n`.
    DescendingLevel(usize),
    /// Running the transform on leaf targets.
    ApplyingTransform,
    /// Repacking a transformed leaf archive of level `n`.
    RepackingLevel(usize),
    /// Repacking an enclosing archive of level `n` after its children.
    FoldingUp(usize),
    /// Finished successfully.
    Done,
    /// Finished with an error.
    Failed,
}

impl PipelineState {
    /// Returns `true` for `Done` and `Failed`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::ExtractingOuter => f.write_str("extracting-outer"),
            Self::DescendingLevel(n) => write!(f, "descending-level({n})"),
            Self::ApplyingTransform => f.write_str("applying-transform"),
            Self::RepackingLevel(n) => write!(f, "repacking-level({n})"),
            Self::FoldingUp(n) => write!(f, "folding-up({n})"),
            Self::Done => f.write_str("done"),
            Self::Failed => f.write_str("failed"),
        }
    }
}

/// Receives state transitions of pipeline runs.
///
/// Calls may arrive from several batch workers at once. Both methods default
/// to doing nothing.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use zipfold_core::pipeline::PipelineObserver;
/// use zipfold_core::pipeline::PipelineState;
///
/// struct Printer;
///
/// impl PipelineObserver for Printer {
///     fn on_state(&self, input: &Path, state: PipelineState) {
///         println!("{}: {state}", input.display());
///     }
/// }
/// ```
pub trait PipelineObserver: Send + Sync {
    /// Called on every state transition, before the cancellation checkpoint
    /// that follows it.
    fn on_state(&self, input: &Path, state: PipelineState) {
        let _ = (input, state);
    }

    /// Called once per input after its run ends and its workspace is gone.
    fn on_run_finished(&self, input: &Path, succeeded: bool) {
        let _ = (input, succeeded);
    }
}

/// Observer that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl PipelineObserver for NoopObserver {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_display() {
        assert_eq!(PipelineState::Idle.to_string(), "idle");
        assert_eq!(PipelineState::DescendingLevel(2).to_string(), "descending-level(2)");
        assert_eq!(PipelineState::FoldingUp(0).to_string(), "folding-up(0)");
    }

    #[test]
    fn test_terminal_states() {
        assert!(PipelineState::Done.is_terminal());
        assert!(PipelineState::Failed.is_terminal());
        assert!(!PipelineState::RepackingLevel(1).is_terminal());
    }
}
