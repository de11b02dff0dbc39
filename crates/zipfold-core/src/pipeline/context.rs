//! Run-scoped context: configuration, transform, observer, cancellation.

use crate::PipelineConfig;
use crate::PipelineError;
use crate::Result;
use crate::pipeline::state::PipelineObserver;
use crate::pipeline::state::PipelineState;
use crate::transform::DirectoryTransform;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Instant;

/// Shared cancellation flag.
///
/// Clones share the same flag. Cancelling stops every run holding a clone at
/// its next checkpoint.
///
/// # Examples
///
/// ```
/// use zipfold_core::CancelToken;
///
/// let token = CancelToken::new();
/// let handle = token.clone();
/// handle.cancel();
/// assert!(token.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Creates a token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Everything one run needs, with its own start time and deadline.
pub struct RunContext<'a> {
    config: &'a PipelineConfig,
    transform: &'a dyn DirectoryTransform,
    observer: &'a dyn PipelineObserver,
    cancel: CancelToken,
    started: Instant,
    deadline: Option<Instant>,
}

impl std::fmt::Debug for RunContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunContext")
            .field("config", &self.config)
            .field("cancel", &self.cancel)
            .field("started", &self.started)
            .field("deadline", &self.deadline)
            .finish_non_exhaustive()
    }
}

impl<'a> RunContext<'a> {
    /// Creates a context; the deadline clock starts now.
    #[must_use]
    pub fn new(
        config: &'a PipelineConfig,
        transform: &'a dyn DirectoryTransform,
        observer: &'a dyn PipelineObserver,
        cancel: CancelToken,
    ) -> Self {
        let started = Instant::now();
        Self {
            config,
            transform,
            observer,
            cancel,
            started,
            deadline: config.timeout.and_then(|t| started.checked_add(t)),
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        self.config
    }

    /// Returns the leaf transform.
    #[must_use]
    pub fn transform(&self) -> &dyn DirectoryTransform {
        self.transform
    }

    /// Returns when the run started.
    #[must_use]
    pub fn started(&self) -> Instant {
        self.started
    }

    /// Fails if the run was cancelled or its deadline has passed.
    ///
    /// # Errors
    ///
    /// Returns `Cancelled` or `DeadlineExceeded`.
    pub fn checkpoint(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(PipelineError::DeadlineExceeded {
                elapsed: self.started.elapsed(),
            });
        }
        Ok(())
    }

    /// Records a transition and runs the checkpoint that follows it.
    pub(crate) fn enter(&self, input: &Path, state: PipelineState) -> Result<()> {
        log::debug!("{}: {state}", input.display());
        self.observer.on_state(input, state);
        if state.is_terminal() {
            return Ok(());
        }
        self.checkpoint()
    }

    pub(crate) fn finish(&self, input: &Path, succeeded: bool) {
        let state = if succeeded {
            PipelineState::Done
        } else {
            PipelineState::Failed
        };
        let _ = self.enter(input, state);
        self.observer.on_run_finished(input, succeeded);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::pipeline::state::NoopObserver;
    use crate::transform::MarkerInjector;
    use std::time::Duration;

    #[test]
    fn test_checkpoint_passes_by_default() {
        let config = PipelineConfig::default();
        let marker = MarkerInjector::default();
        let ctx = RunContext::new(&config, &marker, &NoopObserver, CancelToken::new());
        assert!(ctx.checkpoint().is_ok());
    }

    #[test]
    fn test_checkpoint_cancelled() {
        let config = PipelineConfig::default();
        let token = CancelToken::new();
        let marker = MarkerInjector::default();
        let ctx = RunContext::new(&config, &marker, &NoopObserver, token.clone());
        token.cancel();
        assert!(matches!(ctx.checkpoint(), Err(PipelineError::Cancelled)));
    }

    #[test]
    fn test_checkpoint_deadline() {
        let config = PipelineConfig::default().with_timeout(Some(Duration::from_millis(1)));
        let marker = MarkerInjector::default();
        let ctx = RunContext::new(&config, &marker, &NoopObserver, CancelToken::new());
        std::thread::sleep(Duration::from_millis(20));
        assert!(matches!(
            ctx.checkpoint(),
            Err(PipelineError::DeadlineExceeded { .. })
        ));
    }

    #[test]
    fn test_terminal_state_skips_checkpoint() {
        let config = PipelineConfig::default();
        let token = CancelToken::new();
        token.cancel();
        let marker = MarkerInjector::default();
        let ctx = RunContext::new(&config, &marker, &NoopObserver, token);
        assert!(ctx.enter(Path::new("a.zip"), PipelineState::Failed).is_ok());
        assert!(ctx.enter(Path::new("a.zip"), PipelineState::Idle).is_err());
    }
}
