//! Scratch workspaces are removed after every outcome.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::entry_count;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Mutex;
use tempfile::TempDir;
use zipfold_core::CancelToken;
use zipfold_core::DirectoryTransform;
use zipfold_core::ErrorKind;
use zipfold_core::MarkerInjector;
use zipfold_core::PipelineConfig;
use zipfold_core::PipelineError;
use zipfold_core::fixture::FIXTURE_NAME;
use zipfold_core::fixture::create_fixture;
use zipfold_core::pipeline::PipelineObserver;
use zipfold_core::pipeline::PipelineState;
use zipfold_core::pipeline::RunContext;
use zipfold_core::pipeline::run;

/// Records every transition and cancels the run on reaching `target`.
struct CancelAt {
    target: Option<PipelineState>,
    token: CancelToken,
    seen: Mutex<Vec<PipelineState>>,
    finished: Mutex<Vec<bool>>,
}

impl CancelAt {
    fn new(target: Option<PipelineState>, token: CancelToken) -> Self {
        Self {
            target,
            token,
            seen: Mutex::new(Vec::new()),
            finished: Mutex::new(Vec::new()),
        }
    }
}

impl PipelineObserver for CancelAt {
    fn on_state(&self, _input: &Path, state: PipelineState) {
        self.seen.lock().unwrap().push(state);
        if Some(state) == self.target {
            self.token.cancel();
        }
    }

    fn on_run_finished(&self, _input: &Path, succeeded: bool) {
        self.finished.lock().unwrap().push(succeeded);
    }
}

struct Fixture {
    temp: TempDir,
    input: PathBuf,
    scratch: PathBuf,
    out: PathBuf,
}

fn fixture() -> Fixture {
    let temp = TempDir::new().unwrap();
    let input = create_fixture(&temp.path().join("unsign")).unwrap();
    let scratch = temp.path().join("scratch");
    std::fs::create_dir_all(&scratch).unwrap();
    let out = temp.path().join("signed");
    Fixture {
        temp,
        input,
        scratch,
        out,
    }
}

fn config(scratch: &Path) -> PipelineConfig {
    PipelineConfig::default().with_scratch_parent(Some(scratch.to_path_buf()))
}

#[test]
fn test_state_sequence_of_successful_run() {
    let f = fixture();
    let token = CancelToken::new();
    let observer = CancelAt::new(None, token.clone());
    let config = config(&f.scratch);
    let marker = MarkerInjector::default();
    let ctx = RunContext::new(&config, &marker, &observer, token);

    run(&ctx, &f.input, &f.out).unwrap();

    use PipelineState::*;
    assert_eq!(
        *observer.seen.lock().unwrap(),
        [
            Idle,
            ExtractingOuter,
            DescendingLevel(1),
            DescendingLevel(2),
            ApplyingTransform,
            RepackingLevel(2),
            ApplyingTransform,
            RepackingLevel(2),
            FoldingUp(1),
            FoldingUp(0),
            Done,
        ]
    );
    assert_eq!(*observer.finished.lock().unwrap(), [true]);
    assert_eq!(entry_count(&f.scratch), 0);
    assert!(f.out.join(FIXTURE_NAME).exists());
}

#[test]
fn test_cancel_at_every_state_cleans_up() {
    let states = [
        PipelineState::Idle,
        PipelineState::ExtractingOuter,
        PipelineState::DescendingLevel(1),
        PipelineState::DescendingLevel(2),
        PipelineState::ApplyingTransform,
        PipelineState::RepackingLevel(2),
        PipelineState::FoldingUp(1),
        PipelineState::FoldingUp(0),
    ];

    for state in states {
        let f = fixture();
        let token = CancelToken::new();
        let observer = CancelAt::new(Some(state), token.clone());
        let config = config(&f.scratch);
        let marker = MarkerInjector::default();
        let ctx = RunContext::new(&config, &marker, &observer, token);

        let err = run(&ctx, &f.input, &f.out).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Cancelled, "cancel at {state}");
        assert_eq!(entry_count(&f.scratch), 0, "scratch left after {state}");
        assert!(!f.out.join(FIXTURE_NAME).exists(), "output after {state}");
        assert_eq!(
            observer.seen.lock().unwrap().last(),
            Some(&PipelineState::Failed)
        );
        assert_eq!(*observer.finished.lock().unwrap(), [false]);
        drop(f.temp);
    }
}

struct Failing;

impl DirectoryTransform for Failing {
    fn transform(&self, directory: &Path) -> zipfold_core::Result<()> {
        Err(PipelineError::Transform {
            target: directory.to_path_buf(),
            reason: "signing service unavailable".into(),
        })
    }
}

#[test]
fn test_transform_failure_cleans_up() {
    let f = fixture();
    let token = CancelToken::new();
    let observer = CancelAt::new(None, token.clone());
    let config = config(&f.scratch);
    let ctx = RunContext::new(&config, &Failing, &observer, token);

    let err = run(&ctx, &f.input, &f.out).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transform);
    assert_eq!(entry_count(&f.scratch), 0);
}

struct Panicking;

impl DirectoryTransform for Panicking {
    fn transform(&self, _directory: &Path) -> zipfold_core::Result<()> {
        panic!("transform panicked");
    }
}

#[test]
fn test_panic_in_transform_fails_run_and_cleans_up() {
    let f = fixture();
    let token = CancelToken::new();
    let observer = CancelAt::new(None, token.clone());
    let config = config(&f.scratch);
    let ctx = RunContext::new(&config, &Panicking, &observer, token);

    let err = run(&ctx, &f.input, &f.out).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Transform);
    assert!(err.to_string().contains("transform panicked"), "{err}");
    assert_eq!(entry_count(&f.scratch), 0);
    assert!(!f.out.join(FIXTURE_NAME).exists());
    assert_eq!(
        observer.seen.lock().unwrap().last(),
        Some(&PipelineState::Failed)
    );
    assert_eq!(*observer.finished.lock().unwrap(), [false]);
}

#[test]
fn test_deadline_exceeded_cleans_up() {
    struct Slow;

    impl DirectoryTransform for Slow {
        fn transform(&self, _directory: &Path) -> zipfold_core::Result<()> {
            std::thread::sleep(std::time::Duration::from_millis(200));
            Ok(())
        }
    }

    let f = fixture();
    let token = CancelToken::new();
    let observer = CancelAt::new(None, token.clone());
    let config = config(&f.scratch).with_timeout(Some(std::time::Duration::from_millis(100)));
    let ctx = RunContext::new(&config, &Slow, &observer, token);

    let err = run(&ctx, &f.input, &f.out).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DeadlineExceeded);
    assert_eq!(entry_count(&f.scratch), 0);
    assert!(!f.out.join(FIXTURE_NAME).exists());
}

#[cfg(unix)]
#[test]
fn test_deadline_kills_hung_command() {
    use std::time::Duration;
    use std::time::Instant;
    use zipfold_core::CommandTransform;

    let f = fixture();
    let token = CancelToken::new();
    let observer = CancelAt::new(None, token.clone());
    let config = config(&f.scratch).with_timeout(Some(Duration::from_millis(200)));
    let hung = CommandTransform::new("sh").args(["-c", "sleep 30"]);
    let ctx = RunContext::new(&config, &hung, &observer, token);

    let started = Instant::now();
    let err = run(&ctx, &f.input, &f.out).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::DeadlineExceeded);
    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(entry_count(&f.scratch), 0);
    assert!(!f.out.join(FIXTURE_NAME).exists());
}
