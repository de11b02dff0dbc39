//! Leaf directory transforms.
//!
//! The pipeline hands each leaf target directory to a [`DirectoryTransform`]
//! and knows nothing else about what happens there. [`MarkerInjector`] stands
//! in for code signing by dropping a marker file; [`CommandTransform`] runs an
//! external program instead.

use crate::PipelineError;
use crate::Result;
use crate::types::Checkpoint;
use std::ffi::OsString;
use std::io::Read;
use std::io::Seek;
use std::path::Path;
use std::path::PathBuf;
use std::process::Child;
use std::process::Command;
use std::process::Stdio;
use std::time::Duration;

/// How often a running command is checked for exit and for cancellation.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Default marker file name.
pub const DEFAULT_MARKER_NAME: &str = "署名済み.txt";

/// Default marker file content.
pub const DEFAULT_MARKER_CONTENT: &str = "このフレームワークは署名済みです\n";

/// A transform applied in place to a leaf directory.
///
/// Implementations must be safe to share across batch workers.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use zipfold_core::DirectoryTransform;
///
/// struct Touch;
///
/// impl DirectoryTransform for Touch {
///     fn transform(&self, directory: &Path) -> zipfold_core::Result<()> {
///         std::fs::write(directory.join("touched"), b"")?;
///         Ok(())
///     }
/// }
/// ```
pub trait DirectoryTransform: Send + Sync {
    /// Transforms `directory` in place.
    ///
    /// # Errors
    ///
    /// Any error fails the run. Implementations should report their own
    /// failures as `PipelineError::Transform`.
    fn transform(&self, directory: &Path) -> Result<()>;

    /// Transforms `directory`, consulting `checkpoint` while work is running.
    ///
    /// The pipeline always calls this method. The default ignores the
    /// checkpoint; long-running transforms override it so cancellation and
    /// the run deadline can interrupt them.
    ///
    /// # Errors
    ///
    /// As for [`transform`](Self::transform), plus whatever `checkpoint`
    /// returns.
    fn transform_with(&self, directory: &Path, checkpoint: &Checkpoint<'_>) -> Result<()> {
        let _ = checkpoint;
        self.transform(directory)
    }
}

/// Writes a single marker file into each leaf directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerInjector {
    file_name: String,
    content: String,
}

impl Default for MarkerInjector {
    fn default() -> Self {
        Self {
            file_name: DEFAULT_MARKER_NAME.to_string(),
            content: DEFAULT_MARKER_CONTENT.to_string(),
        }
    }
}

impl MarkerInjector {
    /// Creates an injector with the default name and content.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the marker file name.
    #[must_use]
    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = name.into();
        self
    }

    /// Sets the marker content.
    #[must_use]
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    /// Returns the marker file name.
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Checks that the marker name is a single plain file name.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` for empty names or names with separators.
    pub fn validate(&self) -> Result<()> {
        let plain = !self.file_name.is_empty()
            && !self.file_name.contains(['/', '\\'])
            && self.file_name != "."
            && self.file_name != "..";
        if plain {
            Ok(())
        } else {
            Err(PipelineError::InvalidConfig(format!(
                "marker name must be a plain file name, got {:?}",
                self.file_name
            )))
        }
    }
}

impl DirectoryTransform for MarkerInjector {
    fn transform(&self, directory: &Path) -> Result<()> {
        let marker = directory.join(&self.file_name);
        std::fs::write(&marker, self.content.as_bytes()).map_err(|e| {
            PipelineError::Transform {
                target: directory.to_path_buf(),
                reason: format!("cannot write {}: {e}", self.file_name),
            }
        })?;
        log::debug!("wrote marker {}", marker.display());
        Ok(())
    }
}

/// Runs an external program on each leaf directory.
///
/// The directory is passed as the final argument. A non-zero exit status
/// fails the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTransform {
    program: PathBuf,
    args: Vec<OsString>,
}

impl CommandTransform {
    /// Creates a transform that runs `program` with no extra arguments.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Appends an argument placed before the directory.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments placed before the directory.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl DirectoryTransform for CommandTransform {
    fn transform(&self, directory: &Path) -> Result<()> {
        self.transform_with(directory, &|| -> Result<()> { Ok(()) })
    }

    /// Runs the program, killing it as soon as `checkpoint` fails.
    fn transform_with(&self, directory: &Path, checkpoint: &Checkpoint<'_>) -> Result<()> {
        let failure = |reason: String| PipelineError::Transform {
            target: directory.to_path_buf(),
            reason,
        };
        let cannot_run =
            |e: std::io::Error| failure(format!("cannot run {}: {e}", self.program.display()));

        log::debug!(
            "running {} on {}",
            self.program.display(),
            directory.display()
        );
        // stderr goes to an anonymous file so a chatty child never blocks on
        // a full pipe while we poll it.
        let mut stderr_file = tempfile::tempfile().map_err(cannot_run)?;
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(directory)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(stderr_file.try_clone().map_err(cannot_run)?)
            .spawn()
            .map_err(cannot_run)?;

        let status = loop {
            if let Err(e) = checkpoint() {
                terminate(&mut child);
                log::warn!(
                    "stopped {} on {}: {e}",
                    self.program.display(),
                    directory.display()
                );
                return Err(e);
            }
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => std::thread::sleep(POLL_INTERVAL),
                Err(e) => {
                    terminate(&mut child);
                    return Err(failure(format!(
                        "cannot wait for {}: {e}",
                        self.program.display()
                    )));
                }
            }
        };

        if status.success() {
            return Ok(());
        }

        let mut stderr = String::new();
        if stderr_file.rewind().is_ok() {
            let mut bytes = Vec::new();
            if stderr_file.read_to_end(&mut bytes).is_ok() {
                stderr = String::from_utf8_lossy(&bytes).trim().to_string();
            }
        }
        let mut reason = format!("{} exited with {status}", self.program.display());
        if !stderr.is_empty() {
            reason.push_str(": ");
            reason.push_str(&stderr);
        }
        Err(failure(reason))
    }
}

fn terminate(child: &mut Child) {
    if let Err(e) = child.kill() {
        log::debug!("kill failed: {e}");
    }
    let _ = child.wait();
}
