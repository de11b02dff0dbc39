//! A single nested transform run.
//!
//! The outer archive is extracted into a fresh workspace. Each level's
//! archives are located with the [`NestingSpec`](crate::NestingSpec), unpacked
//! into their own scratch directories, and processed depth first. Leaves get
//! the transform; every directory is then repacked over the scratch copy of
//! the archive it came from, and finally the outer root is written to the
//! output directory.

use crate::PipelineError;
use crate::Result;
use crate::creation::ArchiveWriter;
use crate::extraction::ArchiveReader;
use crate::nesting::structure_mismatch;
use crate::pipeline::context::RunContext;
use crate::pipeline::state::PipelineState;
use crate::report::RunReport;
use crate::workspace::Workspace;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::path::PathBuf;

/// Processes one input archive into `output_dir`.
///
/// The output keeps the input's file name. In dry-run mode nothing is
/// transformed or written and the report lists the leaf targets found.
///
/// # Errors
///
/// Any error fails the whole run. The run's workspace is removed before this
/// function returns, whatever the outcome.
pub fn run(ctx: &RunContext<'_>, input: &Path, output_dir: &Path) -> Result<RunReport> {
    log::info!("processing {}", input.display());
    let result = Run::new(ctx, input).execute(output_dir);

    match &result {
        Ok(report) => {
            log::info!(
                "finished {} in {:?} ({} archives repacked)",
                input.display(),
                report.duration,
                report.archives_repacked.len()
            );
            ctx.finish(input, true);
        }
        Err(e) => {
            log::error!("{} failed [{}]: {e}", input.display(), e.kind());
            ctx.finish(input, false);
        }
    }
    result
}

struct Run<'c, 'a> {
    ctx: &'c RunContext<'a>,
    input: &'c Path,
    report: RunReport,
}

impl<'c, 'a> Run<'c, 'a> {
    fn new(ctx: &'c RunContext<'a>, input: &'c Path) -> Self {
        let report = RunReport {
            input: input.to_path_buf(),
            levels: ctx.config().nesting.depth(),
            dry_run: ctx.config().dry_run,
            ..RunReport::default()
        };
        Self { ctx, input, report }
    }

    fn execute(mut self, output_dir: &Path) -> Result<RunReport> {
        self.ctx.enter(self.input, PipelineState::Idle)?;
        self.ctx.enter(self.input, PipelineState::ExtractingOuter)?;

        let workspace = Workspace::new(self.ctx.config().scratch_parent())?;
        let stem = archive_stem(self.input);
        let root = workspace.allocate(0, &stem)?;
        self.extract(self.input, &root, self.input)?;

        self.process_level(&workspace, 0, &root, &stem, Path::new(""))?;

        if !self.ctx.config().dry_run {
            let file_name = self.input.file_name().ok_or_else(|| {
                PipelineError::InvalidConfig(format!(
                    "input has no file name: {}",
                    self.input.display()
                ))
            })?;
            std::fs::create_dir_all(output_dir)?;
            let output = output_dir.join(file_name);
            self.ctx.enter(self.input, self.repack_state(0))?;
            self.compress(&root, &output, None)?;
            self.report.output = Some(output);
        }

        drop(workspace);
        self.report.duration = self.ctx.started().elapsed();
        Ok(self.report)
    }

    /// Handles the extraction root of a level-`level` archive.
    ///
    /// `chain` is the archive's path relative to the outer archive, built
    /// from member names (empty for the outer archive itself).
    fn process_level(
        &mut self,
        workspace: &Workspace,
        level: usize,
        root: &Path,
        stem: &str,
        chain: &Path,
    ) -> Result<()> {
        let ctx = self.ctx;
        let nesting = &ctx.config().nesting;
        let logical = self.logical(chain);

        let Some(spec) = nesting.levels.get(level) else {
            return self.apply_transform(&logical, root, chain);
        };

        ctx.enter(self.input, PipelineState::DescendingLevel(level + 1))?;
        let matches = spec
            .find_matches(root, stem)
            .map_err(|e| e.with_archive(&logical))?;
        if matches.is_empty() {
            return Err(structure_mismatch(&logical, &spec.pattern_for(stem), root));
        }
        log::debug!(
            "{}: {} archive(s) at level {}",
            logical.display(),
            matches.len(),
            level + 1
        );

        for relative in matches {
            let archive = root.join(&relative);
            let child_chain = chain.join(&relative);
            let child_logical = self.logical(&child_chain);
            let child_stem = archive_stem(&archive);

            let child_root = workspace.allocate(level + 1, &child_stem)?;
            self.extract(&archive, &child_root, &child_logical)?;
            self.process_level(workspace, level + 1, &child_root, &child_stem, &child_chain)?;

            if !ctx.config().dry_run {
                ctx.enter(self.input, self.repack_state(level + 1))?;
                self.compress(&child_root, &archive, Some(&child_logical))?;
                self.report
                    .archives_repacked
                    .push(display_chain(&child_chain));
            }
            workspace.release(&child_root);
        }
        Ok(())
    }

    fn apply_transform(&mut self, logical: &Path, root: &Path, chain: &Path) -> Result<()> {
        let ctx = self.ctx;
        ctx.enter(self.input, PipelineState::ApplyingTransform)?;
        let targets = ctx.config().nesting.resolve_leaf_targets(logical, root)?;

        for target in targets {
            let relative = target.strip_prefix(root).unwrap_or(Path::new(""));
            let label = display_chain(&chain.join(relative));
            if ctx.config().dry_run {
                log::info!("would transform {label}");
            } else {
                ctx.checkpoint()?;
                log::debug!("transforming {label}");
                Self::transform_leaf(ctx, &target)?;
            }
            self.report.leaf_targets.push(label);
        }
        Ok(())
    }

    /// Runs the transform on one target, turning a panic into a failed run.
    fn transform_leaf(ctx: &RunContext<'_>, target: &Path) -> Result<()> {
        let checkpoint = || ctx.checkpoint();
        std::panic::catch_unwind(AssertUnwindSafe(|| {
            ctx.transform().transform_with(target, &checkpoint)
        }))
        .unwrap_or_else(|payload| {
            Err(PipelineError::Transform {
                target: target.to_path_buf(),
                reason: format!("transform panicked: {}", panic_message(payload.as_ref())),
            })
        })
    }

    /// Leaf archives are repacked; enclosing archives are folded up.
    fn repack_state(&self, level: usize) -> PipelineState {
        if level == self.ctx.config().nesting.depth() {
            PipelineState::RepackingLevel(level)
        } else {
            PipelineState::FoldingUp(level)
        }
    }

    fn extract(&self, archive: &Path, root: &Path, logical: &Path) -> Result<()> {
        let checkpoint = || self.ctx.checkpoint();
        ArchiveReader::new()
            .with_checkpoint(&checkpoint)
            .extract(archive, root)
            .map(drop)
            .map_err(|e| e.with_archive(logical))
    }

    fn compress(&self, root: &Path, output: &Path, logical: Option<&Path>) -> Result<()> {
        let checkpoint = || self.ctx.checkpoint();
        let result = ArchiveWriter::new()
            .with_checkpoint(&checkpoint)
            .compress(root, output, &self.ctx.config().compression)
            .map(drop);
        match logical {
            Some(logical) => result.map_err(|e| e.with_archive(logical)),
            None => result,
        }
    }

    fn logical(&self, chain: &Path) -> PathBuf {
        if chain.as_os_str().is_empty() {
            self.input.to_path_buf()
        } else {
            self.input.join(chain)
        }
    }
}

/// Returns the file stem used for `{stem}` and scratch directory names.
fn archive_stem(path: &Path) -> String {
    path.file_stem()
        .map_or_else(|| "archive".to_string(), |s| s.to_string_lossy().into_owned())
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

fn display_chain(chain: &Path) -> String {
    let name = chain
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    if name.is_empty() { ".".to_string() } else { name }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_archive_stem() {
        assert_eq!(archive_stem(Path::new("a/コネクト_v1.0.0.zip")), "コネクト_v1.0.0");
        assert_eq!(archive_stem(Path::new("aaa.xcframework.zip")), "aaa.xcframework");
    }

    #[test]
    fn test_panic_message() {
        let payload = std::panic::catch_unwind(|| panic!("boom")).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "boom");

        let payload = std::panic::catch_unwind(|| panic!("code {}", 7)).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "code 7");

        let payload = std::panic::catch_unwind(|| std::panic::panic_any(7_u8)).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "non-string panic payload");
    }

    #[test]
    fn test_display_chain() {
        assert_eq!(display_chain(Path::new("")), ".");
        assert_eq!(
            display_chain(&Path::new("connect/バイナリ/コネクト_v1.0.0.zip").join("x/aaa.zip")),
            "connect/バイナリ/コネクト_v1.0.0.zip/x/aaa.zip"
        );
    }
}
