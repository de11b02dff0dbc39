//! High-level public API.

use std::path::Path;
use std::path::PathBuf;

use crate::BatchReport;
use crate::DirectoryTransform;
use crate::ExtractionReport;
use crate::PipelineConfig;
use crate::PipelineError;
use crate::Result;
use crate::RunReport;
use crate::creation::CompressionOptions;
use crate::creation::CreationReport;
use crate::pipeline::CancelToken;
use crate::pipeline::NoopObserver;
use crate::pipeline::RunContext;

/// Resolves the archives to process.
///
/// `input` may be a single archive, or a directory whose `*.zip` files
/// (not recursive) are returned sorted by name.
///
/// # Errors
///
/// Returns `InvalidConfig` if `input` does not exist or no archives are
/// found, and `Io` if the directory cannot be read.
///
/// # Examples
///
/// ```no_run
/// use zipfold_core::find_input_archives;
///
/// # fn main() -> zipfold_core::Result<()> {
/// for archive in find_input_archives("unsign")? {
///     println!("{}", archive.display());
/// }
/// # Ok(())
/// # }
/// ```
pub fn find_input_archives<P: AsRef<Path>>(input: P) -> Result<Vec<PathBuf>> {
    let input = input.as_ref();
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }
    if !input.is_dir() {
        return Err(PipelineError::InvalidConfig(format!(
            "input not found: {}",
            input.display()
        )));
    }

    let mut archives = Vec::new();
    for entry in std::fs::read_dir(input)? {
        let path = entry?.path();
        let is_zip = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"));
        if is_zip && path.is_file() {
            archives.push(path);
        }
    }
    archives.sort();

    if archives.is_empty() {
        return Err(PipelineError::InvalidConfig(format!(
            "no .zip archives in {}",
            input.display()
        )));
    }
    Ok(archives)
}

/// Processes one archive with no observer and no external cancellation.
///
/// # Errors
///
/// Returns `InvalidConfig` for a rejected configuration, otherwise any error
/// of the run. See [`pipeline::run`](crate::pipeline::run).
///
/// # Examples
///
/// ```no_run
/// use zipfold_core::MarkerInjector;
/// use zipfold_core::PipelineConfig;
/// use zipfold_core::process_archive;
///
/// # fn main() -> zipfold_core::Result<()> {
/// let report = process_archive(
///     "unsign/20260105_test.zip",
///     "signed",
///     &PipelineConfig::default(),
///     &MarkerInjector::default(),
/// )?;
/// println!("transformed {} leaves", report.leaf_targets.len());
/// # Ok(())
/// # }
/// ```
pub fn process_archive<P: AsRef<Path>, Q: AsRef<Path>>(
    input: P,
    output_dir: Q,
    config: &PipelineConfig,
    transform: &dyn DirectoryTransform,
) -> Result<RunReport> {
    config.validate()?;
    let ctx = RunContext::new(config, transform, &NoopObserver, CancelToken::new());
    crate::pipeline::run(&ctx, input.as_ref(), output_dir.as_ref())
}

/// Processes every input in parallel with no observer and no external
/// cancellation.
///
/// # Errors
///
/// See [`pipeline::process_batch`](crate::pipeline::process_batch).
pub fn process_all(
    inputs: &[PathBuf],
    output_dir: &Path,
    config: &PipelineConfig,
    transform: &dyn DirectoryTransform,
) -> Result<BatchReport> {
    crate::pipeline::process_batch(
        inputs,
        output_dir,
        config,
        transform,
        &NoopObserver,
        &CancelToken::new(),
    )
}

/// Extracts a single archive into `destination`.
///
/// # Errors
///
/// See [`ArchiveReader::extract`](crate::extraction::ArchiveReader::extract).
pub fn extract_archive<P: AsRef<Path>, Q: AsRef<Path>>(
    archive: P,
    destination: Q,
) -> Result<ExtractionReport> {
    crate::extraction::extract(archive.as_ref(), destination.as_ref())
}

/// Packs `source_root` into the archive at `output`.
///
/// # Errors
///
/// See [`ArchiveWriter::compress`](crate::creation::ArchiveWriter::compress).
pub fn create_archive<P: AsRef<Path>, Q: AsRef<Path>>(
    source_root: P,
    output: Q,
    options: &CompressionOptions,
) -> Result<CreationReport> {
    crate::creation::compress(source_root.as_ref(), output.as_ref(), options)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_find_single_archive() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a.zip");
        std::fs::write(&path, b"").unwrap();
        assert_eq!(find_input_archives(&path).unwrap(), vec![path]);
    }

    #[test]
    fn test_find_archives_in_directory_sorted() {
        let temp = TempDir::new().unwrap();
        for name in ["b.zip", "a.ZIP", "notes.txt", "c.zip"] {
            std::fs::write(temp.path().join(name), b"").unwrap();
        }
        std::fs::create_dir(temp.path().join("d.zip")).unwrap();

        let found = find_input_archives(temp.path()).unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["a.ZIP", "b.zip", "c.zip"]);
    }

    #[test]
    fn test_find_no_archives() {
        let temp = TempDir::new().unwrap();
        let err = find_input_archives(temp.path()).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidConfig(_)));
    }

    #[test]
    fn test_find_missing_input() {
        let temp = TempDir::new().unwrap();
        assert!(find_input_archives(temp.path().join("missing")).is_err());
    }

    #[test]
    fn test_create_then_extract() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("src");
        std::fs::create_dir_all(source.join("ディレクトリ")).unwrap();
        std::fs::write(source.join("ディレクトリ/ファイル.txt"), "内容").unwrap();

        let archive = temp.path().join("out.zip");
        let created = create_archive(&source, &archive, &CompressionOptions::default()).unwrap();
        assert_eq!(created.files_added, 1);

        let extracted = extract_archive(&archive, temp.path().join("dst")).unwrap();
        assert_eq!(extracted.entries, ["ディレクトリ/ファイル.txt"]);
        assert_eq!(
            std::fs::read_to_string(temp.path().join("dst/ディレクトリ/ファイル.txt")).unwrap(),
            "内容"
        );
    }
}
