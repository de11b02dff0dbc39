//! ZIP archive writing.
//!
//! Entry names are UTF-8 with `/` separators. The `zip` crate sets
//! general-purpose flag bit 11 on every entry whose name is not pure ASCII.

use crate::PipelineError;
use crate::Result;
use crate::creation::atomic::write_atomic;
use crate::creation::config::CompressionOptions;
use crate::creation::report::CreationReport;
use crate::creation::walker::EntryType;
use crate::creation::walker::TreeEntry;
use crate::creation::walker::collect_entries;
use crate::timestamp;
use crate::types::Checkpoint;
use std::fs::File;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::time::Instant;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

const DEFAULT_FILE_MODE: u32 = 0o644;
const DEFAULT_DIR_MODE: u32 = 0o755;
const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Writes a directory tree into a ZIP archive.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use zipfold_core::creation::ArchiveWriter;
/// use zipfold_core::creation::CompressionOptions;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let report = ArchiveWriter::new().compress(
///     Path::new("leaf"),
///     Path::new("aaa.xcframework.zip"),
///     &CompressionOptions::default(),
/// )?;
/// println!("added {} files", report.files_added);
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct ArchiveWriter<'a> {
    checkpoint: Option<&'a Checkpoint<'a>>,
}

impl std::fmt::Debug for ArchiveWriter<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveWriter")
            .field("checkpoint", &self.checkpoint.is_some())
            .finish()
    }
}

impl<'a> ArchiveWriter<'a> {
    /// Creates a writer with no cancellation checkpoint.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a checkpoint called before each entry.
    #[must_use]
    pub fn with_checkpoint(mut self, checkpoint: &'a Checkpoint<'a>) -> Self {
        self.checkpoint = Some(checkpoint);
        self
    }

    /// Writes every file, symlink and empty directory under `source_root`
    /// into `output`.
    ///
    /// Entries are sorted by name. The archive is written to a temporary
    /// sibling of `output` and renamed into place only on success, so an
    /// existing `output` is replaced atomically.
    ///
    /// # Errors
    ///
    /// Returns `ArchiveWrite` on any I/O failure, `InvalidConfig` for bad
    /// compression settings, or the checkpoint's error.
    pub fn compress(
        &self,
        source_root: &Path,
        output: &Path,
        options: &CompressionOptions,
    ) -> Result<CreationReport> {
        options.validate()?;
        let start = Instant::now();
        let entries = collect_entries(source_root).map_err(|e| PipelineError::write(output, e))?;

        log::debug!(
            "compressing {} ({} entries) into {}",
            source_root.display(),
            entries.len(),
            output.display()
        );

        let mut report = CreationReport::new();
        write_atomic(output, |file: &mut File| {
            self.write_entries(file, &entries, options, &mut report)
        })
        .map_err(|e| match e {
            PipelineError::Io(io) => PipelineError::write(output, io),
            other => other,
        })?;

        report.duration = start.elapsed();
        log::debug!(
            "wrote {} ({} entries, {} bytes) in {:?}",
            output.display(),
            report.total_items(),
            report.bytes_compressed,
            report.duration
        );
        Ok(report)
    }

    fn write_entries(
        &self,
        file: &mut File,
        entries: &[TreeEntry],
        options: &CompressionOptions,
        report: &mut CreationReport,
    ) -> Result<()> {
        let mut zip = ZipWriter::new(&mut *file);
        let base = options.file_options();
        let mut buffer = vec![0u8; COPY_BUFFER_SIZE];

        for entry in entries {
            if let Some(checkpoint) = self.checkpoint {
                checkpoint()?;
            }
            log::trace!("entry {}", entry.archive_name);

            let stamped = base.last_modified_time(
                entry
                    .modified
                    .map(timestamp::system_to_zip)
                    .unwrap_or_default(),
            );

            match &entry.entry_type {
                EntryType::File => {
                    let mode = entry.mode.filter(|m| *m != 0).unwrap_or(DEFAULT_FILE_MODE);
                    let entry_options = stamped
                        .unix_permissions(mode)
                        .large_file(entry.size >= u64::from(u32::MAX));
                    zip.start_file(entry.archive_name.as_str(), entry_options)
                        .map_err(std::io::Error::other)?;
                    report.bytes_written += copy_file(&entry.path, &mut zip, &mut buffer)?;
                    report.files_added += 1;
                }
                EntryType::EmptyDirectory => {
                    let mode = entry.mode.filter(|m| *m != 0).unwrap_or(DEFAULT_DIR_MODE);
                    zip.add_directory(
                        format!("{}/", entry.archive_name),
                        add_dir_options(stamped, mode),
                    )
                    .map_err(std::io::Error::other)?;
                    report.directories_added += 1;
                }
                EntryType::Symlink { target } => {
                    let target = target.to_str().ok_or_else(|| {
                        std::io::Error::new(
                            std::io::ErrorKind::InvalidData,
                            format!("symlink target is not valid UTF-8: {}", target.display()),
                        )
                    })?;
                    zip.add_symlink(entry.archive_name.as_str(), target, stamped)
                        .map_err(std::io::Error::other)?;
                    report.symlinks_added += 1;
                }
            }
            report.entries.push(entry.archive_name.clone());
        }

        zip.finish().map_err(std::io::Error::other)?;
        report.bytes_compressed = file.metadata()?.len();
        Ok(())
    }
}

fn add_dir_options(options: SimpleFileOptions, mode: u32) -> SimpleFileOptions {
    options
        .compression_method(zip::CompressionMethod::Stored)
        .unix_permissions(mode)
}

fn copy_file<W: Write>(source: &Path, out: &mut W, buffer: &mut [u8]) -> Result<u64> {
    let mut input = File::open(source)?;
    let mut copied = 0u64;
    loop {
        let n = input.read(buffer)?;
        if n == 0 {
            break;
        }
        out.write_all(&buffer[..n])?;
        copied += n as u64;
    }
    Ok(copied)
}
