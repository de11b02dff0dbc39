//! ZIP extraction with UTF-8 name decoding and path validation.

use crate::PipelineError;
use crate::Result;
use crate::report::ExtractionReport;
use crate::timestamp;
use crate::types::Checkpoint;
use crate::types::ExtractRoot;
use crate::types::SafePath;
use crate::types::SafeSymlink;
use std::fs::File;
use std::io::BufReader;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::time::Instant;
use zip::ZipArchive;

/// File type mask and symlink type from `st_mode`.
const S_IFMT: u32 = 0o170_000;
const S_IFLNK: u32 = 0o120_000;

/// Permission bits applied to files stored without any.
pub(crate) const DEFAULT_FILE_MODE: u32 = 0o644;

/// Permission bits every extracted directory keeps for its owner.
const OWNER_RWX: u32 = 0o700;

const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Extracts ZIP archives into a directory.
///
/// Every member name is decoded from its raw bytes as UTF-8 and validated
/// with [`SafePath`] before anything is written. Backslash separators in
/// stored names are treated as `/`.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use zipfold_core::extraction::ArchiveReader;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let report = ArchiveReader::new().extract(Path::new("input.zip"), Path::new("out"))?;
/// println!("extracted {} files", report.files_extracted);
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct ArchiveReader<'a> {
    checkpoint: Option<&'a Checkpoint<'a>>,
}

impl std::fmt::Debug for ArchiveReader<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveReader")
            .field("checkpoint", &self.checkpoint.is_some())
            .finish()
    }
}

impl<'a> ArchiveReader<'a> {
    /// Creates a reader with no cancellation checkpoint.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a checkpoint called before each member.
    ///
    /// An error from the checkpoint aborts extraction and is returned as is.
    #[must_use]
    pub fn with_checkpoint(mut self, checkpoint: &'a Checkpoint<'a>) -> Self {
        self.checkpoint = Some(checkpoint);
        self
    }

    /// Extracts every member of `archive` into `destination`.
    ///
    /// `destination` is created if missing. Directory permissions and
    /// timestamps are applied after all members are written.
    ///
    /// # Errors
    ///
    /// - `ArchiveRead` if the archive cannot be opened, its central directory
    ///   is damaged, or a member fails its CRC check
    /// - `Decode` if a member name is not valid UTF-8
    /// - `PathTraversal` / `SymlinkEscape` if a member would land outside
    ///   `destination`
    /// - `Io` if writing to `destination` fails
    pub fn extract(&self, archive: &Path, destination: &Path) -> Result<ExtractionReport> {
        let start = Instant::now();
        let file = File::open(archive).map_err(|e| PipelineError::read(archive, e))?;
        let mut zip =
            ZipArchive::new(BufReader::new(file)).map_err(|e| PipelineError::read(archive, e))?;

        let root = ExtractRoot::create(destination)?;
        let mut report = ExtractionReport::new();
        let mut deferred_dirs: Vec<(PathBuf, Option<u32>, Option<i64>)> = Vec::new();
        let mut buffer = vec![0u8; COPY_BUFFER_SIZE];

        log::debug!(
            "extracting {} ({} members) into {}",
            archive.display(),
            zip.len(),
            root.as_path().display()
        );

        for index in 0..zip.len() {
            if let Some(checkpoint) = self.checkpoint {
                checkpoint()?;
            }

            let mut member = zip
                .by_index(index)
                .map_err(|e| PipelineError::read(archive, e))?;

            let name = decode_member_name(archive, member.name_raw())?;
            let is_dir = name.ends_with('/');
            let relative = name.trim_end_matches('/');
            if relative.is_empty() {
                continue;
            }

            let safe = SafePath::validate(Path::new(relative), &root)?;
            let target = root.join(&safe);
            let mode = member.unix_mode();
            let mtime = member.last_modified().and_then(timestamp::zip_to_unix);
            log::trace!("member {name}");

            if is_dir {
                std::fs::create_dir_all(&target)?;
                deferred_dirs.push((target, mode.map(|m| m & 0o777), mtime));
                report.directories_created += 1;
            } else if mode.is_some_and(|m| m & S_IFMT == S_IFLNK) {
                let mut link_target = Vec::new();
                member
                    .read_to_end(&mut link_target)
                    .map_err(|e| PipelineError::read(archive, e))?;
                let link_target = String::from_utf8(link_target).map_err(|e| {
                    PipelineError::Decode {
                        archive: archive.to_path_buf(),
                        raw_name: e.into_bytes(),
                    }
                })?;
                let symlink = SafeSymlink::validate(&safe, Path::new(&link_target), &root)?;
                if target.symlink_metadata().is_ok() {
                    std::fs::remove_file(&target)?;
                }
                symlink.create(&root)?;
                report.symlinks_created += 1;
            } else {
                if let Some(parent) = target.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                let written = copy_member(archive, &mut member, &target, &mut buffer)?;
                apply_file_mode(&target, mode)?;
                if let Some(secs) = mtime
                    && let Err(e) = restore_mtime(&target, secs)
                {
                    report.add_warning(format!("cannot restore mtime of {name}: {e}"));
                }
                report.files_extracted += 1;
                report.bytes_written += written;
            }

            report.entries.push(name);
        }

        // Deepest first, so that restoring a parent's timestamp is not undone
        // by touching its children.
        deferred_dirs.sort_by(|a, b| b.0.cmp(&a.0));
        for (dir, mode, mtime) in deferred_dirs {
            apply_dir_mode(&dir, mode)?;
            if let Some(secs) = mtime
                && let Err(e) = restore_mtime(&dir, secs)
            {
                report.add_warning(format!("cannot restore mtime of {}: {e}", dir.display()));
            }
        }

        report.duration = start.elapsed();
        log::debug!(
            "extracted {} items from {} in {:?}",
            report.total_items(),
            archive.display(),
            report.duration
        );
        Ok(report)
    }
}

/// Decodes a raw member name as UTF-8 and normalizes separators to `/`.
///
/// # Errors
///
/// Returns `PipelineError::Decode` carrying the raw bytes if they are not
/// valid UTF-8.
pub fn decode_member_name(archive: &Path, raw: &[u8]) -> Result<String> {
    let name = std::str::from_utf8(raw).map_err(|_| PipelineError::Decode {
        archive: archive.to_path_buf(),
        raw_name: raw.to_vec(),
    })?;
    Ok(name.replace('\\', "/"))
}

fn copy_member<R: Read>(
    archive: &Path,
    member: &mut R,
    target: &Path,
    buffer: &mut [u8],
) -> Result<u64> {
    let mut out = File::create(target)?;
    let mut written = 0u64;
    loop {
        // Read errors include CRC mismatches reported at end of stream.
        let n = member
            .read(buffer)
            .map_err(|e| PipelineError::read(archive, e))?;
        if n == 0 {
            break;
        }
        out.write_all(&buffer[..n])?;
        written += n as u64;
    }
    out.flush()?;
    Ok(written)
}

#[cfg(unix)]
fn apply_file_mode(target: &Path, mode: Option<u32>) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let bits = mode.map_or(0, |m| m & 0o777);
    let bits = if bits == 0 { DEFAULT_FILE_MODE } else { bits };
    std::fs::set_permissions(target, std::fs::Permissions::from_mode(bits))?;
    Ok(())
}

#[cfg(not(unix))]
fn apply_file_mode(_target: &Path, _mode: Option<u32>) -> Result<()> {
    Ok(())
}

/// Directories stay owner-writable: later levels and the transform write into
/// them, and the scratch tree must be removable.
#[cfg(unix)]
fn apply_dir_mode(target: &Path, mode: Option<u32>) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    if let Some(bits) = mode.filter(|m| *m != 0) {
        std::fs::set_permissions(target, std::fs::Permissions::from_mode(bits | OWNER_RWX))?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn apply_dir_mode(_target: &Path, _mode: Option<u32>) -> Result<()> {
    Ok(())
}

fn restore_mtime(path: &Path, secs: i64) -> std::io::Result<()> {
    filetime::set_file_mtime(path, filetime::FileTime::from_unix_time(secs, 0))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::TempDir;
    use zip::ZipWriter;
    use zip::write::SimpleFileOptions;

    fn write_zip(path: &Path, members: &[(&str, &[u8])]) {
        let mut zip = ZipWriter::new(File::create(path).unwrap());
        for (name, data) in members {
            if name.ends_with('/') {
                zip.add_directory(*name, SimpleFileOptions::default()).unwrap();
            } else {
                zip.start_file(*name, SimpleFileOptions::default()).unwrap();
                zip.write_all(data).unwrap();
            }
        }
        zip.finish().unwrap();
    }

    #[test]
    fn test_extract_unicode_members() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("in.zip");
        write_zip(
            &archive,
            &[
                ("connect/バイナリ/readme.txt", b"hello"),
                ("署名済み.txt", b"signed"),
            ],
        );

        let out = temp.path().join("out");
        let report = ArchiveReader::new().extract(&archive, &out).unwrap();

        assert_eq!(report.files_extracted, 2);
        assert_eq!(
            report.entries,
            vec!["connect/バイナリ/readme.txt", "署名済み.txt"]
        );
        assert_eq!(
            std::fs::read(out.join("connect/バイナリ/readme.txt")).unwrap(),
            b"hello"
        );
    }

    #[test]
    fn test_extract_explicit_empty_directory() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("in.zip");
        write_zip(&archive, &[("empty/", b""), ("a.txt", b"a")]);

        let out = temp.path().join("out");
        let report = ArchiveReader::new().extract(&archive, &out).unwrap();

        assert_eq!(report.directories_created, 1);
        assert!(out.join("empty").is_dir());
    }

    #[test]
    fn test_extract_rejects_traversal() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("evil.zip");
        write_zip(&archive, &[("../../etc/passwd", b"root")]);

        let out = temp.path().join("nested/out");
        let err = ArchiveReader::new().extract(&archive, &out).unwrap_err();

        assert!(matches!(err, PipelineError::PathTraversal { .. }));
        assert!(!temp.path().join("etc").exists());
    }

    #[test]
    fn test_extract_not_a_zip() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("bogus.zip");
        std::fs::write(&archive, b"this is not a zip archive").unwrap();

        let err = ArchiveReader::new()
            .extract(&archive, &temp.path().join("out"))
            .unwrap_err();
        assert!(matches!(err, PipelineError::ArchiveRead { .. }));
    }

    #[test]
    fn test_decode_member_name_backslash() {
        let name = decode_member_name(Path::new("a.zip"), b"dir\\sub\\file.txt").unwrap();
        assert_eq!(name, "dir/sub/file.txt");
    }

    #[test]
    fn test_decode_member_name_rejects_invalid_utf8() {
        // "テ" in Shift-JIS
        let err = decode_member_name(Path::new("a.zip"), &[0x83, 0x65]).unwrap_err();
        assert!(matches!(err, PipelineError::Decode { ref raw_name, .. } if raw_name == &[0x83, 0x65]));
    }

    #[test]
    fn test_checkpoint_aborts_extraction() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("in.zip");
        write_zip(&archive, &[("a.txt", b"a"), ("b.txt", b"b")]);

        let cancel = || -> Result<()> { Err(PipelineError::Cancelled) };
        let err = ArchiveReader::new()
            .with_checkpoint(&cancel)
            .extract(&archive, &temp.path().join("out"))
            .unwrap_err();
        assert!(matches!(err, PipelineError::Cancelled));
        assert!(!temp.path().join("out/a.txt").exists());
    }

    #[test]
    #[cfg(unix)]
    fn test_extract_applies_default_mode() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("in.zip");
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file("run.sh", SimpleFileOptions::default().unix_permissions(0o755))
            .unwrap();
        zip.write_all(b"#!/bin/sh\n").unwrap();
        std::fs::write(&archive, zip.finish().unwrap().into_inner()).unwrap();

        let out = temp.path().join("out");
        ArchiveReader::new().extract(&archive, &out).unwrap();

        let mode = std::fs::metadata(out.join("run.sh")).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[test]
    #[cfg(unix)]
    fn test_extract_keeps_read_only_directory_writable() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("in.zip");
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        zip.add_directory("pkg/", SimpleFileOptions::default().unix_permissions(0o555))
            .unwrap();
        zip.start_file("pkg/a.txt", SimpleFileOptions::default()).unwrap();
        zip.write_all(b"a").unwrap();
        std::fs::write(&archive, zip.finish().unwrap().into_inner()).unwrap();

        let out = temp.path().join("out");
        ArchiveReader::new().extract(&archive, &out).unwrap();

        let mode = std::fs::metadata(out.join("pkg")).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
        std::fs::write(out.join("pkg/new.txt"), b"n").unwrap();
    }

    #[test]
    fn test_extract_rejects_non_utf8_member_name() {
        let temp = TempDir::new().unwrap();
        let mut data = {
            let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
            zip.start_file("xx.txt", SimpleFileOptions::default()).unwrap();
            zip.write_all(b"data").unwrap();
            zip.finish().unwrap().into_inner()
        };
        // Rewrite the stored name as Shift-JIS "テ.txt" in both headers.
        let sjis = [0x83, 0x65, b'.', b't', b'x', b't'];
        let mut patched = 0;
        for i in 0..=data.len() - sjis.len() {
            if &data[i..i + sjis.len()] == b"xx.txt" {
                data[i..i + sjis.len()].copy_from_slice(&sjis);
                patched += 1;
            }
        }
        assert_eq!(patched, 2);
        let archive = temp.path().join("legacy.zip");
        std::fs::write(&archive, data).unwrap();

        let err = ArchiveReader::new()
            .extract(&archive, &temp.path().join("out"))
            .unwrap_err();

        match err {
            PipelineError::Decode { archive: at, raw_name } => {
                assert_eq!(at, archive);
                assert_eq!(raw_name, sjis);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
