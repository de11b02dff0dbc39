//! Atomic replacement of output files.

use std::fs::File;
use std::io;
use std::path::Path;

/// Permission bits for newly created outputs.
#[cfg(unix)]
const DEFAULT_OUTPUT_MODE: u32 = 0o644;

/// Writes `target` through a temporary sibling file and renames it into place.
///
/// The temporary file is named `.zipfold-*.partial` and lives in the target's
/// directory, so the final rename never crosses filesystems. If `write` fails
/// the temporary file is removed and `target` is left untouched. When
/// `target` already exists its permission bits are carried over; otherwise
/// the new file gets `0o644`.
///
/// # Errors
///
/// Returns the error from `write`, or any I/O error from creating, syncing or
/// renaming the temporary file.
pub fn write_atomic<E, F>(target: &Path, write: F) -> Result<(), E>
where
    E: From<io::Error>,
    F: FnOnce(&mut File) -> Result<(), E>,
{
    let parent = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = tempfile::Builder::new()
        .prefix(".zipfold-")
        .suffix(".partial")
        .tempfile_in(parent)?;

    write(temp.as_file_mut())?;

    apply_output_mode(temp.as_file(), target)?;
    temp.as_file().sync_all()?;
    temp.persist(target).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(unix)]
fn apply_output_mode(file: &File, target: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mode = match std::fs::metadata(target) {
        Ok(existing) => existing.permissions().mode() & 0o7777,
        Err(_) => DEFAULT_OUTPUT_MODE,
    };
    file.set_permissions(std::fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn apply_output_mode(_file: &File, _target: &Path) -> io::Result<()> {
    Ok(())
}
