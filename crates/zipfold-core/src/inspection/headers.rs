//! Raw central directory parsing.
//!
//! The `zip` crate normalizes what it reads: it decodes names and hides the
//! general-purpose flags. Verification needs the stored bytes, so the central
//! directory is walked here directly.

use crate::PipelineError;
use crate::Result;
use std::path::Path;

/// Signature at the start of every local file header (`PK\x03\x04`).
pub const LOCAL_HEADER_SIGNATURE: u32 = 0x0403_4b50;

/// Signature at the start of the end of central directory record
/// (`PK\x05\x06`).
pub const EOCD_SIGNATURE: u32 = 0x0605_4b50;

/// General-purpose flag bit 11: name and comment are UTF-8.
pub const FLAG_UTF8: u16 = 0x0800;

const CENTRAL_HEADER_SIGNATURE: u32 = 0x0201_4b50;
const ZIP64_EOCD_SIGNATURE: u32 = 0x0606_4b50;
const ZIP64_LOCATOR_SIGNATURE: u32 = 0x0706_4b50;
const ZIP64_EXTRA_ID: u16 = 0x0001;

const EOCD_LEN: usize = 22;
const ZIP64_LOCATOR_LEN: usize = 20;
const CENTRAL_HEADER_LEN: usize = 46;
const MAX_COMMENT_LEN: usize = 0xFFFF;

const HOST_UNIX: u16 = 3;
const S_IFMT: u32 = 0o170_000;
const S_IFLNK: u32 = 0o120_000;

/// One central directory record, as stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CentralEntry {
    /// "Version made by"; the high byte is the host system.
    pub version_made_by: u16,
    /// General-purpose bit flags.
    pub flags: u16,
    /// Compression method number.
    pub method: u16,
    /// MS-DOS time field.
    pub dos_time: u16,
    /// MS-DOS date field.
    pub dos_date: u16,
    /// Stored CRC-32 of the uncompressed data.
    pub crc32: u32,
    /// Compressed size, from the ZIP64 extra field when present.
    pub compressed_size: u64,
    /// Uncompressed size, from the ZIP64 extra field when present.
    pub size: u64,
    /// External file attributes.
    pub external_attributes: u32,
    /// Name bytes exactly as stored.
    pub raw_name: Vec<u8>,
}

impl CentralEntry {
    /// Returns `true` if the UTF-8 name flag (bit 11) is set.
    #[must_use]
    pub const fn has_utf8_flag(&self) -> bool {
        self.flags & FLAG_UTF8 != 0
    }

    /// Returns the Unix mode for entries written on a Unix host.
    #[must_use]
    pub const fn unix_mode(&self) -> Option<u32> {
        if self.version_made_by >> 8 != HOST_UNIX {
            return None;
        }
        match self.external_attributes >> 16 {
            0 => None,
            mode => Some(mode),
        }
    }

    /// Returns the name, replacing invalid UTF-8 sequences.
    #[must_use]
    pub fn name_lossy(&self) -> String {
        String::from_utf8_lossy(&self.raw_name).into_owned()
    }

    /// Returns `true` if the name ends with `/`.
    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.raw_name.last() == Some(&b'/')
    }

    /// Returns `true` if the Unix mode marks a symbolic link.
    #[must_use]
    pub const fn is_symlink(&self) -> bool {
        match self.unix_mode() {
            Some(mode) => mode & S_IFMT == S_IFLNK,
            None => false,
        }
    }

    /// Returns the stored timestamp as seconds since the Unix epoch.
    #[must_use]
    pub fn modified(&self) -> Option<i64> {
        zip::DateTime::try_from_msdos(self.dos_date, self.dos_time)
            .ok()
            .and_then(crate::timestamp::zip_to_unix)
    }
}

/// Reads every central directory record of an in-memory archive.
///
/// `archive` only names the archive in errors.
///
/// # Errors
///
/// Returns `ArchiveRead` if the end record cannot be found or a record is
/// truncated or carries the wrong signature.
pub fn read_central_directory(archive: &Path, data: &[u8]) -> Result<Vec<CentralEntry>> {
    let eocd = find_eocd(data)
        .ok_or_else(|| PipelineError::read(archive, "end of central directory not found"))?;
    let truncated = || PipelineError::read(archive, "truncated end of central directory");

    let mut count = u64::from(u16_at(data, eocd + 10).ok_or_else(truncated)?);
    let mut offset = u64::from(u32_at(data, eocd + 16).ok_or_else(truncated)?);

    if count == 0xFFFF || offset == 0xFFFF_FFFF {
        if let Some((zip64_count, zip64_offset)) = read_zip64_eocd(data, eocd) {
            count = zip64_count;
            offset = zip64_offset;
        }
    }

    let mut position = usize::try_from(offset)
        .map_err(|_| PipelineError::read(archive, "central directory offset out of range"))?;
    let mut entries = Vec::new();

    for index in 0..count {
        let entry = read_central_header(data, &mut position).ok_or_else(|| {
            PipelineError::read(
                archive,
                format!("bad central directory record {index} at offset {position}"),
            )
        })?;
        entries.push(entry);
    }

    log::trace!(
        "{}: {} central directory record(s)",
        archive.display(),
        entries.len()
    );
    Ok(entries)
}

/// Returns the offset of the end record, scanning back over the comment.
fn find_eocd(data: &[u8]) -> Option<usize> {
    let last = data.len().checked_sub(EOCD_LEN)?;
    let first = last.saturating_sub(MAX_COMMENT_LEN);
    (first..=last).rev().find(|&at| {
        u32_at(data, at) == Some(EOCD_SIGNATURE)
            && u16_at(data, at + 20)
                .is_some_and(|comment| at + EOCD_LEN + usize::from(comment) <= data.len())
    })
}

fn read_zip64_eocd(data: &[u8], eocd: usize) -> Option<(u64, u64)> {
    let locator = eocd.checked_sub(ZIP64_LOCATOR_LEN)?;
    if u32_at(data, locator)? != ZIP64_LOCATOR_SIGNATURE {
        return None;
    }
    let record = usize::try_from(u64_at(data, locator + 8)?).ok()?;
    if u32_at(data, record)? != ZIP64_EOCD_SIGNATURE {
        return None;
    }
    Some((u64_at(data, record + 32)?, u64_at(data, record + 48)?))
}

fn read_central_header(data: &[u8], position: &mut usize) -> Option<CentralEntry> {
    let at = *position;
    if u32_at(data, at)? != CENTRAL_HEADER_SIGNATURE {
        return None;
    }

    let name_len = usize::from(u16_at(data, at + 28)?);
    let extra_len = usize::from(u16_at(data, at + 30)?);
    let comment_len = usize::from(u16_at(data, at + 32)?);

    let name_start = at + CENTRAL_HEADER_LEN;
    let extra_start = name_start + name_len;
    let raw_name = data.get(name_start..extra_start)?.to_vec();
    let extra = data.get(extra_start..extra_start + extra_len)?;

    let mut size = u64::from(u32_at(data, at + 24)?);
    let mut compressed_size = u64::from(u32_at(data, at + 20)?);
    apply_zip64_sizes(extra, &mut size, &mut compressed_size);

    *position = extra_start + extra_len + comment_len;
    Some(CentralEntry {
        version_made_by: u16_at(data, at + 4)?,
        flags: u16_at(data, at + 8)?,
        method: u16_at(data, at + 10)?,
        dos_time: u16_at(data, at + 12)?,
        dos_date: u16_at(data, at + 14)?,
        crc32: u32_at(data, at + 16)?,
        compressed_size,
        size,
        external_attributes: u32_at(data, at + 38)?,
        raw_name,
    })
}

/// Replaces saturated 32-bit sizes with the values from a ZIP64 extra field.
fn apply_zip64_sizes(mut extra: &[u8], size: &mut u64, compressed_size: &mut u64) {
    while extra.len() >= 4 {
        let (Some(id), Some(len)) = (u16_at(extra, 0), u16_at(extra, 2)) else {
            return;
        };
        let len = usize::from(len);
        let Some(body) = extra.get(4..4 + len) else {
            return;
        };
        if id == ZIP64_EXTRA_ID {
            let mut cursor = 0;
            for field in [size, compressed_size] {
                if *field == 0xFFFF_FFFF {
                    if let Some(value) = u64_at(body, cursor) {
                        *field = value;
                    }
                    cursor += 8;
                }
            }
            return;
        }
        extra = &extra[4 + len..];
    }
}

fn u16_at(data: &[u8], at: usize) -> Option<u16> {
    let bytes = data.get(at..at.checked_add(2)?)?;
    Some(u16::from_le_bytes(bytes.try_into().ok()?))
}

fn u32_at(data: &[u8], at: usize) -> Option<u32> {
    let bytes = data.get(at..at.checked_add(4)?)?;
    Some(u32::from_le_bytes(bytes.try_into().ok()?))
}

fn u64_at(data: &[u8], at: usize) -> Option<u64> {
    let bytes = data.get(at..at.checked_add(8)?)?;
    Some(u64::from_le_bytes(bytes.try_into().ok()?))
}

/// Returns `true` if `data` starts with a local file header signature.
#[must_use]
pub fn starts_with_local_header(data: &[u8]) -> bool {
    u32_at(data, 0) == Some(LOCAL_HEADER_SIGNATURE)
}
