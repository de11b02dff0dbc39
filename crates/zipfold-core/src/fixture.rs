//! Synthetic nested fixture.
//!
//! Builds the three-level archive the default [`NestingSpec`] expects:
//!
//! ```text
//! 20260105_test.zip
//! └── connect/バイナリ/コネクト_v1.0.0.zip
//!     └── コネクト_v1.0.0/コネクト_v1.0.0/
//!         ├── aaa.xcframework.zip
//!         │   └── aaa.xcframework/{Info.plist, ios-arm64/aaa.framework/aaa}
//!         └── bbb.xcframework.zip
//!             └── bbb.xcframework/{Info.plist, ios-arm64/bbb.framework/bbb}
//! ```
//!
//! Every level is Deflate-compressed, holds files only, and uses a fixed
//! timestamp so the bytes are the same on every run.
//!
//! [`NestingSpec`]: crate::NestingSpec

use crate::PipelineError;
use crate::Result;
use crate::creation::atomic::write_atomic;
use std::io::Cursor;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// File name of the generated fixture.
pub const FIXTURE_NAME: &str = "20260105_test.zip";

/// Frameworks packed at the innermost level.
pub const FIXTURE_FRAMEWORKS: [&str; 2] = ["aaa", "bbb"];

const CONNECT_MEMBER: &str = "connect/バイナリ/コネクト_v1.0.0.zip";
const CONNECT_PREFIX: &str = "コネクト_v1.0.0/コネクト_v1.0.0";
const BINARY_SIZE: usize = 1024;

/// Writes the fixture into `output_dir` and returns its path.
///
/// # Errors
///
/// Returns `Io` if `output_dir` cannot be created, or `ArchiveWrite` if an
/// archive cannot be built or written.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
///
/// # fn main() -> zipfold_core::Result<()> {
/// let path = zipfold_core::fixture::create_fixture(Path::new("unsign"))?;
/// assert!(path.ends_with("20260105_test.zip"));
/// # Ok(())
/// # }
/// ```
pub fn create_fixture(output_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)?;
    let path = output_dir.join(FIXTURE_NAME);

    let mut frameworks = Vec::new();
    for name in FIXTURE_FRAMEWORKS {
        let files = [
            (format!("{name}.xcframework/Info.plist"), info_plist(name)),
            (
                format!("{name}.xcframework/ios-arm64/{name}.framework/{name}"),
                vec![0u8; BINARY_SIZE],
            ),
        ];
        let member = format!("{CONNECT_PREFIX}/{name}.xcframework.zip");
        frameworks.push((member.clone(), pack(&path.join(&member), &files)?));
    }

    let connect = pack(&path.join(CONNECT_MEMBER), &frameworks)?;
    let outer = pack(&path, &[(CONNECT_MEMBER.to_string(), connect)])?;

    write_atomic(&path, |file| file.write_all(&outer))
        .map_err(|e| PipelineError::write(&path, e))?;
    log::info!("wrote fixture {}", path.display());
    Ok(path)
}

fn info_plist(name: &str) -> Vec<u8> {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <plist version=\"1.0\">\n\
         <dict>\n    \
         <key>CFBundleIdentifier</key>\n    \
         <string>com.example.{name}</string>\n\
         </dict>\n\
         </plist>\n"
    )
    .into_bytes()
}

/// Packs `(name, content)` pairs into an in-memory archive.
///
/// `archive` only names the archive in errors.
fn pack(archive: &Path, files: &[(String, Vec<u8>)]) -> Result<Vec<u8>> {
    let fail = |e: &dyn std::fmt::Display| PipelineError::write(archive, e);
    let stamp = zip::DateTime::from_date_and_time(2026, 1, 5, 9, 30, 14).map_err(|e| fail(&e))?;
    let options = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .unix_permissions(0o644)
        .last_modified_time(stamp);

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in files {
        writer
            .start_file(name.as_str(), options)
            .map_err(|e| fail(&e))?;
        writer.write_all(content).map_err(|e| fail(&e))?;
    }
    Ok(writer.finish().map_err(|e| fail(&e))?.into_inner())
}
