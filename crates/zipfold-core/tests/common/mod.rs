//! Helpers shared by the integration tests.

#![allow(dead_code, clippy::unwrap_used)]

use std::collections::BTreeMap;
use std::io::Cursor;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use zip::ZipArchive;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// Flattens an archive into `name -> content`, expanding nested `.zip`
/// members in place as `outer.zip/inner-name`.
pub fn flatten(data: &[u8]) -> BTreeMap<String, Vec<u8>> {
    let mut out = BTreeMap::new();
    flatten_into(data, "", &mut out);
    out
}

fn flatten_into(data: &[u8], prefix: &str, out: &mut BTreeMap<String, Vec<u8>>) {
    let mut archive = ZipArchive::new(Cursor::new(data)).unwrap();
    for index in 0..archive.len() {
        let mut member = archive.by_index(index).unwrap();
        let name = format!("{prefix}{}", member.name());
        let mut content = Vec::new();
        member.read_to_end(&mut content).unwrap();
        drop(member);
        if name.ends_with(".zip") {
            flatten_into(&content, &format!("{name}/"), out);
        } else {
            out.insert(name, content);
        }
    }
}

/// Returns the member names of one archive level.
pub fn names(data: &[u8]) -> Vec<String> {
    let archive = ZipArchive::new(Cursor::new(data)).unwrap();
    archive.file_names().map(str::to_string).collect()
}

/// Reads one member of an in-memory archive.
pub fn member(data: &[u8], name: &str) -> Vec<u8> {
    let mut archive = ZipArchive::new(Cursor::new(data)).unwrap();
    let mut member = archive.by_name(name).unwrap();
    let mut out = Vec::new();
    member.read_to_end(&mut out).unwrap();
    out
}

/// Builds an in-memory archive from `(name, content)` pairs.
pub fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in entries {
        writer
            .start_file(*name, SimpleFileOptions::default())
            .unwrap();
        writer.write_all(content).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Number of entries left directly under `dir`.
pub fn entry_count(dir: &Path) -> usize {
    std::fs::read_dir(dir).map_or(0, Iterator::count)
}

/// Overwrites every occurrence of `from` with the same-length `to`, which
/// rewrites a stored member name in both its local and central headers.
pub fn patch_bytes(data: &mut [u8], from: &[u8], to: &[u8]) -> usize {
    assert_eq!(from.len(), to.len());
    let mut patched = 0;
    let mut i = 0;
    while i + from.len() <= data.len() {
        if &data[i..i + from.len()] == from {
            data[i..i + from.len()].copy_from_slice(to);
            patched += 1;
            i += from.len();
        } else {
            i += 1;
        }
    }
    patched
}
