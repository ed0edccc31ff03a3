//! Shared pieces of snapshot and backup files: timestamped file names and
//! directory listing.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use tracing::warn;

use crate::error::{FlipError, Result};

/// Timestamp layout embedded in file names, local time.
pub const STAMP_FORMAT: &str = "%Y%m%d-%H%M%S";
const STAMP_LEN: usize = 15;

/// A snapshot or backup file on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// File stem, e.g. `backup-20250101-120000`.
    pub id: String,
    /// Parsed from the file name; `None` when it does not parse.
    pub timestamp: Option<NaiveDateTime>,
    /// Provider tag.
    pub provider: String,
    pub path: PathBuf,
    /// Size in bytes.
    pub size: u64,
}

pub type SnapshotInfo = ArchiveEntry;
pub type BackupInfo = ArchiveEntry;

/// Current local time at second precision, as used in file names.
pub fn now_stamp() -> NaiveDateTime {
    let now = Local::now().naive_local();
    parse_stamp(&format_stamp(now)).unwrap_or(now)
}

pub fn format_stamp(at: NaiveDateTime) -> String {
    at.format(STAMP_FORMAT).to_string()
}

pub fn parse_stamp(text: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, STAMP_FORMAT).ok()
}

/// Split `<tag>-<YYYYMMDD>-<HHMMSS>` into tag and timestamp.
///
/// The timestamp is always the last two dash-separated parts, so tags may
/// contain dashes themselves.
pub fn split_tag_and_stamp(rest: &str) -> Option<(&str, Option<NaiveDateTime>)> {
    let mut parts = rest.rsplitn(3, '-');
    let time = parts.next()?;
    let date = parts.next()?;
    let tag = parts.next()?;
    if tag.is_empty() {
        return None;
    }
    Some((tag, parse_stamp(&format!("{date}-{time}"))))
}

/// Parse the timestamp at the start of `rest` (`<YYYYMMDD-HHMMSS>[-suffix]`).
pub fn leading_stamp(rest: &str) -> Option<NaiveDateTime> {
    let head = rest.get(..STAMP_LEN)?;
    match rest.get(STAMP_LEN..STAMP_LEN + 1) {
        None | Some("-") => parse_stamp(head),
        Some(_) => None,
    }
}

/// A `*.json` file found in an archive directory.
#[derive(Debug, Clone)]
pub struct JsonFile {
    pub stem: String,
    pub path: PathBuf,
    pub size: u64,
}

/// List `<prefix>*.json` files in `dir`. A missing directory lists as empty.
pub fn list_json_files(dir: &Path, prefix: &str) -> Result<Vec<JsonFile>> {
    let read_dir = match fs::read_dir(dir) {
        Ok(read_dir) => read_dir,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => {
            return Err(FlipError::Read {
                path: dir.to_path_buf(),
                source: err,
            })
        }
    };

    let mut files = Vec::new();
    for entry in read_dir {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(dir = %dir.display(), error = %err, "Skipping unreadable directory entry");
                continue;
            }
        };
        let name = entry.file_name().to_string_lossy().to_string();
        let Some(stem) = name.strip_suffix(".json") else {
            continue;
        };
        if !stem.starts_with(prefix) {
            continue;
        }
        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        if !metadata.is_file() {
            continue;
        }
        files.push(JsonFile {
            stem: stem.to_string(),
            path: entry.path(),
            size: metadata.len(),
        });
    }
    Ok(files)
}

/// Delete a file, logging instead of failing.
pub fn remove_logged(path: &Path, what: &str) -> bool {
    match fs::remove_file(path) {
        Ok(()) => true,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "Failed to remove old {what}");
            false
        }
    }
}
