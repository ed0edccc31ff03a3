//! Atomic file writes.
//!
//! Every write stages its contents in a temp file inside the destination
//! directory and renames it over the target. The rename never crosses a
//! filesystem, so readers observe either the old file or the new one.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{FlipError, Result};

/// Contents written to a temp file next to `target`, not yet renamed.
///
/// Dropping a `StagedWrite` without calling [`commit`](Self::commit)
/// removes the temp file and leaves `target` untouched.
pub struct StagedWrite {
    temp: NamedTempFile,
    target: PathBuf,
}

impl StagedWrite {
    /// Write `contents` into a fresh temp file in `target`'s directory.
    ///
    /// The directory is created if missing. On Unix the temp file is created
    /// with mode 0600 and keeps it after the rename.
    pub fn stage(target: &Path, contents: &[u8]) -> Result<Self> {
        let dir = parent_dir(target);
        fs::create_dir_all(&dir).map_err(|source| FlipError::Write {
            path: dir.clone(),
            source,
        })?;

        let write_err = |source| FlipError::Write {
            path: target.to_path_buf(),
            source,
        };

        let mut temp = NamedTempFile::new_in(&dir).map_err(write_err)?;
        temp.write_all(contents).map_err(write_err)?;
        temp.as_file().sync_all().map_err(write_err)?;

        debug!(target = %target.display(), temp = %temp.path().display(), "Staged write");
        Ok(Self {
            temp,
            target: target.to_path_buf(),
        })
    }

    /// Path of the staged temp file.
    pub fn temp_path(&self) -> &Path {
        self.temp.path()
    }

    /// Rename the temp file over the target.
    pub fn commit(self) -> Result<()> {
        let StagedWrite { temp, target } = self;
        // On failure the returned handle is dropped here, which deletes the temp file.
        temp.persist(&target).map_err(|err| FlipError::Write {
            path: target.clone(),
            source: err.error,
        })?;
        debug!(target = %target.display(), "Committed write");
        Ok(())
    }
}

/// Stage and commit in one step.
pub fn write_atomic(target: &Path, contents: &[u8]) -> Result<()> {
    StagedWrite::stage(target, contents)?.commit()
}

/// Copy `source` byte-for-byte over `target` using an atomic write.
pub fn copy_atomic(source: &Path, target: &Path) -> Result<u64> {
    let bytes = fs::read(source).map_err(|err| FlipError::Read {
        path: source.to_path_buf(),
        source: err,
    })?;
    write_atomic(target, &bytes)?;
    Ok(bytes.len() as u64)
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn dir_entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn write_atomic_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("a").join("b").join("file.json");

        write_atomic(&target, b"{}").unwrap();

        assert_eq!(fs::read_to_string(&target).unwrap(), "{}");
        assert_eq!(dir_entries(target.parent().unwrap()), vec!["file.json"]);
    }

    #[test]
    fn dropped_stage_leaves_original_untouched() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("config.toml");
        fs::write(&target, b"original").unwrap();

        let staged = StagedWrite::stage(&target, b"replacement").unwrap();
        let temp_path = staged.temp_path().to_path_buf();
        assert!(temp_path.exists());
        assert_eq!(temp_path.parent(), target.parent());
        drop(staged);

        assert_eq!(fs::read(&target).unwrap(), b"original");
        assert!(!temp_path.exists());
        assert_eq!(dir_entries(dir.path()), vec!["config.toml"]);
    }

    #[test]
    fn commit_replaces_target() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("config.toml");
        fs::write(&target, b"original").unwrap();

        StagedWrite::stage(&target, b"replacement")
            .unwrap()
            .commit()
            .unwrap();

        assert_eq!(fs::read(&target).unwrap(), b"replacement");
        assert_eq!(dir_entries(dir.path()), vec!["config.toml"]);
    }

    #[cfg(unix)]
    #[test]
    fn written_files_are_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let target = dir.path().join("secret.toml");
        write_atomic(&target, b"key = 1").unwrap();

        let mode = fs::metadata(&target).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }

    #[test]
    fn copy_atomic_is_verbatim() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src.json");
        let dst = dir.path().join("out").join("dst.json");
        fs::write(&src, b"{ \"b\": 1,\n  \"a\": 2 }").unwrap();

        let size = copy_atomic(&src, &dst).unwrap();

        assert_eq!(fs::read(&dst).unwrap(), fs::read(&src).unwrap());
        assert_eq!(size, fs::metadata(&src).unwrap().len());
    }
}
