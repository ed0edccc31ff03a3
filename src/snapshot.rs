//! Per-provider snapshots of the settings document, written before each
//! switch so a previous state can be restored.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::archive::{
    format_stamp, list_json_files, now_stamp, remove_logged, split_tag_and_stamp, SnapshotInfo,
};
use crate::error::{FlipError, Result};
use crate::persist::copy_atomic;
use crate::settings::SettingsDocument;

const SNAPSHOT_PREFIX: &str = "snapshot-";

/// Snapshots kept per provider tag.
pub const DEFAULT_SNAPSHOTS_PER_TAG: usize = 5;

/// Returns the `snapshots/` directory next to a settings document.
pub fn default_snapshot_dir(settings_path: &Path) -> PathBuf {
    settings_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("snapshots")
}

pub struct SnapshotManager {
    dir: PathBuf,
}

impl SnapshotManager {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Manager for the default directory of `settings_path`.
    pub fn for_settings(settings_path: &Path) -> Self {
        Self::new(default_snapshot_dir(settings_path))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Snapshot `document` under `tag`.
    ///
    /// Returns `None` without writing when the newest snapshot for `tag` is
    /// structurally equal to `document`.
    pub fn create_snapshot(
        &self,
        document: &SettingsDocument,
        tag: &str,
    ) -> Result<Option<SnapshotInfo>> {
        let tag = sanitize_tag(tag)?;

        if let Some(latest) = self.latest_snapshot(&tag)? {
            match SettingsDocument::load(&latest.path) {
                Ok(previous) if previous.structurally_equal(document) => {
                    debug!(tag = %tag, latest = %latest.id, "Settings unchanged, snapshot skipped");
                    return Ok(None);
                }
                Ok(_) => {}
                Err(err) => {
                    warn!(path = %latest.path.display(), error = %err, "Unreadable snapshot, writing a new one");
                }
            }
        }

        let timestamp = now_stamp();
        let id = format!("{SNAPSHOT_PREFIX}{tag}-{}", format_stamp(timestamp));
        let path = self.dir.join(format!("{id}.json"));
        let size = document.save(&path)?;

        info!(id = %id, path = %path.display(), "Snapshot created");
        Ok(Some(SnapshotInfo {
            id,
            timestamp: Some(timestamp),
            provider: tag,
            path,
            size,
        }))
    }

    /// All snapshots, newest first. Files whose timestamp does not parse sort
    /// last.
    pub fn list_snapshots(&self) -> Result<Vec<SnapshotInfo>> {
        let mut snapshots: Vec<SnapshotInfo> = list_json_files(&self.dir, SNAPSHOT_PREFIX)?
            .into_iter()
            .filter_map(|file| {
                let rest = file.stem.strip_prefix(SNAPSHOT_PREFIX)?;
                let (tag, timestamp) = split_tag_and_stamp(rest)?;
                Some(SnapshotInfo {
                    provider: tag.to_string(),
                    timestamp,
                    id: file.stem,
                    path: file.path,
                    size: file.size,
                })
            })
            .collect();
        snapshots.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| a.id.cmp(&b.id)));
        Ok(snapshots)
    }

    /// Newest snapshot for `tag` by parsed timestamp.
    pub fn latest_snapshot(&self, tag: &str) -> Result<Option<SnapshotInfo>> {
        Ok(self
            .list_snapshots()?
            .into_iter()
            .filter(|s| s.provider == tag && s.timestamp.is_some())
            .max_by_key(|s| s.timestamp))
    }

    /// Keep the `keep_per_tag` newest snapshots of each tag and delete the
    /// rest. Snapshots with unparseable timestamps are never deleted.
    /// Returns the number of files removed.
    pub fn cleanup_old_snapshots(&self, keep_per_tag: usize) -> Result<usize> {
        let mut by_tag: BTreeMap<String, Vec<SnapshotInfo>> = BTreeMap::new();
        for snapshot in self.list_snapshots()? {
            if snapshot.timestamp.is_none() {
                debug!(id = %snapshot.id, "Snapshot timestamp unparseable, keeping");
                continue;
            }
            by_tag
                .entry(snapshot.provider.clone())
                .or_default()
                .push(snapshot);
        }

        let mut removed = 0;
        for (tag, mut snapshots) in by_tag {
            snapshots.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
            for stale in snapshots.iter().skip(keep_per_tag) {
                if remove_logged(&stale.path, "snapshot") {
                    debug!(tag = %tag, id = %stale.id, "Removed old snapshot");
                    removed += 1;
                }
            }
        }

        if removed > 0 {
            info!(removed, keep_per_tag, "Old snapshots cleaned up");
        }
        Ok(removed)
    }

    /// Copy snapshot `id` verbatim over `destination`.
    pub fn restore_snapshot(&self, id: &str, destination: &Path) -> Result<u64> {
        let snapshot = self
            .list_snapshots()?
            .into_iter()
            .find(|s| s.id == id)
            .ok_or_else(|| FlipError::not_found("Snapshot", id))?;

        let bytes = copy_atomic(&snapshot.path, destination)?;
        info!(id = %id, destination = %destination.display(), "Snapshot restored");
        Ok(bytes)
    }
}

fn sanitize_tag(tag: &str) -> Result<String> {
    let tag = tag.trim();
    if tag.is_empty() {
        return Err(FlipError::EmptyInput {
            field: "snapshot tag",
        });
    }
    Ok(tag.replace(['/', '\\', ' '], "-"))
}
