//! Verbatim backups of the settings document with count and age retention.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{Duration, NaiveDateTime};
use tracing::{debug, info, warn};

use crate::archive::{
    format_stamp, leading_stamp, list_json_files, now_stamp, remove_logged, BackupInfo,
};
use crate::config::GlobalSettings;
use crate::error::{FlipError, Result};
use crate::persist::copy_atomic;
use crate::registry::ProviderRegistry;
use crate::settings::SettingsDocument;

const BACKUP_PREFIX: &str = "backup-";
const UNKNOWN_PROVIDER: &str = "unknown";

/// Outcome of an age-based prune.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneReport {
    pub deleted: Vec<String>,
    /// Backups whose timestamp could not be parsed.
    pub skipped: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackupStats {
    pub count: usize,
    pub total_size: u64,
    pub oldest: Option<NaiveDateTime>,
    pub newest: Option<NaiveDateTime>,
    pub by_provider: BTreeMap<String, usize>,
}

pub struct BackupManager {
    dir: PathBuf,
    settings_path: PathBuf,
    /// 0 disables count retention.
    max_backups: usize,
    registry: Arc<ProviderRegistry>,
}

impl BackupManager {
    pub fn new(
        dir: PathBuf,
        settings_path: PathBuf,
        max_backups: usize,
        registry: Arc<ProviderRegistry>,
    ) -> Self {
        Self {
            dir,
            settings_path,
            max_backups,
            registry,
        }
    }

    /// Manager configured from the global settings block of the config file
    /// at `config_path`.
    pub fn from_settings(
        settings: &GlobalSettings,
        config_path: &Path,
        settings_path: PathBuf,
        registry: Arc<ProviderRegistry>,
    ) -> Self {
        Self::new(
            settings.backup_dir_for(config_path),
            settings_path,
            settings.max_backups,
            registry,
        )
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Copy the settings document into a new backup.
    pub fn create_backup(&self, description: Option<&str>) -> Result<BackupInfo> {
        if !self.settings_path.is_file() {
            return Err(FlipError::not_found(
                "Settings file",
                self.settings_path.display().to_string(),
            ));
        }

        let timestamp = now_stamp();
        let mut id = format!("{BACKUP_PREFIX}{}", format_stamp(timestamp));
        if let Some(suffix) = description.and_then(sanitize_description) {
            id.push('-');
            id.push_str(&suffix);
        }
        let path = self.dir.join(format!("{id}.json"));
        let size = copy_atomic(&self.settings_path, &path)?;
        let provider = self.provider_of(&path);

        info!(id = %id, provider = %provider, size, "Backup created");

        if let Err(err) = self.enforce_retention() {
            warn!(error = %err, "Backup retention failed");
        }

        Ok(BackupInfo {
            id,
            timestamp: Some(timestamp),
            provider,
            path,
            size,
        })
    }

    /// All backups in directory order.
    pub fn list_backups(&self) -> Result<Vec<BackupInfo>> {
        Ok(list_json_files(&self.dir, BACKUP_PREFIX)?
            .into_iter()
            .map(|file| {
                let timestamp = file
                    .stem
                    .strip_prefix(BACKUP_PREFIX)
                    .and_then(leading_stamp);
                BackupInfo {
                    provider: self.provider_of(&file.path),
                    timestamp,
                    id: file.stem,
                    path: file.path,
                    size: file.size,
                }
            })
            .collect())
    }

    pub fn find_backup(&self, id: &str) -> Result<BackupInfo> {
        self.list_backups()?
            .into_iter()
            .find(|b| b.id == id)
            .ok_or_else(|| FlipError::not_found("Backup", id))
    }

    /// Newest backup by parsed timestamp.
    pub fn latest_backup(&self) -> Result<Option<BackupInfo>> {
        Ok(self
            .list_backups()?
            .into_iter()
            .filter(|b| b.timestamp.is_some())
            .max_by_key(|b| b.timestamp))
    }

    /// Copy backup `id` verbatim over the settings document.
    pub fn restore_backup(&self, id: &str) -> Result<BackupInfo> {
        let backup = self.find_backup(id)?;
        copy_atomic(&backup.path, &self.settings_path)?;
        info!(id = %id, settings = %self.settings_path.display(), "Backup restored");
        Ok(backup)
    }

    pub fn delete_backup(&self, id: &str) -> Result<BackupInfo> {
        let backup = self.find_backup(id)?;
        fs::remove_file(&backup.path).map_err(|source| FlipError::Write {
            path: backup.path.clone(),
            source,
        })?;
        info!(id = %id, "Backup deleted");
        Ok(backup)
    }

    /// Delete backups older than `max_age`.
    pub fn prune_backups(&self, max_age: Duration) -> Result<PruneReport> {
        let cutoff = now_stamp()
            .checked_sub_signed(max_age)
            .unwrap_or(NaiveDateTime::MIN);
        self.prune_backups_before(cutoff)
    }

    /// Delete backups stamped strictly before `cutoff`. Backups without a
    /// parseable timestamp are reported as skipped.
    pub fn prune_backups_before(&self, cutoff: NaiveDateTime) -> Result<PruneReport> {
        let mut report = PruneReport::default();
        for backup in self.list_backups()? {
            match backup.timestamp {
                None => {
                    debug!(id = %backup.id, "Backup timestamp unparseable, skipping");
                    report.skipped.push(backup.id);
                }
                Some(ts) if ts < cutoff => {
                    if remove_logged(&backup.path, "backup") {
                        report.deleted.push(backup.id);
                    }
                }
                Some(_) => {}
            }
        }
        report.deleted.sort();
        report.skipped.sort();
        info!(
            deleted = report.deleted.len(),
            skipped = report.skipped.len(),
            cutoff = %cutoff,
            "Backups pruned"
        );
        Ok(report)
    }

    pub fn stats(&self) -> Result<BackupStats> {
        let mut stats = BackupStats::default();
        for backup in self.list_backups()? {
            stats.count += 1;
            stats.total_size += backup.size;
            if let Some(ts) = backup.timestamp {
                stats.oldest = Some(stats.oldest.map_or(ts, |o| o.min(ts)));
                stats.newest = Some(stats.newest.map_or(ts, |n| n.max(ts)));
            }
            *stats.by_provider.entry(backup.provider).or_default() += 1;
        }
        Ok(stats)
    }

    /// Delete the oldest backups beyond `max_backups`.
    fn enforce_retention(&self) -> Result<usize> {
        if self.max_backups == 0 {
            return Ok(0);
        }
        let mut dated: Vec<BackupInfo> = self
            .list_backups()?
            .into_iter()
            .filter(|b| b.timestamp.is_some())
            .collect();
        if dated.len() <= self.max_backups {
            return Ok(0);
        }

        dated.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));
        let excess = dated.len() - self.max_backups;
        let mut removed = 0;
        for backup in dated.into_iter().take(excess) {
            if remove_logged(&backup.path, "backup") {
                debug!(id = %backup.id, "Removed backup over retention limit");
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn provider_of(&self, path: &Path) -> String {
        match SettingsDocument::load(path) {
            Ok(document) => self.registry.infer_provider(document.base_url()),
            Err(err) => {
                debug!(path = %path.display(), error = %err, "Backup content unreadable");
                UNKNOWN_PROVIDER.to_string()
            }
        }
    }
}

fn sanitize_description(description: &str) -> Option<String> {
    let trimmed = description.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.replace(' ', "_").replace(['/', '\\'], "-"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn description_is_sanitized() {
        assert_eq!(
            sanitize_description("before glm/upgrade").as_deref(),
            Some("before_glm-upgrade")
        );
        assert_eq!(sanitize_description("   "), None);
    }
}
