//! Provider and model switching: update the configuration, then reconcile
//! the settings document with it.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::archive::{BackupInfo, SnapshotInfo};
use crate::backup::BackupManager;
use crate::config::{ConfigStore, Configuration, ModelCategory};
use crate::error::{FlipError, Result};
use crate::settings::{SettingsDocument, SettingsGenerator};
use crate::snapshot::{SnapshotManager, DEFAULT_SNAPSHOTS_PER_TAG};

/// What a switch did besides rewriting the settings.
#[derive(Debug, Clone, Default)]
pub struct SwitchOutcome {
    /// Provider now active.
    pub provider: String,
    /// Provider the settings pointed at before the switch.
    pub previous_provider: String,
    pub snapshot: Option<SnapshotInfo>,
    pub backup: Option<BackupInfo>,
    /// Bytes written to the settings document.
    pub settings_bytes: u64,
    /// Best-effort steps that failed.
    pub warnings: Vec<String>,
}

pub struct Switcher {
    store: ConfigStore,
    settings_path: PathBuf,
    snapshots: SnapshotManager,
    snapshots_per_tag: usize,
}

impl Switcher {
    /// Switcher writing `settings_path`, with snapshots in the default
    /// directory next to it.
    pub fn new(store: ConfigStore, settings_path: PathBuf) -> Self {
        let snapshots = SnapshotManager::for_settings(&settings_path);
        Self {
            store,
            settings_path,
            snapshots,
            snapshots_per_tag: DEFAULT_SNAPSHOTS_PER_TAG,
        }
    }

    pub fn with_snapshots(mut self, snapshots: SnapshotManager, per_tag: usize) -> Self {
        self.snapshots = snapshots;
        self.snapshots_per_tag = per_tag;
        self
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    pub fn settings_path(&self) -> &Path {
        &self.settings_path
    }

    pub fn snapshots(&self) -> &SnapshotManager {
        &self.snapshots
    }

    /// Backup manager for the directory and limit in `config.settings`.
    pub fn backups(&self, config: &Configuration) -> BackupManager {
        BackupManager::from_settings(
            &config.settings,
            self.store.path(),
            self.settings_path.clone(),
            self.store.registry().clone(),
        )
    }

    /// Make `name` the active provider, installing it from the registry when
    /// the configuration does not know it yet. `api_key` is stored first when
    /// given.
    pub fn switch_provider(&self, name: &str, api_key: Option<&str>) -> Result<SwitchOutcome> {
        let name = name.trim();
        if name.is_empty() {
            return Err(FlipError::EmptyInput { field: "provider" });
        }

        let mut config = self.store.load()?;
        if !config.providers.contains_key(name) {
            let template = self
                .store
                .registry()
                .get(name)
                .ok_or_else(|| FlipError::not_found("Provider", name))?;
            config.install_provider(template);
        }
        if let Some(key) = api_key {
            config.set_provider_secret(name, key)?;
        }
        config.set_active_provider(name)?;
        self.apply(&mut config)
    }

    /// Map `category` to `model_id` for the active provider.
    pub fn switch_model(&self, category: ModelCategory, model_id: &str) -> Result<SwitchOutcome> {
        let model_id = model_id.trim();
        if model_id.is_empty() {
            return Err(FlipError::EmptyInput { field: "model id" });
        }

        let mut config = self.store.load()?;
        config.set_active_model(category, model_id)?;
        self.apply(&mut config)
    }

    /// Rewrite the settings document from `config` and persist `config`.
    ///
    /// The configuration is validated and staged before anything is written,
    /// and only committed once the settings are on disk. Backup and snapshot
    /// failures become warnings.
    pub fn apply(&self, config: &mut Configuration) -> Result<SwitchOutcome> {
        let staged = self.store.stage(config)?;
        let provider = config.active_provider()?.clone();

        let current = SettingsDocument::load(&self.settings_path)?;
        let exists = self.settings_path.is_file();
        let previous_provider = self.store.registry().infer_provider(current.base_url());

        let mut outcome = SwitchOutcome {
            provider: provider.name.clone(),
            previous_provider: previous_provider.clone(),
            ..SwitchOutcome::default()
        };

        if exists && config.settings.auto_backup {
            match self.backups(config).create_backup(None) {
                Ok(backup) => outcome.backup = Some(backup),
                Err(err) => {
                    warn!(error = %err, "Backup before switch failed");
                    outcome.warnings.push(format!("backup failed: {err}"));
                }
            }
        }

        if exists {
            match self.snapshots.create_snapshot(&current, &previous_provider) {
                Ok(snapshot) => outcome.snapshot = snapshot,
                Err(err) => {
                    warn!(error = %err, "Snapshot before switch failed");
                    outcome.warnings.push(format!("snapshot failed: {err}"));
                }
            }
            if let Err(err) = self.snapshots.cleanup_old_snapshots(self.snapshots_per_tag) {
                warn!(error = %err, "Snapshot cleanup failed");
                outcome.warnings.push(format!("snapshot cleanup failed: {err}"));
            }
        }

        let generated = SettingsGenerator::new(config.settings.default_timeout).generate(
            current,
            &provider,
            &config.active,
        );
        // Dropping `staged` on this error leaves config.toml as it was.
        outcome.settings_bytes = generated.save(&self.settings_path)?;
        staged.commit()?;

        info!(
            from = %outcome.previous_provider,
            to = %outcome.provider,
            warnings = outcome.warnings.len(),
            "Switch applied"
        );
        Ok(outcome)
    }
}
