//! File-backed configuration store.
//!
//! Owns the path of `config.toml` and the provider registry used to build
//! the first-run default. Every save validates first and then goes through
//! an atomic temp-file-and-rename write.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use crate::config::types::{Configuration, GlobalSettings, ModelCategory, UserPreferences};
use crate::error::Result;
use crate::persist::StagedWrite;
use crate::registry::ProviderRegistry;

/// Loads, validates and persists the configuration file.
#[derive(Clone)]
pub struct ConfigStore {
    path: PathBuf,
    registry: Arc<ProviderRegistry>,
}

impl ConfigStore {
    /// Create a store for the config file at `path`.
    pub fn new(path: PathBuf, registry: Arc<ProviderRegistry>) -> Self {
        Self { path, registry }
    }

    /// Store at the default location, `~/.cflip/config.toml`.
    pub fn at_default_path(registry: Arc<ProviderRegistry>) -> Self {
        Self::new(Configuration::config_path(), registry)
    }

    /// Get the config file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    /// Load the configuration.
    ///
    /// - If the file doesn't exist, builds the registry default and persists it.
    /// - If it exists, parses it. Absent maps come back empty.
    pub fn load(&self) -> Result<Configuration> {
        if !self.path.exists() {
            info!(path = %self.path.display(), "No config file, writing defaults");
            let mut config = self.registry.default_configuration(Utc::now());
            self.save(&mut config)?;
            return Ok(config);
        }

        debug!(path = %self.path.display(), "Loading config");
        Configuration::read_from(&self.path)
    }

    /// Validate the provider/model graph. See [`Configuration::validate`].
    pub fn validate(&self, config: &Configuration) -> Result<()> {
        config.validate()
    }

    /// Validate, bump `updated_at`, and write atomically.
    ///
    /// On a validation failure nothing is written and `config` is unchanged.
    pub fn save(&self, config: &mut Configuration) -> Result<()> {
        let previous = config.updated_at;
        if let Err(err) = self.stage(config)?.commit() {
            config.updated_at = previous;
            return Err(err);
        }
        info!(path = %self.path.display(), "Config saved");
        Ok(())
    }

    /// Validate and serialize `config` into a temp file next to the config
    /// file without replacing it. Call `commit` on the result to finish.
    pub fn stage(&self, config: &mut Configuration) -> Result<StagedWrite> {
        config.validate()?;
        let previous = config.updated_at;
        config.touch();
        let staged = config
            .to_toml()
            .and_then(|text| StagedWrite::stage(&self.path, text.as_bytes()));
        if staged.is_err() {
            config.updated_at = previous;
        }
        staged
    }

    /// Load, switch the active provider, save.
    pub fn switch_active_provider(&self, name: &str) -> Result<Configuration> {
        self.update(|config| config.set_active_provider(name))
    }

    /// Load, map one category to a model, save.
    pub fn switch_active_model(&self, category: ModelCategory, model_id: &str) -> Result<Configuration> {
        self.update(|config| config.set_active_model(category, model_id))
    }

    /// Load, store a provider secret, save.
    pub fn store_secret(&self, provider: &str, secret: &str) -> Result<Configuration> {
        self.update(|config| config.set_provider_secret(provider, secret))
    }

    pub fn update_settings(&self, settings: GlobalSettings) -> Result<Configuration> {
        self.update(|config| {
            config.settings = settings;
            Ok(())
        })
    }

    pub fn update_preferences(&self, preferences: UserPreferences) -> Result<Configuration> {
        self.update(|config| {
            config.user_preferences = preferences;
            Ok(())
        })
    }

    fn update<F>(&self, mutate: F) -> Result<Configuration>
    where
        F: FnOnce(&mut Configuration) -> Result<()>,
    {
        let mut config = self.load()?;
        mutate(&mut config)?;
        self.save(&mut config)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> ConfigStore {
        ConfigStore::new(
            dir.path().join("config.toml"),
            Arc::new(ProviderRegistry::builtin()),
        )
    }

    #[test]
    fn failed_validation_leaves_file_and_timestamp_alone() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let mut config = store.load().unwrap();
        let on_disk = std::fs::read(store.path()).unwrap();

        config.active.provider = "ghost".to_string();
        let stamp = config.updated_at;
        assert!(store.save(&mut config).is_err());

        assert_eq!(config.updated_at, stamp);
        assert_eq!(std::fs::read(store.path()).unwrap(), on_disk);
    }

    #[test]
    fn failed_write_restores_timestamp() {
        let dir = TempDir::new().unwrap();
        let mut config = store_in(&dir).load().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "file").unwrap();
        let store = ConfigStore::new(
            blocker.join("config.toml"),
            Arc::new(ProviderRegistry::builtin()),
        );

        let stamp = config.updated_at;
        assert!(store.save(&mut config).is_err());
        assert_eq!(config.updated_at, stamp);
    }

    #[test]
    fn update_helpers_persist() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store.switch_active_provider("claude-code").unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded.active.provider, "claude-code");
        assert_eq!(
            loaded.active.model_for(ModelCategory::Sonnet),
            Some("claude-code-default")
        );

        let mut settings = loaded.settings.clone();
        settings.max_backups = 2;
        store.update_settings(settings).unwrap();
        assert_eq!(store.load().unwrap().settings.max_backups, 2);
    }
}
