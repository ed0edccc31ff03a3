//! Shared test utilities.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use cflip::config::GlobalSettings;
use cflip::{ConfigStore, Configuration, ProviderRegistry, SnapshotManager, Switcher};
use serde_json::Value;
use tempfile::TempDir;

/// A temporary home: config, settings file, snapshots and backups all live
/// under one `TempDir`.
pub struct Sandbox {
    pub dir: TempDir,
    pub registry: Arc<ProviderRegistry>,
}

impl Sandbox {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp dir"),
            registry: Arc::new(ProviderRegistry::builtin()),
        }
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.path().join(".cflip").join("config.toml")
    }

    pub fn settings_path(&self) -> PathBuf {
        self.dir.path().join(".claude").join("settings.json")
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.dir.path().join(".cflip").join("backups")
    }

    pub fn snapshot_dir(&self) -> PathBuf {
        self.dir.path().join(".claude").join("snapshots")
    }

    pub fn store(&self) -> ConfigStore {
        ConfigStore::new(self.config_path(), self.registry.clone())
    }

    /// Write the default configuration with the backup directory pointed
    /// into the sandbox.
    pub fn init_config(&self) -> Configuration {
        self.store()
            .update_settings(GlobalSettings {
                backup_directory: self.backup_dir(),
                ..GlobalSettings::default()
            })
            .expect("Failed to write initial config")
    }

    pub fn switcher(&self) -> Switcher {
        Switcher::new(self.store(), self.settings_path())
            .with_snapshots(SnapshotManager::new(self.snapshot_dir()), 5)
    }

    pub fn write_settings(&self, value: &Value) {
        write_json(&self.settings_path(), value);
    }

    pub fn read_settings(&self) -> Value {
        read_json(&self.settings_path())
    }
}

pub fn write_json(path: &Path, value: &Value) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, serde_json::to_string_pretty(value).unwrap()).unwrap();
}

pub fn read_json(path: &Path) -> Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

/// Names of the files directly inside `dir`, sorted.
pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect(),
        Err(_) => Vec::new(),
    };
    names.sort();
    names
}
