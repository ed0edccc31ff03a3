use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::credentials::SecureString;
use crate::config::timestamp;

/// Current on-disk schema version.
pub const CONFIG_VERSION: &str = "1.0.0";

/// Root configuration container, persisted as `~/.cflip/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    pub version: String,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
    /// Model catalog keyed by model id.
    #[serde(default)]
    pub models: BTreeMap<String, ModelConfig>,
    /// Providers keyed by provider name.
    #[serde(default)]
    pub providers: BTreeMap<String, ProviderInfo>,
    #[serde(default)]
    pub active: ActiveSelection,
    #[serde(default)]
    pub settings: GlobalSettings,
    #[serde(default)]
    pub user_preferences: UserPreferences,
}

/// Selection bucket a model is tagged with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelCategory {
    Haiku,
    Sonnet,
    Opus,
    Custom,
}

impl ModelCategory {
    /// Stable key used in `active.model_mapping`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Haiku => "haiku",
            Self::Sonnet => "sonnet",
            Self::Opus => "opus",
            Self::Custom => "custom",
        }
    }

    /// All variants for iteration.
    pub fn all() -> &'static [ModelCategory] {
        &[Self::Haiku, Self::Sonnet, Self::Opus, Self::Custom]
    }

    /// Parse from a mapping key. Unknown keys return `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "haiku" => Some(Self::Haiku),
            "sonnet" => Some(Self::Sonnet),
            "opus" => Some(Self::Opus),
            "custom" => Some(Self::Custom),
            _ => None,
        }
    }
}

impl fmt::Display for ModelCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| {
            format!("unknown model category '{s}' (expected haiku, sonnet, opus or custom)")
        })
    }
}

/// A model entry in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub id: String,
    /// Display name (e.g., "GLM-4.6").
    pub name: String,
    /// Owning provider name.
    pub provider: String,
    pub category: ModelCategory,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub max_tokens: u32,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub context_window: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub capabilities: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub custom_params: BTreeMap<String, String>,
}

/// How a provider authenticates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    /// Token plus base URL written into the settings document.
    ApiKey,
    /// Claude subscription login; the downstream tool uses its own endpoint.
    Subscription,
}

/// Authentication settings for a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderAuth {
    pub method: AuthMethod,
    /// Stored secret. Never shown by `Debug` or `Display`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<SecureString>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub base_url: String,
    /// Header the upstream expects (e.g., "x-api-key", "authorization").
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub auth_header: String,
    /// Request timeout in seconds; 0 means use the default.
    #[serde(default)]
    pub timeout_seconds: u32,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub rate_limit_rpm: u32,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub rate_limit_tpm: u32,
    #[serde(default)]
    pub requires_setup: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub setup_instructions: String,
    #[serde(default, with = "timestamp::option", skip_serializing_if = "Option::is_none")]
    pub last_validated: Option<DateTime<Utc>>,
}

/// Provider configuration for an upstream API endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderInfo {
    /// Unique identifier (e.g., "anthropic", "glm").
    pub name: String,
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub website: String,
    pub auth: ProviderAuth,
    /// Model ids offered by this provider, in preference order.
    #[serde(default)]
    pub models: Vec<String>,
    /// Extra environment entries written for this provider.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env_vars: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl ProviderInfo {
    pub fn is_api_key(&self) -> bool {
        self.auth.method == AuthMethod::ApiKey
    }

    /// The stored secret, if present and non-empty.
    pub fn secret(&self) -> Option<&SecureString> {
        self.auth.api_key.as_ref().filter(|key| !key.is_empty())
    }
}

/// The currently chosen provider and its per-category model assignment.
///
/// An absent `[active]` table loads as the empty selection, which fails
/// validation on `active.provider`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActiveSelection {
    #[serde(default)]
    pub provider: String,
    /// Category key ("haiku", "sonnet", ...) to model id.
    #[serde(default)]
    pub model_mapping: BTreeMap<String, String>,
    /// User overrides applied on top of the provider's environment.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env_vars: BTreeMap<String, String>,
    #[serde(default, with = "timestamp")]
    pub last_switched: DateTime<Utc>,
}

impl ActiveSelection {
    /// Model id mapped for `category`, if any.
    pub fn model_for(&self, category: ModelCategory) -> Option<&str> {
        self.model_mapping.get(category.as_str()).map(String::as_str)
    }
}

/// Global policy knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalSettings {
    #[serde(default = "default_backup_directory")]
    pub backup_directory: PathBuf,
    #[serde(default = "default_max_backups")]
    pub max_backups: usize,
    #[serde(default = "default_true")]
    pub auto_backup: bool,
    /// Kept for compatibility; secrets are stored as given in an owner-only file.
    #[serde(default)]
    pub secure_storage: bool,
    /// Default request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub default_timeout: u32,
    #[serde(default = "default_true")]
    pub auto_validate: bool,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub telemetry: bool,
    #[serde(default, with = "timestamp::option", skip_serializing_if = "Option::is_none")]
    pub last_update_check: Option<DateTime<Utc>>,
}

impl GlobalSettings {
    /// Backup directory, with a relative `backup_directory` resolved against
    /// the directory holding `config_path`.
    pub fn backup_dir_for(&self, config_path: &Path) -> PathBuf {
        if self.backup_directory.is_absolute() {
            return self.backup_directory.clone();
        }
        config_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(&self.backup_directory)
    }
}

/// User-specific preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPreferences {
    #[serde(default)]
    pub default_model_categories: Vec<String>,
    #[serde(default)]
    pub favorite_providers: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_switch_interval_hours: Option<u32>,
    #[serde(default = "default_true")]
    pub prompt_on_switch: bool,
    #[serde(default = "default_true")]
    pub show_model_info: bool,
    #[serde(default = "default_true")]
    pub color_output: bool,
}

fn is_zero(value: &u32) -> bool {
    *value == 0
}

fn default_true() -> bool {
    true
}

fn default_max_backups() -> usize {
    10
}

fn default_timeout() -> u32 {
    300
}

fn default_log_level() -> String {
    "info".to_string()
}

/// `backups`, next to the config file. For the default config location
/// that is `~/.cflip/backups`.
pub fn default_backup_directory() -> PathBuf {
    PathBuf::from("backups")
}

/// `~/.cflip`.
pub fn cflip_home() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".cflip")
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            backup_directory: default_backup_directory(),
            max_backups: default_max_backups(),
            auto_backup: true,
            secure_storage: false,
            default_timeout: default_timeout(),
            auto_validate: true,
            log_level: default_log_level(),
            telemetry: false,
            last_update_check: None,
        }
    }
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            default_model_categories: vec!["sonnet".to_string(), "haiku".to_string()],
            favorite_providers: vec!["anthropic".to_string(), "claude-code".to_string()],
            auto_switch_interval_hours: None,
            prompt_on_switch: true,
            show_model_info: true,
            color_output: true,
        }
    }
}
