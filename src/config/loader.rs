//! Reading, writing and validating `config.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::types::{cflip_home, AuthMethod, Configuration, ModelCategory};
use crate::error::{FlipError, Result};

impl Configuration {
    /// Returns the path to the configuration file.
    ///
    /// Uses `~/.cflip/config.toml`. Falls back to the current directory if
    /// the home directory is unavailable.
    pub fn config_path() -> PathBuf {
        cflip_home().join("config.toml")
    }

    /// Reads and parses a configuration file without validating it.
    pub fn read_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| FlipError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&content, path)
    }

    /// Parses TOML content. `path` is used for error context only.
    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| FlipError::ParseToml {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Serializes to pretty TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| FlipError::Serialize {
            what: "configuration",
            message: e.to_string(),
        })
    }

    /// Validates the provider/model graph.
    ///
    /// Checks, stopping at the first violation:
    /// - The active provider exists
    /// - Every provider is well formed and its models exist
    /// - Every model is well formed and its provider exists
    /// - Every active mapping entry names an existing model of that category
    pub fn validate(&self) -> Result<()> {
        if !self.providers.contains_key(&self.active.provider) {
            return Err(FlipError::validation(
                "active.provider",
                format!("active provider '{}' not found", self.active.provider),
            ));
        }

        for (name, provider) in &self.providers {
            let field = format!("providers.{name}");
            if provider.name.trim().is_empty() {
                return Err(FlipError::validation(field, "provider name cannot be empty"));
            }
            if provider.auth.method == AuthMethod::ApiKey {
                if provider.auth.base_url.trim().is_empty() {
                    return Err(FlipError::validation(
                        format!("{field}.auth.base_url"),
                        "base URL is required for API key authentication",
                    ));
                }
                if provider.auth.auth_header.trim().is_empty() {
                    return Err(FlipError::validation(
                        format!("{field}.auth.auth_header"),
                        "auth header is required for API key authentication",
                    ));
                }
            }
            if let Some(missing) = provider.models.iter().find(|id| !self.models.contains_key(*id)) {
                return Err(FlipError::validation(
                    format!("{field}.models"),
                    format!("references non-existent model '{missing}'"),
                ));
            }
        }

        for (id, model) in &self.models {
            let field = format!("models.{id}");
            if model.id.trim().is_empty() {
                return Err(FlipError::validation(field, "model ID cannot be empty"));
            }
            if model.name.trim().is_empty() {
                return Err(FlipError::validation(field, "model name cannot be empty"));
            }
            if model.provider.trim().is_empty() {
                return Err(FlipError::validation(field, "model provider cannot be empty"));
            }
            if !self.providers.contains_key(&model.provider) {
                return Err(FlipError::validation(
                    format!("{field}.provider"),
                    format!("provider '{}' does not exist", model.provider),
                ));
            }
        }

        for (key, model_id) in &self.active.model_mapping {
            let field = format!("active.model_mapping.{key}");
            let Some(category) = ModelCategory::parse(key) else {
                return Err(FlipError::validation(field, format!("unknown category '{key}'")));
            };
            let Some(model) = self.models.get(model_id) else {
                return Err(FlipError::validation(
                    field,
                    format!("model '{model_id}' not found"),
                ));
            };
            if model.category != category {
                return Err(FlipError::validation(
                    field,
                    format!(
                        "model '{model_id}' is in category '{}', not '{category}'",
                        model.category
                    ),
                ));
            }
        }

        Ok(())
    }
}
