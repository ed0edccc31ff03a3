//! Provider/model graph operations on a loaded configuration.
//!
//! Providers list the models they offer, models name their owning provider,
//! and the active selection points at one provider plus one model per
//! category. Mutations here keep that graph consistent; `validate` checks it.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::credentials::SecureString;
use super::types::{Configuration, ModelCategory, ModelConfig, ProviderInfo};
use crate::error::{FlipError, Result};
use crate::registry::ProviderTemplate;

impl Configuration {
    /// The provider named by `active.provider`.
    pub fn active_provider(&self) -> Result<&ProviderInfo> {
        self.provider(&self.active.provider)
    }

    pub fn provider(&self, name: &str) -> Result<&ProviderInfo> {
        self.providers
            .get(name)
            .ok_or_else(|| FlipError::not_found("Provider", name))
    }

    pub fn model(&self, id: &str) -> Result<&ModelConfig> {
        self.models
            .get(id)
            .ok_or_else(|| FlipError::not_found("Model", id))
    }

    /// The model currently mapped for `category`.
    pub fn active_model(&self, category: ModelCategory) -> Result<&ModelConfig> {
        let id = self
            .active
            .model_for(category)
            .ok_or_else(|| FlipError::not_found("Active model for category", category.as_str()))?;
        self.model(id)
    }

    pub fn models_by_category(&self, category: ModelCategory) -> Vec<&ModelConfig> {
        self.models
            .values()
            .filter(|m| m.category == category)
            .collect()
    }

    pub fn models_by_provider(&self, provider: &str) -> Vec<&ModelConfig> {
        self.models
            .values()
            .filter(|m| m.provider == provider)
            .collect()
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.keys().map(String::as_str).collect()
    }

    /// Category mapping for `provider`: one model per category, taken in the
    /// order the provider lists them. The first model of a category wins.
    pub fn derive_model_mapping(&self, provider: &str) -> BTreeMap<String, String> {
        let mut mapping = BTreeMap::new();
        let Some(info) = self.providers.get(provider) else {
            return mapping;
        };
        for model_id in &info.models {
            if let Some(model) = self.models.get(model_id) {
                mapping
                    .entry(model.category.as_str().to_string())
                    .or_insert_with(|| model_id.clone());
            }
        }
        mapping
    }

    /// Make `name` the active provider.
    ///
    /// The whole category mapping is rebuilt from the provider's model list;
    /// earlier per-category choices are discarded, not merged.
    pub fn set_active_provider(&mut self, name: &str) -> Result<()> {
        self.provider(name)?;

        let mapping = self.derive_model_mapping(name);
        let previous = std::mem::replace(&mut self.active.provider, name.to_string());
        self.active.model_mapping = mapping;
        self.active.last_switched = Utc::now();

        info!(
            from = %previous,
            to = %name,
            categories = self.active.model_mapping.len(),
            "Active provider set"
        );
        Ok(())
    }

    /// Map `category` to `model_id`. Only that one entry changes.
    pub fn set_active_model(&mut self, category: ModelCategory, model_id: &str) -> Result<()> {
        let model = self.model(model_id)?;
        if model.category != category {
            return Err(FlipError::validation(
                format!("active.model_mapping.{category}"),
                format!(
                    "model '{}' is not in category '{}' (it's in '{}')",
                    model_id, category, model.category
                ),
            ));
        }

        self.active
            .model_mapping
            .insert(category.as_str().to_string(), model_id.to_string());
        self.touch();
        info!(%category, model = %model_id, "Active model set");
        Ok(())
    }

    /// Store a secret for an api-key provider.
    pub fn set_provider_secret(&mut self, name: &str, secret: &str) -> Result<()> {
        let secret = secret.trim();
        if secret.is_empty() {
            return Err(FlipError::EmptyInput { field: "API key" });
        }
        let provider = self
            .providers
            .get_mut(name)
            .ok_or_else(|| FlipError::not_found("Provider", name))?;
        provider.auth.api_key = Some(SecureString::new(secret));
        debug!(provider = %name, "Stored provider secret");
        Ok(())
    }

    pub fn clear_provider_secret(&mut self, name: &str) -> Result<()> {
        let provider = self
            .providers
            .get_mut(name)
            .ok_or_else(|| FlipError::not_found("Provider", name))?;
        provider.auth.api_key = None;
        Ok(())
    }

    /// Record a successful external connection test for `name`.
    pub fn mark_validated(&mut self, name: &str, at: DateTime<Utc>) -> Result<()> {
        let provider = self
            .providers
            .get_mut(name)
            .ok_or_else(|| FlipError::not_found("Provider", name))?;
        provider.auth.last_validated = Some(at);
        Ok(())
    }

    /// Add a registry provider and its models. Existing entries are left as
    /// they are. Returns whether the provider was newly added.
    pub fn install_provider(&mut self, template: &ProviderTemplate) -> bool {
        if self.providers.contains_key(template.name()) {
            return false;
        }
        for model in &template.models {
            self.models
                .entry(model.id.clone())
                .or_insert_with(|| model.clone());
        }
        self.providers
            .insert(template.name().to_string(), template.provider.clone());
        info!(provider = %template.name(), "Installed provider from registry");
        true
    }

    /// Bump `updated_at`.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
