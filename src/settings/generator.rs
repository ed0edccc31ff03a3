//! Projects the active provider and model selection into the settings `env`.

use serde_json::Value;
use tracing::debug;

use super::document::SettingsDocument;
use crate::config::{ActiveSelection, AuthMethod, ModelCategory, ProviderInfo};

pub const AUTH_TOKEN_KEY: &str = "ANTHROPIC_AUTH_TOKEN";
pub const BASE_URL_KEY: &str = "ANTHROPIC_BASE_URL";
pub const HAIKU_MODEL_KEY: &str = "ANTHROPIC_DEFAULT_HAIKU_MODEL";
pub const SONNET_MODEL_KEY: &str = "ANTHROPIC_DEFAULT_SONNET_MODEL";
pub const OPUS_MODEL_KEY: &str = "ANTHROPIC_DEFAULT_OPUS_MODEL";
pub const TIMEOUT_KEY: &str = "API_TIMEOUT_MS";

/// Keys cflip owns. They are cleared before every regeneration so nothing
/// from the previous provider survives.
pub const RESERVED_KEYS: [&str; 5] = [
    AUTH_TOKEN_KEY,
    BASE_URL_KEY,
    HAIKU_MODEL_KEY,
    SONNET_MODEL_KEY,
    OPUS_MODEL_KEY,
];

/// Timeout used when neither the provider nor the global settings give one.
pub const DEFAULT_TIMEOUT_SECONDS: u32 = 300;

/// Env key holding the default model for `category`. `Custom` has none.
pub fn model_key(category: ModelCategory) -> Option<&'static str> {
    match category {
        ModelCategory::Haiku => Some(HAIKU_MODEL_KEY),
        ModelCategory::Sonnet => Some(SONNET_MODEL_KEY),
        ModelCategory::Opus => Some(OPUS_MODEL_KEY),
        ModelCategory::Custom => None,
    }
}

/// Rewrites the reserved part of a settings document.
#[derive(Debug, Clone, Copy)]
pub struct SettingsGenerator {
    default_timeout_seconds: u32,
}

impl SettingsGenerator {
    /// `default_timeout_seconds` applies to providers with no timeout of
    /// their own; 0 falls back to [`DEFAULT_TIMEOUT_SECONDS`].
    pub fn new(default_timeout_seconds: u32) -> Self {
        Self {
            default_timeout_seconds,
        }
    }

    /// Produce the new document from the previous one.
    ///
    /// - api-key: token (when stored), base URL, one model key per mapped
    ///   category, then the provider's extra env entries.
    /// - subscription: base URL and model keys are left out so the downstream
    ///   tool uses its own endpoint and model choice.
    ///
    /// Active-selection overrides go last. The timeout key is only added when
    /// absent. Every key outside the reserved set is carried over unchanged.
    pub fn generate(
        &self,
        previous: SettingsDocument,
        provider: &ProviderInfo,
        active: &ActiveSelection,
    ) -> SettingsDocument {
        let mut document = previous;
        let env = document.env_mut();

        for key in RESERVED_KEYS {
            env.remove(key);
        }

        if let Some(secret) = provider.secret() {
            env.insert(
                AUTH_TOKEN_KEY.to_string(),
                Value::String(secret.expose().to_string()),
            );
        }

        if provider.auth.method == AuthMethod::ApiKey {
            env.insert(
                BASE_URL_KEY.to_string(),
                Value::String(provider.auth.base_url.clone()),
            );

            for category in ModelCategory::all() {
                let (Some(key), Some(model)) = (model_key(*category), active.model_for(*category))
                else {
                    continue;
                };
                env.insert(key.to_string(), Value::String(model.to_string()));
            }

            for (key, value) in &provider.env_vars {
                env.insert(key.clone(), Value::String(value.clone()));
            }
        }

        for (key, value) in &active.env_vars {
            env.insert(key.clone(), Value::String(value.clone()));
        }

        if !env.contains_key(TIMEOUT_KEY) {
            let millis = u64::from(self.timeout_seconds(provider)) * 1000;
            env.insert(TIMEOUT_KEY.to_string(), Value::String(millis.to_string()));
        }

        debug!(
            provider = %provider.name,
            method = ?provider.auth.method,
            env_keys = env.len(),
            "Generated settings"
        );
        document
    }

    fn timeout_seconds(&self, provider: &ProviderInfo) -> u32 {
        [provider.auth.timeout_seconds, self.default_timeout_seconds]
            .into_iter()
            .find(|secs| *secs > 0)
            .unwrap_or(DEFAULT_TIMEOUT_SECONDS)
    }
}

impl Default for SettingsGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT_SECONDS)
    }
}
