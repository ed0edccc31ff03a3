//! The downstream settings document and its generator.

pub mod document;
pub mod generator;

pub use document::{default_settings_path, SettingsDocument, ENV_KEY, SCHEMA_KEY};
pub use generator::{
    model_key, SettingsGenerator, AUTH_TOKEN_KEY, BASE_URL_KEY, DEFAULT_TIMEOUT_SECONDS,
    HAIKU_MODEL_KEY, OPUS_MODEL_KEY, RESERVED_KEYS, SONNET_MODEL_KEY, TIMEOUT_KEY,
};
