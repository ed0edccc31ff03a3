use std::path::Path;

use cflip::config::{Configuration, ModelCategory};
use cflip::settings::{
    SettingsDocument, SettingsGenerator, AUTH_TOKEN_KEY, BASE_URL_KEY, HAIKU_MODEL_KEY,
    OPUS_MODEL_KEY, SONNET_MODEL_KEY, TIMEOUT_KEY,
};
use cflip::ProviderRegistry;
use chrono::Utc;
use serde_json::{json, Value};

fn config_with_glm() -> Configuration {
    let registry = ProviderRegistry::builtin();
    let mut config = registry.default_configuration(Utc::now());
    config.install_provider(registry.get("glm").unwrap());
    config
}

fn document(value: Value) -> SettingsDocument {
    SettingsDocument::parse(&value.to_string(), Path::new("settings.json")).unwrap()
}

fn generate(config: &Configuration, previous: Value) -> SettingsDocument {
    SettingsGenerator::new(config.settings.default_timeout).generate(
        document(previous),
        config.active_provider().unwrap(),
        &config.active,
    )
}

#[test]
fn unrelated_fields_survive_regeneration() {
    let mut config = config_with_glm();
    config.set_provider_secret("glm", "glm-secret").unwrap();
    config.set_active_provider("glm").unwrap();

    let out = generate(
        &config,
        json!({
            "$schema": "https://json.schemastore.org/claude-code-settings.json",
            "theme": "dark",
            "permissions": {"allow": ["Bash(ls:*)"], "deny": []},
            "env": {"MY_VAR": "keep", "ANTHROPIC_BASE_URL": "https://old.example"}
        }),
    );

    assert_eq!(out.get("theme"), Some(&json!("dark")));
    assert_eq!(
        out.get("permissions"),
        Some(&json!({"allow": ["Bash(ls:*)"], "deny": []}))
    );
    assert_eq!(
        out.schema(),
        Some("https://json.schemastore.org/claude-code-settings.json")
    );
    assert_eq!(out.env_str("MY_VAR"), Some("keep"));
    assert_eq!(out.env_str(BASE_URL_KEY), Some("https://api.z.ai/api/anthropic"));
    assert_eq!(out.env_str(AUTH_TOKEN_KEY), Some("glm-secret"));
    assert_eq!(out.env_str(HAIKU_MODEL_KEY), Some("glm-4.5-air"));
    assert_eq!(out.env_str(SONNET_MODEL_KEY), Some("glm-4.6"));
    assert_eq!(out.env_str(OPUS_MODEL_KEY), None);
    assert_eq!(out.env_str(TIMEOUT_KEY), Some("3000000"));
}

#[test]
fn top_level_key_order_is_kept() {
    let config = config_with_glm();
    let out = generate(&config, json!({"zeta": 1, "env": {}, "alpha": 2}));

    let keys: Vec<&str> = out.root().keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["zeta", "env", "alpha"]);
}

#[test]
fn subscription_provider_omits_base_url_and_models() {
    let mut config = config_with_glm();
    config.set_active_provider("claude-code").unwrap();

    let out = generate(
        &config,
        json!({"env": {
            "ANTHROPIC_BASE_URL": "https://api.z.ai/api/anthropic",
            "ANTHROPIC_AUTH_TOKEN": "stale",
            "ANTHROPIC_DEFAULT_SONNET_MODEL": "glm-4.6"
        }}),
    );

    assert_eq!(out.env_str(BASE_URL_KEY), None);
    assert_eq!(out.env_str(AUTH_TOKEN_KEY), None);
    assert_eq!(out.env_str(SONNET_MODEL_KEY), None);
    assert!(out.base_url().is_none());
}

#[test]
fn token_is_absent_without_a_secret() {
    let config = config_with_glm();
    assert_eq!(config.active.provider, "anthropic");

    let out = generate(&config, json!({"env": {"ANTHROPIC_AUTH_TOKEN": "old-token"}}));

    assert_eq!(out.env_str(AUTH_TOKEN_KEY), None);
    assert_eq!(out.env_str(BASE_URL_KEY), Some("https://api.anthropic.com"));
    assert_eq!(out.env_str(HAIKU_MODEL_KEY), Some("claude-haiku-4-5"));
    assert_eq!(out.env_str(SONNET_MODEL_KEY), Some("claude-sonnet-4-5"));
    assert_eq!(out.env_str(OPUS_MODEL_KEY), Some("claude-opus-4-1"));
}

#[test]
fn existing_timeout_is_not_overwritten() {
    let config = config_with_glm();

    let out = generate(&config, json!({"env": {"API_TIMEOUT_MS": "1234"}}));
    assert_eq!(out.env_str(TIMEOUT_KEY), Some("1234"));

    let out = generate(&config, json!({}));
    assert_eq!(out.env_str(TIMEOUT_KEY), Some("300000"));
}

#[test]
fn provider_without_timeout_uses_global_default() {
    let mut config = config_with_glm();
    config.providers.get_mut("anthropic").unwrap().auth.timeout_seconds = 0;
    config.settings.default_timeout = 42;

    let out = generate(&config, json!({}));
    assert_eq!(out.env_str(TIMEOUT_KEY), Some("42000"));
}

#[test]
fn active_env_overrides_apply_last() {
    let mut config = config_with_glm();
    config.set_active_provider("glm").unwrap();
    config
        .active
        .env_vars
        .insert(TIMEOUT_KEY.to_string(), "99".to_string());

    let out = generate(&config, json!({}));
    assert_eq!(out.env_str(TIMEOUT_KEY), Some("99"));
}

#[test]
fn unmapped_category_keys_are_cleared() {
    let mut config = config_with_glm();
    config.set_active_provider("glm").unwrap();
    config
        .active
        .model_mapping
        .remove(ModelCategory::Haiku.as_str());

    let out = generate(
        &config,
        json!({"env": {"ANTHROPIC_DEFAULT_HAIKU_MODEL": "claude-haiku-4-5"}}),
    );
    assert_eq!(out.env_str(HAIKU_MODEL_KEY), None);
}
