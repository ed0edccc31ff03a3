//! Registry of known provider templates.
//!
//! Built once at process start and shared by reference. It supplies the
//! default configuration, providers that can be installed on demand, and
//! the URL patterns used to tell which provider a settings file points at.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::config::{
    ActiveSelection, AuthMethod, Configuration, GlobalSettings, ModelCategory, ModelConfig,
    ProviderAuth, ProviderInfo, UserPreferences, CONFIG_VERSION,
};
use crate::error::{FlipError, Result};

/// Provider tag used when the settings file has no base URL.
pub const DEFAULT_PROVIDER_TAG: &str = "anthropic";
/// Provider tag used when the base URL matches no known provider.
pub const CUSTOM_PROVIDER_TAG: &str = "custom";

/// A provider definition together with the models it ships.
#[derive(Debug, Clone)]
pub struct ProviderTemplate {
    pub provider: ProviderInfo,
    pub models: Vec<ModelConfig>,
    /// Lowercase substrings of a base URL that identify this provider.
    pub url_markers: Vec<&'static str>,
    /// Part of the configuration written on first run.
    pub bundled: bool,
}

impl ProviderTemplate {
    pub fn name(&self) -> &str {
        &self.provider.name
    }
}

/// Ordered set of provider templates. Order determines the default active provider.
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    templates: Vec<ProviderTemplate>,
}

impl ProviderRegistry {
    /// Registry with no templates.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry with the built-in providers: anthropic, claude-code and glm.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        for template in builtin_templates() {
            // Built-in names are distinct, registration cannot fail.
            let _ = registry.register(template);
        }
        registry
    }

    /// Add a template. Names must be non-empty and unique.
    pub fn register(&mut self, template: ProviderTemplate) -> Result<()> {
        if template.name().trim().is_empty() {
            return Err(FlipError::EmptyInput {
                field: "provider name",
            });
        }
        if self.get(template.name()).is_some() {
            return Err(FlipError::validation(
                "registry",
                format!("provider '{}' is already registered", template.name()),
            ));
        }
        self.templates.push(template);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ProviderTemplate> {
        self.templates.iter().find(|t| t.name() == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.templates.iter().map(ProviderTemplate::name).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProviderTemplate> {
        self.templates.iter()
    }

    /// Infer a provider tag from a settings file's base URL.
    ///
    /// Unset or blank → `anthropic`; exact base URL match or URL marker match
    /// → that provider; anything else → `custom`.
    pub fn infer_provider(&self, base_url: Option<&str>) -> String {
        let Some(url) = base_url.map(str::trim).filter(|u| !u.is_empty()) else {
            return DEFAULT_PROVIDER_TAG.to_string();
        };
        let url = url.trim_end_matches('/').to_lowercase();

        let exact = self.templates.iter().find(|t| {
            let base = t.provider.auth.base_url.trim_end_matches('/');
            !base.is_empty() && base.to_lowercase() == url
        });
        if let Some(template) = exact {
            return template.name().to_string();
        }

        self.templates
            .iter()
            .find(|t| t.url_markers.iter().any(|marker| url.contains(marker)))
            .map(|t| t.name().to_string())
            .unwrap_or_else(|| CUSTOM_PROVIDER_TAG.to_string())
    }

    /// Build the first-run configuration from the bundled templates.
    ///
    /// The first bundled provider becomes active, with its category mapping
    /// derived from its model list.
    pub fn default_configuration(&self, now: DateTime<Utc>) -> Configuration {
        let bundled: Vec<&ProviderTemplate> = self.templates.iter().filter(|t| t.bundled).collect();

        let mut providers = BTreeMap::new();
        let mut models = BTreeMap::new();
        for template in &bundled {
            providers.insert(template.name().to_string(), template.provider.clone());
            for model in &template.models {
                models.insert(model.id.clone(), model.clone());
            }
        }

        let active_provider = bundled
            .first()
            .map(|t| t.name().to_string())
            .unwrap_or_default();

        let mut config = Configuration {
            version: CONFIG_VERSION.to_string(),
            created_at: now,
            updated_at: now,
            models,
            providers,
            active: ActiveSelection {
                provider: active_provider.clone(),
                model_mapping: BTreeMap::new(),
                env_vars: BTreeMap::new(),
                last_switched: now,
            },
            settings: GlobalSettings::default(),
            user_preferences: UserPreferences::default(),
        };
        if !active_provider.is_empty() {
            config.active.model_mapping = config.derive_model_mapping(&active_provider);
        }
        config
    }
}

fn model(
    id: &str,
    name: &str,
    provider: &str,
    category: ModelCategory,
    description: &str,
    max_tokens: u32,
    context_window: u32,
    capabilities: &[&str],
) -> ModelConfig {
    ModelConfig {
        id: id.to_string(),
        name: name.to_string(),
        provider: provider.to_string(),
        category,
        description: description.to_string(),
        max_tokens,
        context_window,
        capabilities: capabilities.iter().map(|c| c.to_string()).collect(),
        custom_params: BTreeMap::new(),
    }
}

fn api_key_auth(base_url: &str, auth_header: &str, rpm: u32, tpm: u32) -> ProviderAuth {
    ProviderAuth {
        method: AuthMethod::ApiKey,
        api_key: None,
        base_url: base_url.to_string(),
        auth_header: auth_header.to_string(),
        timeout_seconds: 300,
        rate_limit_rpm: rpm,
        rate_limit_tpm: tpm,
        requires_setup: false,
        setup_instructions: String::new(),
        last_validated: None,
    }
}

fn tags(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn builtin_templates() -> Vec<ProviderTemplate> {
    let anthropic_models = vec![
        model(
            "claude-haiku-4-5",
            "Claude Haiku 4.5",
            "anthropic",
            ModelCategory::Haiku,
            "Fast and efficient model for quick tasks",
            64_000,
            200_000,
            &["text", "code", "analysis"],
        ),
        model(
            "claude-sonnet-4-5",
            "Claude Sonnet 4.5",
            "anthropic",
            ModelCategory::Sonnet,
            "Balanced model for most tasks",
            64_000,
            200_000,
            &["text", "code", "analysis", "reasoning"],
        ),
        model(
            "claude-opus-4-1",
            "Claude Opus 4.1",
            "anthropic",
            ModelCategory::Opus,
            "Most capable model for complex tasks",
            32_000,
            200_000,
            &["text", "code", "analysis", "reasoning", "creative"],
        ),
    ];

    let glm_models = vec![
        model(
            "glm-4.5-air",
            "GLM-4.5 Air",
            "glm",
            ModelCategory::Haiku,
            "Lightweight model for fast responses",
            8_192,
            128_000,
            &["text", "code"],
        ),
        model(
            "glm-4.6",
            "GLM-4.6",
            "glm",
            ModelCategory::Sonnet,
            "Advanced model for complex tasks",
            8_192,
            128_000,
            &["text", "code", "reasoning"],
        ),
    ];

    vec![
        ProviderTemplate {
            provider: ProviderInfo {
                name: "anthropic".to_string(),
                display_name: "Anthropic".to_string(),
                description: "Official Anthropic Claude API".to_string(),
                website: "https://anthropic.com".to_string(),
                auth: api_key_auth("https://api.anthropic.com", "x-api-key", 1000, 100_000),
                models: anthropic_models.iter().map(|m| m.id.clone()).collect(),
                env_vars: BTreeMap::new(),
                tags: tags(&["official", "api", "paid"]),
            },
            models: anthropic_models,
            url_markers: vec!["api.anthropic.com"],
            bundled: true,
        },
        ProviderTemplate {
            provider: ProviderInfo {
                name: "claude-code".to_string(),
                display_name: "Claude Code".to_string(),
                description: "Claude Code CLI with subscription authentication".to_string(),
                website: "https://docs.anthropic.com/claude/docs/claude-code".to_string(),
                auth: ProviderAuth {
                    method: AuthMethod::Subscription,
                    api_key: None,
                    base_url: String::new(),
                    auth_header: String::new(),
                    timeout_seconds: 300,
                    rate_limit_rpm: 0,
                    rate_limit_tpm: 0,
                    requires_setup: true,
                    setup_instructions:
                        "Run 'claude /login' to authenticate with your Claude subscription"
                            .to_string(),
                    last_validated: None,
                },
                models: vec!["claude-code-default".to_string()],
                env_vars: BTreeMap::new(),
                tags: tags(&["official", "subscription", "cli"]),
            },
            models: vec![model(
                "claude-code-default",
                "Claude Code Default",
                "claude-code",
                ModelCategory::Sonnet,
                "Default model from Claude Code subscription",
                0,
                0,
                &["text", "code", "analysis", "reasoning"],
            )],
            url_markers: vec![],
            bundled: true,
        },
        ProviderTemplate {
            provider: ProviderInfo {
                name: "glm".to_string(),
                display_name: "GLM by z.ai".to_string(),
                description: "GLM models compatible with the Claude API".to_string(),
                website: "https://z.ai".to_string(),
                auth: api_key_auth("https://api.z.ai/api/anthropic", "authorization", 500, 50_000),
                models: glm_models.iter().map(|m| m.id.clone()).collect(),
                env_vars: BTreeMap::from([(
                    "API_TIMEOUT_MS".to_string(),
                    "3000000".to_string(),
                )]),
                tags: tags(&["third-party", "api", "paid"]),
            },
            models: glm_models,
            url_markers: vec!["z.ai", "bigmodel"],
            bundled: false,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_order_and_names() {
        let registry = ProviderRegistry::builtin();
        assert_eq!(registry.names(), vec!["anthropic", "claude-code", "glm"]);
    }

    #[test]
    fn register_rejects_duplicates_and_blank_names() {
        let mut registry = ProviderRegistry::builtin();
        let dup = registry.get("glm").unwrap().clone();
        assert!(matches!(
            registry.register(dup),
            Err(FlipError::Validation { .. })
        ));

        let mut blank = registry.get("glm").unwrap().clone();
        blank.provider.name = "  ".to_string();
        assert!(matches!(
            registry.register(blank),
            Err(FlipError::EmptyInput { .. })
        ));
    }

    #[test]
    fn infer_provider_from_base_url() {
        let registry = ProviderRegistry::builtin();
        assert_eq!(registry.infer_provider(None), "anthropic");
        assert_eq!(registry.infer_provider(Some("  ")), "anthropic");
        assert_eq!(
            registry.infer_provider(Some("https://api.anthropic.com/")),
            "anthropic"
        );
        assert_eq!(
            registry.infer_provider(Some("https://api.z.ai/api/anthropic")),
            "glm"
        );
        assert_eq!(
            registry.infer_provider(Some("https://open.BigModel.cn/api/anthropic")),
            "glm"
        );
        assert_eq!(
            registry.infer_provider(Some("https://llm.example.com")),
            "custom"
        );
    }

    #[test]
    fn default_configuration_uses_bundled_templates() {
        let config = ProviderRegistry::builtin().default_configuration(Utc::now());

        assert_eq!(config.active.provider, "anthropic");
        assert!(config.providers.contains_key("claude-code"));
        assert!(!config.providers.contains_key("glm"));
        assert!(!config.models.contains_key("glm-4.6"));
        assert_eq!(config.active.model_mapping.len(), 3);
        assert_eq!(
            config.active.model_for(ModelCategory::Opus),
            Some("claude-opus-4-1")
        );
    }

    #[test]
    fn empty_registry_yields_no_active_provider() {
        let config = ProviderRegistry::empty().default_configuration(Utc::now());
        assert!(config.active.provider.is_empty());
        assert!(config.providers.is_empty());
    }
}
