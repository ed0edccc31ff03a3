//! Credential handling for stored provider secrets.
//!
//! Secrets are kept as given in the config file, which is written owner-only.
//! This module makes sure they never end up in logs or debug output.

use serde::{Deserialize, Serialize};

use super::types::{AuthMethod, ProviderInfo};

/// Wrapper for sensitive strings that prevents accidental logging.
///
/// The inner value is never exposed via Debug or Display traits.
/// Use `expose()` to access the actual value when needed.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecureString(String);

impl SecureString {
    /// Create a new secure string.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Expose the inner value.
    ///
    /// Use sparingly, only when writing the settings document.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Masked form showing at most the first four characters.
    pub fn hint(&self) -> String {
        let prefix: String = self.0.chars().take(4).collect();
        if self.0.chars().count() > 8 {
            format!("{prefix}…")
        } else {
            "••••••••".to_string()
        }
    }
}

impl std::fmt::Debug for SecureString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SecureString(••••••••)")
    }
}

impl std::fmt::Display for SecureString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "••••••••")
    }
}

/// Status of credential resolution for a provider.
#[derive(Debug, Clone)]
pub enum CredentialStatus {
    /// API key stored.
    Configured(SecureString),
    /// API key is missing or empty.
    Unconfigured {
        /// Reason for missing configuration.
        reason: String,
    },
    /// Subscription login; no key managed by cflip.
    Subscription,
}

impl ProviderInfo {
    /// Resolve the stored credential for this provider.
    pub fn resolve_credential(&self) -> CredentialStatus {
        match self.auth.method {
            AuthMethod::Subscription => CredentialStatus::Subscription,
            AuthMethod::ApiKey => match self.secret() {
                Some(key) => CredentialStatus::Configured(key.clone()),
                None => CredentialStatus::Unconfigured {
                    reason: "api_key is not set".to_string(),
                },
            },
        }
    }

    /// Check if this provider is usable without further setup.
    pub fn is_configured(&self) -> bool {
        matches!(
            self.resolve_credential(),
            CredentialStatus::Configured(_) | CredentialStatus::Subscription
        )
    }
}
