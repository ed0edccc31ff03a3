//! Configuration model, validation and persistence.

pub mod credentials;
pub mod graph;
pub mod loader;
pub mod store;
pub mod timestamp;
pub mod types;

pub use credentials::{CredentialStatus, SecureString};
pub use store::ConfigStore;
pub use types::{
    cflip_home, default_backup_directory, ActiveSelection, AuthMethod, Configuration,
    GlobalSettings, ModelCategory, ModelConfig, ProviderAuth, ProviderInfo, UserPreferences,
    CONFIG_VERSION,
};
