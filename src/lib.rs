//! cflip keeps a provider/model configuration in `~/.cflip/config.toml` and
//! reconciles it into Claude Code's `~/.claude/settings.json`, snapshotting
//! and backing up the settings file along the way.

pub mod archive;
pub mod backup;
pub mod config;
pub mod error;
pub mod logging;
pub mod persist;
pub mod registry;
pub mod settings;
pub mod snapshot;
pub mod switch;

pub use archive::{ArchiveEntry, BackupInfo, SnapshotInfo};
pub use backup::{BackupManager, BackupStats, PruneReport};
pub use config::{ConfigStore, Configuration, ModelCategory};
pub use error::{FlipError, Result};
pub use registry::ProviderRegistry;
pub use settings::{SettingsDocument, SettingsGenerator};
pub use snapshot::SnapshotManager;
pub use switch::{SwitchOutcome, Switcher};
