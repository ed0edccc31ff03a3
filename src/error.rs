//! Error types shared by the config store, settings writer, snapshots and backups.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading, validating or writing cflip state.
#[derive(Debug, Error)]
pub enum FlipError {
    #[error("Failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    ParseToml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to parse settings file '{path}': {source}")]
    ParseJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize {what}: {message}")]
    Serialize { what: &'static str, message: String },

    #[error("Config validation failed: {field}: {message}")]
    Validation { field: String, message: String },

    #[error("{kind} '{name}' not found")]
    NotFound { kind: &'static str, name: String },

    #[error("{field} cannot be empty")]
    EmptyInput { field: &'static str },
}

impl FlipError {
    pub(crate) fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        FlipError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub(crate) fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        FlipError::NotFound {
            kind,
            name: name.into(),
        }
    }

    /// True for read/write failures on the filesystem.
    pub fn is_io(&self) -> bool {
        matches!(self, FlipError::Read { .. } | FlipError::Write { .. })
    }

    /// True for malformed TOML or JSON input.
    pub fn is_parse(&self) -> bool {
        matches!(self, FlipError::ParseToml { .. } | FlipError::ParseJson { .. })
    }
}

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, FlipError>;
