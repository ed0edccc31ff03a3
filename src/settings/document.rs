//! The Claude Code settings document (`~/.claude/settings.json`).
//!
//! cflip owns a handful of keys inside `env`; everything else in the file
//! belongs to other tools and must survive a rewrite untouched, including
//! its JSON types and key order.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{FlipError, Result};
use crate::persist::write_atomic;

pub const SCHEMA_KEY: &str = "$schema";
pub const ENV_KEY: &str = "env";

/// Returns `~/.claude/settings.json`.
pub fn default_settings_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".claude")
        .join("settings.json")
}

/// A settings document held as an ordered JSON object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsDocument {
    root: Map<String, Value>,
}

impl SettingsDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from `path`. A missing file is an empty document.
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(text) => Self::parse(&text, path),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "Settings file missing, starting empty");
                Ok(Self::new())
            }
            Err(err) => Err(FlipError::Read {
                path: path.to_path_buf(),
                source: err,
            }),
        }
    }

    /// Parse JSON text. The top level must be an object; an empty file is
    /// treated as an empty document.
    pub fn parse(text: &str, path: &Path) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::new());
        }
        let parse_err = |source| FlipError::ParseJson {
            path: path.to_path_buf(),
            source,
        };
        match serde_json::from_str::<Value>(text).map_err(parse_err)? {
            Value::Object(root) => Ok(Self { root }),
            _ => Err(parse_err(serde::de::Error::custom(
                "settings document must be a JSON object",
            ))),
        }
    }

    /// Write pretty JSON to `path` atomically.
    pub fn save(&self, path: &Path) -> Result<u64> {
        let text = self.to_json_string()?;
        write_atomic(path, text.as_bytes())?;
        debug!(path = %path.display(), bytes = text.len(), "Settings written");
        Ok(text.len() as u64)
    }

    pub fn to_json_string(&self) -> Result<String> {
        let mut text = serde_json::to_string_pretty(&self.root).map_err(|e| FlipError::Serialize {
            what: "settings document",
            message: e.to_string(),
        })?;
        text.push('\n');
        Ok(text)
    }

    /// The whole top-level object.
    pub fn root(&self) -> &Map<String, Value> {
        &self.root
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.root.get(key)
    }

    /// Set a top-level field. Replacing keeps the key's position.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.root.insert(key.into(), value);
    }

    /// The `$schema` pointer, if it is a string.
    pub fn schema(&self) -> Option<&str> {
        self.root.get(SCHEMA_KEY).and_then(Value::as_str)
    }

    /// The `env` object, if present and an object.
    pub fn env(&self) -> Option<&Map<String, Value>> {
        self.root.get(ENV_KEY).and_then(Value::as_object)
    }

    /// A string value from `env`.
    pub fn env_str(&self, key: &str) -> Option<&str> {
        self.env().and_then(|env| env.get(key)).and_then(Value::as_str)
    }

    /// Mutable `env`, created empty when absent or not an object.
    pub fn env_mut(&mut self) -> &mut Map<String, Value> {
        object_mut(self.root.entry(ENV_KEY).or_insert(Value::Null))
    }

    /// The base URL the document points the downstream tool at.
    pub fn base_url(&self) -> Option<&str> {
        self.env_str(super::generator::BASE_URL_KEY)
    }

    /// Top-level fields other than `$schema` and `env`.
    pub fn passthrough(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.root
            .iter()
            .filter(|(key, _)| key.as_str() != SCHEMA_KEY && key.as_str() != ENV_KEY)
    }

    /// Compare by content rather than bytes: same `$schema`, same `env`
    /// entries and same passthrough fields, in any key order. An absent
    /// `env` equals an empty one.
    pub fn structurally_equal(&self, other: &SettingsDocument) -> bool {
        if self.root.get(SCHEMA_KEY) != other.root.get(SCHEMA_KEY) {
            return false;
        }
        if !env_equal(self.root.get(ENV_KEY), other.root.get(ENV_KEY)) {
            return false;
        }
        let theirs: Map<String, Value> = other
            .passthrough()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let ours: Map<String, Value> = self
            .passthrough()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        ours == theirs
    }
}

/// The object in `slot`, replacing any other value with an empty object.
fn object_mut(slot: &mut Value) -> &mut Map<String, Value> {
    match slot {
        Value::Object(map) => map,
        other => {
            *other = Value::Object(Map::new());
            object_mut(other)
        }
    }
}

fn env_equal(a: Option<&Value>, b: Option<&Value>) -> bool {
    fn is_empty_env(value: Option<&Value>) -> bool {
        match value {
            None => true,
            Some(Value::Object(map)) => map.is_empty(),
            Some(_) => false,
        }
    }
    if is_empty_env(a) && is_empty_env(b) {
        return true;
    }
    a == b
}
