//! On-device settings storage.
//!
//! The request layer only ever reads one key from here, the host override.
//! Writes come from whoever manages settings (a preferences screen, a test).

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

/// Key holding the optional remote host override.
pub const HOST_OVERRIDE_KEY: &str = "charkeeper_host";

/// Key/value settings collaborator.
pub trait SettingsStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    /// Store `value` under `key`; `None` removes the entry.
    fn set(&self, key: &str, value: Option<String>);
}

/// In-memory store. Lost on drop.
#[derive(Debug, Default)]
pub struct MemorySettings {
    values: RwLock<BTreeMap<String, String>>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(key: &str, value: &str) -> Self {
        let settings = Self::new();
        settings.set(key, Some(value.to_string()));
        settings
    }
}

impl SettingsStore for MemorySettings {
    fn get(&self, key: &str) -> Option<String> {
        let values = self.values.read().unwrap_or_else(PoisonError::into_inner);
        values.get(key).cloned()
    }

    fn set(&self, key: &str, value: Option<String>) {
        let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
        apply(&mut values, key, value);
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to read settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("settings file {path} is not a flat JSON object: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Settings persisted as a flat JSON object of strings.
///
/// The whole file is loaded on `open` and rewritten on every `set`.
#[derive(Debug)]
pub struct JsonFileSettings {
    path: PathBuf,
    values: RwLock<BTreeMap<String, String>>,
}

impl JsonFileSettings {
    /// Load `path`, or start empty if it does not exist yet.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref().to_path_buf();
        let values = match fs::read_to_string(&path) {
            Ok(data) if data.trim().is_empty() => BTreeMap::new(),
            Ok(data) => serde_json::from_str(&data).map_err(|source| SettingsError::Parse {
                path: path.clone(),
                source,
            })?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(SettingsError::Io { path, source }),
        };
        tracing::debug!(path = %path.display(), entries = values.len(), "settings loaded");
        Ok(Self {
            path,
            values: RwLock::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, values: &BTreeMap<String, String>) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let data = serde_json::to_string_pretty(values)?;
        fs::write(&self.path, data)
    }
}

impl SettingsStore for JsonFileSettings {
    fn get(&self, key: &str) -> Option<String> {
        let values = self.values.read().unwrap_or_else(PoisonError::into_inner);
        values.get(key).cloned()
    }

    fn set(&self, key: &str, value: Option<String>) {
        let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
        apply(&mut values, key, value);
        if let Err(err) = self.persist(&values) {
            tracing::warn!(path = %self.path.display(), key, error = %err, "failed to persist settings");
        }
    }
}

fn apply(values: &mut BTreeMap<String, String>, key: &str, value: Option<String>) {
    match value {
        Some(value) => {
            values.insert(key.to_string(), value);
        }
        None => {
            values.remove(key);
        }
    }
}
