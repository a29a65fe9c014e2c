//! Client configuration.
//!
//! # Design
//! `ClientConfig` is read once at startup, from TOML, and every field has a
//! default so an empty file is valid. The host mode is either stated (`mode`)
//! or detected from the environment; after this point it is never re-read.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::host::{os_platform, HostMode, CLIENT_VERSION, DEFAULT_HOST};
use crate::settings::SettingsError;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("unknown mode {0:?}, expected \"browser\" or \"packaged\"")]
    InvalidMode(String),

    #[error("invalid document origin {origin:?}: {source}")]
    InvalidOrigin {
        origin: String,
        #[source]
        source: url::ParseError,
    },

    #[error(transparent)]
    Settings(#[from] SettingsError),
}

/// Client configuration, usually loaded from `charkeeper.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// `"browser"` or `"packaged"`. Unset means detect from the environment.
    pub mode: Option<String>,
    /// Platform reported when packaged. Defaults to the running OS.
    pub platform: Option<String>,
    /// Origin relative (browser) URLs are resolved against.
    pub document_origin: Option<String>,
    /// Host used when no override is stored in settings.
    pub default_host: String,
    /// Value of the `version` query parameter.
    pub client_version: String,
    /// Settings file holding the host override. In-memory when unset.
    pub settings_path: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            mode: None,
            platform: None,
            document_origin: None,
            default_host: DEFAULT_HOST.to_string(),
            client_version: CLIENT_VERSION.to_string(),
            settings_path: None,
        }
    }
}

impl ClientConfig {
    pub fn from_toml_str(data: &str) -> Result<Self, ConfigError> {
        let config: ClientConfig = toml::from_str(data)?;
        config.host_mode()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let data = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&data)?;
        tracing::debug!(path = %path.display(), "loaded client config");
        Ok(config)
    }

    pub fn host_mode(&self) -> Result<HostMode, ConfigError> {
        self.host_mode_or(HostMode::detect)
    }

    /// `detect` runs only when `mode` is unset.
    fn host_mode_or(&self, detect: impl FnOnce() -> HostMode) -> Result<HostMode, ConfigError> {
        match self.mode.as_deref() {
            None => Ok(match detect() {
                HostMode::Packaged { .. } => self.packaged(),
                HostMode::Browser => HostMode::Browser,
            }),
            Some("browser") => Ok(HostMode::Browser),
            Some("packaged") => Ok(self.packaged()),
            Some(other) => Err(ConfigError::InvalidMode(other.to_string())),
        }
    }

    pub fn origin(&self) -> Result<Option<Url>, ConfigError> {
        self.document_origin
            .as_deref()
            .map(|origin| {
                Url::parse(origin).map_err(|source| ConfigError::InvalidOrigin {
                    origin: origin.to_string(),
                    source,
                })
            })
            .transpose()
    }

    fn packaged(&self) -> HostMode {
        HostMode::Packaged {
            platform: self.platform.clone().unwrap_or_else(|| os_platform().to_string()),
        }
    }
}
