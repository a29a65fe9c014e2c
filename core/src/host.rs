//! Host resolution: where a request goes and which client it claims to be.
//!
//! # Design
//! The packaged-app / browser decision is made once, at startup, and injected
//! as a `HostMode`. Per request the resolver only consults the settings store
//! for a host override, so the same resolver serves every call.
//!
//! Query fragment placement follows the path suffix: a path ending in `.json`
//! is taken to have no query string yet and gets `?`, anything else is taken to
//! already carry one and gets `&`. A `.json` path that already has a query
//! comes out malformed; callers must not build such paths.

use std::sync::Arc;

use crate::settings::{SettingsStore, HOST_OVERRIDE_KEY};

/// Default remote API domain.
pub const DEFAULT_HOST: &str = "charkeeper.org";

/// Client version sent with every request.
pub const CLIENT_VERSION: &str = "0.4.7";

/// Environment variable marking a packaged-app build.
pub const PACKAGED_ENV: &str = "CHARKEEPER_PACKAGED";

/// Execution context of the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostMode {
    /// Native shell with OS bridges; no document origin, talks to an absolute host.
    Packaged { platform: String },
    /// Browser tab; requests stay relative to the document origin.
    Browser,
}

impl HostMode {
    /// Read the environment once. Packaged when `CHARKEEPER_PACKAGED` is set
    /// to anything other than empty or `0`.
    pub fn detect() -> Self {
        Self::from_env_value(std::env::var(PACKAGED_ENV).ok().as_deref())
    }

    /// Mode for a given value of `CHARKEEPER_PACKAGED`.
    pub fn from_env_value(value: Option<&str>) -> Self {
        match value {
            Some(value) if !value.is_empty() && value != "0" => Self::packaged_current(),
            _ => HostMode::Browser,
        }
    }

    /// Packaged mode with the platform of the running OS.
    pub fn packaged_current() -> Self {
        HostMode::Packaged {
            platform: os_platform().to_string(),
        }
    }

    pub fn platform(&self) -> &str {
        match self {
            HostMode::Packaged { platform } => platform,
            HostMode::Browser => "web",
        }
    }

    pub fn is_packaged(&self) -> bool {
        matches!(self, HostMode::Packaged { .. })
    }
}

/// Platform identifier of the current OS (`linux`, `macos`, `windows`,
/// `android`, `ios`, ...), as a packaged shell reports it.
pub fn os_platform() -> &'static str {
    std::env::consts::OS
}

/// Resolves relative API paths into request URLs.
#[derive(Clone)]
pub struct HostResolver {
    mode: HostMode,
    settings: Arc<dyn SettingsStore>,
    default_host: String,
    version: String,
}

impl std::fmt::Debug for HostResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostResolver")
            .field("mode", &self.mode)
            .field("default_host", &self.default_host)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

impl HostResolver {
    pub fn new(mode: HostMode, settings: Arc<dyn SettingsStore>) -> Self {
        Self {
            mode,
            settings,
            default_host: DEFAULT_HOST.to_string(),
            version: CLIENT_VERSION.to_string(),
        }
    }

    pub fn with_default_host(mut self, host: impl Into<String>) -> Self {
        self.default_host = host.into();
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn mode(&self) -> &HostMode {
        &self.mode
    }

    /// The remote host: the cached override if one is set, else the default.
    pub fn host(&self) -> String {
        self.settings
            .get(HOST_OVERRIDE_KEY)
            .filter(|host| !host.trim().is_empty())
            .map(|host| host.trim().to_string())
            .unwrap_or_else(|| self.default_host.clone())
    }

    pub fn query_fragment(&self) -> String {
        format!("platform={}&version={}", self.mode.platform(), self.version)
    }

    /// Target URL for `path`: relative in a browser, `https://<host>` when packaged.
    pub fn resolve(&self, path: &str) -> String {
        let separator = if path.ends_with(".json") { '?' } else { '&' };
        let target = match &self.mode {
            HostMode::Packaged { .. } => format!("https://{}{path}", self.host()),
            HostMode::Browser => path.to_string(),
        };
        let url = format!("{target}{separator}{}", self.query_fragment());
        tracing::debug!(%url, packaged = self.mode.is_packaged(), "resolved request url");
        url
    }

    /// Target URL for binary downloads.
    ///
    /// A packaged shell has no document origin, so the host lookup always
    /// applies; a browser download stays relative like any other request.
    pub fn resolve_absolute(&self, path: &str) -> String {
        self.resolve(path)
    }
}
