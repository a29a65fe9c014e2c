//! Request layer of the charkeeper client.
//!
//! # Overview
//! Turns a relative `/frontend/...` path plus caller-built options into one
//! HTTP round-trip and normalizes whatever comes back into an `ApiResult`.
//!
//! # Design
//! - `HostMode` (packaged shell or browser tab) is decided once and injected
//!   into `HostResolver`, which also reads the host override from a
//!   `SettingsStore`.
//! - `ApiClient` executes through a `Transport` trait object, so the network
//!   is swappable; `ReqwestTransport` is the real one.
//! - Every transport or decode failure collapses into `TransportError`, whose
//!   message is one fixed English sentence. Decoded JSON, application errors
//!   included, is returned untouched.
//! - Binary downloads land in a `BlobRegistry` and come back as handles.

pub mod blob;
pub mod client;
pub mod config;
pub mod error;
pub mod host;
pub mod http;
pub mod options;
pub mod outcome;
pub mod report;
pub mod settings;
pub mod transport;

pub use blob::{Blob, BlobHandle, BlobRegistry};
pub use client::ApiClient;
pub use config::{ClientConfig, ConfigError};
pub use error::{ApiError, FailureKind, TransportError, GENERIC_ERROR_MESSAGE};
pub use host::{HostMode, HostResolver, CLIENT_VERSION, DEFAULT_HOST};
pub use http::{HttpMethod, HttpRequest, HttpResponse, RequestBody, RequestOptions};
pub use options::{form_options, json_options};
pub use outcome::{ApiResult, ResponseOutcome};
pub use report::{ErrorReporter, TracingReporter};
pub use settings::{JsonFileSettings, MemorySettings, SettingsError, SettingsStore, HOST_OVERRIDE_KEY};
pub use transport::{ReqwestTransport, Transport};
