//! Error types for the charkeeper request layer.
//!
//! # Design
//! `TransportError` is the single failure callers of an executor ever see.
//! Whatever went wrong underneath (connection refused, a body that is not
//! JSON, an error page instead of a download) collapses to one fixed,
//! language-invariant message. The underlying `FailureKind` is kept for the
//! error reporter and logs only.
//!
//! `ApiError` covers mistakes made before a request exists, such as a payload
//! that cannot be serialized.

/// The generic user-facing message for every transport or decode failure.
pub const GENERIC_ERROR_MESSAGE: &str =
    "Internal server error, an error report has been sent to the developer!";

/// What actually went wrong behind a `TransportError`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FailureKind {
    /// Network unreachable, DNS failure, connection reset, body read aborted.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The URL could not be turned into an absolute request target.
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// The response body could not be decoded into the expected shape.
    #[error("decoding failed: {0}")]
    Decode(String),

    /// A binary download answered with a non-2xx status.
    #[error("unexpected status {0}")]
    Status(u16),
}

/// Uniform failure returned by the request executors.
///
/// `Display` always yields [`GENERIC_ERROR_MESSAGE`]; match on
/// [`TransportError::kind`] for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", GENERIC_ERROR_MESSAGE)]
pub struct TransportError {
    kind: FailureKind,
}

impl TransportError {
    pub fn new(kind: FailureKind) -> Self {
        Self { kind }
    }

    pub fn connection(detail: impl Into<String>) -> Self {
        Self::new(FailureKind::Connection(detail.into()))
    }

    pub fn invalid_url(detail: impl Into<String>) -> Self {
        Self::new(FailureKind::InvalidUrl(detail.into()))
    }

    pub fn decode(detail: impl Into<String>) -> Self {
        Self::new(FailureKind::Decode(detail.into()))
    }

    pub fn status(status: u16) -> Self {
        Self::new(FailureKind::Status(status))
    }

    pub fn kind(&self) -> &FailureKind {
        &self.kind
    }

    /// The `errors_list` callers render: always exactly one generic entry.
    pub fn errors_list(&self) -> Vec<String> {
        vec![GENERIC_ERROR_MESSAGE.to_string()]
    }
}

/// Errors raised while building a request.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),
}
