//! Where failed requests get reported.

use crate::error::TransportError;
use crate::http::HttpMethod;

/// Receives every failure an executor is about to return.
pub trait ErrorReporter: Send + Sync {
    fn report(&self, method: HttpMethod, url: &str, error: &TransportError);
}

/// Logs failures through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report(&self, method: HttpMethod, url: &str, error: &TransportError) {
        tracing::error!(%method, url, kind = %error.kind(), "api request failed");
    }
}
