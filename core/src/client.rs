//! Request executors for the charkeeper API.
//!
//! # Design
//! `ApiClient` resolves a relative path through its `HostResolver`, pairs it
//! with caller-built `RequestOptions`, and runs the round-trip through an
//! injected `Transport`. Every outcome is normalized:
//!
//! - JSON variant: any response whose body decodes as JSON is returned as-is,
//!   whatever its status. Application error envelopes are the caller's
//!   business.
//! - Blob variant: a 2xx body is parked in the `BlobRegistry` and a handle is
//!   returned.
//! - Anything else becomes a `TransportError`, is reported once, and is
//!   returned. Nothing panics or escapes in another shape.
//!
//! Each call is fire-once: no queuing, retries or deduplication.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::blob::{BlobHandle, BlobRegistry};
use crate::config::{ClientConfig, ConfigError};
use crate::error::TransportError;
use crate::host::HostResolver;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, RequestOptions};
use crate::outcome::ApiResult;
use crate::report::{ErrorReporter, TracingReporter};
use crate::settings::{JsonFileSettings, MemorySettings, SettingsStore};
use crate::transport::{ReqwestTransport, Transport};

/// Async client for the `/frontend` JSON API.
#[derive(Clone)]
pub struct ApiClient {
    resolver: HostResolver,
    transport: Arc<dyn Transport>,
    reporter: Arc<dyn ErrorReporter>,
    blobs: BlobRegistry,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("resolver", &self.resolver)
            .field("blobs", &self.blobs.len())
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    pub fn new(resolver: HostResolver, transport: Arc<dyn Transport>) -> Self {
        Self {
            resolver,
            transport,
            reporter: Arc::new(TracingReporter),
            blobs: BlobRegistry::new(),
        }
    }

    /// Build the resolver, settings store and `ReqwestTransport` described by
    /// `config`.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ConfigError> {
        let settings: Arc<dyn SettingsStore> = match &config.settings_path {
            Some(path) => Arc::new(JsonFileSettings::open(path)?),
            None => Arc::new(MemorySettings::new()),
        };
        let resolver = HostResolver::new(config.host_mode()?, settings)
            .with_default_host(config.default_host.clone())
            .with_version(config.client_version.clone());

        let mut transport = ReqwestTransport::new();
        if let Some(origin) = config.origin()? {
            transport = transport.with_origin(origin);
        }
        Ok(Self::new(resolver, Arc::new(transport)))
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn with_blob_registry(mut self, blobs: BlobRegistry) -> Self {
        self.blobs = blobs;
        self
    }

    pub fn resolver(&self) -> &HostResolver {
        &self.resolver
    }

    /// Registry holding downloaded payloads. Callers revoke handles here.
    pub fn blobs(&self) -> &BlobRegistry {
        &self.blobs
    }

    /// Issue a JSON request and return the decoded body verbatim.
    pub async fn api_request(&self, path: &str, options: RequestOptions) -> ApiResult<Value> {
        self.api_request_as(path, options).await
    }

    /// Like [`ApiClient::api_request`], decoding straight into `T`. A body that
    /// does not fit `T` is a decode failure.
    pub async fn api_request_as<T: DeserializeOwned>(&self, path: &str, options: RequestOptions) -> ApiResult<T> {
        let request = HttpRequest::new(self.resolver.resolve(path), options);
        let (method, url) = (request.method, request.url.clone());

        let result = self.transport.execute(request).await.and_then(|response| decode_json(&response));
        self.finish(method, &url, result)
    }

    /// Download a binary payload and return a handle to it.
    pub async fn api_blob_request(&self, path: &str, options: RequestOptions) -> ApiResult<BlobHandle> {
        let request = HttpRequest::new(self.resolver.resolve_absolute(path), options);
        let (method, url) = (request.method, request.url.clone());

        let result = self.transport.execute(request).await.and_then(|response| {
            if !response.is_success() {
                return Err(TransportError::status(response.status));
            }
            let content_type = response.header("content-type").map(str::to_string);
            Ok(self.blobs.register(response.body, content_type))
        });
        self.finish(method, &url, result)
    }

    fn finish<T>(&self, method: HttpMethod, url: &str, result: ApiResult<T>) -> ApiResult<T> {
        match &result {
            Ok(_) => tracing::debug!(%method, url, "api request completed"),
            Err(err) => self.reporter.report(method, url, err),
        }
        result
    }
}

fn decode_json<T: DeserializeOwned>(response: &HttpResponse) -> ApiResult<T> {
    serde_json::from_slice(&response.body)
        .map_err(|e| TransportError::decode(format!("status {}: {e}", response.status)))
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use bytes::Bytes;
    use serde::Deserialize;
    use serde_json::json;

    use super::*;
    use crate::error::{FailureKind, GENERIC_ERROR_MESSAGE};
    use crate::host::HostMode;
    use crate::options::{form_options, json_options};
    use crate::settings::HOST_OVERRIDE_KEY;

    /// Answers from a script and remembers every request it saw.
    #[derive(Default)]
    struct ScriptedTransport {
        replies: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
        seen: Mutex<Vec<HttpRequest>>,
    }

    impl ScriptedTransport {
        fn replying(reply: Result<HttpResponse, TransportError>) -> Arc<Self> {
            let transport = Self::default();
            transport.replies.lock().unwrap().push_back(reply);
            Arc::new(transport)
        }

        fn seen(&self) -> Vec<HttpRequest> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            self.seen.lock().unwrap().push(request);
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(TransportError::connection("script exhausted")))
        }
    }

    #[derive(Default)]
    struct RecordingReporter {
        reports: Mutex<Vec<(HttpMethod, String, FailureKind)>>,
    }

    impl ErrorReporter for RecordingReporter {
        fn report(&self, method: HttpMethod, url: &str, error: &TransportError) {
            self.reports
                .lock()
                .unwrap()
                .push((method, url.to_string(), error.kind().clone()));
        }
    }

    fn response(status: u16, content_type: &str, body: &'static [u8]) -> HttpResponse {
        HttpResponse {
            status,
            headers: vec![("content-type".to_string(), content_type.to_string())],
            body: Bytes::from_static(body),
        }
    }

    fn browser_client(transport: Arc<ScriptedTransport>) -> ApiClient {
        ApiClient::new(
            HostResolver::new(HostMode::Browser, Arc::new(MemorySettings::new())),
            transport,
        )
    }

    fn get() -> RequestOptions {
        json_options::<Value>(HttpMethod::Get, "token", None).unwrap()
    }

    #[tokio::test]
    async fn browser_get_resolves_relative_and_returns_json() {
        let transport = ScriptedTransport::replying(Ok(response(200, "application/json", br#"{"campaign":{"id":42}}"#)));
        let client = browser_client(transport.clone());

        let data = client.api_request("/frontend/campaigns/42.json", get()).await.unwrap();
        assert_eq!(data, json!({"campaign": {"id": 42}}));

        let seen = transport.seen();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].url, "/frontend/campaigns/42.json?platform=web&version=0.4.7");
        assert_eq!(seen[0].method, HttpMethod::Get);
        assert!(seen[0].body.is_none());
    }

    #[tokio::test]
    async fn network_failure_is_the_generic_error() {
        let transport = ScriptedTransport::replying(Err(TransportError::connection("connection refused")));
        let reporter = Arc::new(RecordingReporter::default());
        let client = browser_client(transport).with_reporter(reporter.clone());

        let err = client.api_request("/frontend/campaigns/42.json", get()).await.unwrap_err();
        assert_eq!(err.errors_list(), vec![GENERIC_ERROR_MESSAGE.to_string()]);
        assert_eq!(err.to_string(), GENERIC_ERROR_MESSAGE);

        let reports = reporter.reports.lock().unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].0, HttpMethod::Get);
        assert_eq!(reports[0].1, "/frontend/campaigns/42.json?platform=web&version=0.4.7");
        assert!(matches!(reports[0].2, FailureKind::Connection(_)));
    }

    #[tokio::test]
    async fn non_json_success_is_indistinguishable_from_outage() {
        let transport = ScriptedTransport::replying(Ok(response(200, "text/html", b"<html>maintenance</html>")));
        let client = browser_client(transport);

        let err = client.api_request("/frontend/campaigns/42.json", get()).await.unwrap_err();
        assert!(matches!(err.kind(), FailureKind::Decode(_)));
        assert_eq!(err.to_string(), GENERIC_ERROR_MESSAGE);
    }

    #[tokio::test]
    async fn application_errors_pass_through_untouched() {
        let transport = ScriptedTransport::replying(Ok(response(
            422,
            "application/json",
            br#"{"errors_list":["Name can't be blank"]}"#,
        )));
        let reporter = Arc::new(RecordingReporter::default());
        let client = browser_client(transport).with_reporter(reporter.clone());

        let payload = json!({"campaign": {"name": ""}});
        let options = json_options(HttpMethod::Post, "token", Some(&payload)).unwrap();
        let data = client.api_request("/frontend/campaigns.json", options).await.unwrap();
        assert_eq!(data, json!({"errors_list": ["Name can't be blank"]}));
        assert!(reporter.reports.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn packaged_request_targets_override_host() {
        let transport = ScriptedTransport::replying(Ok(response(200, "application/json", b"{}")));
        let resolver = HostResolver::new(
            HostMode::Packaged {
                platform: "macos".to_string(),
            },
            Arc::new(MemorySettings::with(HOST_OVERRIDE_KEY, "staging.example.com")),
        );
        let client = ApiClient::new(resolver, transport.clone());

        client.api_request("/frontend/campaigns/42.json", get()).await.unwrap();
        assert_eq!(
            transport.seen()[0].url,
            "https://staging.example.com/frontend/campaigns/42.json?platform=macos&version=0.4.7"
        );
    }

    #[tokio::test]
    async fn typed_request_rejects_mismatched_body() {
        #[derive(Debug, Deserialize)]
        struct Campaign {
            #[allow(dead_code)]
            id: u64,
        }

        let transport = ScriptedTransport::replying(Ok(response(200, "application/json", br#"{"name":"no id"}"#)));
        let client = browser_client(transport);

        let err = client
            .api_request_as::<Campaign>("/frontend/campaigns/42.json", get())
            .await
            .unwrap_err();
        assert!(matches!(err.kind(), FailureKind::Decode(_)));
    }

    #[tokio::test]
    async fn blob_success_registers_payload() {
        let transport = ScriptedTransport::replying(Ok(response(200, "application/pdf", b"%PDF-1.7 sheet")));
        let resolver = HostResolver::new(
            HostMode::Packaged {
                platform: "windows".to_string(),
            },
            Arc::new(MemorySettings::new()),
        );
        let client = ApiClient::new(resolver, transport.clone());

        let handle = client
            .api_blob_request("/frontend/characters/7/export.pdf?format=a4", get())
            .await
            .unwrap();
        assert_eq!(
            transport.seen()[0].url,
            "https://charkeeper.org/frontend/characters/7/export.pdf?format=a4&platform=windows&version=0.4.7"
        );

        let blob = client.blobs().get(&handle).unwrap();
        assert_eq!(blob.bytes, Bytes::from_static(b"%PDF-1.7 sheet"));
        assert_eq!(blob.content_type.as_deref(), Some("application/pdf"));

        assert!(client.blobs().revoke(&handle));
        assert!(client.blobs().is_empty());
    }

    #[tokio::test]
    async fn clients_can_share_one_registry() {
        let shared = BlobRegistry::new();
        let downloader = browser_client(ScriptedTransport::replying(Ok(response(200, "image/png", b"\x89PNG"))))
            .with_blob_registry(shared.clone());
        let viewer = browser_client(Arc::new(ScriptedTransport::default())).with_blob_registry(shared.clone());

        let handle = downloader
            .api_blob_request("/frontend/characters/7/avatar.png?size=64", get())
            .await
            .unwrap();
        assert_eq!(viewer.blobs().get(&handle).unwrap().bytes, Bytes::from_static(b"\x89PNG"));

        assert!(viewer.blobs().revoke(&handle));
        assert!(downloader.blobs().get(&handle).is_none());
        assert!(shared.is_empty());
    }

    #[tokio::test]
    async fn blob_error_status_is_the_generic_error() {
        let transport = ScriptedTransport::replying(Ok(response(500, "text/html", b"oops")));
        let reporter = Arc::new(RecordingReporter::default());
        let client = browser_client(transport).with_reporter(reporter.clone());

        let err = client
            .api_blob_request("/frontend/characters/7/export.pdf?format=a4", get())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), &FailureKind::Status(500));
        assert_eq!(err.to_string(), GENERIC_ERROR_MESSAGE);
        assert!(client.blobs().is_empty());
        assert_eq!(reporter.reports.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn upload_body_reaches_transport_unmodified() {
        let transport = ScriptedTransport::replying(Ok(response(200, "application/json", br#"{"result":"ok"}"#)));
        let client = browser_client(transport.clone());

        let raw: &'static [u8] = b"--b\r\nContent-Disposition: form-data; name=\"avatar\"\r\n\r\n\x89PNG\r\n--b--\r\n";
        let options = form_options(HttpMethod::Post, "token", "multipart/form-data; boundary=b", raw);
        client.api_request("/frontend/characters/7/avatar.json", options).await.unwrap();

        let seen = transport.seen();
        assert_eq!(seen[0].body.as_ref().unwrap().as_bytes(), raw);
        assert_eq!(seen[0].header("authorization"), Some("Bearer token"));
    }
}
