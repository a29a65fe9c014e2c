//! The network seam.
//!
//! # Design
//! `ApiClient` never talks to the network itself. It hands a fully built
//! `HttpRequest` to a `Transport` and gets an `HttpResponse` back, so tests
//! can script responses and record requests without sockets.
//!
//! `ReqwestTransport` is the real implementation. Like a browser resolving a
//! `fetch` path, it completes relative URLs against its document origin.
//! It adds no retries or timeouts of its own.

use async_trait::async_trait;
use url::Url;

use crate::error::TransportError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, RequestBody};

/// Executes one HTTP round-trip.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// `reqwest`-backed transport.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    origin: Option<Url>,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client, origin: None }
    }

    /// Origin relative URLs are resolved against (the browser document origin).
    pub fn with_origin(mut self, origin: Url) -> Self {
        self.origin = Some(origin);
        self
    }

    pub fn origin(&self) -> Option<&Url> {
        self.origin.as_ref()
    }

    fn target(&self, url: &str) -> Result<Url, TransportError> {
        match Url::parse(url) {
            Ok(absolute) => Ok(absolute),
            Err(url::ParseError::RelativeUrlWithoutBase) => match &self.origin {
                Some(origin) => origin
                    .join(url)
                    .map_err(|e| TransportError::invalid_url(format!("{e} for {url}"))),
                None => Err(TransportError::invalid_url(format!("no origin to resolve {url}"))),
            },
            Err(e) => Err(TransportError::invalid_url(format!("{e} for {url}"))),
        }
    }
}

fn reqwest_method(method: HttpMethod) -> reqwest::Method {
    match method {
        HttpMethod::Get => reqwest::Method::GET,
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Patch => reqwest::Method::PATCH,
        HttpMethod::Delete => reqwest::Method::DELETE,
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = self.target(&request.url)?;
        tracing::debug!(method = %request.method, %url, "sending request");

        let mut builder = self.client.request(reqwest_method(request.method), url);
        for (key, value) in request.headers {
            builder = builder.header(key, value);
        }
        builder = match request.body {
            Some(RequestBody::Text(text)) => builder.body(text),
            Some(RequestBody::Binary(bytes)) => builder.body(bytes),
            None => builder,
        };

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::connection(e.to_string()))?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::connection(e.to_string()))?;

        Ok(HttpResponse { status, headers, body })
    }
}
