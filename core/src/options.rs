//! Builders for the `options` half of a request.

use bytes::Bytes;
use serde::Serialize;

use crate::error::ApiError;
use crate::http::{HttpMethod, RequestBody, RequestOptions};

fn bearer(token: &str) -> (String, String) {
    ("Authorization".to_string(), format!("Bearer {token}"))
}

/// JSON request options.
///
/// The payload becomes the body only for non-`GET` methods; a `GET` never
/// carries a body even when one is passed.
pub fn json_options<T: Serialize + ?Sized>(
    method: HttpMethod,
    token: &str,
    payload: Option<&T>,
) -> Result<RequestOptions, ApiError> {
    let body = match payload {
        Some(payload) if method != HttpMethod::Get => {
            let json = serde_json::to_string(payload).map_err(|e| ApiError::Serialization(e.to_string()))?;
            Some(RequestBody::Text(json))
        }
        _ => None,
    };
    Ok(RequestOptions {
        method,
        headers: vec![
            ("Content-Type".to_string(), "application/json".to_string()),
            bearer(token),
        ],
        body,
    })
}

/// Upload options for a body the caller already encoded (multipart form data).
///
/// `content_type` must carry the multipart boundary used to encode `body`.
/// The body is passed through untouched.
pub fn form_options(method: HttpMethod, token: &str, content_type: &str, body: impl Into<Bytes>) -> RequestOptions {
    RequestOptions {
        method,
        headers: vec![bearer(token), ("Content-Type".to_string(), content_type.to_string())],
        body: Some(RequestBody::Binary(body.into())),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn get_never_carries_a_body() {
        let payload = json!({"ignored": true});
        let options = json_options(HttpMethod::Get, "secret", Some(&payload)).unwrap();
        assert_eq!(options.method, HttpMethod::Get);
        assert!(options.body.is_none());
        assert_eq!(options.header("content-type"), Some("application/json"));
        assert_eq!(options.header("authorization"), Some("Bearer secret"));
    }

    #[test]
    fn post_serializes_payload() {
        let payload = json!({"campaign": {"name": "Curse of Strahd"}});
        let options = json_options(HttpMethod::Post, "secret", Some(&payload)).unwrap();
        let body = match options.body {
            Some(RequestBody::Text(text)) => text,
            other => panic!("unexpected body: {other:?}"),
        };
        let decoded: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(decoded, payload);
    }

    #[test]
    fn delete_without_payload_has_no_body() {
        let options = json_options::<serde_json::Value>(HttpMethod::Delete, "secret", None).unwrap();
        assert!(options.body.is_none());
        assert_eq!(options.headers.len(), 2);
    }

    #[test]
    fn unserializable_payload_is_an_error() {
        use std::collections::HashMap;

        // JSON object keys must be strings.
        let mut payload: HashMap<(u8, u8), u8> = HashMap::new();
        payload.insert((1, 2), 3);
        let err = json_options(HttpMethod::Patch, "secret", Some(&payload)).unwrap_err();
        assert!(matches!(err, ApiError::Serialization(_)));
    }

    #[test]
    fn form_body_passes_through() {
        let raw = b"--XyZ\r\nContent-Disposition: form-data; name=\"file\"\r\n\r\n\x00\x01\r\n--XyZ--\r\n".to_vec();
        let options = form_options(HttpMethod::Post, "secret", "multipart/form-data; boundary=XyZ", raw.clone());
        assert_eq!(options.body, Some(RequestBody::Binary(Bytes::from(raw))));
        assert_eq!(options.header("authorization"), Some("Bearer secret"));
        assert_eq!(options.header("content-type"), Some("multipart/form-data; boundary=XyZ"));
    }
}
