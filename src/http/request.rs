//! Request handling helpers.
//!
//! # Responsibilities
//! - Generate a unique request ID (UUID v4) for every request
//! - Decode InfluxDB-style parameters from the query string and form body
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - Form bodies are only decoded for `application/x-www-form-urlencoded`

use axum::http::{header, HeaderMap, HeaderValue, Request};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

pub const X_REQUEST_ID: &str = "x-request-id";

/// Issues a fresh UUID v4 for requests that arrive without an ID.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// The request ID set by the request-id layer, or `"unknown"`.
pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// Decode `key=value` pairs from a raw query string.
pub fn query_pairs(raw_query: Option<&str>) -> Vec<(String, String)> {
    raw_query
        .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default()
}

/// Query-string pairs followed by form-body pairs, in that order.
pub fn form_pairs(raw_query: Option<&str>, headers: &HeaderMap, body: &[u8]) -> Vec<(String, String)> {
    let mut pairs = query_pairs(raw_query);
    let is_form = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));
    if is_form {
        pairs.extend(url::form_urlencoded::parse(body).into_owned());
    }
    pairs
}

/// First value for `key`, if present.
pub fn param<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_pairs_decodes() {
        let pairs = query_pairs(Some("db=metrics&q=select%20*%20from%20cpu&precision=s"));
        assert_eq!(param(&pairs, "db"), Some("metrics"));
        assert_eq!(param(&pairs, "q"), Some("select * from cpu"));
        assert_eq!(param(&pairs, "missing"), None);
        assert!(query_pairs(None).is_empty());
    }

    #[test]
    fn test_form_body_only_with_form_content_type() {
        let mut headers = HeaderMap::new();
        let body = b"q=show+databases";
        assert_eq!(param(&form_pairs(Some("db=a"), &headers, body), "q"), None);

        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );
        let pairs = form_pairs(Some("db=a"), &headers, body);
        assert_eq!(param(&pairs, "db"), Some("a"));
        assert_eq!(param(&pairs, "q"), Some("show databases"));
    }

    #[test]
    fn test_request_id_is_uuid() {
        let request = Request::new(());
        let id = MakeRequestUuid.make_request_id(&request).unwrap();
        let text = id.header_value().to_str().unwrap();
        assert!(Uuid::parse_str(text).is_ok());
    }
}
