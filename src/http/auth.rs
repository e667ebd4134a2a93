//! Client authentication.
//!
//! Credentials come from the `u`/`p` query parameters or HTTP basic auth.
//! With no username and password configured every request passes.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::engine::general_purpose::STANDARD as B64_STANDARD;
use base64::Engine as _;

use crate::config::AuthConfig;
use crate::http::request::{param, query_pairs, request_id};
use crate::http::response::ApiError;
use crate::http::server::AppState;

pub async fn auth_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if check_auth(&state.auth, request.uri().query(), request.headers()) {
        return next.run(request).await;
    }
    tracing::warn!(
        request_id = %request_id(request.headers()),
        path = %request.uri().path(),
        "Authentication failed"
    );
    ApiError::Unauthorized.into_response()
}

pub fn check_auth(auth: &AuthConfig, raw_query: Option<&str>, headers: &HeaderMap) -> bool {
    if !auth.enabled() {
        return true;
    }

    let pairs = query_pairs(raw_query);
    if let (Some(u), Some(p)) = (param(&pairs, "u"), param(&pairs, "p")) {
        if u == auth.username && p == auth.password {
            return true;
        }
    }

    matches!(basic_credentials(headers), Some((u, p)) if u == auth.username && p == auth.password)
}

fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let encoded = value.strip_prefix("Basic ")?;
    let decoded = B64_STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, password) = decoded.split_once(':')?;
    Some((user.to_string(), password.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn auth() -> AuthConfig {
        AuthConfig {
            username: "admin".into(),
            password: "secret".into(),
        }
    }

    #[test]
    fn test_disabled_auth_allows_all() {
        assert!(check_auth(&AuthConfig::default(), None, &HeaderMap::new()));
    }

    #[test]
    fn test_query_credentials() {
        assert!(check_auth(&auth(), Some("u=admin&p=secret&db=x"), &HeaderMap::new()));
        assert!(!check_auth(&auth(), Some("u=admin&p=wrong"), &HeaderMap::new()));
        assert!(!check_auth(&auth(), None, &HeaderMap::new()));
    }

    #[test]
    fn test_basic_credentials() {
        let mut headers = HeaderMap::new();
        let token = B64_STANDARD.encode("admin:secret");
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Basic {}", token)).unwrap(),
        );
        assert!(check_auth(&auth(), None, &headers));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic !!!"));
        assert!(!check_auth(&auth(), None, &headers));
    }
}
