//! Response helpers and error mapping.
//!
//! Errors are returned the way InfluxDB returns them: a JSON object with a
//! single `error` field, plus the `X-Influxdb-Version` header.

use axum::{
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::error::ProxyError;

pub const X_INFLUXDB_VERSION: &str = "x-influxdb-version";

/// Version advertised to clients.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Transport-level errors.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("authentication failed")]
    Unauthorized,

    #[error("method not allowed")]
    MethodNotAllowed,

    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Proxy(#[from] ProxyError),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Proxy(ProxyError::DatabaseForbidden(_)) => StatusCode::FORBIDDEN,
            Self::Proxy(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            Self::Proxy(_) => StatusCode::BAD_GATEWAY,
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.to_string() });
        with_version((self.status_code(), Json(body)).into_response())
    }
}

/// Attach `X-Influxdb-Version` to a response.
pub fn with_version(mut response: Response) -> Response {
    response
        .headers_mut()
        .insert(HeaderName::from_static(X_INFLUXDB_VERSION), HeaderValue::from_static(VERSION));
    response
}
