//! Error types for the proxy core.
//!
//! Query-path errors surface to the caller as [`ProxyError`]. Write-path
//! errors ([`LineError`], [`BackendError`]) are logged per row and never
//! abort a batch.

use thiserror::Error;

/// Result type for query-path operations.
pub type Result<T> = std::result::Result<T, ProxyError>;

/// Errors returned from [`crate::proxy::Proxy::query`].
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("empty query")]
    EmptyQuery,

    #[error("illegal influxql")]
    IllegalQuery,

    #[error("database not found")]
    DatabaseNotFound,

    #[error("database forbidden: {0}")]
    DatabaseForbidden(String),

    #[error("no backend resolved for key '{0}'")]
    NoBackendResolved(String),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl ProxyError {
    /// True for errors caused by the client's request rather than a backend.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, ProxyError::Backend(_))
    }
}

/// A malformed line-protocol row.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LineError {
    #[error("no measurement found")]
    MissingMeasurement,

    #[error("malformed line: {0}")]
    Malformed(&'static str),
}

/// Failures reported by a backend collaborator. Never escalated past the
/// call that produced them.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("forward to {url} failed: {reason}")]
    Forward { url: String, reason: String },

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("{url} responded {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },
}

impl BackendError {
    pub fn forward(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Forward {
            url: url.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forbidden_names_database() {
        let err = ProxyError::DatabaseForbidden("_internal".into());
        assert_eq!(err.to_string(), "database forbidden: _internal");
        assert!(err.is_client_error());
    }

    #[test]
    fn test_backend_error_is_not_client_error() {
        let err: ProxyError = BackendError::forward("http://b1:8086", "buffer full").into();
        assert!(!err.is_client_error());
        assert!(err.to_string().contains("buffer full"));
    }
}
