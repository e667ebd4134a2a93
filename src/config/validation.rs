//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - At least one circle, every circle with at least one backend
//! - Backend URLs parse as http(s), names unique within a circle
//! - Value ranges (sizes and timeouts > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::ProxyConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no circles configured")]
    NoCircles,

    #[error("circle '{0}' has no backends")]
    EmptyCircle(String),

    #[error("duplicate circle name '{0}'")]
    DuplicateCircle(String),

    #[error("duplicate backend '{backend}' in circle '{circle}'")]
    DuplicateBackend { circle: String, backend: String },

    #[error("backend '{backend}' has invalid url '{url}'")]
    InvalidUrl { backend: String, url: String },

    #[error("invalid bind address '{0}'")]
    InvalidBindAddress(String),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Check a parsed configuration, collecting every error.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(config.listener.bind_address.clone()));
    }

    if config.circles.is_empty() {
        errors.push(ValidationError::NoCircles);
    }

    let mut circle_names = HashSet::new();
    for circle in &config.circles {
        if !circle_names.insert(circle.name.as_str()) {
            errors.push(ValidationError::DuplicateCircle(circle.name.clone()));
        }
        if circle.backends.is_empty() {
            errors.push(ValidationError::EmptyCircle(circle.name.clone()));
        }

        let mut backend_names = HashSet::new();
        for backend in &circle.backends {
            if !backend_names.insert(backend.name.as_str()) {
                errors.push(ValidationError::DuplicateBackend {
                    circle: circle.name.clone(),
                    backend: backend.name.clone(),
                });
            }
            let valid = url::Url::parse(&backend.url)
                .map(|u| matches!(u.scheme(), "http" | "https") && u.host().is_some())
                .unwrap_or(false);
            if !valid {
                errors.push(ValidationError::InvalidUrl {
                    backend: backend.name.clone(),
                    url: backend.url.clone(),
                });
            }
        }
    }

    let b = &config.backend;
    for (value, name) in [
        (b.flush_size as u64, "backend.flush_size"),
        (b.flush_time_ms, "backend.flush_time_ms"),
        (b.buffer_capacity as u64, "backend.buffer_capacity"),
        (b.check_timeout_secs, "backend.check_timeout_secs"),
        (b.request_timeout_secs, "backend.request_timeout_secs"),
        (config.http.request_timeout_secs, "http.request_timeout_secs"),
    ] {
        if value == 0 {
            errors.push(ValidationError::Zero(name));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
