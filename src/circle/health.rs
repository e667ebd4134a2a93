//! Health records returned by backend health checks.

use serde::Serialize;

/// Write-buffer counters for one backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BackendStats {
    /// Points buffered and not yet flushed.
    pub queued: usize,
    /// Points acknowledged by the backend.
    pub written: usize,
    /// Points lost to a full buffer or a failed flush.
    pub dropped: usize,
}

/// Result of probing one backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackendHealth {
    pub name: String,
    pub url: String,
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<BackendStats>,
}

impl BackendHealth {
    pub fn healthy(name: impl Into<String>, url: impl Into<String>, latency_ms: u64) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            active: true,
            latency_ms: Some(latency_ms),
            error: None,
            stats: None,
        }
    }

    pub fn failed(name: impl Into<String>, url: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            active: false,
            latency_ms: None,
            error: Some(error.into()),
            stats: None,
        }
    }

    pub fn with_stats(mut self, stats: Option<BackendStats>) -> Self {
        self.stats = stats;
        self
    }
}

/// Per-backend records for one circle, in backend order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CircleHealth {
    pub circle: String,
    pub backends: Vec<BackendHealth>,
}

impl CircleHealth {
    pub fn active(&self) -> usize {
        self.backends.iter().filter(|b| b.active).count()
    }
}
