//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Write path, query path, backend flushers and health checks produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → stdout log stream
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Rows are dropped with a log line, never silently
//! - Metrics are cheap (atomic increments); without an installed
//!   recorder every call is a no-op

pub mod logging;
pub mod metrics;
