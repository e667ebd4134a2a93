//! Circle-sharded InfluxDB proxy library.
//!
//! Writes are split into rows, normalized to nanosecond timestamps and
//! routed by `db,measurement` to one circle (pinned on first sight) and,
//! inside it, to one backend by consistent hash. Queries are classified and
//! sent to the owning backend, merged across circles, or broadcast.

pub mod circle;
pub mod config;
pub mod error;
pub mod http;
pub mod influxql;
pub mod lifecycle;
pub mod line;
pub mod observability;
pub mod proxy;
pub mod routing;

#[cfg(test)]
mod testing;

pub use config::schema::ProxyConfig;
pub use error::{BackendError, LineError, ProxyError};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use proxy::{Proxy, QueryRequest, WriteSummary};
