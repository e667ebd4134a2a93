//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_rows_written_total` (counter): rows accepted by at least one backend
//! - `proxy_rows_dropped_total` (counter): dropped rows by `reason`
//! - `proxy_queries_total` (counter): dispatched queries by `kind`
//! - `proxy_query_errors_total` (counter): queries answered with an error
//! - `proxy_backend_flush_total` (counter): batch flushes by `backend`, `outcome`
//! - `proxy_backend_health` (gauge): 1=healthy, 0=unhealthy
//! - `proxy_pinned_keys` (gauge): occupied assignment slots

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape listener on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_row_written() {
    metrics::counter!("proxy_rows_written_total").increment(1);
}

/// `reason` is one of `timestamp`, `measurement`, `format`, `no_backend`, `forward`.
pub fn record_row_dropped(reason: &'static str) {
    metrics::counter!("proxy_rows_dropped_total", "reason" => reason).increment(1);
}

pub fn record_query(kind: &'static str) {
    metrics::counter!("proxy_queries_total", "kind" => kind).increment(1);
}

pub fn record_query_error() {
    metrics::counter!("proxy_query_errors_total").increment(1);
}

pub fn record_flush(backend: &str, outcome: &'static str) {
    metrics::counter!(
        "proxy_backend_flush_total",
        "backend" => backend.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_backend_health(backend: &str, healthy: bool) {
    let value = if healthy { 1.0 } else { 0.0 };
    metrics::gauge!("proxy_backend_health", "backend" => backend.to_string()).set(value);
}

pub fn set_pinned_keys(count: usize) {
    metrics::gauge!("proxy_pinned_keys").set(count as f64);
}
