//! Write path: batch splitting and per-row routing.

use crate::line::{self, LinePoint, Precision};
use crate::observability::metrics;
use crate::proxy::coordinator::Proxy;
use crate::routing::RoutingKey;

/// Row counts for one `write` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteSummary {
    /// Rows handed to at least one backend.
    pub accepted: usize,
    /// Rows dropped after logging.
    pub dropped: usize,
}

impl Proxy {
    /// Route every newline-terminated row of `payload` independently.
    ///
    /// A missing trailing newline ends the final row. Malformed or
    /// unroutable rows are logged and dropped; they never fail the batch.
    pub fn write(&self, payload: &[u8], db: &str, precision: Precision) -> WriteSummary {
        let mut summary = WriteSummary::default();
        for row in payload.split_inclusive(|b| *b == b'\n') {
            if row.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            if self.write_row(row, db, precision) {
                summary.accepted += 1;
            } else {
                summary.dropped += 1;
            }
        }
        summary
    }

    /// Normalize, validate and forward one row. Returns whether any backend
    /// accepted it.
    pub fn write_row(&self, row: &[u8], db: &str, precision: Precision) -> bool {
        let nano_line = match line::append_nano(row, precision) {
            Ok(l) => l,
            Err(e) => {
                tracing::warn!(db = %db, precision = %precision, error = %e, row = %String::from_utf8_lossy(row), "Invalid timestamp, drop data");
                metrics::record_row_dropped("timestamp");
                return false;
            }
        };

        let (measurement, offset) = match line::scan_measurement(&nano_line) {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!(db = %db, error = %e, row = %String::from_utf8_lossy(row), "Scan measurement error");
                metrics::record_row_dropped("measurement");
                return false;
            }
        };

        if let Err(e) = line::rapid_check(&nano_line[offset..]) {
            tracing::warn!(db = %db, precision = %precision, error = %e, row = %String::from_utf8_lossy(row), "Invalid format, drop data");
            metrics::record_row_dropped("format");
            return false;
        }

        let key = RoutingKey::new(db, &measurement);
        let backends = self.get_backends(&key);
        if backends.is_empty() {
            tracing::warn!(key = %key, "Write data error: can't get backends");
            metrics::record_row_dropped("no_backend");
            return false;
        }

        let mut accepted = false;
        for backend in &backends {
            match backend.write_point(LinePoint::new(db, nano_line.clone())) {
                Ok(()) => accepted = true,
                Err(e) => {
                    tracing::error!(backend = %backend.url(), db = %db, precision = %precision, error = %e, row = %String::from_utf8_lossy(row), "Write data to buffer error");
                }
            }
        }

        if accepted {
            metrics::record_row_written();
        } else {
            metrics::record_row_dropped("forward");
        }
        accepted
    }
}
