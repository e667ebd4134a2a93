//! InfluxDB 1.x HTTP backend.
//!
//! # Responsibilities
//! - Buffer points per database and flush them to `/write` in batches
//! - Forward statements to `/query`
//! - Check `/ping` within a bounded timeout
//!
//! # Design Decisions
//! - `write_point` never blocks: a full buffer rejects the point
//! - Failed flushes are logged and counted, not retried
//! - The flusher drains and flushes once more on shutdown

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use futures_util::future::BoxFuture;
use tokio::sync::{broadcast, mpsc};
use tokio::time;

use crate::circle::backend::Backend;
use crate::circle::health::{BackendHealth, BackendStats};
use crate::error::BackendError;
use crate::line::LinePoint;
use crate::observability::metrics;
use crate::proxy::QueryRequest;

/// Header carrying the InfluxDB server version.
const VERSION_HEADER: &str = "x-influxdb-version";

/// Tunables shared by every backend.
#[derive(Debug, Clone)]
pub struct HttpBackendOptions {
    /// Rows buffered before a flush is forced.
    pub flush_size: usize,
    /// Longest time a row waits in the buffer.
    pub flush_time: Duration,
    /// Points the channel holds before `write_point` rejects.
    pub buffer_capacity: usize,
    /// Bound on a single `/ping` check.
    pub check_timeout: Duration,
}

impl Default for HttpBackendOptions {
    fn default() -> Self {
        Self {
            flush_size: 5000,
            flush_time: Duration::from_millis(1000),
            buffer_capacity: 100_000,
            check_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    queued: AtomicUsize,
    written: AtomicUsize,
    dropped: AtomicUsize,
}

/// A backend reached over the InfluxDB 1.x HTTP API.
#[derive(Debug)]
pub struct HttpBackend {
    name: String,
    url: String,
    client: reqwest::Client,
    tx: mpsc::Sender<LinePoint>,
    active: AtomicBool,
    counters: Arc<Counters>,
    check_timeout: Duration,
}

impl HttpBackend {
    /// Create the backend and spawn its flusher task.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn(
        name: impl Into<String>,
        url: &str,
        client: reqwest::Client,
        options: &HttpBackendOptions,
        shutdown: broadcast::Receiver<()>,
    ) -> Arc<Self> {
        let name = name.into();
        let url = url.trim_end_matches('/').to_string();
        let (tx, rx) = mpsc::channel(options.buffer_capacity.max(1));
        let counters = Arc::new(Counters::default());

        let flusher = Flusher {
            url: url.clone(),
            client: client.clone(),
            flush_size: options.flush_size.max(1),
            counters: counters.clone(),
            pending: HashMap::new(),
            rows: 0,
        };
        tokio::spawn(flusher.run(rx, options.flush_time, shutdown));

        Arc::new(Self {
            name,
            url,
            client,
            tx,
            active: AtomicBool::new(true),
            counters,
            check_timeout: options.check_timeout,
        })
    }

    pub fn stats(&self) -> BackendStats {
        BackendStats {
            queued: self.counters.queued.load(Ordering::Relaxed),
            written: self.counters.written.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
        }
    }
}

impl Backend for HttpBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn url(&self) -> &str {
        &self.url
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }

    fn write_point(&self, point: LinePoint) -> Result<(), BackendError> {
        // Counted before the send so the flusher never subtracts first.
        self.counters.queued.fetch_add(1, Ordering::Relaxed);
        match self.tx.try_send(point) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.counters.queued.fetch_sub(1, Ordering::Relaxed);
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                Err(BackendError::forward(&self.url, "write buffer full"))
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.counters.queued.fetch_sub(1, Ordering::Relaxed);
                Err(BackendError::forward(&self.url, "backend closed"))
            }
        }
    }

    fn query<'a>(&'a self, request: &'a QueryRequest) -> BoxFuture<'a, Result<Bytes, BackendError>> {
        Box::pin(async move {
            let mut form: Vec<(&str, &str)> = vec![("q", request.q.as_str())];
            if let Some(db) = &request.db {
                form.push(("db", db.as_str()));
            }
            form.extend(request.params.iter().map(|(k, v)| (k.as_str(), v.as_str())));

            let response = self
                .client
                .post(format!("{}/query", self.url))
                .form(&form)
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(BackendError::Status {
                    url: self.url.clone(),
                    status: status.as_u16(),
                    body,
                });
            }
            Ok(response.bytes().await?)
        })
    }

    fn health(&self, stats: bool) -> BoxFuture<'_, BackendHealth> {
        Box::pin(async move {
            let start = Instant::now();
            let ping = self.client.get(format!("{}/ping", self.url)).send();

            let health = match time::timeout(self.check_timeout, ping).await {
                Ok(Ok(response)) if response.status().is_success() => BackendHealth::healthy(
                    &self.name,
                    &self.url,
                    start.elapsed().as_millis() as u64,
                ),
                Ok(Ok(response)) => {
                    tracing::warn!(backend = %self.url, status = %response.status(), "Health check failed: non-success status");
                    BackendHealth::failed(&self.name, &self.url, format!("status {}", response.status()))
                }
                Ok(Err(e)) => {
                    tracing::warn!(backend = %self.url, error = %e, "Health check failed: connection error");
                    BackendHealth::failed(&self.name, &self.url, e.to_string())
                }
                Err(_) => {
                    tracing::warn!(backend = %self.url, "Health check failed: timeout");
                    BackendHealth::failed(&self.name, &self.url, "timeout")
                }
            };

            self.active.store(health.active, Ordering::Relaxed);
            health.with_stats(stats.then(|| self.stats()))
        })
    }

    fn ping(&self) -> BoxFuture<'_, Result<Option<String>, BackendError>> {
        Box::pin(async move {
            let response = self
                .client
                .get(format!("{}/ping", self.url))
                .timeout(self.check_timeout)
                .send()
                .await?;
            if !response.status().is_success() {
                return Err(BackendError::Status {
                    url: self.url.clone(),
                    status: response.status().as_u16(),
                    body: String::new(),
                });
            }
            Ok(response
                .headers()
                .get(VERSION_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string))
        })
    }
}

/// Background task batching points per database.
struct Flusher {
    url: String,
    client: reqwest::Client,
    flush_size: usize,
    counters: Arc<Counters>,
    pending: HashMap<String, (Vec<u8>, usize)>,
    rows: usize,
}

impl Flusher {
    async fn run(
        mut self,
        mut rx: mpsc::Receiver<LinePoint>,
        flush_time: Duration,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        let mut ticker = time::interval(flush_time);
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                point = rx.recv() => match point {
                    Some(point) => {
                        self.push(point);
                        if self.rows >= self.flush_size {
                            self.flush().await;
                        }
                    }
                    None => break,
                },
                _ = ticker.tick() => self.flush().await,
                _ = shutdown.recv() => {
                    tracing::info!(backend = %self.url, "Backend flusher received shutdown signal");
                    break;
                }
            }
        }

        while let Ok(point) = rx.try_recv() {
            self.push(point);
        }
        self.flush().await;
    }

    fn push(&mut self, point: LinePoint) {
        let entry = self.pending.entry(point.db).or_default();
        entry.0.extend_from_slice(&point.line);
        entry.1 += 1;
        self.rows += 1;
    }

    async fn flush(&mut self) {
        if self.rows == 0 {
            return;
        }
        for (db, (body, rows)) in std::mem::take(&mut self.pending) {
            self.counters.queued.fetch_sub(rows, Ordering::Relaxed);
            let result = self
                .client
                .post(format!("{}/write", self.url))
                .query(&[("db", db.as_str()), ("precision", "ns")])
                .body(body)
                .send()
                .await;

            match result {
                Ok(response) if response.status().is_success() => {
                    self.counters.written.fetch_add(rows, Ordering::Relaxed);
                    metrics::record_flush(&self.url, "ok");
                }
                Ok(response) => {
                    self.counters.dropped.fetch_add(rows, Ordering::Relaxed);
                    metrics::record_flush(&self.url, "rejected");
                    tracing::error!(backend = %self.url, db = %db, rows, status = %response.status(), "Flush rejected by backend");
                }
                Err(e) => {
                    self.counters.dropped.fetch_add(rows, Ordering::Relaxed);
                    metrics::record_flush(&self.url, "error");
                    tracing::error!(backend = %self.url, db = %db, rows, error = %e, "Flush failed");
                }
            }
        }
        self.rows = 0;
    }
}
