//! In-process backend double for unit tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use futures_util::future::BoxFuture;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::circle::{Backend, BackendHealth, Circle};
use crate::error::BackendError;
use crate::line::LinePoint;
use crate::proxy::{Proxy, QueryRequest};

/// Records points and queries; health, failures and latency are scriptable.
#[derive(Debug)]
pub struct MockBackend {
    name: String,
    url: String,
    healthy: AtomicBool,
    fail_writes: AtomicBool,
    fail_queries: AtomicBool,
    health_delay: Mutex<Duration>,
    version: Mutex<Option<String>>,
    response: Mutex<Bytes>,
    points: Mutex<Vec<LinePoint>>,
    queries: Mutex<Vec<QueryRequest>>,
}

impl MockBackend {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            url: format!("http://{}:8086", name),
            name,
            healthy: AtomicBool::new(true),
            fail_writes: AtomicBool::new(false),
            fail_queries: AtomicBool::new(false),
            health_delay: Mutex::new(Duration::ZERO),
            version: Mutex::new(None),
            response: Mutex::new(Bytes::from_static(br#"{"results":[{"statement_id":0}]}"#)),
            points: Mutex::new(Vec::new()),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_queries(&self, fail: bool) {
        self.fail_queries.store(fail, Ordering::SeqCst);
    }

    pub fn set_health_delay(&self, delay: Duration) {
        *self.health_delay.lock().unwrap() = delay;
    }

    pub fn set_version(&self, version: &str) {
        *self.version.lock().unwrap() = Some(version.to_string());
    }

    pub fn set_response(&self, body: &'static str) {
        *self.response.lock().unwrap() = Bytes::from_static(body.as_bytes());
    }

    pub fn points(&self) -> Vec<LinePoint> {
        self.points.lock().unwrap().clone()
    }

    pub fn queries(&self) -> Vec<QueryRequest> {
        self.queries.lock().unwrap().clone()
    }
}

impl Backend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn url(&self) -> &str {
        &self.url
    }

    fn is_active(&self) -> bool {
        self.healthy.load(Ordering::SeqCst)
    }

    fn write_point(&self, point: LinePoint) -> Result<(), BackendError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(BackendError::forward(&self.url, "write buffer full"));
        }
        self.points.lock().unwrap().push(point);
        Ok(())
    }

    fn query<'a>(&'a self, request: &'a QueryRequest) -> BoxFuture<'a, Result<Bytes, BackendError>> {
        Box::pin(async move {
            self.queries.lock().unwrap().push(request.clone());
            if self.fail_queries.load(Ordering::SeqCst) {
                return Err(BackendError::Status {
                    url: self.url.clone(),
                    status: 500,
                    body: "boom".into(),
                });
            }
            Ok(self.response.lock().unwrap().clone())
        })
    }

    fn health(&self, _stats: bool) -> BoxFuture<'_, BackendHealth> {
        Box::pin(async move {
            let delay = *self.health_delay.lock().unwrap();
            tokio::time::sleep(delay).await;
            if self.healthy.load(Ordering::SeqCst) {
                BackendHealth::healthy(&self.name, &self.url, delay.as_millis() as u64)
            } else {
                BackendHealth::failed(&self.name, &self.url, "connection refused")
            }
        })
    }

    fn ping(&self) -> BoxFuture<'_, Result<Option<String>, BackendError>> {
        Box::pin(async move {
            if !self.healthy.load(Ordering::SeqCst) {
                return Err(BackendError::forward(&self.url, "connection refused"));
            }
            Ok(self.version.lock().unwrap().clone())
        })
    }
}

/// A proxy over `circles` circles of `backends` mocks each, seeded for
/// deterministic spraying. Mocks are named `c{circle}b{backend}`.
pub fn proxy_with(
    circles: usize,
    backends: usize,
    db_list: &[&str],
) -> (Proxy, Vec<Vec<Arc<MockBackend>>>) {
    let mocks: Vec<Vec<Arc<MockBackend>>> = (0..circles)
        .map(|c| {
            (0..backends)
                .map(|b| Arc::new(MockBackend::new(format!("c{}b{}", c, b))))
                .collect()
        })
        .collect();
    let circles = mocks
        .iter()
        .enumerate()
        .map(|(i, ms)| {
            Circle::new(
                format!("circle-{}", i),
                ms.iter().map(|m| m.clone() as Arc<dyn Backend>).collect(),
            )
        })
        .collect();
    let proxy = Proxy::with_rng(
        circles,
        db_list.iter().map(|s| s.to_string()),
        StdRng::seed_from_u64(11),
    );
    (proxy, mocks)
}
