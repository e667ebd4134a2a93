//! A circle: an ordered, fixed set of interchangeable backends.

use std::hash::Hasher;
use std::sync::Arc;
use std::time::Instant;

use futures_util::future::join_all;
use siphasher::sip::SipHasher13;

use crate::circle::backend::Backend;
use crate::circle::health::{BackendHealth, CircleHealth};
use crate::observability::metrics;
use crate::routing::RoutingKey;

// Fixed so every proxy instance maps a key to the same backend.
const SELECT_KEY: [u8; 16] = [
    0x3b, 0x91, 0x0e, 0xc4, 0x58, 0x2f, 0xd7, 0x66, 0xa1, 0x14, 0x7c, 0xe9, 0x05, 0xb8, 0x4d, 0x92,
];

/// Lamping & Veach jump consistent hash of `key` onto `buckets` buckets.
fn jump_hash(mut key: u64, buckets: usize) -> usize {
    let mut b: i64 = -1;
    let mut j: i64 = 0;
    while j < buckets as i64 {
        b = j;
        key = key.wrapping_mul(2862933555777941757).wrapping_add(1);
        j = ((b + 1) as f64 * ((1u64 << 31) as f64 / ((key >> 33) + 1) as f64)) as i64;
    }
    b as usize
}

/// An independent shard group.
#[derive(Debug)]
pub struct Circle {
    name: String,
    backends: Vec<Arc<dyn Backend>>,
    hasher: SipHasher13,
}

impl Circle {
    /// # Panics
    ///
    /// Panics if `backends` is empty; configuration validation rejects that.
    pub fn new(name: impl Into<String>, backends: Vec<Arc<dyn Backend>>) -> Self {
        assert!(!backends.is_empty(), "circle needs at least one backend");
        Self {
            name: name.into(),
            backends,
            hasher: SipHasher13::new_with_key(&SELECT_KEY),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn backends(&self) -> &[Arc<dyn Backend>] {
        &self.backends
    }

    /// The backend owning `key`. Stable for a given membership and order.
    pub fn select_backend(&self, key: &RoutingKey) -> &Arc<dyn Backend> {
        let mut state = self.hasher;
        state.write(key.as_str().as_bytes());
        &self.backends[jump_hash(state.finish(), self.backends.len())]
    }

    /// First backend whose last health check succeeded, else the first backend.
    pub fn first_active(&self) -> &Arc<dyn Backend> {
        self.backends
            .iter()
            .find(|b| b.is_active())
            .unwrap_or(&self.backends[0])
    }

    /// Check every backend concurrently and join on all of them.
    pub async fn health(&self, stats: bool) -> CircleHealth {
        let start = Instant::now();
        let checks = self.backends.iter().map(|backend| {
            let backend = backend.clone();
            tokio::spawn(async move { backend.health(stats).await })
        });
        let results = join_all(checks).await;

        let backends: Vec<BackendHealth> = results
            .into_iter()
            .zip(&self.backends)
            .map(|(result, backend)| match result {
                Ok(health) => health,
                Err(e) => {
                    tracing::error!(circle = %self.name, backend = %backend.url(), error = %e, "Health check task failed");
                    BackendHealth::failed(backend.name(), backend.url(), e.to_string())
                }
            })
            .collect();

        for b in &backends {
            metrics::record_backend_health(&b.url, b.active);
        }
        tracing::debug!(
            circle = %self.name,
            active = backends.iter().filter(|b| b.active).count(),
            total = backends.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Circle health collected"
        );

        CircleHealth {
            circle: self.name.clone(),
            backends,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockBackend;
    use std::time::Duration;

    fn circle(n: usize) -> (Circle, Vec<Arc<MockBackend>>) {
        let mocks: Vec<Arc<MockBackend>> =
            (0..n).map(|i| Arc::new(MockBackend::new(format!("b{}", i)))).collect();
        let backends = mocks.iter().map(|m| m.clone() as Arc<dyn Backend>).collect();
        (Circle::new("c0", backends), mocks)
    }

    #[test]
    fn test_jump_hash_in_range() {
        for key in 0..1000u64 {
            assert!(jump_hash(key.wrapping_mul(0x9e3779b97f4a7c15), 7) < 7);
        }
        assert_eq!(jump_hash(42, 1), 0);
    }

    #[test]
    fn test_select_backend_is_stable() {
        let (c, _) = circle(5);
        for m in ["cpu", "mem", "disk", "net", "load"] {
            let key = RoutingKey::new("db", m);
            let first = c.select_backend(&key).url().to_string();
            for _ in 0..10 {
                assert_eq!(c.select_backend(&key).url(), first);
            }
        }
    }

    #[test]
    fn test_select_backend_spreads_keys() {
        let (c, _) = circle(4);
        let mut hit = std::collections::HashSet::new();
        for i in 0..200 {
            hit.insert(c.select_backend(&RoutingKey::new("db", &format!("m{}", i))).url().to_string());
        }
        assert_eq!(hit.len(), 4);
    }

    #[tokio::test]
    async fn test_health_isolates_failures_and_joins_slowest() {
        let (c, mocks) = circle(2);
        mocks[0].set_healthy(false);
        mocks[0].set_health_delay(Duration::from_millis(200));

        let start = Instant::now();
        let health = c.health(false).await;
        assert!(start.elapsed() >= Duration::from_millis(200));

        assert_eq!(health.backends.len(), 2);
        assert!(!health.backends[0].active);
        assert_eq!(health.backends[0].name, "b0");
        assert!(health.backends[1].active);
        assert_eq!(health.backends[1].error, None);
        assert_eq!(health.active(), 1);
    }

    #[tokio::test]
    async fn test_first_active_skips_inactive() {
        let (c, mocks) = circle(3);
        mocks[0].set_healthy(false);
        assert_eq!(c.first_active().name(), "b1");
        mocks[1].set_healthy(false);
        mocks[2].set_healthy(false);
        assert_eq!(c.first_active().name(), "b0");
    }
}
