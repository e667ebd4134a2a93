//! Circle ownership, assignment and health aggregation.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use rand::rngs::StdRng;
use tokio::sync::broadcast;

use crate::circle::{Backend, BackendHealth, Circle, CircleHealth, HttpBackend};
use crate::config::ProxyConfig;
use crate::observability::metrics;
use crate::routing::{Assignment, AssignmentCache, RoutingKey};

/// Reserved database that is never served through the proxy.
pub const INTERNAL_DATABASE: &str = "_internal";

/// Top-level coordinator: ordered circles, database whitelist and the
/// circle-assignment cache.
#[derive(Debug)]
pub struct Proxy {
    circles: Vec<Arc<Circle>>,
    db_set: HashSet<String>,
    cache: AssignmentCache,
}

impl Proxy {
    /// # Panics
    ///
    /// Panics if `circles` is empty.
    pub fn new(circles: Vec<Circle>, db_list: impl IntoIterator<Item = String>) -> Self {
        let cache = AssignmentCache::new(circles.len());
        Self::with_cache(circles, db_list, cache)
    }

    /// Like [`Proxy::new`] with an explicit random source for spraying.
    pub fn with_rng(
        circles: Vec<Circle>,
        db_list: impl IntoIterator<Item = String>,
        rng: StdRng,
    ) -> Self {
        let cache = AssignmentCache::with_rng(circles.len(), rng);
        Self::with_cache(circles, db_list, cache)
    }

    fn with_cache(
        circles: Vec<Circle>,
        db_list: impl IntoIterator<Item = String>,
        cache: AssignmentCache,
    ) -> Self {
        Self {
            circles: circles.into_iter().map(Arc::new).collect(),
            db_set: db_list.into_iter().collect(),
            cache,
        }
    }

    /// Build circles of [`HttpBackend`]s from validated configuration.
    ///
    /// Spawns one flusher per backend; must run inside a Tokio runtime.
    pub fn from_config(
        config: &ProxyConfig,
        shutdown: &broadcast::Sender<()>,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.backend.request_timeout_secs))
            .build()?;
        let options = config.backend.options();

        let circles = config
            .circles
            .iter()
            .map(|cc| {
                let backends = cc
                    .backends
                    .iter()
                    .map(|bc| {
                        HttpBackend::spawn(&bc.name, &bc.url, client.clone(), &options, shutdown.subscribe())
                            as Arc<dyn Backend>
                    })
                    .collect();
                tracing::info!(circle = %cc.name, backends = cc.backends.len(), "Circle configured");
                Circle::new(&cc.name, backends)
            })
            .collect();

        Ok(Self::new(circles, config.db_list.iter().cloned()))
    }

    pub fn circles(&self) -> &[Arc<Circle>] {
        &self.circles
    }

    /// True if `db` may be served: not reserved, and whitelisted when a
    /// whitelist is configured.
    pub fn is_database_allowed(&self, db: &str) -> bool {
        db != INTERNAL_DATABASE && (self.db_set.is_empty() || self.db_set.contains(db))
    }

    /// Circle for a write row.
    ///
    /// Pins the key into the first empty slot on first sight. Once every slot
    /// is taken, unseen keys get a random circle that is not remembered.
    pub fn assign_circle(&self, key: &RoutingKey) -> &Arc<Circle> {
        let assignment = self.cache.assign(key);
        match assignment {
            Assignment::Pinned(i) => {
                let pinned = self.cache.pinned();
                metrics::set_pinned_keys(pinned);
                tracing::info!(key = %key, circle = %self.circles[i].name(), "Routing key pinned");
                if pinned == self.circles.len() {
                    tracing::warn!(
                        capacity = pinned,
                        "Assignment cache full; unseen keys are now spread randomly and cannot be found by queries"
                    );
                }
            }
            Assignment::Sprayed(i) => {
                tracing::debug!(key = %key, circle = %self.circles[i].name(), "Routing key sprayed");
            }
            Assignment::Sticky(_) => {}
        }
        &self.circles[assignment.index()]
    }

    /// Circle a key is pinned to, for the query path. Never pins.
    ///
    /// Keys written after the cache filled up are not found here even though
    /// their rows were written to some circle.
    pub fn get_circle(&self, key: &RoutingKey) -> Option<&Arc<Circle>> {
        self.cache.lookup(key).map(|i| &self.circles[i])
    }

    /// Backends receiving a write row for `key`. Always exactly one.
    pub fn get_backends(&self, key: &RoutingKey) -> Vec<Arc<dyn Backend>> {
        vec![self.assign_circle(key).select_backend(key).clone()]
    }

    /// Version advertised by the first circle whose active backend answers
    /// `/ping` with one. `None` when no backend does.
    pub async fn ping(&self) -> Option<String> {
        for circle in &self.circles {
            let backend = circle.first_active();
            match backend.ping().await {
                Ok(Some(version)) => return Some(version),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(circle = %circle.name(), backend = %backend.url(), error = %e, "Ping failed");
                }
            }
        }
        None
    }

    /// Check every circle concurrently and return their records in circle
    /// order once all of them have finished.
    pub async fn health(&self, stats: bool) -> Vec<CircleHealth> {
        let checks = self.circles.iter().map(|circle| {
            let circle = circle.clone();
            tokio::spawn(async move { circle.health(stats).await })
        });

        join_all(checks)
            .await
            .into_iter()
            .zip(&self.circles)
            .map(|(result, circle)| {
                result.unwrap_or_else(|e| {
                    tracing::error!(circle = %circle.name(), error = %e, "Circle health task failed");
                    CircleHealth {
                        circle: circle.name().to_string(),
                        backends: circle
                            .backends()
                            .iter()
                            .map(|b| BackendHealth::failed(b.name(), b.url(), e.to_string()))
                            .collect(),
                    }
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::proxy_with;
    use std::time::Instant;

    #[test]
    fn test_database_allowed() {
        let (open, _) = proxy_with(1, 1, &[]);
        assert!(open.is_database_allowed("anything"));
        assert!(!open.is_database_allowed(INTERNAL_DATABASE));

        let (listed, _) = proxy_with(1, 1, &["metrics", INTERNAL_DATABASE]);
        assert!(listed.is_database_allowed("metrics"));
        assert!(!listed.is_database_allowed("other"));
        assert!(!listed.is_database_allowed(INTERNAL_DATABASE));
    }

    #[test]
    fn test_assign_is_sticky_below_capacity() {
        let (proxy, _) = proxy_with(3, 1, &[]);
        let a = RoutingKey::new("db", "a");
        let b = RoutingKey::new("db", "b");
        let ca = proxy.assign_circle(&a).name().to_string();
        let cb = proxy.assign_circle(&b).name().to_string();
        assert_ne!(ca, cb);
        for _ in 0..10 {
            assert_eq!(proxy.assign_circle(&a).name(), ca);
            assert_eq!(proxy.get_circle(&a).map(|c| c.name().to_string()), Some(ca.clone()));
        }
    }

    #[test]
    fn test_unpinned_key_is_written_but_not_found() {
        let (proxy, _) = proxy_with(2, 1, &[]);
        proxy.assign_circle(&RoutingKey::new("db", "a"));
        proxy.assign_circle(&RoutingKey::new("db", "b"));

        let late = RoutingKey::new("db", "late");
        let circle = proxy.assign_circle(&late);
        assert!(proxy.circles().iter().any(|c| Arc::ptr_eq(c, circle)));
        assert!(proxy.get_circle(&late).is_none());
    }

    #[test]
    fn test_get_circle_does_not_pin() {
        let (proxy, _) = proxy_with(2, 1, &[]);
        let key = RoutingKey::new("db", "cpu");
        assert!(proxy.get_circle(&key).is_none());
        assert!(proxy.get_circle(&key).is_none());
        proxy.assign_circle(&key);
        assert!(proxy.get_circle(&key).is_some());
    }

    #[test]
    fn test_get_backends_returns_one() {
        let (proxy, _) = proxy_with(2, 3, &[]);
        let key = RoutingKey::new("db", "cpu");
        let first = proxy.get_backends(&key);
        assert_eq!(first.len(), 1);
        let again = proxy.get_backends(&key);
        assert_eq!(first[0].url(), again[0].url());
    }

    #[tokio::test]
    async fn test_health_joins_every_circle() {
        let (proxy, mocks) = proxy_with(2, 2, &[]);
        mocks[0][0].set_healthy(false);
        mocks[1][1].set_health_delay(Duration::from_millis(150));

        let start = Instant::now();
        let health = proxy.health(true).await;
        assert!(start.elapsed() >= Duration::from_millis(150));

        assert_eq!(health.len(), 2);
        assert_eq!(health[0].circle, "circle-0");
        assert_eq!(health[0].backends.len(), 2);
        assert!(!health[0].backends[0].active);
        assert!(health[0].backends[1].active);
        assert!(health[1].backends.iter().all(|b| b.active));
    }

    #[tokio::test]
    async fn test_ping_skips_circles_without_a_version() {
        let (proxy, mocks) = proxy_with(3, 1, &[]);
        assert_eq!(proxy.ping().await, None);

        mocks[0][0].set_healthy(false);
        mocks[0][0].set_version("1.6.0");
        mocks[2][0].set_version("1.8.10");
        assert_eq!(proxy.ping().await.as_deref(), Some("1.8.10"));
    }
}
