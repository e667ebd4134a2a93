//! Statement executors, one per dispatch row.

use std::sync::Arc;

use bytes::Bytes;
use futures_util::future::join_all;

use crate::circle::Backend;
use crate::error::{ProxyError, Result};
use crate::influxql;
use crate::proxy::coordinator::Proxy;
use crate::proxy::merge::merge_results;
use crate::proxy::query::QueryRequest;
use crate::routing::RoutingKey;

/// Run `request` on every backend concurrently; the first failure wins,
/// otherwise the first body is returned.
async fn run_all(backends: Vec<Arc<dyn Backend>>, request: &QueryRequest) -> Result<Bytes> {
    let results = join_all(backends.iter().map(|b| b.query(request))).await;
    let mut first = None;
    for (result, backend) in results.into_iter().zip(&backends) {
        match result {
            Ok(body) => {
                first.get_or_insert(body);
            }
            Err(e) => {
                tracing::error!(backend = %backend.url(), error = %e, "Broadcast statement failed");
                return Err(e.into());
            }
        }
    }
    first.ok_or_else(|| ProxyError::NoBackendResolved(request.q.clone()))
}

/// SELECT/SHOW with FROM: served by the backend owning the measurement in
/// the circle its key is pinned to.
pub async fn query_from(
    proxy: &Proxy,
    request: &QueryRequest,
    tokens: &[String],
    db: &str,
) -> Result<Bytes> {
    let measurement = influxql::measurement_from_tokens(tokens).ok_or(ProxyError::IllegalQuery)?;
    let key = RoutingKey::new(db, &measurement);
    let circle = proxy
        .get_circle(&key)
        .ok_or_else(|| ProxyError::NoBackendResolved(key.to_string()))?;
    let backend = circle.select_backend(&key);
    tracing::debug!(key = %key, circle = %circle.name(), backend = %backend.url(), "Query routed");
    Ok(backend.query(&request.for_database(Some(db))).await?)
}

/// SELECT/SHOW without FROM: one backend per circle, results merged.
pub async fn query_show(proxy: &Proxy, request: &QueryRequest, db: Option<&str>) -> Result<Bytes> {
    let request = request.for_database(db);
    let backends: Vec<Arc<dyn Backend>> = proxy
        .circles()
        .iter()
        .map(|c| c.first_active().clone())
        .collect();

    let results = join_all(backends.iter().map(|b| b.query(&request))).await;
    let mut bodies = Vec::with_capacity(results.len());
    let mut last_error = None;
    for (result, backend) in results.into_iter().zip(&backends) {
        match result {
            Ok(body) => bodies.push(body),
            Err(e) => {
                tracing::warn!(backend = %backend.url(), error = %e, "Show query failed on circle");
                last_error = Some(e);
            }
        }
    }

    match (bodies.is_empty(), last_error) {
        (true, Some(e)) => Err(e.into()),
        _ => Ok(merge_results(&bodies)),
    }
}

/// DELETE / DROP MEASUREMENT / DROP SERIES: historical data may sit on any
/// circle, so every circle executes it.
pub async fn query_delete_or_drop(
    proxy: &Proxy,
    request: &QueryRequest,
    tokens: &[String],
    db: &str,
) -> Result<Bytes> {
    let request = request.for_database(Some(db));
    let key = influxql::measurement_from_tokens(tokens).map(|m| RoutingKey::new(db, &m));

    let backends: Vec<Arc<dyn Backend>> = proxy
        .circles()
        .iter()
        .flat_map(|c| match &key {
            Some(key) => vec![c.select_backend(key).clone()],
            None => c.backends().to_vec(),
        })
        .collect();
    run_all(backends, &request).await
}

/// Database and retention-policy DDL: every backend of every circle.
pub async fn query_alter(proxy: &Proxy, request: &QueryRequest, db: Option<&str>) -> Result<Bytes> {
    let request = request.for_database(db);
    let backends: Vec<Arc<dyn Backend>> = proxy
        .circles()
        .iter()
        .flat_map(|c| c.backends().iter().cloned())
        .collect();
    tracing::info!(statement = %request.q, backends = backends.len(), "Broadcasting schema change");
    run_all(backends, &request).await
}

#[cfg(test)]
mod tests {
    use crate::error::ProxyError;
    use crate::proxy::QueryRequest;
    use crate::testing::proxy_with;

    fn req(q: &str, db: &str) -> QueryRequest {
        QueryRequest::new(q).with_db(db)
    }

    #[tokio::test]
    async fn test_show_broadcasts_and_merges() {
        let (proxy, mocks) = proxy_with(2, 2, &[]);
        mocks[0][0].set_response(
            r#"{"results":[{"statement_id":0,"series":[{"name":"measurements","columns":["name"],"values":[["cpu"],["mem"]]}]}]}"#,
        );
        mocks[1][0].set_response(
            r#"{"results":[{"statement_id":0,"series":[{"name":"measurements","columns":["name"],"values":[["disk"],["mem"]]}]}]}"#,
        );

        let body = proxy.query(&req("show measurements", "db")).await.unwrap();
        let v: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            v["results"][0]["series"][0]["values"],
            serde_json::json!([["cpu"], ["mem"], ["disk"]])
        );
        assert_eq!(mocks[0][0].queries().len(), 1);
        assert_eq!(mocks[1][0].queries().len(), 1);
        assert!(mocks[0][1].queries().is_empty());
    }

    #[tokio::test]
    async fn test_show_uses_active_backend() {
        let (proxy, mocks) = proxy_with(1, 2, &[]);
        mocks[0][0].set_healthy(false);
        proxy.query(&req("show series", "db")).await.unwrap();
        assert!(mocks[0][0].queries().is_empty());
        assert_eq!(mocks[0][1].queries().len(), 1);
    }

    #[tokio::test]
    async fn test_show_survives_one_failed_circle() {
        let (proxy, mocks) = proxy_with(2, 1, &[]);
        mocks[0][0].set_fail_queries(true);
        assert!(proxy.query(&req("show measurements", "db")).await.is_ok());

        mocks[1][0].set_fail_queries(true);
        assert!(matches!(
            proxy.query(&req("show measurements", "db")).await,
            Err(ProxyError::Backend(_))
        ));
    }

    #[tokio::test]
    async fn test_drop_measurement_hits_every_circle() {
        let (proxy, mocks) = proxy_with(3, 2, &[]);
        proxy.query(&req("drop measurement cpu", "db")).await.unwrap();
        for circle in &mocks {
            let hits: usize = circle.iter().map(|m| m.queries().len()).sum();
            assert_eq!(hits, 1);
        }
    }

    #[tokio::test]
    async fn test_delete_failure_is_reported() {
        let (proxy, mocks) = proxy_with(2, 1, &[]);
        mocks[1][0].set_fail_queries(true);
        assert!(matches!(
            proxy.query(&req("delete from cpu where time < 0", "db")).await,
            Err(ProxyError::Backend(_))
        ));
    }

    #[tokio::test]
    async fn test_alter_hits_every_backend() {
        let (proxy, mocks) = proxy_with(2, 3, &[]);
        proxy.query(&req("create database metrics", "")).await.unwrap();
        for m in mocks.iter().flatten() {
            let queries = m.queries();
            assert_eq!(queries.len(), 1);
            assert_eq!(queries[0].q, "create database metrics");
            assert_eq!(queries[0].db.as_deref(), Some("metrics"));
        }
    }

    #[tokio::test]
    async fn test_retention_policy_forbidden_outside_whitelist() {
        let (proxy, mocks) = proxy_with(1, 1, &["metrics"]);
        assert!(matches!(
            proxy
                .query(&QueryRequest::new("create retention policy rp on other duration 1d replication 1"))
                .await,
            Err(ProxyError::DatabaseForbidden(_))
        ));
        assert!(mocks[0][0].queries().is_empty());
    }
}
