//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Router,
};
use tokio::net::TcpListener;

use circle_proxy::config::{BackendConfig, CircleConfig, ProxyConfig};

/// Version every mock advertises on `/ping`.
pub const MOCK_VERSION: &str = "1.8.10";

/// One `/write` call received by a mock.
#[derive(Debug, Clone)]
pub struct ReceivedWrite {
    pub db: String,
    pub precision: String,
    pub body: String,
}

#[derive(Debug)]
struct Inner {
    writes: Vec<ReceivedWrite>,
    queries: Vec<Vec<(String, String)>>,
    query_response: String,
    write_status: u16,
    healthy: bool,
    version: String,
}

/// A programmable stand-in for an InfluxDB 1.x server.
#[derive(Clone)]
pub struct MockInflux {
    pub addr: SocketAddr,
    inner: Arc<Mutex<Inner>>,
}

impl MockInflux {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn writes(&self) -> Vec<ReceivedWrite> {
        self.inner.lock().unwrap().writes.clone()
    }

    /// Every written line, in arrival order.
    pub fn lines(&self) -> Vec<String> {
        self.writes()
            .iter()
            .flat_map(|w| w.body.lines().map(str::to_string).collect::<Vec<_>>())
            .collect()
    }

    pub fn queries(&self) -> Vec<Vec<(String, String)>> {
        self.inner.lock().unwrap().queries.clone()
    }

    pub fn set_query_response(&self, body: &str) {
        self.inner.lock().unwrap().query_response = body.to_string();
    }

    pub fn set_write_status(&self, status: u16) {
        self.inner.lock().unwrap().write_status = status;
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.inner.lock().unwrap().healthy = healthy;
    }
}

/// Start a mock InfluxDB on an ephemeral port.
pub async fn start_mock_influx() -> MockInflux {
    let inner = Arc::new(Mutex::new(Inner {
        writes: Vec::new(),
        queries: Vec::new(),
        query_response: r#"{"results":[{"statement_id":0}]}"#.to_string(),
        write_status: 204,
        healthy: true,
        version: MOCK_VERSION.to_string(),
    }));

    let app = Router::new()
        .route("/ping", get(ping))
        .route("/write", post(write))
        .route("/query", post(query))
        .with_state(inner.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    MockInflux { addr, inner }
}

async fn ping(State(inner): State<Arc<Mutex<Inner>>>) -> Response {
    let inner = inner.lock().unwrap();
    if inner.healthy {
        (StatusCode::NO_CONTENT, [("x-influxdb-version", inner.version.clone())]).into_response()
    } else {
        StatusCode::SERVICE_UNAVAILABLE.into_response()
    }
}

async fn write(
    State(inner): State<Arc<Mutex<Inner>>>,
    Query(params): Query<Vec<(String, String)>>,
    body: Bytes,
) -> StatusCode {
    let get = |key: &str| {
        params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
            .unwrap_or_default()
    };
    let mut inner = inner.lock().unwrap();
    inner.writes.push(ReceivedWrite {
        db: get("db"),
        precision: get("precision"),
        body: String::from_utf8_lossy(&body).into_owned(),
    });
    StatusCode::from_u16(inner.write_status).unwrap_or(StatusCode::NO_CONTENT)
}

async fn query(
    State(inner): State<Arc<Mutex<Inner>>>,
    Form(params): Form<Vec<(String, String)>>,
) -> Response {
    let mut inner = inner.lock().unwrap();
    inner.queries.push(params);
    (
        [(axum::http::header::CONTENT_TYPE, "application/json")],
        inner.query_response.clone(),
    )
        .into_response()
}

/// A config with one circle per entry of `layout`, each holding the given mocks.
pub fn config_for(layout: &[&[&MockInflux]]) -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.backend.flush_time_ms = 50;
    config.backend.check_timeout_secs = 1;
    config.backend.request_timeout_secs = 5;
    config.circles = layout
        .iter()
        .enumerate()
        .map(|(c, mocks)| CircleConfig {
            name: format!("circle-{}", c),
            backends: mocks
                .iter()
                .enumerate()
                .map(|(b, m)| BackendConfig {
                    name: format!("influxdb-{}-{}", c, b),
                    url: m.url(),
                })
                .collect(),
        })
        .collect();
    config
}

/// Poll `check` until it holds or `timeout` elapses.
pub async fn eventually<F: Fn() -> bool>(timeout: Duration, check: F) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    check()
}
