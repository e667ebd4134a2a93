//! HTTP server setup and handlers.
//!
//! # Responsibilities
//! - Create Axum Router with the InfluxDB-compatible endpoints
//! - Wire up middleware (request ID, tracing, timeout, gzip bodies, auth)
//! - Translate requests into `Proxy::write` / `Proxy::query` / `Proxy::health`
//! - Serve until the shutdown signal fires
//!
//! # Endpoints
//! - `/ping` → 204, advertising a backend's version when one answers
//! - `/query` → proxied InfluxQL, JSON body from the backend(s)
//! - `/write` → line protocol, 204 once rows are buffered
//! - `/health` → per-circle backend health

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{ConnectInfo, RawQuery, State},
    http::{Extensions, HeaderMap, HeaderName, HeaderValue, Method, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    decompression::RequestDecompressionLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::{AuthConfig, HttpConfig, ProxyConfig};
use crate::http::auth::auth_middleware;
use crate::http::request::{form_pairs, param, query_pairs, request_id, MakeRequestUuid};
use crate::http::response::{with_version, ApiError, X_INFLUXDB_VERSION};
use crate::line::{InvalidPrecision, Precision};
use crate::proxy::{Proxy, QueryRequest};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub proxy: Arc<Proxy>,
    pub auth: Arc<AuthConfig>,
    pub http: Arc<HttpConfig>,
}

/// HTTP front end for the proxy.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server over an already built proxy.
    pub fn new(config: &ProxyConfig, proxy: Arc<Proxy>) -> Self {
        if let Some(db) = &config.http.database {
            tracing::info!(database = %db, "Single-database write mode");
        }
        let state = AppState {
            proxy,
            auth: Arc::new(config.auth.clone()),
            http: Arc::new(config.http.clone()),
        };
        Self {
            router: Self::build_router(config, state),
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        let authenticated = Router::new()
            .route("/query", get(query_handler).post(query_handler))
            .route("/write", any(write_handler))
            .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

        Router::new()
            .route("/ping", get(ping_handler))
            .route("/health", get(health_handler))
            .merge(authenticated)
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(TimeoutLayer::new(Duration::from_secs(
                        config.http.request_timeout_secs,
                    )))
                    .layer(RequestDecompressionLayer::new()),
            )
    }

    /// The configured router, for in-process serving.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn ping_handler(State(state): State<AppState>) -> Response {
    let mut response = StatusCode::NO_CONTENT.into_response();
    match state.proxy.ping().await.and_then(|v| HeaderValue::from_str(&v).ok()) {
        Some(version) => {
            response
                .headers_mut()
                .insert(HeaderName::from_static(X_INFLUXDB_VERSION), version);
            response
        }
        None => with_version(response),
    }
}

async fn health_handler(State(state): State<AppState>, RawQuery(raw): RawQuery) -> Response {
    let pairs = query_pairs(raw.as_deref());
    let stats = param(&pairs, "stats") == Some("true");
    Json(state.proxy.health(stats).await).into_response()
}

async fn query_handler(
    State(state): State<AppState>,
    extensions: Extensions,
    RawQuery(raw): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let client = client_addr(&extensions);
    let pairs = form_pairs(raw.as_deref(), &headers, &body);
    let request = QueryRequest::from_pairs(pairs);

    match state.proxy.query(&request).await {
        Ok(result) => {
            if state.http.query_tracing {
                tracing::info!(request_id = %request_id(&headers), query = %request.q, client = %client, "Query");
            }
            let response = (
                [(axum::http::header::CONTENT_TYPE, "application/json")],
                result,
            )
                .into_response();
            Ok(with_version(response))
        }
        Err(e) => {
            tracing::warn!(request_id = %request_id(&headers), error = %e, query = %request.q, client = %client, "Query error");
            Err(e.into())
        }
    }
}

async fn write_handler(
    State(state): State<AppState>,
    method: Method,
    extensions: Extensions,
    RawQuery(raw): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    if method != Method::POST {
        return Err(ApiError::MethodNotAllowed);
    }

    let pairs = query_pairs(raw.as_deref());
    let precision: Precision = param(&pairs, "precision")
        .unwrap_or("ns")
        .parse()
        .map_err(|e: InvalidPrecision| ApiError::bad_request(e.to_string()))?;

    let db = match param(&pairs, "db") {
        Some(db) if !db.is_empty() => db,
        _ => return Err(ApiError::bad_request("database not found")),
    };
    if let Some(only) = &state.http.database {
        if db != only {
            return Err(ApiError::bad_request("database forbidden"));
        }
    }

    let summary = state.proxy.write(&body, db, precision);
    tracing::debug!(
        request_id = %request_id(&headers),
        db = %db,
        accepted = summary.accepted,
        dropped = summary.dropped,
        "Write handled"
    );
    if state.http.write_tracing {
        tracing::info!(
            body = %String::from_utf8_lossy(&body),
            client = %client_addr(&extensions),
            "Write body received"
        );
    }

    Ok(with_version(StatusCode::NO_CONTENT.into_response()))
}

fn client_addr(extensions: &Extensions) -> String {
    extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
