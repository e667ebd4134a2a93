//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request ID, query-string and form parameters)
//!     → auth.rs (u/p parameters or basic auth, /query and /write only)
//!     → Proxy::write / Proxy::query / Proxy::health
//!     → response.rs (JSON errors, X-Influxdb-Version)
//!     → Send to client
//! ```

pub mod auth;
pub mod request;
pub mod response;
pub mod server;

pub use request::{MakeRequestUuid, X_REQUEST_ID};
pub use response::ApiError;
pub use server::{AppState, HttpServer};
