//! Circle and backend subsystem.
//!
//! # Data Flow
//! ```text
//! RoutingKey
//!     → group.rs (jump hash over a SipHash digest → one backend)
//!     → backend.rs (Backend trait: write_point / query / health)
//!     → http_backend.rs (buffer → flusher task → POST /write)
//!
//! Health:
//!     Circle::health
//!     → one spawned health check per backend
//!     → join on all of them, ordered per-backend records
//! ```
//!
//! # Design Decisions
//! - Backend membership is fixed at startup
//! - Same key and membership always select the same backend
//! - A failed or slow check never hides a sibling's result
//! - Check timeouts belong to the backend, the aggregator only joins

pub mod backend;
pub mod group;
pub mod health;
pub mod http_backend;

pub use backend::Backend;
pub use group::Circle;
pub use health::{BackendHealth, BackendStats, CircleHealth};
pub use http_backend::{HttpBackend, HttpBackendOptions};
