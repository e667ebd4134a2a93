//! Proxy coordinator.
//!
//! # Data Flow
//! ```text
//! Write:
//!     payload → split on '\n'
//!     → write_row: append_nano → scan_measurement → rapid_check
//!     → RoutingKey → assign_circle (may pin) → Circle::select_backend
//!     → Backend::write_point
//!
//! Query:
//!     q → influxql::check_query → resolve database → authorize
//!     → dispatch:
//!         select/show + FROM   → get_circle (never pins) → one backend
//!         select/show, no FROM → one backend per circle, merged
//!         delete/drop          → every circle
//!         create/alter/drop db → every backend of every circle
//! ```
//!
//! # Design Decisions
//! - The assignment cache is the only shared mutable state
//! - Per-row write failures are logged and dropped, never fail the batch
//! - Health fans out per circle and per backend and joins on everything

pub mod coordinator;
pub mod executors;
pub mod merge;
pub mod query;
pub mod write;

pub use coordinator::{Proxy, INTERNAL_DATABASE};
pub use query::{QueryKind, QueryRequest};
pub use write::WriteSummary;
