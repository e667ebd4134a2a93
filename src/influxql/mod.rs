//! InfluxQL statement classification.
//!
//! # Data Flow
//! ```text
//! query text
//!     → tokens.rs (split into words, quotes kept intact)
//!     → classify.rs (statement kind, FROM clause, database, measurement)
//!     → Proxy dispatch
//! ```
//!
//! # Design Decisions
//! - Keyword matching only, no grammar; backends do the real parsing
//! - `SELECT ... INTO` is rejected, the proxy cannot route derived writes
//! - Identifiers are returned unquoted

pub mod classify;
pub mod tokens;

pub use classify::{
    check_query, classify_database, database_from_body, is_delete_or_drop_measurement,
    is_retention_policy_statement, is_select_or_show, measurement_from_tokens, DatabaseClass,
};
pub use tokens::{scan_tokens, unquote};
