//! Backend abstraction.
//!
//! # Responsibilities
//! - Accept a point for forwarding, reporting failure per call
//! - Execute a query statement and return the raw response body
//! - Check its own health, bounded by its own timeout
//! - Report the server version it advertises

use std::fmt;

use bytes::Bytes;
use futures_util::future::BoxFuture;

use crate::circle::health::BackendHealth;
use crate::error::BackendError;
use crate::line::LinePoint;
use crate::proxy::QueryRequest;

/// One downstream database instance inside a circle.
pub trait Backend: Send + Sync + fmt::Debug {
    /// Configured name, unique within its circle.
    fn name(&self) -> &str;

    /// Endpoint identifier.
    fn url(&self) -> &str;

    /// Result of the most recent health check; true before the first check.
    fn is_active(&self) -> bool;

    /// Hand off a point for forwarding.
    fn write_point(&self, point: LinePoint) -> Result<(), BackendError>;

    /// Run a statement against this backend.
    fn query<'a>(&'a self, request: &'a QueryRequest) -> BoxFuture<'a, Result<Bytes, BackendError>>;

    /// Check this backend. Never fails; failures are recorded in the result.
    fn health(&self, stats: bool) -> BoxFuture<'_, BackendHealth>;

    /// Server version advertised on `/ping`, if the backend sends one.
    fn ping(&self) -> BoxFuture<'_, Result<Option<String>, BackendError>>;
}
