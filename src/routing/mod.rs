//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! (database, measurement)
//!     → key.rs (RoutingKey = "db,measurement")
//!     → assignment.rs (slot table: sticky hit, pin into empty slot, or spray)
//!     → circle index
//! ```
//!
//! # Design Decisions
//! - One slot per circle; a key pinned once stays pinned for the process lifetime
//! - Write path may pin, query path only looks up
//! - Beyond capacity, writes spray randomly and queries cannot find the key
//! - Linear scan over the slots, circle counts stay small

pub mod assignment;
pub mod key;

pub use assignment::{Assignment, AssignmentCache};
pub use key::RoutingKey;
