//! Line-protocol preprocessing.
//!
//! # Data Flow
//! ```text
//! raw row bytes + precision
//!     → precision.rs (append_nano: timestamp normalized to nanoseconds)
//!     → scan.rs (scan_measurement: measurement name + remainder offset)
//!     → scan.rs (rapid_check: shallow tag/field/timestamp structure)
//!     → LinePoint handed to a backend
//! ```
//!
//! # Design Decisions
//! - This layer relays, it does not validate full grammar or field types
//! - Backends always receive nanosecond timestamps
//! - Escaped separators inside names are honored, quoted strings are skipped

pub mod precision;
pub mod scan;

pub use precision::{append_nano, InvalidPrecision, Precision};
pub use scan::{rapid_check, scan_measurement};

/// A normalized row bound for one database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinePoint {
    /// Target database.
    pub db: String,
    /// Line-protocol bytes with a nanosecond timestamp and trailing newline.
    pub line: Vec<u8>,
}

impl LinePoint {
    pub fn new(db: impl Into<String>, line: Vec<u8>) -> Self {
        Self {
            db: db.into(),
            line,
        }
    }
}
