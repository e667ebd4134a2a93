//! Routing key construction.

use std::fmt;

/// Shard key for a series: `database ++ "," ++ measurement`.
///
/// Not escaped; database and measurement must not contain the separator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoutingKey(String);

impl RoutingKey {
    pub fn new(db: &str, measurement: &str) -> Self {
        let mut key = String::with_capacity(db.len() + measurement.len() + 1);
        key.push_str(db);
        key.push(',');
        key.push_str(measurement);
        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoutingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RoutingKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
