//! Timestamp precision and nanosecond normalization.

use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::LineError;

/// Unit of the trailing timestamp in an inbound row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Precision {
    #[default]
    Nanosecond,
    Microsecond,
    Millisecond,
    Second,
    Minute,
    Hour,
}

impl Precision {
    /// Nanoseconds per unit.
    pub fn multiplier(self) -> i64 {
        match self {
            Precision::Nanosecond => 1,
            Precision::Microsecond => 1_000,
            Precision::Millisecond => 1_000_000,
            Precision::Second => 1_000_000_000,
            Precision::Minute => 60 * 1_000_000_000,
            Precision::Hour => 3_600 * 1_000_000_000,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Precision::Nanosecond => "ns",
            Precision::Microsecond => "u",
            Precision::Millisecond => "ms",
            Precision::Second => "s",
            Precision::Minute => "m",
            Precision::Hour => "h",
        }
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for an unrecognised precision parameter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid precision: {0}")]
pub struct InvalidPrecision(pub String);

impl FromStr for Precision {
    type Err = InvalidPrecision;

    /// Accepts the InfluxDB 1.x spellings; an empty string means nanoseconds.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "n" | "ns" => Ok(Precision::Nanosecond),
            "u" | "us" | "µ" => Ok(Precision::Microsecond),
            "ms" => Ok(Precision::Millisecond),
            "s" => Ok(Precision::Second),
            "m" => Ok(Precision::Minute),
            "h" => Ok(Precision::Hour),
            other => Err(InvalidPrecision(other.to_string())),
        }
    }
}

/// Current wall-clock time in nanoseconds since the epoch.
pub fn now_nanos() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as i64)
        .unwrap_or_default()
}

/// Position of the trailing timestamp, if the row ends in `<space><integer>`.
fn scan_time(line: &[u8]) -> Option<usize> {
    let digits = line.iter().rev().take_while(|b| b.is_ascii_digit()).count();
    if digits == 0 {
        return None;
    }
    let mut start = line.len() - digits;
    if start > 0 && line[start - 1] == b'-' {
        start -= 1;
    }
    match start.checked_sub(1).map(|i| line[i]) {
        Some(b' ') | Some(b'\t') if start > 1 => Some(start),
        _ => None,
    }
}

/// Normalize the row's timestamp to nanoseconds and terminate it with `\n`.
///
/// A present timestamp is scaled by the precision's multiplier; a missing one
/// is replaced by the current time, which is already in nanoseconds.
pub fn append_nano(line: &[u8], precision: Precision) -> Result<Vec<u8>, LineError> {
    append_nano_at(line, precision, now_nanos())
}

pub(crate) fn append_nano_at(
    line: &[u8],
    precision: Precision,
    now: i64,
) -> Result<Vec<u8>, LineError> {
    let end = line
        .iter()
        .rposition(|b| !matches!(b, b' ' | b'\t' | b'\r' | b'\n'))
        .map_or(0, |i| i + 1);
    let line = &line[..end];

    let mut out = Vec::with_capacity(line.len() + 21);
    match scan_time(line) {
        Some(_) if precision == Precision::Nanosecond => out.extend_from_slice(line),
        Some(pos) => {
            let ts: i64 = std::str::from_utf8(&line[pos..])
                .ok()
                .and_then(|s| s.parse().ok())
                .ok_or(LineError::Malformed("timestamp out of range"))?;
            let ts = ts
                .checked_mul(precision.multiplier())
                .ok_or(LineError::Malformed("timestamp out of range"))?;
            out.extend_from_slice(&line[..pos]);
            out.extend_from_slice(ts.to_string().as_bytes());
        }
        None => {
            out.extend_from_slice(line);
            out.push(b' ');
            out.extend_from_slice(now.to_string().as_bytes());
        }
    }
    out.push(b'\n');
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000_123_456_789;

    #[test]
    fn test_parse_precision() {
        assert_eq!("".parse::<Precision>().unwrap(), Precision::Nanosecond);
        assert_eq!("u".parse::<Precision>().unwrap(), Precision::Microsecond);
        assert_eq!("h".parse::<Precision>().unwrap(), Precision::Hour);
        assert!("weeks".parse::<Precision>().is_err());
    }

    #[test]
    fn test_appends_now_when_timestamp_missing() {
        let out = append_nano_at(b"cpu,host=a value=1", Precision::Second, NOW).unwrap();
        assert_eq!(out, format!("cpu,host=a value=1 {}\n", NOW).into_bytes());
    }

    #[test]
    fn test_scales_existing_timestamp() {
        let out = append_nano_at(b"cpu value=1 1700000000\n", Precision::Second, NOW).unwrap();
        assert_eq!(out, b"cpu value=1 1700000000000000000\n".to_vec());

        let out = append_nano_at(b"cpu value=1 2", Precision::Minute, NOW).unwrap();
        assert_eq!(out, b"cpu value=1 120000000000\n".to_vec());
    }

    #[test]
    fn test_negative_timestamp() {
        let out = append_nano_at(b"cpu value=1 -5", Precision::Millisecond, NOW).unwrap();
        assert_eq!(out, b"cpu value=1 -5000000\n".to_vec());
    }

    #[test]
    fn test_field_value_is_not_a_timestamp() {
        let out = append_nano_at(b"cpu value=42", Precision::Nanosecond, NOW).unwrap();
        assert_eq!(out, format!("cpu value=42 {}\n", NOW).into_bytes());
    }

    #[test]
    fn test_nanosecond_normalization_is_idempotent() {
        let once = append_nano_at(b"cpu value=1 1700000000000000000", Precision::Nanosecond, NOW)
            .unwrap();
        let twice = append_nano_at(&once, Precision::Nanosecond, NOW + 1).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_overflow_is_rejected() {
        let err = append_nano_at(b"cpu value=1 9223372036854775807", Precision::Hour, NOW);
        assert!(err.is_err());
    }
}
