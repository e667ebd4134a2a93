//! Measurement extraction and shallow structural checks.

use crate::error::LineError;

/// Extract the measurement name from a row.
///
/// Returns the unescaped name and the byte offset where the tag set (`,`) or
/// field set (` `) begins. Backslash escapes are honored inside the name.
pub fn scan_measurement(line: &[u8]) -> Result<(String, usize), LineError> {
    let mut name = Vec::with_capacity(32);
    let mut i = 0;
    while i < line.len() {
        match line[i] {
            b'\\' => {
                let escaped = *line.get(i + 1).ok_or(LineError::MissingMeasurement)?;
                name.push(escaped);
                i += 2;
            }
            b',' | b' ' => {
                if name.is_empty() {
                    return Err(LineError::MissingMeasurement);
                }
                let name =
                    String::from_utf8(name).map_err(|_| LineError::Malformed("measurement is not utf-8"))?;
                return Ok((name, i));
            }
            b'\n' | b'\r' => break,
            c => {
                name.push(c);
                i += 1;
            }
        }
    }
    Err(LineError::MissingMeasurement)
}

/// Split the remainder of a row on unescaped spaces into its tag set (when
/// `rest` starts with `,`), field set and timestamp.
///
/// A double quote opens a string only in field-value position, i.e. inside
/// the field set after an unescaped `=`. Quotes in tag keys, tag values and
/// field keys are plain bytes.
fn split_sections(rest: &[u8]) -> Result<Vec<&[u8]>, LineError> {
    let field_section = usize::from(rest.first() == Some(&b','));
    let mut sections = Vec::new();
    let mut start = 0;
    let mut quoted = false;
    let mut in_value = false;
    let mut i = 0;
    while i < rest.len() {
        match rest[i] {
            b'\\' => i += 1,
            b'"' if quoted || (in_value && sections.len() == field_section) => quoted = !quoted,
            _ if quoted => {}
            b'=' => in_value = true,
            b',' => in_value = false,
            b' ' => {
                if i > start {
                    sections.push(&rest[start..i]);
                }
                start = i + 1;
                in_value = false;
            }
            _ => {}
        }
        i += 1;
    }
    if quoted {
        return Err(LineError::Malformed("unterminated string"));
    }
    if start < rest.len() {
        sections.push(&rest[start..]);
    }
    Ok(sections)
}

/// Split `buf` on unescaped `sep`. With `strings`, separators inside a
/// quoted field value are skipped.
fn split_unescaped(buf: &[u8], sep: u8, strings: bool) -> Vec<&[u8]> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut quoted = false;
    let mut in_value = false;
    let mut i = 0;
    while i < buf.len() {
        match buf[i] {
            b'\\' => i += 1,
            b'"' if strings && (quoted || in_value) => quoted = !quoted,
            _ if quoted => {}
            c => {
                if c == b'=' {
                    in_value = true;
                } else if c == b',' {
                    in_value = false;
                }
                if c == sep {
                    parts.push(&buf[start..i]);
                    start = i + 1;
                }
            }
        }
        i += 1;
    }
    parts.push(&buf[start..]);
    parts
}

/// Split a pair at its first unescaped `=`.
fn split_pair(pair: &[u8]) -> Option<(&[u8], &[u8])> {
    let mut i = 0;
    while i < pair.len() {
        match pair[i] {
            b'\\' => i += 1,
            b'=' => return Some((&pair[..i], &pair[i + 1..])),
            _ => {}
        }
        i += 1;
    }
    None
}

fn has_unescaped_eq(buf: &[u8]) -> bool {
    split_pair(buf).is_some()
}

fn check_tags(section: &[u8]) -> Result<(), LineError> {
    for pair in split_unescaped(section, b',', false) {
        match split_pair(pair) {
            Some((k, v)) if !k.is_empty() && !v.is_empty() && !has_unescaped_eq(v) => {}
            _ => return Err(LineError::Malformed("invalid tag set")),
        }
    }
    Ok(())
}

fn check_fields(section: &[u8]) -> Result<(), LineError> {
    for pair in split_unescaped(section, b',', true) {
        let valid = match split_pair(pair) {
            Some((k, v)) if !k.is_empty() && !v.is_empty() => {
                if v[0] == b'"' {
                    v.len() >= 2 && v[v.len() - 1] == b'"'
                } else {
                    !has_unescaped_eq(v)
                }
            }
            _ => false,
        };
        if !valid {
            return Err(LineError::Malformed("invalid field set"));
        }
    }
    Ok(())
}

/// Shallow validation of everything after the measurement.
///
/// Checks the tag set and field set are `key=value` lists and that an
/// optional trailing timestamp is an integer. Field types are not checked.
pub fn rapid_check(rest: &[u8]) -> Result<(), LineError> {
    let end = rest
        .iter()
        .rposition(|b| !matches!(b, b'\r' | b'\n'))
        .map_or(0, |i| i + 1);
    let rest = &rest[..end];

    let sections = split_sections(rest)?;

    let (tags, fields, timestamp) = match rest.first() {
        Some(b',') => match sections.as_slice() {
            [tags, fields] => (Some(&tags[1..]), *fields, None),
            [tags, fields, ts] => (Some(&tags[1..]), *fields, Some(*ts)),
            _ => return Err(LineError::Malformed("expected tags, fields and timestamp")),
        },
        Some(b' ') => match sections.as_slice() {
            [fields] => (None, *fields, None),
            [fields, ts] => (None, *fields, Some(*ts)),
            _ => return Err(LineError::Malformed("expected fields and timestamp")),
        },
        _ => return Err(LineError::Malformed("missing field set")),
    };

    if let Some(tags) = tags {
        check_tags(tags)?;
    }
    check_fields(fields)?;

    if let Some(ts) = timestamp {
        let valid = std::str::from_utf8(ts)
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .is_some();
        if !valid {
            return Err(LineError::Malformed("invalid timestamp"));
        }
    }
    Ok(())
}
