//! Merge InfluxDB JSON query responses from several circles.

use bytes::Bytes;
use serde_json::Value;

fn same_series(a: &Value, b: &Value) -> bool {
    a.get("name") == b.get("name") && a.get("tags") == b.get("tags")
}

fn merge_series(into: &mut Vec<Value>, from: Vec<Value>) {
    for series in from {
        match into.iter_mut().find(|s| same_series(s, &series)) {
            Some(existing) => {
                let incoming = series
                    .get("values")
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default();
                if let Some(values) = existing.get_mut("values").and_then(Value::as_array_mut) {
                    for v in incoming {
                        if !values.contains(&v) {
                            values.push(v);
                        }
                    }
                } else if !incoming.is_empty() {
                    existing["values"] = Value::Array(incoming);
                }
            }
            None => into.push(series),
        }
    }
}

/// Merge `results[i].series` across bodies, de-duplicating values.
///
/// Bodies that are not JSON (e.g. chunked or CSV responses) are skipped;
/// if nothing parses, the first body is returned as is.
pub fn merge_results(bodies: &[Bytes]) -> Bytes {
    let mut merged: Option<Value> = None;

    for body in bodies {
        let parsed: Value = match serde_json::from_slice(body) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping unparseable response while merging");
                continue;
            }
        };
        let Some(base) = merged.as_mut() else {
            merged = Some(parsed);
            continue;
        };

        let incoming = match parsed.get("results").and_then(Value::as_array) {
            Some(results) => results.clone(),
            None => continue,
        };
        let Some(results) = base.get_mut("results").and_then(Value::as_array_mut) else {
            continue;
        };
        for (i, result) in incoming.into_iter().enumerate() {
            let series = result
                .get("series")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
            match results.get_mut(i) {
                Some(target) => match target.get_mut("series").and_then(Value::as_array_mut) {
                    Some(existing) => merge_series(existing, series),
                    None if !series.is_empty() => target["series"] = Value::Array(series),
                    None => {}
                },
                None => results.push(result),
            }
        }
    }

    match merged {
        Some(v) => serde_json::to_vec(&v).map(Bytes::from).unwrap_or_default(),
        None => bodies.first().cloned().unwrap_or_default(),
    }
}
