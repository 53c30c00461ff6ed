//! Loader for the `Points` section of a corrected-series payload.

use chrono::{DateTime, Datelike, NaiveDateTime, Timelike};
use serde_json::Value;

use crate::error::{ExportError, ExportResult};
use crate::model::{ObservationPoint, RawPoint};

/// Key of the number inside the store's nested value object.
const NUMERIC_KEY: &str = "Numeric";

/// Converts raw payload entries into observation points, preserving order.
///
/// # Errors
///
/// Returns [`ExportError::Parse`] if any timestamp is missing or malformed,
/// or if a present value does not contain an extractable number.
pub fn load_points(site: &str, raw: &[RawPoint]) -> ExportResult<Vec<ObservationPoint>> {
    raw.iter()
        .enumerate()
        .map(|(i, entry)| {
            let stamp = entry
                .timestamp
                .as_deref()
                .ok_or_else(|| ExportError::Parse(format!("point {i} has no Timestamp")))?;
            let (timestamp, utc_offset) = parse_timestamp(stamp)?;
            let value = match &entry.value {
                Some(v) => parse_numeric(v)
                    .map_err(|e| ExportError::Parse(format!("point {i} ({stamp}): {e}")))?,
                None => None,
            };

            Ok(ObservationPoint {
                site: site.to_string(),
                timestamp,
                utc_offset,
                value,
            })
        })
        .collect()
}

/// Parses an offset-carrying timestamp into its local wall time and offset.
///
/// Sub-second digits are dropped; the store writes seven of them and every
/// downstream comparison works at one-second resolution.
pub fn parse_timestamp(stamp: &str) -> ExportResult<(NaiveDateTime, String)> {
    let dt = DateTime::parse_from_rfc3339(stamp.trim())
        .map_err(|e| ExportError::Parse(format!("invalid timestamp '{stamp}': {e}")))?;
    let local = dt
        .naive_local()
        .with_nanosecond(0)
        .ok_or_else(|| ExportError::Parse(format!("invalid timestamp '{stamp}'")))?;
    Ok((local, dt.format("%:z").to_string()))
}

/// Parses an interval bound. Missing, blank, malformed and sentinel bounds
/// all come back as `None` (open).
///
/// The store marks unbounded intervals with `0001-01-01` and `9999-12-31`.
pub fn parse_bound(stamp: Option<&str>) -> Option<NaiveDateTime> {
    let stamp = stamp?.trim();
    if stamp.is_empty() {
        return None;
    }
    let (local, _) = parse_timestamp(stamp).ok()?;
    if local.year() <= 1 || local.year() >= 9999 {
        return None;
    }
    Some(local)
}

/// Extracts the number from a point's value structure.
///
/// Accepts the nested object, a bare number, or either of those serialized
/// into a string (JSON or the single-quoted dict form older exports use).
/// `null` at either level is a gap and yields `Ok(None)`.
pub fn parse_numeric(value: &Value) -> ExportResult<Option<f64>> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_f64()
            .map(Some)
            .ok_or_else(|| ExportError::Parse(format!("number out of range: {n}"))),
        Value::Object(map) => match map.get(NUMERIC_KEY) {
            Some(Value::Object(_)) | None => Err(ExportError::Parse(format!(
                "value object has no usable '{NUMERIC_KEY}' field: {value}"
            ))),
            Some(inner) => parse_numeric(inner),
        },
        Value::String(text) => parse_numeric_text(text),
        other => Err(ExportError::Parse(format!("unexpected value shape: {other}"))),
    }
}

fn parse_numeric_text(text: &str) -> ExportResult<Option<f64>> {
    let trimmed = text.trim();
    if let Ok(n) = trimmed.parse::<f64>() {
        return Ok(Some(n));
    }

    let structured = serde_json::from_str::<Value>(trimmed).or_else(|_| {
        let normalized = trimmed.replace('\'', "\"").replace("None", "null");
        serde_json::from_str::<Value>(&normalized)
    });

    match structured {
        // A string that decodes to another string would loop; treat as garbage.
        Ok(Value::String(_)) | Err(_) => {
            Err(ExportError::Parse(format!("cannot extract number from '{text}'")))
        }
        Ok(inner) => parse_numeric(&inner),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn raw(ts: &str, value: Value) -> RawPoint {
        RawPoint {
            timestamp: Some(ts.to_string()),
            value: Some(value),
        }
    }

    #[test]
    fn test_numeric_round_trip() {
        for expected in [0.0, 5.0, -3.25, 12.345678, 1e-9, 98765.4321] {
            let payload = json!({ "Numeric": expected, "Display": format!("{expected}") });
            assert_eq!(parse_numeric(&payload).unwrap(), Some(expected));
        }

        for expected in [0.0, 5.0, -3.25, 0.5, 1024.125] {
            let stringified = format!("{{'Numeric': {expected:?}}}");
            assert_eq!(
                parse_numeric(&Value::String(stringified)).unwrap(),
                Some(expected)
            );
        }
    }

    #[test]
    fn test_null_numeric_is_a_gap() {
        assert_eq!(parse_numeric(&json!({ "Numeric": null })).unwrap(), None);
        assert_eq!(parse_numeric(&Value::Null).unwrap(), None);
    }

    #[test]
    fn test_missing_numeric_field_is_parse_error() {
        let err = parse_numeric(&json!({ "Display": "5.0" })).unwrap_err();
        assert!(matches!(err, ExportError::Parse(_)));

        let err = parse_numeric(&Value::String("{'Numeric': abc}".into())).unwrap_err();
        assert!(matches!(err, ExportError::Parse(_)));
    }

    #[test]
    fn test_timestamp_offset_is_stripped() {
        let (local, offset) = parse_timestamp("2021-07-01T13:45:00.0000000-06:00").unwrap();
        assert_eq!(
            local,
            NaiveDate::from_ymd_opt(2021, 7, 1)
                .unwrap()
                .and_hms_opt(13, 45, 0)
                .unwrap()
        );
        assert_eq!(offset, "-06:00");
    }

    #[test]
    fn test_subseconds_are_truncated() {
        let (local, _) = parse_timestamp("2021-07-01T13:45:00.9999999+00:00").unwrap();
        assert_eq!(local.nanosecond(), 0);
        assert_eq!(local.second(), 0);
    }

    #[test]
    fn test_sentinel_bounds_are_open() {
        assert_eq!(parse_bound(Some("0001-01-01T00:00:00.0000000+00:00")), None);
        assert_eq!(parse_bound(Some("9999-12-31T23:59:59.9999999+00:00")), None);
        assert_eq!(parse_bound(Some("not a date")), None);
        assert_eq!(parse_bound(Some("")), None);
        assert_eq!(parse_bound(None), None);
        assert!(parse_bound(Some("2021-01-01T00:00:00-07:00")).is_some());
    }

    #[test]
    fn test_load_points_preserves_order_and_site() {
        let points = load_points(
            "ABCD_001",
            &[
                raw("2021-01-01T00:00:00-07:00", json!({ "Numeric": 5.0 })),
                raw("2021-01-01T12:00:00-07:00", json!({ "Numeric": 7.0 })),
            ],
        )
        .unwrap();

        assert_eq!(points.len(), 2);
        assert_eq!(points[0].site, "ABCD_001");
        assert_eq!(points[0].value, Some(5.0));
        assert_eq!(points[1].value, Some(7.0));
        assert!(points[0].timestamp < points[1].timestamp);
        assert_eq!(points[1].utc_offset, "-07:00");
    }

    #[test]
    fn test_load_points_rejects_bad_timestamp() {
        let err = load_points("S", &[raw("yesterday", json!({ "Numeric": 1.0 }))]).unwrap_err();
        assert!(matches!(err, ExportError::Parse(_)));

        let missing = RawPoint {
            timestamp: None,
            value: Some(json!({ "Numeric": 1.0 })),
        };
        assert!(load_points("S", &[missing]).is_err());
    }
}
