//! Lenient numeric parsing for store documents.
//!
//! Documents written by older console versions store money and hours as
//! numbers, numeric strings, empty strings, or null. None of those may fail
//! deserialization; anything that is not a finite number becomes `None`.
//! Timestamps get the same treatment.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Parses a loosely-typed JSON value into a decimal.
///
/// # Examples
///
/// ```
/// use payroll_engine::models::parse_decimal;
/// use rust_decimal::Decimal;
/// use serde_json::json;
///
/// assert_eq!(parse_decimal(&json!(12.5)), Some(Decimal::new(125, 1)));
/// assert_eq!(parse_decimal(&json!(" 40 ")), Some(Decimal::new(40, 0)));
/// assert_eq!(parse_decimal(&json!("n/a")), None);
/// assert_eq!(parse_decimal(&json!(null)), None);
/// ```
pub fn parse_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(number) => parse_str(&number.to_string()),
        Value::String(text) => parse_str(text.trim()),
        _ => None,
    }
}

fn parse_str(text: &str) -> Option<Decimal> {
    if text.is_empty() {
        return None;
    }
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
}

/// `deserialize_with` adapter for `Option<Decimal>` fields.
pub(crate) fn lenient_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(parse_decimal))
}

/// `deserialize_with` adapter for flags stored as bools, strings, or numbers.
pub(crate) fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Bool(flag)) => flag,
        Some(Value::String(text)) => matches!(text.trim(), "true" | "TRUE" | "True" | "1" | "yes"),
        Some(Value::Number(number)) => number.as_f64().is_some_and(|n| n != 0.0),
        _ => false,
    })
}

/// `deserialize_with` adapter for optional flags.
pub(crate) fn lenient_opt_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(other) => lenient_bool(other).ok(),
    })
}

/// Parses a loosely-typed JSON timestamp.
///
/// Accepts RFC 3339 strings, bare `YYYY-MM-DD` dates (midnight UTC), epoch
/// milliseconds, and `{"seconds", "nanoseconds"}` objects with or without
/// leading underscores.
fn parse_datetime(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(text) => {
            let text = text.trim();
            DateTime::parse_from_rfc3339(text)
                .map(|parsed| parsed.with_timezone(&Utc))
                .ok()
                .or_else(|| {
                    NaiveDate::parse_from_str(text, "%Y-%m-%d")
                        .ok()
                        .and_then(|date| date.and_hms_opt(0, 0, 0))
                        .map(|naive| naive.and_utc())
                })
        }
        Value::Number(number) => number.as_i64().and_then(DateTime::from_timestamp_millis),
        Value::Object(fields) => {
            let part = |name: &str| {
                fields
                    .get(name)
                    .or_else(|| fields.get(&format!("_{}", name)))
                    .and_then(Value::as_i64)
            };
            let nanos = part("nanoseconds").unwrap_or(0);
            DateTime::from_timestamp(part("seconds")?, u32::try_from(nanos).ok()?)
        }
        _ => None,
    }
}

/// `deserialize_with` adapter for optional timestamps. Unreadable values
/// become `None`.
pub(crate) fn lenient_datetime<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(parse_datetime))
}

/// `deserialize_with` adapter that reads a null list as empty.
pub(crate) fn nullable_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Loose {
        #[serde(default, deserialize_with = "lenient_decimal")]
        value: Option<Decimal>,
        #[serde(default, deserialize_with = "lenient_bool")]
        flag: bool,
        #[serde(default, deserialize_with = "lenient_opt_bool")]
        maybe: Option<bool>,
        #[serde(default, deserialize_with = "lenient_datetime")]
        at: Option<DateTime<Utc>>,
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_number_and_string_forms_agree() {
        assert_eq!(parse_decimal(&json!(28.54)), Some(dec("28.54")));
        assert_eq!(parse_decimal(&json!("28.54")), Some(dec("28.54")));
        assert_eq!(parse_decimal(&json!(40)), Some(dec("40")));
    }

    #[test]
    fn test_scientific_notation() {
        assert_eq!(parse_decimal(&json!("1.5e2")), Some(dec("150")));
    }

    #[test]
    fn test_garbage_is_absent() {
        assert_eq!(parse_decimal(&json!("")), None);
        assert_eq!(parse_decimal(&json!("NaN")), None);
        assert_eq!(parse_decimal(&json!([1, 2])), None);
        assert_eq!(parse_decimal(&json!({"amount": 1})), None);
        assert_eq!(parse_decimal(&json!(true)), None);
    }

    #[test]
    fn test_missing_field_is_absent() {
        let loose: Loose = serde_json::from_value(json!({})).unwrap();
        assert_eq!(loose.value, None);
        assert!(!loose.flag);
        assert_eq!(loose.maybe, None);
    }

    #[test]
    fn test_malformed_field_does_not_fail() {
        let loose: Loose =
            serde_json::from_value(json!({"value": "abc", "flag": "true", "maybe": 0})).unwrap();
        assert_eq!(loose.value, None);
        assert!(loose.flag);
        assert_eq!(loose.maybe, Some(false));
    }

    #[test]
    fn test_timestamp_forms() {
        let expected = DateTime::parse_from_rfc3339("2024-03-05T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(parse_datetime(&json!("2024-03-05T00:00:00Z")), Some(expected));
        assert_eq!(parse_datetime(&json!("2024-03-05")), Some(expected));
        assert_eq!(parse_datetime(&json!(1_709_596_800_000i64)), Some(expected));
        assert_eq!(parse_datetime(&json!({"seconds": 1_709_596_800i64})), Some(expected));
        assert_eq!(
            parse_datetime(&json!({"_seconds": 1_709_596_800i64, "_nanoseconds": 0})),
            Some(expected)
        );
    }

    #[test]
    fn test_malformed_timestamp_is_absent() {
        for bad in [json!("yesterday"), json!("2024-13-45"), json!(true), json!([2024])] {
            let loose: Loose = serde_json::from_value(json!({"at": bad})).unwrap();
            assert_eq!(loose.at, None);
        }
    }

    #[test]
    fn test_zero_is_present() {
        let loose: Loose = serde_json::from_value(json!({"value": 0})).unwrap();
        assert_eq!(loose.value, Some(Decimal::ZERO));
    }
}
