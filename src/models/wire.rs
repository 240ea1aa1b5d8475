// Lenient field decoders for server payloads
//
// The API is not strict about scalar types: identifiers arrive as integers or
// strings, costs as numbers or formatted strings, timestamps with or without
// an offset. These helpers normalise them at the decode boundary.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

/// Identifier sent as a string or an integer
pub fn id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or integer identifier, got {}",
            other
        ))),
    }
}

/// Optional identifier sent as a string or an integer
pub fn opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(scalar_to_string))
}

/// Any scalar rendered as text; null becomes empty
pub fn text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(scalar_to_string).unwrap_or_default())
}

/// Optional scalar rendered as text
pub fn opt_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(scalar_to_string))
}

/// Percentage as integer, float or numeric string, clamped to 0..=100
pub fn percent<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let raw = match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().trim_end_matches('%').parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    Ok(raw.round().clamp(0.0, 100.0) as u8)
}

/// Map whose values should be names; non-string values keep their JSON text
pub fn string_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<BTreeMap<String, Value>>::deserialize(deserializer)?;
    Ok(value
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(k, v)| scalar_to_string(&v).map(|v| (k, v)))
        .collect())
}

/// Parse an RFC 3339 timestamp, or an offset-less one taken as UTC
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .map(|naive| naive.and_utc())
        .map_err(|e| format!("Invalid timestamp '{}': {}", raw, e))
}

/// `#[serde(with = "wire::timestamp")]`
pub mod timestamp {
    use super::*;

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse_timestamp(&raw).map_err(serde::de::Error::custom)
    }
}

/// `#[serde(default, with = "wire::opt_timestamp")]`
pub mod opt_timestamp {
    use super::*;

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(dt) => serializer.serialize_some(&dt.to_rfc3339()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            Some(raw) if !raw.trim().is_empty() => parse_timestamp(&raw)
                .map(Some)
                .map_err(serde::de::Error::custom),
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Sample {
        #[serde(deserialize_with = "id")]
        id: String,
        #[serde(default, deserialize_with = "percent")]
        progress: u8,
        #[serde(default, deserialize_with = "string_map")]
        services: BTreeMap<String, String>,
        #[serde(default, with = "opt_timestamp")]
        created_at: Option<DateTime<Utc>>,
    }

    #[test]
    fn test_ids_accept_integers() {
        let s: Sample = serde_json::from_value(json!({"id": 42})).unwrap();
        assert_eq!(s.id, "42");
        let s: Sample = serde_json::from_value(json!({"id": "p1"})).unwrap();
        assert_eq!(s.id, "p1");
        assert!(serde_json::from_value::<Sample>(json!({"id": [1]})).is_err());
    }

    #[test]
    fn test_percent_is_clamped() {
        let cases = [
            (json!(42), 42),
            (json!(42.6), 43),
            (json!("75%"), 75),
            (json!(140), 100),
            (json!(-3), 0),
            (json!(null), 0),
        ];
        for (raw, expected) in cases {
            let s: Sample = serde_json::from_value(json!({"id": "x", "progress": raw})).unwrap();
            assert_eq!(s.progress, expected);
        }
    }

    #[test]
    fn test_string_map_keeps_names() {
        let s: Sample = serde_json::from_value(json!({
            "id": "x",
            "services": {"compute": "AWS Lambda", "replicas": 3, "cdn": null}
        }))
        .unwrap();
        assert_eq!(s.services.get("compute").map(String::as_str), Some("AWS Lambda"));
        assert_eq!(s.services.get("replicas").map(String::as_str), Some("3"));
        assert!(!s.services.contains_key("cdn"));
    }

    #[test]
    fn test_offsetless_timestamps_are_utc() {
        let s: Sample = serde_json::from_value(json!({
            "id": "x",
            "created_at": "2024-03-01T10:15:30.123456"
        }))
        .unwrap();
        let dt = s.created_at.unwrap();
        assert_eq!((dt.year(), dt.month(), dt.day()), (2024, 3, 1));
        assert_eq!((dt.hour(), dt.minute(), dt.second()), (10, 15, 30));

        let with_offset = parse_timestamp("2024-03-01T12:15:30+02:00").unwrap();
        assert_eq!(with_offset.hour(), 10);
        assert!(parse_timestamp("yesterday").is_err());
    }
}
