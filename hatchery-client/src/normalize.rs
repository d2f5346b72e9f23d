//! Response normalization
//!
//! The farm backend is inconsistent: list endpoints return either a bare array
//! or an object wrapping it (`{"tanks": [...]}`), single records may come back
//! bare or wrapped, ids show up as strings, numbers or populated objects, and
//! counts may be numeric strings. Everything is funnelled through here so the
//! allocation logic only ever sees canonical types.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{BackendError, Result};

/// Wrapper key used by `GET /tanksNew`
pub const TANKS_KEY: &str = "tanks";
/// Wrapper key used by `GET /breeding`
pub const BREEDING_KEY: &str = "breedingRecords";
/// Wrapper key used by `GET /babies`
pub const BABIES_KEY: &str = "babyRecords";

/// Unwrap a list payload that is either `[...]` or `{ key: [...] }`.
pub fn list_from_value<T: DeserializeOwned>(value: Value, key: &str) -> Result<Vec<T>> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove(key) {
            Some(Value::Array(items)) => items,
            Some(Value::Null) => Vec::new(),
            Some(other) => {
                return Err(BackendError::InvalidResponse(format!(
                    "expected `{}` to be an array, got {}",
                    key,
                    kind(&other)
                )))
            }
            None => {
                return Err(BackendError::InvalidResponse(format!(
                    "object response has no `{}` field",
                    key
                )))
            }
        },
        Value::Null => Vec::new(),
        other => {
            return Err(BackendError::InvalidResponse(format!(
                "expected a list, got {}",
                kind(&other)
            )))
        }
    };

    items
        .into_iter()
        .map(|item| serde_json::from_value(item).map_err(BackendError::from))
        .collect()
}

/// Unwrap a single record that is either bare or `{ key: {...} }`.
///
/// Returns `Ok(None)` for empty bodies and for acknowledgements that carry
/// no record (e.g. `{"message": "updated"}`).
pub fn record_from_value<T: DeserializeOwned>(value: Value, key: &str) -> Result<Option<T>> {
    let candidate = match value {
        Value::Null => return Ok(None),
        Value::Object(mut map) => match map.remove(key) {
            Some(inner @ Value::Object(_)) => inner,
            _ => Value::Object(map),
        },
        other => {
            return Err(BackendError::InvalidResponse(format!(
                "expected a record, got {}",
                kind(&other)
            )))
        }
    };

    let has_id = candidate.get("id").is_some() || candidate.get("_id").is_some();
    if !has_id {
        return Ok(None);
    }
    Ok(Some(serde_json::from_value(candidate)?))
}

/// Best available human message for a failed response.
///
/// Prefers a `message` or `error` field of a JSON body, then the raw body,
/// then the status reason phrase.
pub fn error_message(status: u16, body: &str) -> String {
    let trimmed = body.trim();
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(trimmed) {
        for field in ["message", "error", "detail"] {
            if let Some(Value::String(message)) = map.get(field) {
                if !message.is_empty() {
                    return message.clone();
                }
            }
        }
    }
    if !trimmed.is_empty() {
        return trimmed.to_string();
    }
    reqwest::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("request failed")
        .to_string()
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Field-level deserializers tolerant of what the forms upstream produce.
pub(crate) mod lenient {
    use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    fn id_from_value(value: &Value) -> Option<String> {
        match value {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            Value::Object(map) => map.get("_id").or_else(|| map.get("id")).and_then(id_from_value),
            _ => None,
        }
    }

    /// String, number, or populated `{ "_id": ... }` reference.
    pub fn id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        let value = Value::deserialize(deserializer)?;
        id_from_value(&value).ok_or_else(|| D::Error::custom(format!("expected an id, got {}", value)))
    }

    pub fn opt_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(id_from_value(&value))
    }

    pub fn text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
    }

    fn number_from_value(value: &Value) -> Option<f64> {
        match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    fn count_from_value(value: &Value) -> Option<u32> {
        let n = number_from_value(value)?;
        if n.is_finite() && n >= 0.0 && n.fract() == 0.0 && n <= u32::MAX as f64 {
            Some(n as u32)
        } else {
            None
        }
    }

    /// Non-negative integer, as a number or a numeric string.
    pub fn count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
        let value = Value::deserialize(deserializer)?;
        if value.is_null() {
            return Ok(0);
        }
        count_from_value(&value)
            .ok_or_else(|| D::Error::custom(format!("expected a non-negative integer, got {}", value)))
    }

    pub fn opt_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(count_from_value(&value))
    }

    pub fn opt_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(number_from_value(&value))
    }

    pub(crate) fn parse_date(raw: &str) -> Option<NaiveDate> {
        let raw = raw.trim();
        if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            return Some(date);
        }
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc).date_naive());
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|dt| dt.date())
    }

    /// `YYYY-MM-DD` or a full ISO-8601 timestamp.
    pub fn date<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_date(&raw).ok_or_else(|| D::Error::custom(format!("invalid date `{}`", raw)))
    }

    pub fn opt_datetime<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        let Some(raw) = Option::<String>::deserialize(deserializer)? else {
            return Ok(None);
        };
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw.trim()) {
            return Ok(Some(dt.with_timezone(&Utc)));
        }
        Ok(parse_date(&raw)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc()))
    }
}
