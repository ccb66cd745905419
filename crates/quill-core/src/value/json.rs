use super::Value;

use base64::Engine;
use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use std::str::FromStr;

const TYPE_TAG: &str = "$type";

impl From<serde_json::Value> for Value {
    /// Converts a JSON argument tree.
    ///
    /// Objects of the form `{"$type": "DbNull"}` (and `JsonNull`/`AnyNull`)
    /// become the null sentinels. `{"$type": "DateTime" | "Decimal" |
    /// "BigInt" | "Bytes", "value": ..}` become typed literals.
    fn from(json: serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(value) => Value::Bool(value),
            serde_json::Value::Number(number) => match number.as_i64() {
                Some(value) => Value::Int(value),
                None => Value::Float(number.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(value) => Value::String(value),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                if let Some(value) = tagged(&map) {
                    return value;
                }
                Value::Object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

fn tagged(map: &serde_json::Map<String, serde_json::Value>) -> Option<Value> {
    let tag = map.get(TYPE_TAG)?.as_str()?;

    match (tag, map.len()) {
        ("DbNull", 1) => return Some(Value::DbNull),
        ("JsonNull", 1) => return Some(Value::JsonNull),
        ("AnyNull", 1) => return Some(Value::AnyNull),
        _ => {}
    }

    if map.len() != 2 {
        return None;
    }

    let value = map.get("value")?;
    match tag {
        "DateTime" => DateTime::parse_from_rfc3339(value.as_str()?)
            .ok()
            .map(|dt| Value::DateTime(dt.with_timezone(&Utc))),
        "Decimal" => match value {
            serde_json::Value::String(s) => Decimal::from_str(s).ok().map(Value::Decimal),
            serde_json::Value::Number(n) => {
                Decimal::from_str(&n.to_string()).ok().map(Value::Decimal)
            }
            _ => None,
        },
        "BigInt" => match value {
            serde_json::Value::String(s) => s.parse().ok().map(Value::BigInt),
            serde_json::Value::Number(n) => n.as_i64().map(Value::BigInt),
            _ => None,
        },
        "Bytes" => base64::engine::general_purpose::STANDARD
            .decode(value.as_str()?)
            .ok()
            .map(Value::Bytes),
        _ => None,
    }
}

impl Value {
    /// Renders the value as plain JSON.
    ///
    /// Dates become RFC 3339 strings with millisecond precision, decimals
    /// become strings, bytes become base64 strings and every null sentinel
    /// becomes `null`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null | Value::DbNull | Value::JsonNull | Value::AnyNull => {
                serde_json::Value::Null
            }
            Value::Bool(value) => serde_json::Value::Bool(*value),
            Value::Int(value) | Value::BigInt(value) => serde_json::Value::from(*value),
            Value::Float(value) => serde_json::Number::from_f64(*value)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Decimal(value) => serde_json::Value::String(value.to_string()),
            Value::String(value) => serde_json::Value::String(value.clone()),
            Value::DateTime(value) => {
                serde_json::Value::String(value.to_rfc3339_opts(SecondsFormat::Millis, true))
            }
            Value::Bytes(value) => serde_json::Value::String(
                base64::engine::general_purpose::STANDARD.encode(value),
            ),
            Value::Json(value) => value.clone(),
            Value::List(items) => serde_json::Value::Array(items.iter().map(Value::to_json).collect()),
            Value::Object(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }
}
