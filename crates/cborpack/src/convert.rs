//! Bridge between [`Value`] and `serde_json::Value`.
//!
//! JSON has no byte strings, tags, big integers or non-finite floats, so the
//! mapping to JSON is lossy:
//!
//! - byte strings become `data:application/octet-stream;base64,...` strings,
//! - integers outside `i64`/`u64` become decimal strings,
//! - tags and timestamps are replaced by the value they wrap,
//! - simple values, NaN and infinities become `null`,
//! - non-text map keys are rendered as their JSON text.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{Map, Number};

use crate::integer::Integer;
use crate::value::{Epoch, Value};

const DATA_URI_PREFIX: &str = "data:application/octet-stream;base64,";

pub fn to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null | Value::Simple(_) => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Integer(i) => integer_to_json(i),
        Value::Float(f) => float_to_json(*f),
        Value::Bytes(b) => {
            serde_json::Value::String(format!("{DATA_URI_PREFIX}{}", STANDARD.encode(b)))
        }
        Value::Text(s) | Value::Symbol(s) => serde_json::Value::String(s.clone()),
        Value::Array(items) => serde_json::Value::Array(items.iter().map(to_json).collect()),
        Value::Map(entries) => {
            let mut out = Map::new();
            for (k, v) in entries {
                out.insert(key_to_string(k), to_json(v));
            }
            serde_json::Value::Object(out)
        }
        Value::Tagged(tagged) => to_json(&tagged.value),
        Value::Timestamp(Epoch::Integer(i)) => integer_to_json(i),
        Value::Timestamp(Epoch::Float(f)) => float_to_json(*f),
    }
}

fn integer_to_json(i: &Integer) -> serde_json::Value {
    if let Ok(n) = i64::try_from(i) {
        serde_json::Value::Number(Number::from(n))
    } else if let Ok(n) = u64::try_from(i) {
        serde_json::Value::Number(Number::from(n))
    } else {
        serde_json::Value::String(i.to_string())
    }
}

fn float_to_json(f: f64) -> serde_json::Value {
    Number::from_f64(f)
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null)
}

fn key_to_string(key: &Value) -> String {
    match key {
        Value::Text(s) | Value::Symbol(s) => s.clone(),
        other => to_json(other).to_string(),
    }
}

/// Maps JSON onto values. Strings carrying the byte-string data URI prefix
/// decode back into byte strings.
pub fn from_json(json: &serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(u) = n.as_u64() {
                Value::from(u)
            } else {
                Value::Float(n.as_f64().unwrap_or(0.0))
            }
        }
        serde_json::Value::String(s) => match s.strip_prefix(DATA_URI_PREFIX) {
            Some(b64) => match STANDARD.decode(b64) {
                Ok(bytes) => Value::Bytes(bytes),
                Err(_) => Value::Text(s.clone()),
            },
            None => Value::Text(s.clone()),
        },
        serde_json::Value::Array(items) => Value::Array(items.iter().map(from_json).collect()),
        serde_json::Value::Object(map) => Value::Map(
            map.iter()
                .map(|(k, v)| (Value::Text(k.clone()), from_json(v)))
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Simple;
    use serde_json::json;

    #[test]
    fn scalars_to_json() {
        assert_eq!(to_json(&Value::Null), json!(null));
        assert_eq!(to_json(&Value::from(true)), json!(true));
        assert_eq!(to_json(&Value::from(-5i8)), json!(-5));
        assert_eq!(to_json(&Value::from(u64::MAX)), json!(u64::MAX));
        assert_eq!(to_json(&Value::from(1.5)), json!(1.5));
        assert_eq!(to_json(&Value::Float(f64::NAN)), json!(null));
        assert_eq!(to_json(&Value::Simple(Simple::UNDEFINED)), json!(null));
    }

    #[test]
    fn big_integers_become_decimal_strings() {
        assert_eq!(
            to_json(&Value::from(1u128 << 64)),
            json!("18446744073709551616")
        );
        assert_eq!(
            to_json(&Value::from(-(1i128 << 64) - 1)),
            json!("-18446744073709551617")
        );
    }

    #[test]
    fn bytes_use_data_uri() {
        let value = Value::from(vec![0u8, 1, 2]);
        let json = to_json(&value);
        assert_eq!(json, json!("data:application/octet-stream;base64,AAEC"));
        assert_eq!(from_json(&json), value);
    }

    #[test]
    fn tags_unwrap_and_keys_stringify() {
        let value = Value::Map(vec![
            (Value::from("a"), Value::tagged(32, "http://x")),
            (Value::from(1u8), Value::Symbol("s".into())),
            (Value::Timestamp(Epoch::Integer(Integer::from(10u8))), Value::Null),
        ]);
        assert_eq!(
            to_json(&value),
            json!({"a": "http://x", "1": "s", "10": null})
        );
    }

    #[test]
    fn from_json_preserves_order() {
        let json: serde_json::Value = serde_json::from_str(r#"{"b": 1, "a": [2.5, "x"]}"#).unwrap();
        assert_eq!(
            from_json(&json),
            Value::Map(vec![
                (Value::from("b"), Value::from(1u8)),
                (
                    Value::from("a"),
                    Value::from(vec![Value::from(2.5), Value::from("x")])
                ),
            ])
        );
    }

    #[test]
    fn malformed_data_uri_stays_text() {
        let json = json!("data:application/octet-stream;base64,@@@");
        assert_eq!(
            from_json(&json),
            Value::from("data:application/octet-stream;base64,@@@")
        );
    }
}
