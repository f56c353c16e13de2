//! Text encoding of simple attributes and index values
//!
//! | Kind | In memory | Stored |
//! |------|-----------|--------|
//! | string, id | `String` | text, omitted if blank |
//! | integer | `Int` | decimal text |
//! | timestamp | `Int`, `Time` | decimal seconds |
//! | boolean | `Bool` | `"true"` / `"false"` |
//! | json_string | any | serialized JSON, omitted if blank |
//!
//! An omitted value (`None`) removes the field from the record's field-map.
//! Complex kinds never pass through here; they live in their own keys.

use keyrecord_core::{AttributeType, Error, Result, Value};

/// Stored text of a simple attribute, or `None` to remove the field
pub fn encode_simple(kind: AttributeType, value: &Value) -> Result<Option<String>> {
    if value.is_null() {
        return Ok(None);
    }
    if kind == AttributeType::JsonString {
        if value.is_blank() {
            return Ok(None);
        }
        return Ok(Some(serde_json::to_string(&value.to_json())?));
    }
    match value {
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        Value::Int(i) => Ok(Some(i.to_string())),
        Value::Time(t) => Ok(Some(t.timestamp().to_string())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        other => Err(Error::Serialization(format!(
            "cannot store {} as {}",
            other.type_name(),
            kind
        ))),
    }
}

/// Value of a simple attribute from its stored text
pub fn decode_simple(attribute: &str, kind: AttributeType, raw: &str) -> Result<Value> {
    let decode_error = |reason: String| Error::Decode {
        attribute: attribute.to_string(),
        value: raw.to_string(),
        reason,
    };
    match kind {
        AttributeType::Integer | AttributeType::Timestamp => raw
            .trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|e| decode_error(e.to_string())),
        AttributeType::Boolean => Ok(Value::Bool(raw.eq_ignore_ascii_case("true"))),
        AttributeType::JsonString => {
            if raw.is_empty() {
                return Ok(Value::Null);
            }
            serde_json::from_str(raw)
                .map(Value::from_json)
                .map_err(|e| decode_error(e.to_string()))
        }
        AttributeType::String | AttributeType::Id => Ok(Value::String(raw.to_string())),
        AttributeType::List | AttributeType::Set | AttributeType::Hash => {
            Err(decode_error(format!("{} is not stored in the field-map", kind)))
        }
    }
}

/// Text naming a value's index entry
///
/// Only scalars with a deterministic text form have one; blank text, nulls,
/// times, collections and JSON documents resolve to `None`.
pub fn index_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Int(i) => Some(i.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
