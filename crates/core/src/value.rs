//! Value types for keyrecord
//!
//! This module defines:
//! - Value: in-memory representation of a record attribute
//!
//! ## Value Model
//!
//! A `Value` is what callers read from and write to a record. Each
//! [`AttributeType`](crate::types::AttributeType) admits a fixed set of
//! variants; the type validator checks a value against that set before
//! anything is written to the store.
//!
//! - Scalars: `Null`, `Bool`, `Int`, `Time`, `String`
//! - Collections of text: `List` (ordered), `Set` (unordered), `Map` (field-map)
//! - `Json`: an arbitrary serializable document, stored as serialized text
//!
//! Different variants are never equal, even if they render to the same
//! text: `Int(1) != String("1")`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// In-memory attribute value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Absent value; never written to the store
    Null,
    /// Boolean value
    Bool(bool),
    /// 64-bit signed integer
    Int(i64),
    /// Calendar time (UTC)
    Time(DateTime<Utc>),
    /// UTF-8 text
    String(String),
    /// Ordered sequence of text
    List(Vec<String>),
    /// Unordered set of text
    Set(HashSet<String>),
    /// Field-map of text to text
    Map(HashMap<String, String>),
    /// Arbitrary JSON document
    Json(serde_json::Value),
}

impl Value {
    /// Get the representation name as a string
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Bool(_) => "Bool",
            Value::Int(_) => "Int",
            Value::Time(_) => "Time",
            Value::String(_) => "String",
            Value::List(_) => "List",
            Value::Set(_) => "Set",
            Value::Map(_) => "Map",
            Value::Json(_) => "Json",
        }
    }

    /// Check if this is a null value
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Blank values are dropped from storage rather than written.
    ///
    /// Null, whitespace-only text, empty collections and JSON null / empty
    /// containers are blank. Numbers, times and booleans never are.
    pub fn is_blank(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Bool(_) | Value::Int(_) | Value::Time(_) => false,
            Value::String(s) => s.trim().is_empty(),
            Value::List(l) => l.is_empty(),
            Value::Set(s) => s.is_empty(),
            Value::Map(m) => m.is_empty(),
            Value::Json(j) => match j {
                serde_json::Value::Null => true,
                serde_json::Value::String(s) => s.trim().is_empty(),
                serde_json::Value::Array(a) => a.is_empty(),
                serde_json::Value::Object(o) => o.is_empty(),
                _ => false,
            },
        }
    }

    /// Get as bool if this is a Bool value
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as i64 if this is an Int value
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as &str if this is a String value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as a slice if this is a List value
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    /// Get as &HashSet if this is a Set value
    pub fn as_set(&self) -> Option<&HashSet<String>> {
        match self {
            Value::Set(s) => Some(s),
            _ => None,
        }
    }

    /// Get as &HashMap if this is a Map value
    pub fn as_map(&self) -> Option<&HashMap<String, String>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Convert to a JSON document.
    ///
    /// Times become RFC 3339 strings and sets become arrays.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::Number((*i).into()),
            Value::Time(t) => serde_json::Value::String(t.to_rfc3339()),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::List(l) => {
                serde_json::Value::Array(l.iter().cloned().map(serde_json::Value::String).collect())
            }
            Value::Set(s) => {
                let mut members: Vec<&String> = s.iter().collect();
                members.sort();
                serde_json::Value::Array(
                    members
                        .into_iter()
                        .cloned()
                        .map(serde_json::Value::String)
                        .collect(),
                )
            }
            Value::Map(m) => serde_json::Value::Object(
                m.iter()
                    .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
                    .collect(),
            ),
            Value::Json(j) => j.clone(),
        }
    }

    /// Convert a JSON document back to a value.
    ///
    /// Strings and integers map to `String` and `Int`; every other document
    /// stays `Json`, so a decoded value always passes `json_string`
    /// validation.
    pub fn from_json(json: serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Number(ref n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Json(json),
            },
            other => Value::Json(other),
        }
    }
}

// ============================================================================
// From implementations for ergonomic API usage
// ============================================================================

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i as i64)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(t: DateTime<Utc>) -> Self {
        Value::Time(t)
    }
}

impl From<Vec<String>> for Value {
    fn from(l: Vec<String>) -> Self {
        Value::List(l)
    }
}

impl From<Vec<&str>> for Value {
    fn from(l: Vec<&str>) -> Self {
        Value::List(l.into_iter().map(str::to_string).collect())
    }
}

impl From<HashSet<String>> for Value {
    fn from(s: HashSet<String>) -> Self {
        Value::Set(s)
    }
}

impl From<HashMap<String, String>> for Value {
    fn from(m: HashMap<String, String>) -> Self {
        Value::Map(m)
    }
}

impl From<serde_json::Value> for Value {
    fn from(j: serde_json::Value) -> Self {
        Value::Json(j)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(o: Option<T>) -> Self {
        o.map(Into::into).unwrap_or(Value::Null)
    }
}
