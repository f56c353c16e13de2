//! Attribute type declarations
//!
//! Every attribute of an entity type is declared with one of nine kinds.
//! A kind determines:
//! - which in-memory [`Value`] variants are acceptable (checked by the validator)
//! - where the value lives in the store (inside the record's field-map, or in
//!   a dedicated list/set/field-map key of its own)
//! - whether the attribute can carry a secondary index

use crate::error::{Error, Result};
use crate::value::Value;
use std::fmt;
use std::str::FromStr;

/// Declared kind of a record attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeType {
    /// Free text
    String,
    /// Signed integer
    Integer,
    /// Identifier of another record
    Id,
    /// Point in time; numeric seconds or calendar time
    Timestamp,
    /// true / false
    Boolean,
    /// Ordered list of text, stored in its own list key
    List,
    /// Unordered set of text, stored in its own set key
    Set,
    /// Field-map of text, stored in its own field-map key
    Hash,
    /// Any serializable value, stored as serialized JSON text
    JsonString,
}

/// Where an attribute's value is persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageClass {
    /// A field in the record's shared field-map
    Simple,
    /// A dedicated key holding a list, set or field-map
    Complex,
}

impl AttributeType {
    /// All kinds, in declaration order
    pub const ALL: [AttributeType; 9] = [
        AttributeType::String,
        AttributeType::Integer,
        AttributeType::Id,
        AttributeType::Timestamp,
        AttributeType::Boolean,
        AttributeType::List,
        AttributeType::Set,
        AttributeType::Hash,
        AttributeType::JsonString,
    ];

    /// Name used in declarations (`"string"`, `"json_string"`, ...)
    pub fn as_str(&self) -> &'static str {
        match self {
            AttributeType::String => "string",
            AttributeType::Integer => "integer",
            AttributeType::Id => "id",
            AttributeType::Timestamp => "timestamp",
            AttributeType::Boolean => "boolean",
            AttributeType::List => "list",
            AttributeType::Set => "set",
            AttributeType::Hash => "hash",
            AttributeType::JsonString => "json_string",
        }
    }

    /// Representation names accepted for this kind, as reported in
    /// validation messages
    pub fn accepted(&self) -> &'static [&'static str] {
        match self {
            AttributeType::String | AttributeType::Id => &["String"],
            AttributeType::Integer => &["Int"],
            AttributeType::Timestamp => &["Int", "Time"],
            AttributeType::Boolean => &["Bool"],
            AttributeType::List => &["List", "Set"],
            AttributeType::Set => &["Set"],
            AttributeType::Hash => &["Map"],
            AttributeType::JsonString => &["String", "Int", "List", "Set", "Map", "Json"],
        }
    }

    /// Check whether a non-null value is an acceptable representation
    pub fn accepts(&self, value: &Value) -> bool {
        self.accepted().contains(&value.type_name())
    }

    /// Storage class of this kind
    pub fn storage_class(&self) -> StorageClass {
        match self {
            AttributeType::List | AttributeType::Set | AttributeType::Hash => StorageClass::Complex,
            _ => StorageClass::Simple,
        }
    }

    /// Whether this kind is stored in a dedicated key
    pub fn is_complex(&self) -> bool {
        self.storage_class() == StorageClass::Complex
    }

    /// Only kinds with a deterministic text form can back an index
    pub fn is_indexable(&self) -> bool {
        matches!(
            self,
            AttributeType::String | AttributeType::Id | AttributeType::Integer | AttributeType::Boolean
        )
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttributeType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        AttributeType::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| Error::Schema(format!("Unknown attribute type '{}'", s)))
    }
}
