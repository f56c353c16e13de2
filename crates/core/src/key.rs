//! Key layout for keyrecord
//!
//! Every store key is derived here so the layout lives in one place.
//! For entity type `t` and record id `i`:
//!
//! | Structure | Key |
//! |-----------|-----|
//! | id-set | `t::ids` |
//! | simple attributes (field-map) | `t:i:attrs` |
//! | complex attribute `a` | `t:i:attrs:a` |
//! | index entry | `t::by_a:<value>` |
//! | association `n` | `t:i:n_ids` |
//! | temporary set | `t::tmp:<32 hex>` |
//!
//! An optional namespace is prepended as `ns:`. Type names and ids are
//! key segments and must not contain the `:` separator.

use thiserror::Error;
use uuid::Uuid;

/// Separator between key segments
pub const SEPARATOR: char = ':';

/// Validate a single key segment (type name, attribute name or id)
pub fn validate_segment(segment: &str) -> Result<(), KeyError> {
    if segment.is_empty() {
        return Err(KeyError::Empty);
    }
    if segment.contains('\x00') {
        return Err(KeyError::ContainsNul);
    }
    if segment.contains(SEPARATOR) {
        return Err(KeyError::ContainsSeparator);
    }
    Ok(())
}

/// Key segment validation errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    /// Segment is empty
    #[error("key segment cannot be empty")]
    Empty,

    /// Segment contains NUL byte (\0)
    #[error("key segment cannot contain NUL bytes")]
    ContainsNul,

    /// Segment contains the separator
    #[error("key segment cannot contain '{}'", SEPARATOR)]
    ContainsSeparator,
}

/// Builds store keys, optionally under a namespace
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Keyspace {
    namespace: Option<String>,
}

impl Keyspace {
    /// Keys without a namespace prefix
    pub fn new() -> Self {
        Self { namespace: None }
    }

    /// Keys prefixed with `namespace:`
    pub fn with_namespace(namespace: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
        }
    }

    /// Namespace prefix, if any
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Base key of an entity type
    pub fn type_key(&self, entity: &str) -> String {
        match &self.namespace {
            Some(ns) => format!("{}:{}", ns, entity),
            None => entity.to_string(),
        }
    }

    /// Set of all persisted ids of an entity type
    pub fn ids_key(&self, entity: &str) -> String {
        format!("{}::ids", self.type_key(entity))
    }

    /// Base key of one record
    pub fn record_key(&self, entity: &str, id: &str) -> String {
        format!("{}:{}", self.type_key(entity), id)
    }

    /// Field-map holding a record's simple attributes
    pub fn attributes_key(&self, entity: &str, id: &str) -> String {
        format!("{}:attrs", self.record_key(entity, id))
    }

    /// Dedicated key of a complex attribute
    pub fn complex_key(&self, entity: &str, id: &str, attribute: &str) -> String {
        format!("{}:attrs:{}", self.record_key(entity, id), attribute)
    }

    /// Index entry for one attribute value
    pub fn index_key(&self, entity: &str, attribute: &str, value: &str) -> String {
        format!("{}::by_{}:{}", self.type_key(entity), attribute, value)
    }

    /// Reference set of a to-many association
    pub fn association_key(&self, entity: &str, id: &str, name: &str) -> String {
        format!("{}:{}_ids", self.record_key(entity, id), name)
    }

    /// Fresh, unique key for a temporary set
    pub fn temp_key(&self, entity: &str) -> String {
        format!("{}::tmp:{}", self.type_key(entity), random_hex())
    }
}

/// 128 random bits as 32 lowercase hex characters
pub fn random_hex() -> String {
    Uuid::new_v4().simple().to_string()
}
