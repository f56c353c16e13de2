//! Error types for keyrecord
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! ## Taxonomy
//!
//! - `Schema`: bad declaration, raised while an entity type is defined
//! - `Validation`: every attribute that failed type checks in one save attempt
//! - `Identity`: reassigning an id that is already set
//! - `TypeMismatch`: an association given a record of the wrong entity type
//! - `WrongType` / `Store`: failures reported by the store; never retried

use std::fmt;
use thiserror::Error;

/// Result type alias for keyrecord operations
pub type Result<T> = std::result::Result<T, Error>;

/// A single attribute that failed type validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Attribute name
    pub attribute: String,
    /// Human readable reason
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.attribute, self.message)
    }
}

/// All violations collected for one validation pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    violations: Vec<Violation>,
}

impl ValidationErrors {
    /// Create an empty collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a violation
    pub fn add(&mut self, attribute: impl Into<String>, message: impl Into<String>) {
        self.violations.push(Violation {
            attribute: attribute.into(),
            message: message.into(),
        });
    }

    /// Check if no violations were recorded
    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    /// Number of violations
    pub fn len(&self) -> usize {
        self.violations.len()
    }

    /// Violations in the order they were found
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Check whether an attribute has at least one violation
    pub fn contains(&self, attribute: &str) -> bool {
        self.violations.iter().any(|v| v.attribute == attribute)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.violations.iter().map(|v| v.to_string()).collect();
        f.write_str(&parts.join("; "))
    }
}

/// Error types for keyrecord
#[derive(Debug, Error)]
pub enum Error {
    /// Bad attribute or entity declaration
    #[error("Schema error: {0}")]
    Schema(String),

    /// One or more attributes hold values of the wrong representation
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    /// Attempt to replace an id that is already assigned
    #[error("Cannot reassign id '{current}' to '{attempted}'")]
    Identity {
        /// The id already held by the record
        current: String,
        /// The rejected replacement
        attempted: String,
    },

    /// Association given a record of another entity type
    #[error("Type mismatch: expected a '{expected}' record, got '{actual}'")]
    TypeMismatch {
        /// Declared associated type
        expected: String,
        /// Type of the record that was passed
        actual: String,
    },

    /// Attribute not declared on the entity type
    #[error("Unknown attribute '{attribute}' for '{entity}'")]
    UnknownAttribute {
        /// Entity type name
        entity: String,
        /// Attribute name
        attribute: String,
    },

    /// Lookup or filter over an attribute that has no index
    #[error("Attribute '{attribute}' of '{entity}' is not indexed")]
    NotIndexed {
        /// Entity type name
        entity: String,
        /// Attribute name
        attribute: String,
    },

    /// Attribute exists but cannot be used for the requested operation
    #[error("Invalid attribute '{attribute}' of '{entity}': {reason}")]
    InvalidAttribute {
        /// Entity type name
        entity: String,
        /// Attribute name
        attribute: String,
        /// Why the attribute was rejected
        reason: String,
    },

    /// Operation needs a record id and none is assigned
    #[error("Record has no id")]
    MissingId,

    /// Id cannot be used as part of a key
    #[error("Invalid id: {0:?}")]
    InvalidId(String),

    /// Stored text could not be converted back to the declared kind
    #[error("Cannot decode attribute '{attribute}' from {value:?}: {reason}")]
    Decode {
        /// Attribute name
        attribute: String,
        /// Raw stored text
        value: String,
        /// Parser message
        reason: String,
    },

    /// Key holds a structure other than the one the command operates on
    #[error("Wrong type for key '{key}': expected {expected}")]
    WrongType {
        /// Offending key
        key: String,
        /// Structure the command needed
        expected: &'static str,
    },

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration could not be read or is invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// Store communication error
    #[error("Store error: {0}")]
    Store(String),
}

impl Error {
    /// Violations carried by a validation error
    pub fn violations(&self) -> Option<&ValidationErrors> {
        match self {
            Error::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
