//! Core types and traits for keyrecord
//!
//! This crate defines the foundational types used throughout the system:
//! - Value: in-memory attribute value
//! - AttributeType: declared kind of an attribute
//! - Keyspace: key layout for ids, attributes, indexes and associations
//! - Batch / Command: atomic groups of store mutations
//! - Store: the store primitives the record layer is built on
//! - Error: Error type hierarchy
//! - KeyrecordConfig: `keyrecord.toml` configuration

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod batch;
pub mod config;
pub mod error;
pub mod key;
pub mod traits;
pub mod types;
pub mod value;

pub use batch::{Batch, Command};
pub use config::{KeyrecordConfig, CONFIG_FILE_NAME};
pub use error::{Error, Result, ValidationErrors, Violation};
pub use key::{random_hex, validate_segment, KeyError, Keyspace};
pub use traits::Store;
pub use types::{AttributeType, StorageClass};
pub use value::Value;
