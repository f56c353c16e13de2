//! Record layer for keyrecord
//!
//! Maps typed records onto a store's field-maps, sets and lists:
//! - AttributeSchema / Validator: declared kinds and type checks
//! - ChangeTracker: old/new values per attribute
//! - codec: text encoding of simple attributes and index values
//! - EntityType / EntityTypeBuilder: declaration plus type-level operations
//! - Registry: entity types bound to one store, optionally process-wide
//! - Record: load, save and destroy lifecycle
//! - Index: value -> ids reverse maps
//! - HasMany: to-many reference sets
//! - Filter: equality queries by index intersection
//!
//! # Example
//!
//! ```ignore
//! let registry = Registry::new(store, Keyspace::new());
//! let check = registry.define(
//!     EntityType::builder("check")
//!         .attribute("name", AttributeType::String)
//!         .attribute("enabled", AttributeType::Boolean)
//!         .index_by("enabled"),
//! )?;
//!
//! let (mut svc, saved) = check.create([("name", Value::from("svc1")), ("enabled", Value::Bool(true))])?;
//! let enabled = check.find_by("enabled", true)?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod association;
pub mod changes;
pub mod codec;
pub mod entity;
pub mod filter;
pub mod index;
pub mod record;
pub mod registry;
pub mod schema;
pub mod temp;
pub mod validator;

pub use association::HasMany;
pub use changes::{Change, ChangeTracker};
pub use entity::{AssociationDef, EntityType, EntityTypeBuilder};
pub use filter::Filter;
pub use index::Index;
pub use record::Record;
pub use registry::Registry;
pub use schema::{AttributeSchema, ID_ATTRIBUTE};
pub use temp::TempKey;
pub use validator::Validator;
