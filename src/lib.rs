//! keyrecord - typed records over a key-value store
//!
//! keyrecord maps structured records onto a key-value store's native
//! field-map, set and list primitives. Any entity type defined through it
//! gains CRUD, lookup by id, lookup by indexed attribute, to-many
//! associations and composable equality filters.
//!
//! # Quick Start
//!
//! ```ignore
//! use keyrecord::{AttributeType, EntityType, Keyspace, MemoryStore, Registry, Value};
//! use std::sync::Arc;
//!
//! let registry = Registry::new(Arc::new(MemoryStore::new()), Keyspace::new());
//! let service = registry.define(
//!     EntityType::builder("service")
//!         .attribute("name", AttributeType::String)
//!         .attribute("status", AttributeType::Boolean)
//!         .index_by("status"),
//! )?;
//!
//! let (svc, _) = service.create(vec![
//!     ("name", Value::from("svc1")),
//!     ("status", Value::Bool(true)),
//! ])?;
//! let up = service.find_by("status", true)?;
//! ```
//!
//! # Architecture
//!
//! - `keyrecord-core`: values, attribute kinds, key layout, the `Store` trait
//!   and atomic batches, configuration
//! - `keyrecord-storage`: the in-process `MemoryStore` and the delivery
//!   `WorkQueue`
//! - `keyrecord-records`: entity types, records, indexes, associations and
//!   filters

pub use keyrecord_core::{
    AttributeType, Batch, Command, Error, KeyrecordConfig, Keyspace, Result, StorageClass, Store,
    ValidationErrors, Value, Violation, CONFIG_FILE_NAME,
};
pub use keyrecord_records::{
    AttributeSchema, Change, EntityType, EntityTypeBuilder, Filter, HasMany, Index, Record,
    Registry,
};
pub use keyrecord_storage::{DeliveryOutcome, MemoryStore, WorkQueue};
