//! Shared fixtures for the monitoring domain suite.

#![allow(dead_code)]

use std::sync::{Arc, Once};

use keyrecord::{AttributeType, EntityType, Keyspace, MemoryStore, Record, Registry, Store};

static INIT_TRACING: Once = Once::new();

/// Route library logs to the test harness output.
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::DEBUG)
            .try_init();
    });
}

pub struct Domain {
    pub store: Arc<MemoryStore>,
    pub registry: Registry,
    pub service: Arc<EntityType>,
    pub check: Arc<EntityType>,
    pub medium: Arc<EntityType>,
    pub contact: Arc<EntityType>,
}

/// Registry with the monitoring entity types defined.
pub fn domain() -> Domain {
    init_tracing();
    let store = Arc::new(MemoryStore::new());
    let registry = Registry::new(store.clone() as Arc<dyn Store>, Keyspace::new());

    let service = registry
        .define(
            EntityType::builder("service")
                .attribute("name", AttributeType::String)
                .attribute("status", AttributeType::Boolean)
                .index_by("status"),
        )
        .unwrap();

    let check = registry
        .define(
            EntityType::builder("check")
                .attribute("name", AttributeType::String)
                .attribute("state", AttributeType::String)
                .attribute("enabled", AttributeType::Boolean)
                .attribute("last_update", AttributeType::Timestamp)
                .attribute("tags", AttributeType::Set)
                .index_by("state")
                .index_by("enabled"),
        )
        .unwrap();

    let medium = registry
        .define(
            EntityType::builder("medium")
                .attribute("transport", AttributeType::String)
                .attribute("address", AttributeType::String)
                .attribute("interval", AttributeType::Integer)
                .attribute("rollup_threshold", AttributeType::Integer)
                .index_by("transport"),
        )
        .unwrap();

    let contact = registry
        .define(
            EntityType::builder("contact")
                .attribute("first_name", AttributeType::String)
                .attribute("last_name", AttributeType::String)
                .attribute("email", AttributeType::String)
                .attribute("timezone", AttributeType::String)
                .attribute("tags", AttributeType::Set)
                .attribute("preferences", AttributeType::JsonString)
                .has_many("checks", &check)
                .has_many("media", &medium),
        )
        .unwrap();

    Domain {
        store,
        registry,
        service,
        check,
        medium,
        contact,
    }
}

/// Text value of an attribute, if set.
pub fn text(record: &Record, attribute: &str) -> Option<String> {
    record
        .get(attribute)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
}

/// Sorted text values of one attribute across records.
pub fn texts(records: &[Record], attribute: &str) -> Vec<String> {
    let mut values: Vec<String> = records.iter().filter_map(|r| text(r, attribute)).collect();
    values.sort();
    values
}
