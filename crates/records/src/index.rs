//! Secondary indexes
//!
//! One index per (entity type, indexed attribute). Each distinct value owns a
//! store-resident set of the ids holding that value:
//!
//! ```text
//! check::by_enabled:true  -> {id1, id3}
//! check::by_enabled:false -> {id2}
//! ```
//!
//! Values without a deterministic text form (see [`index_text`]) have no
//! entry; reads resolve to empty results and writes are skipped.

use std::collections::HashSet;
use std::sync::Arc;

use keyrecord_core::{Keyspace, Result, Store, Value};
use tracing::trace;

use crate::codec::index_text;

/// Reverse map from one attribute's values to record ids
#[derive(Clone)]
pub struct Index {
    store: Arc<dyn Store>,
    keyspace: Keyspace,
    entity: String,
    attribute: String,
}

impl Index {
    pub(crate) fn new(
        store: Arc<dyn Store>,
        keyspace: Keyspace,
        entity: &str,
        attribute: &str,
    ) -> Self {
        Self {
            store,
            keyspace,
            entity: entity.to_string(),
            attribute: attribute.to_string(),
        }
    }

    /// Indexed attribute name
    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    /// Storage key of the entry for `value`, if the value has one
    pub fn key(&self, value: &Value) -> Option<String> {
        index_text(value).map(|text| self.keyspace.index_key(&self.entity, &self.attribute, &text))
    }

    /// Add `id` to the entry for `value`; returns whether it was added
    pub fn add_id(&self, value: &Value, id: &str) -> Result<bool> {
        let Some(key) = self.key(value) else {
            return Ok(false);
        };
        trace!(target: "keyrecord::index", key = %key, id, "Index add");
        Ok(self.store.set_add(&key, &[id.to_string()])? > 0)
    }

    /// Remove `id` from the entry for `value`; returns whether it was present
    pub fn delete_id(&self, value: &Value, id: &str) -> Result<bool> {
        let Some(key) = self.key(value) else {
            return Ok(false);
        };
        trace!(target: "keyrecord::index", key = %key, id, "Index delete");
        Ok(self.store.set_remove(&key, &[id.to_string()])? > 0)
    }

    /// Ids holding `value`
    pub fn ids(&self, value: &Value) -> Result<HashSet<String>> {
        match self.key(value) {
            Some(key) => self.store.set_members(&key),
            None => Ok(HashSet::new()),
        }
    }

    /// Number of ids holding `value`
    pub fn count(&self, value: &Value) -> Result<usize> {
        match self.key(value) {
            Some(key) => self.store.set_count(&key),
            None => Ok(0),
        }
    }

    /// Check whether `id` is in the entry for `value`
    pub fn contains(&self, value: &Value, id: &str) -> Result<bool> {
        match self.key(value) {
            Some(key) => self.store.set_contains(&key, id),
            None => Ok(false),
        }
    }
}

impl std::fmt::Debug for Index {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Index")
            .field("entity", &self.entity)
            .field("attribute", &self.attribute)
            .finish()
    }
}
