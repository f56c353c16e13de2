//! Composable equality queries
//!
//! A [`Filter`] accumulates `(attribute, value)` constraints over indexed
//! attributes and answers them by intersecting the matching index entries
//! (and, when scoped to an association, the association's reference set)
//! into a temporary store-side set.
//!
//! Resolution rules:
//! - constraining an attribute without an index fails with `Error::NotIndexed`
//! - a constraint value with no index entry (collections, blank text, ...)
//!   matches nothing
//! - with no scope and no constraints, every persisted record matches

use std::collections::HashSet;
use std::sync::Arc;

use keyrecord_core::{Result, Value};
use tracing::debug;

use crate::entity::EntityType;
use crate::record::Record;
use crate::temp::TempKey;

/// Query over one entity type
#[derive(Clone)]
pub struct Filter {
    entity: Arc<EntityType>,
    scope: Option<String>,
    constraints: Vec<(String, Value)>,
}

impl Filter {
    pub(crate) fn new(entity: Arc<EntityType>, scope: Option<String>) -> Self {
        Self {
            entity,
            scope,
            constraints: Vec::new(),
        }
    }

    /// Add constraints; chainable
    pub fn filter<K, V>(mut self, constraints: impl IntoIterator<Item = (K, V)>) -> Result<Self>
    where
        K: AsRef<str>,
        V: Into<Value>,
    {
        for (attribute, value) in constraints {
            let attribute = attribute.as_ref();
            // Fails for undeclared or unindexed attributes
            self.entity.index(attribute)?;
            self.constraints.push((attribute.to_string(), value.into()));
        }
        Ok(self)
    }

    /// Accumulated constraints, in order
    pub fn constraints(&self) -> &[(String, Value)] {
        &self.constraints
    }

    /// Association reference set this query is scoped to
    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    /// Keys to intersect, or `None` when some constraint matches nothing
    fn resolve_steps(&self) -> Result<Option<Vec<String>>> {
        let mut keys = Vec::with_capacity(self.constraints.len() + 1);
        if let Some(scope) = &self.scope {
            keys.push(scope.clone());
        }
        for (attribute, value) in &self.constraints {
            match self.entity.index(attribute)?.key(value) {
                Some(key) => keys.push(key),
                None => return Ok(None),
            }
        }
        if keys.is_empty() {
            keys.push(self.entity.ids_key());
        }
        Ok(Some(keys))
    }

    /// Run the intersection into a temporary key and hand it to `read`
    fn with_result<T>(
        &self,
        empty: T,
        read: impl FnOnce(&TempKey, usize) -> Result<T>,
    ) -> Result<T> {
        let Some(keys) = self.resolve_steps()? else {
            return Ok(empty);
        };
        let store = self.entity.store();
        let temp = TempKey::new(Arc::clone(store), self.entity.keyspace().temp_key(self.entity.name()));
        let count = store.set_intersect_store(temp.key(), &keys)?;
        debug!(
            target: "keyrecord::filter",
            entity = %self.entity.name(),
            steps = keys.len(),
            count,
            "Filter resolved"
        );
        read(&temp, count)
    }

    /// Matching ids
    pub fn ids(&self) -> Result<HashSet<String>> {
        let store = Arc::clone(self.entity.store());
        self.with_result(HashSet::new(), |temp, count| {
            if count == 0 {
                return Ok(HashSet::new());
            }
            store.set_members(temp.key())
        })
    }

    /// Number of matching records
    pub fn count(&self) -> Result<usize> {
        self.with_result(0, |_, count| Ok(count))
    }

    /// Matching records, ordered by id
    pub fn all(&self) -> Result<Vec<Record>> {
        let ids = self.ids()?;
        self.entity.load_all(ids)
    }
}

impl std::fmt::Debug for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Filter")
            .field("entity", &self.entity.name())
            .field("scope", &self.scope)
            .field("constraints", &self.constraints)
            .finish()
    }
}
