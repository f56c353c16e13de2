//! To-many associations
//!
//! A [`HasMany`] is a reference set scoped to an owning record
//! (`owner_type:owner_id:name_ids`) holding ids of the associated type.
//! Membership means the target existed when it was added; deleting the
//! target later does not clean the set, and removing an id from the set
//! does not destroy the target.

use std::collections::HashSet;
use std::sync::Arc;

use keyrecord_core::{Error, Result, Value};
use tracing::debug;

use crate::entity::EntityType;
use crate::filter::Filter;
use crate::record::Record;

/// Reference set from one owning record to records of another type
#[derive(Clone)]
pub struct HasMany {
    name: String,
    key: String,
    target: Arc<EntityType>,
}

impl HasMany {
    pub(crate) fn new(name: &str, key: String, target: Arc<EntityType>) -> Self {
        Self {
            name: name.to_string(),
            key,
            target,
        }
    }

    /// Association name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Store key of the reference set
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Entity type of the referenced records
    pub fn target(&self) -> &Arc<EntityType> {
        &self.target
    }

    /// Save each record and add its id
    ///
    /// Every record must belong to the exact target type (same declaration,
    /// same store) and is checked before anything is saved. A record that
    /// fails validation stops the call with `Error::Validation`; records
    /// before it stay added. Returns how many ids were newly added.
    pub fn add<'a>(&self, records: impl IntoIterator<Item = &'a mut Record>) -> Result<usize> {
        let records: Vec<&'a mut Record> = records.into_iter().collect();
        for record in &records {
            if !Arc::ptr_eq(record.entity(), &self.target) {
                return Err(Error::TypeMismatch {
                    expected: self.target.name().to_string(),
                    actual: record.entity().name().to_string(),
                });
            }
        }

        let store = self.target.store();
        let mut added = 0;
        for record in records {
            if !record.save()? {
                return Err(Error::Validation(record.errors().clone()));
            }
            let id = record.id().ok_or(Error::MissingId)?;
            added += store.set_add(&self.key, &[id.to_string()])?;
        }
        debug!(target: "keyrecord::record", association = %self.name, key = %self.key, added, "Association add");
        Ok(added)
    }

    /// Remove record ids from the reference set; the records are untouched
    ///
    /// Records without an id are skipped. Returns how many ids were removed.
    pub fn delete<'a>(&self, records: impl IntoIterator<Item = &'a Record>) -> Result<usize> {
        let ids: Vec<String> = records
            .into_iter()
            .filter_map(|r| r.id().map(str::to_string))
            .collect();
        if ids.is_empty() {
            return Ok(0);
        }
        self.target.store().set_remove(&self.key, &ids)
    }

    /// Number of referenced ids
    pub fn count(&self) -> Result<usize> {
        self.target.store().set_count(&self.key)
    }

    /// Referenced ids
    pub fn ids(&self) -> Result<HashSet<String>> {
        self.target.store().set_members(&self.key)
    }

    /// Check whether a record is referenced
    pub fn contains(&self, record: &Record) -> Result<bool> {
        match record.id() {
            Some(id) => self.target.store().set_contains(&self.key, id),
            None => Ok(false),
        }
    }

    /// Load every referenced record, ordered by id
    pub fn all(&self) -> Result<Vec<Record>> {
        self.target.load_all(self.ids()?)
    }

    /// Visit every referenced record
    pub fn each(&self, mut f: impl FnMut(&Record)) -> Result<()> {
        for record in self.all()? {
            f(&record);
        }
        Ok(())
    }

    /// Map every referenced record
    pub fn map<T>(&self, f: impl FnMut(&Record) -> T) -> Result<Vec<T>> {
        Ok(self.all()?.iter().map(f).collect())
    }

    /// Query over referenced records, narrowed by index constraints
    pub fn filter<K, V>(&self, constraints: impl IntoIterator<Item = (K, V)>) -> Result<Filter>
    where
        K: AsRef<str>,
        V: Into<Value>,
    {
        Filter::new(Arc::clone(&self.target), Some(self.key.clone())).filter(constraints)
    }
}

impl std::fmt::Debug for HasMany {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HasMany")
            .field("name", &self.name)
            .field("key", &self.key)
            .field("target", &self.target.name())
            .finish()
    }
}
