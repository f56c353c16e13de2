//! Records: load, track, validate, save, destroy
//!
//! A [`Record`] is one instance of an [`EntityType`]. It caches attribute
//! values in memory, tracks changes, and persists itself as:
//! - one field-map holding every simple attribute (`t:i:attrs`)
//! - one dedicated key per complex attribute (`t:i:attrs:a`)
//! - its id in the type's id-set (`t::ids`)
//! - its id in the index entry of each indexed attribute's value
//!
//! # Save
//!
//! `save` validates first and returns `Ok(false)` without touching the store
//! when any attribute is invalid. Otherwise it stages one [`Batch`]:
//!
//! 1. remove the id from the old-value entry of each changed indexed attribute
//! 2. write every simple attribute (null and blank values remove the field)
//! 3. replace each complex attribute wholesale (delete, then repopulate)
//! 4. add the id to the new-value entry of each changed indexed attribute
//! 5. add the id to the id-set
//!
//! and executes it atomically. Concurrent saves of the same record are
//! last-write-wins per field; nothing checks for conflicting writers.

use std::collections::BTreeMap;
use std::sync::Arc;

use keyrecord_core::{
    random_hex, validate_segment, AttributeType, Batch, Error, Result, ValidationErrors, Value,
};
use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use crate::association::HasMany;
use crate::changes::{Change, ChangeTracker};
use crate::codec::{decode_simple, encode_simple, index_text};
use crate::entity::EntityType;
use crate::schema::ID_ATTRIBUTE;
use crate::validator::Validator;

static NULL: Value = Value::Null;

/// Store keys owned by a record; fixed once the id is assigned
#[derive(Debug, Clone)]
struct Handles {
    id: String,
    attributes_key: String,
    complex_keys: FxHashMap<String, String>,
}

/// One instance of an entity type
#[derive(Clone)]
pub struct Record {
    entity: Arc<EntityType>,
    handles: Option<Handles>,
    values: FxHashMap<String, Value>,
    changes: ChangeTracker,
    errors: ValidationErrors,
}

impl Record {
    pub(crate) fn new(entity: Arc<EntityType>) -> Self {
        Self {
            entity,
            handles: None,
            values: FxHashMap::default(),
            changes: ChangeTracker::new(),
            errors: ValidationErrors::new(),
        }
    }

    /// Entity type of this record
    pub fn entity(&self) -> &Arc<EntityType> {
        &self.entity
    }

    /// Assigned id, if any
    pub fn id(&self) -> Option<&str> {
        self.handles.as_ref().map(|h| h.id.as_str())
    }

    fn require_id(&self) -> Result<&Handles> {
        self.handles.as_ref().ok_or(Error::MissingId)
    }

    /// Assign the id
    ///
    /// Allowed once; assigning the same id again is a no-op, a different id
    /// fails with `Error::Identity`.
    pub fn set_id(&mut self, id: &str) -> Result<()> {
        if let Some(current) = self.id() {
            if current == id {
                return Ok(());
            }
            return Err(Error::Identity {
                current: current.to_string(),
                attempted: id.to_string(),
            });
        }
        validate_segment(id).map_err(|e| Error::InvalidId(format!("{:?}: {}", id, e)))?;

        let entity = &self.entity;
        let keyspace = entity.keyspace();
        let complex_keys = entity
            .schema()
            .complex()
            .map(|(name, _)| {
                (
                    name.to_string(),
                    keyspace.complex_key(entity.name(), id, name),
                )
            })
            .collect();
        self.handles = Some(Handles {
            id: id.to_string(),
            attributes_key: keyspace.attributes_key(entity.name(), id),
            complex_keys,
        });
        self.values
            .insert(ID_ATTRIBUTE.to_string(), Value::String(id.to_string()));
        Ok(())
    }

    /// Base key of this record (`t:i`)
    pub fn record_key(&self) -> Option<String> {
        self.id()
            .map(|id| self.entity.keyspace().record_key(self.entity.name(), id))
    }

    // ========== Attributes ==========

    /// Current value of an attribute (`Null` if unset)
    pub fn get(&self, attribute: &str) -> Result<&Value> {
        self.entity.attribute_kind(attribute)?;
        Ok(self.values.get(attribute).unwrap_or(&NULL))
    }

    /// Set an attribute, recording the change
    ///
    /// Setting the current value again changes nothing. Setting `id` goes
    /// through [`set_id`](Self::set_id).
    pub fn set(&mut self, attribute: &str, value: impl Into<Value>) -> Result<()> {
        self.entity.attribute_kind(attribute)?;
        let value = value.into();

        if attribute == ID_ATTRIBUTE {
            return match value {
                Value::String(id) => self.set_id(&id),
                Value::Null if self.handles.is_none() => Ok(()),
                other => Err(Error::InvalidId(format!("{:?}", other))),
            };
        }

        let current = self.values.get(attribute).unwrap_or(&NULL);
        if *current == value {
            return Ok(());
        }
        self.changes
            .record(attribute, current.clone(), value.clone());
        if value.is_null() {
            self.values.remove(attribute);
        } else {
            self.values.insert(attribute.to_string(), value);
        }
        Ok(())
    }

    /// Snapshot of every non-null attribute
    pub fn attributes(&self) -> BTreeMap<String, Value> {
        self.values
            .iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Set several attributes, then save
    ///
    /// Each value is compared against the current one; only real changes are
    /// recorded. Every name is checked before any value is set, so an
    /// undeclared attribute leaves the record untouched. Returns the save
    /// outcome.
    pub fn update_attributes<K, V>(
        &mut self,
        attributes: impl IntoIterator<Item = (K, V)>,
    ) -> Result<bool>
    where
        K: AsRef<str>,
        V: Into<Value>,
    {
        let attributes: Vec<(K, V)> = attributes.into_iter().collect();
        for (name, _) in &attributes {
            self.entity.attribute_kind(name.as_ref())?;
        }
        for (name, value) in attributes {
            self.set(name.as_ref(), value)?;
        }
        self.save()
    }

    // ========== Change tracking ==========

    /// Pending changes by attribute
    pub fn changes(&self) -> &BTreeMap<String, Change> {
        self.changes.pending()
    }

    /// Names of attributes with pending changes
    pub fn changed(&self) -> Vec<String> {
        self.changes.changed()
    }

    /// Check whether an attribute has a pending change
    pub fn is_changed(&self, attribute: &str) -> bool {
        self.changes.is_changed(attribute)
    }

    /// Changes committed by the last successful save
    pub fn previous_changes(&self) -> &BTreeMap<String, Change> {
        self.changes.previous()
    }

    // ========== Validation ==========

    /// Violations found by the last failed save or [`valid`](Self::valid) call
    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    /// Validate current values; violations are kept in [`errors`](Self::errors)
    pub fn valid(&mut self) -> bool {
        self.errors = Validator::new(self.entity.schema()).validate(&self.values);
        self.errors.is_empty()
    }

    // ========== Persistence ==========

    /// Reload every attribute from the store, discarding local changes
    pub fn refresh(&mut self) -> Result<()> {
        let handles = self.require_id()?.clone();
        let store = self.entity.store();

        let fields = store.hash_get_all(&handles.attributes_key)?;
        let mut values = FxHashMap::default();
        for (name, kind) in self.entity.schema().iter() {
            if name == ID_ATTRIBUTE {
                continue;
            }
            let value = match kind {
                AttributeType::List => Value::List(store.list_all(&handles.complex_keys[name])?),
                AttributeType::Set => Value::Set(store.set_members(&handles.complex_keys[name])?),
                AttributeType::Hash => Value::Map(store.hash_get_all(&handles.complex_keys[name])?),
                _ => match fields.get(name) {
                    Some(raw) => decode_simple(name, kind, raw)?,
                    None => continue,
                },
            };
            values.insert(name.to_string(), value);
        }
        values.insert(ID_ATTRIBUTE.to_string(), Value::String(handles.id.clone()));

        self.values = values;
        self.changes.clear();
        self.errors = ValidationErrors::new();
        debug!(target: "keyrecord::record", entity = %self.entity.name(), id = %handles.id, "Record refreshed");
        Ok(())
    }

    /// Validate and persist
    ///
    /// Returns `Ok(false)` when validation fails; nothing is written and the
    /// violations are available from [`errors`](Self::errors).
    pub fn save(&mut self) -> Result<bool> {
        if !self.valid() {
            warn!(
                target: "keyrecord::record",
                entity = %self.entity.name(),
                violations = self.errors.len(),
                "Record failed validation"
            );
            return Ok(false);
        }
        if self.handles.is_none() {
            self.set_id(&random_hex())?;
        }
        let handles = self.require_id()?;
        let entity = &self.entity;
        let schema = entity.schema();
        let id = handles.id.clone();

        let changed_indexes: Vec<(&str, &Change)> = entity
            .indexed_attributes()
            .iter()
            .filter_map(|name| self.changes.get(name).map(|c| (name.as_str(), c)))
            .collect();

        let mut batch = Batch::new();

        for (name, change) in &changed_indexes {
            if let Some(text) = index_text(&change.old) {
                batch.set_remove(
                    entity.keyspace().index_key(entity.name(), name, &text),
                    vec![id.clone()],
                );
            }
        }

        let mut fields = Vec::new();
        for (name, kind) in schema.simple() {
            if name == ID_ATTRIBUTE {
                continue;
            }
            let value = self.values.get(name).unwrap_or(&NULL);
            fields.push((name.to_string(), encode_simple(kind, value)?));
        }
        batch.hash_set_fields(handles.attributes_key.clone(), fields);

        for (name, kind) in schema.complex() {
            let key = handles.complex_keys[name].clone();
            batch.delete(key.clone());
            match (kind, self.values.get(name)) {
                (_, None) => {}
                (AttributeType::List, Some(Value::List(items))) => {
                    batch.list_push(key, items.clone());
                }
                (AttributeType::List, Some(Value::Set(items))) => {
                    let mut items: Vec<String> = items.iter().cloned().collect();
                    items.sort();
                    batch.list_push(key, items);
                }
                (AttributeType::Set, Some(Value::Set(items))) => {
                    batch.set_add(key, items.iter().cloned().collect());
                }
                (AttributeType::Hash, Some(Value::Map(map))) => {
                    batch.hash_set_fields(
                        key,
                        map.iter()
                            .map(|(k, v)| (k.clone(), Some(v.clone())))
                            .collect(),
                    );
                }
                (kind, Some(other)) => {
                    return Err(Error::Serialization(format!(
                        "cannot store {} as {}",
                        other.type_name(),
                        kind
                    )))
                }
            }
        }

        for (name, _) in &changed_indexes {
            let current = self.values.get(*name).unwrap_or(&NULL);
            if let Some(text) = index_text(current) {
                batch.set_add(
                    entity.keyspace().index_key(entity.name(), name, &text),
                    vec![id.clone()],
                );
            }
        }

        batch.set_add(entity.ids_key(), vec![id.clone()]);

        let indexes_moved = changed_indexes.len();
        entity.store().execute(batch)?;

        self.changes.commit();
        self.errors = ValidationErrors::new();
        debug!(
            target: "keyrecord::record",
            entity = %self.entity.name(),
            id = %id,
            indexes_moved,
            "Record saved"
        );
        Ok(true)
    }

    /// Remove the record, its index memberships and its attribute storage
    ///
    /// Associations of other records that reference this id are left alone.
    /// Returns `Ok(false)` for a record without an id.
    pub fn destroy(&mut self) -> Result<bool> {
        let Some(handles) = self.handles.as_ref() else {
            return Ok(false);
        };
        let entity = &self.entity;
        let id = handles.id.clone();

        let mut batch = Batch::new();
        batch.set_remove(entity.ids_key(), vec![id.clone()]);

        for name in entity.indexed_attributes() {
            let mut entries = Vec::new();
            if let Some(text) = index_text(self.values.get(name).unwrap_or(&NULL)) {
                entries.push(text);
            }
            // An unsaved change means the stored entry is for the old value
            if let Some(text) = self.changes.get(name).and_then(|c| index_text(&c.old)) {
                if !entries.contains(&text) {
                    entries.push(text);
                }
            }
            for text in entries {
                batch.set_remove(
                    entity.keyspace().index_key(entity.name(), name, &text),
                    vec![id.clone()],
                );
            }
        }

        batch.delete(handles.attributes_key.clone());
        for key in handles.complex_keys.values() {
            batch.delete(key.clone());
        }

        entity.store().execute(batch)?;
        debug!(target: "keyrecord::record", entity = %entity.name(), id = %id, "Record destroyed");
        Ok(true)
    }

    /// Check whether the id is in the type's id-set
    pub fn is_persisted(&self) -> Result<bool> {
        match self.id() {
            Some(id) => self.entity.exists(id),
            None => Ok(false),
        }
    }

    /// Handle to a declared to-many association of this record
    pub fn association(&self, name: &str) -> Result<HasMany> {
        let def = self
            .entity
            .association(name)
            .ok_or_else(|| Error::UnknownAttribute {
                entity: self.entity.name().to_string(),
                attribute: name.to_string(),
            })?;
        let id = self.require_id()?.id.as_str();
        let key = self
            .entity
            .keyspace()
            .association_key(self.entity.name(), id, name);
        Ok(HasMany::new(name, key, Arc::clone(def.target())))
    }
}

impl std::fmt::Debug for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Record")
            .field("entity", &self.entity.name())
            .field("id", &self.id())
            .field("values", &self.attributes())
            .field("changed", &self.changed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keyrecord_core::{Keyspace, Store};
    use keyrecord_storage::MemoryStore;
    use serde_json::json;
    use std::collections::{HashMap, HashSet};

    fn setup() -> (Arc<MemoryStore>, Arc<EntityType>) {
        let store = Arc::new(MemoryStore::new());
        let entity = EntityType::builder("check")
            .attribute("name", AttributeType::String)
            .attribute("enabled", AttributeType::Boolean)
            .attribute("interval", AttributeType::Integer)
            .attribute("checked_at", AttributeType::Timestamp)
            .attribute("steps", AttributeType::List)
            .attribute("tags", AttributeType::Set)
            .attribute("headers", AttributeType::Hash)
            .attribute("extra", AttributeType::JsonString)
            .index_by("enabled")
            .index_by("name")
            .build(store.clone() as Arc<dyn Store>, Keyspace::new())
            .unwrap();
        (store, Arc::new(entity))
    }

    fn tags(items: &[&str]) -> Value {
        Value::Set(items.iter().map(|s| s.to_string()).collect::<HashSet<_>>())
    }

    // ========================================
    // Attributes and change tracking
    // ========================================

    #[test]
    fn test_set_records_changes() {
        let (_, check) = setup();
        let mut record = check.new_record();
        record.set("name", "svc").unwrap();
        record.set("name", "svc").unwrap();

        assert!(record.is_changed("name"));
        assert_eq!(record.changes()["name"].old, Value::Null);
        assert_eq!(record.changes()["name"].new, Value::from("svc"));
        assert_eq!(record.changed(), vec!["name".to_string()]);
    }

    #[test]
    fn test_unknown_attribute() {
        let (_, check) = setup();
        let mut record = check.new_record();
        assert!(matches!(
            record.set("nope", 1),
            Err(Error::UnknownAttribute { .. })
        ));
        assert!(matches!(record.get("nope"), Err(Error::UnknownAttribute { .. })));
    }

    #[test]
    fn test_id_assigned_once() {
        let (_, check) = setup();
        let mut record = check.new_record();
        record.set_id("abc").unwrap();
        record.set_id("abc").unwrap();
        record.set("id", "abc").unwrap();

        let err = record.set_id("def").unwrap_err();
        assert!(matches!(err, Error::Identity { ref current, ref attempted }
            if current == "abc" && attempted == "def"));
        assert_eq!(record.get("id").unwrap(), &Value::from("abc"));
        assert_eq!(record.record_key().as_deref(), Some("check:abc"));
    }

    #[test]
    fn test_invalid_id_rejected() {
        let (_, check) = setup();
        let mut record = check.new_record();
        assert!(matches!(record.set_id("a:b"), Err(Error::InvalidId(_))));
        assert!(matches!(record.set_id(""), Err(Error::InvalidId(_))));
        assert!(record.id().is_none());
    }

    // ========================================
    // Save / refresh
    // ========================================

    #[test]
    fn test_save_assigns_hex_id_and_persists() {
        let (store, check) = setup();
        let mut record = check.build([("name", "svc")]).unwrap();
        assert!(!record.is_persisted().unwrap());
        assert!(record.save().unwrap());

        let id = record.id().unwrap().to_string();
        assert_eq!(id.len(), 32);
        assert!(record.is_persisted().unwrap());
        assert!(record.changes().is_empty());
        assert!(record.previous_changes().contains_key("name"));

        let attrs = store.hash_get_all(&format!("check:{}:attrs", id)).unwrap();
        assert_eq!(attrs.get("name").map(String::as_str), Some("svc"));
        assert!(!attrs.contains_key("id"));
    }

    #[test]
    fn test_round_trip_with_coercion() {
        let (_, check) = setup();
        let now = chrono::Utc::now();
        let mut record = check.new_record();
        record.set("name", "svc").unwrap();
        record.set("enabled", false).unwrap();
        record.set("interval", 60).unwrap();
        record.set("checked_at", now).unwrap();
        record.set("steps", vec!["dns", "tcp", "http"]).unwrap();
        record.set("tags", tags(&["a", "b"])).unwrap();
        record
            .set(
                "headers",
                HashMap::from([("accept".to_string(), "json".to_string())]),
            )
            .unwrap();
        record.set("extra", json!({"retries": 3, "ok": true})).unwrap();
        assert!(record.save().unwrap());

        let loaded = check.load(record.id().unwrap()).unwrap();
        assert_eq!(loaded.get("name").unwrap(), &Value::from("svc"));
        assert_eq!(loaded.get("enabled").unwrap(), &Value::Bool(false));
        assert_eq!(loaded.get("interval").unwrap(), &Value::Int(60));
        assert_eq!(loaded.get("checked_at").unwrap(), &Value::Int(now.timestamp()));
        assert_eq!(loaded.get("steps").unwrap(), &Value::from(vec!["dns", "tcp", "http"]));
        assert_eq!(loaded.get("tags").unwrap(), &tags(&["a", "b"]));
        assert_eq!(
            loaded.get("headers").unwrap().as_map().and_then(|m| m.get("accept")),
            Some(&"json".to_string())
        );
        assert_eq!(
            loaded.get("extra").unwrap(),
            &Value::Json(json!({"retries": 3, "ok": true}))
        );
    }

    #[test]
    fn test_blank_values_remove_fields() {
        let (store, check) = setup();
        let (mut record, _) = check.create([("name", "svc")]).unwrap();
        record.set("name", "   ").unwrap();
        assert!(record.save().unwrap());

        let key = format!("check:{}:attrs", record.id().unwrap());
        assert!(!store.hash_get_all(&key).unwrap().contains_key("name"));
        assert_eq!(check.load(record.id().unwrap()).unwrap().get("name").unwrap(), &Value::Null);
    }

    #[test]
    fn test_complex_attributes_fully_replaced() {
        let (_, check) = setup();
        let (mut record, _) = check.create([("tags", tags(&["a", "b", "c"]))]).unwrap();
        record.set("tags", tags(&["z"])).unwrap();
        record.save().unwrap();

        let loaded = check.load(record.id().unwrap()).unwrap();
        assert_eq!(loaded.get("tags").unwrap(), &tags(&["z"]));
    }

    #[test]
    fn test_refresh_discards_local_changes() {
        let (_, check) = setup();
        let (mut record, _) = check.create([("name", "svc")]).unwrap();
        record.set("name", "other").unwrap();
        record.refresh().unwrap();

        assert_eq!(record.get("name").unwrap(), &Value::from("svc"));
        assert!(record.changes().is_empty());
    }

    #[test]
    fn test_refresh_without_id() {
        let (_, check) = setup();
        assert!(matches!(check.new_record().refresh(), Err(Error::MissingId)));
    }

    // ========================================
    // Validation
    // ========================================

    #[test]
    fn test_invalid_record_writes_nothing() {
        let (store, check) = setup();
        let mut record = check.new_record();
        record.set("interval", "soon").unwrap();
        record.set("enabled", "true").unwrap();

        assert!(!record.save().unwrap());
        assert_eq!(record.errors().len(), 2);
        assert!(record.errors().contains("interval"));
        assert!(record.errors().contains("enabled"));
        assert!(record.id().is_none());
        assert_eq!(store.key_count(), 0);
    }

    #[test]
    fn test_valid_clears_errors() {
        let (_, check) = setup();
        let mut record = check.new_record();
        record.set("interval", "soon").unwrap();
        assert!(!record.valid());
        record.set("interval", 5).unwrap();
        assert!(record.valid());
        assert!(record.errors().is_empty());
    }

    // ========================================
    // Update / destroy
    // ========================================

    #[test]
    fn test_update_attributes_compares_new_values() {
        let (_, check) = setup();
        let (mut record, _) = check.create([("name", "svc")]).unwrap();

        // Same value: nothing to change, still saves cleanly
        assert!(record.update_attributes([("name", "svc")]).unwrap());
        assert!(record.previous_changes().is_empty());

        assert!(record.update_attributes([("name", "renamed")]).unwrap());
        let change = &record.previous_changes()["name"];
        assert_eq!(change.old, Value::from("svc"));
        assert_eq!(change.new, Value::from("renamed"));
        assert_eq!(check.find_by("name", "svc").unwrap().len(), 0);
        assert_eq!(check.find_by("name", "renamed").unwrap().len(), 1);
    }

    #[test]
    fn test_update_attributes_unknown_name_changes_nothing() {
        let (_, check) = setup();
        let (mut record, _) = check.create([("name", "svc")]).unwrap();

        let err = record
            .update_attributes(vec![("name", Value::from("renamed")), ("nope", Value::Int(1))])
            .unwrap_err();
        assert!(matches!(err, Error::UnknownAttribute { ref attribute, .. } if attribute == "nope"));
        assert_eq!(record.get("name").unwrap(), &Value::from("svc"));
        assert!(record.changes().is_empty());
    }

    #[test]
    fn test_json_documents_reload_unchanged_and_resave() {
        let (_, check) = setup();
        for document in [json!(true), json!(2.5), json!(["a", "b"]), json!({"k": "v"})] {
            let (record, saved) = check
                .create(vec![("extra", Value::Json(document.clone()))])
                .unwrap();
            assert!(saved);

            let mut loaded = check.load(record.id().unwrap()).unwrap();
            assert_eq!(loaded.get("extra").unwrap(), &Value::Json(document));
            assert_eq!(loaded.attributes(), record.attributes());
            assert!(loaded.save().unwrap(), "errors: {}", loaded.errors());
        }
    }

    #[test]
    fn test_destroy_removes_everything() {
        let (store, check) = setup();
        let (mut record, _) = check
            .create(vec![
                ("name", Value::from("svc")),
                ("enabled", Value::Bool(true)),
                ("tags", tags(&["a"])),
            ])
            .unwrap();

        assert!(record.destroy().unwrap());
        assert!(!record.is_persisted().unwrap());
        assert_eq!(store.key_count(), 0);
    }

    #[test]
    fn test_destroy_with_unsaved_index_change() {
        let (store, check) = setup();
        let (mut record, _) = check.create([("name", "old")]).unwrap();
        record.set("name", "new").unwrap();

        record.destroy().unwrap();
        assert!(!store.exists("check::by_name:old").unwrap());
        assert_eq!(store.key_count(), 0);
    }

    #[test]
    fn test_destroy_without_id_is_noop() {
        let (_, check) = setup();
        assert!(!check.new_record().destroy().unwrap());
    }
}
