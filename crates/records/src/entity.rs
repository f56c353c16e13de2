//! Entity types
//!
//! An [`EntityType`] is the registration-time description of one kind of
//! record: its attribute schema, which attributes carry an index, and its
//! to-many associations. It also hosts the type-level operations (id-set
//! access, lookups, bulk load/delete) and is the factory for [`Record`]s.
//!
//! Entity types are built with [`EntityTypeBuilder`] and normally defined
//! through a [`Registry`](crate::registry::Registry), which binds them to a
//! store and keyspace. All state lives in the store; an `EntityType` holds
//! nothing but its declaration and an `Arc<dyn Store>`.

use std::collections::HashSet;
use std::sync::Arc;

use keyrecord_core::{validate_segment, AttributeType, Error, Keyspace, Result, Store, Value};
use tracing::debug;

use crate::filter::Filter;
use crate::index::Index;
use crate::record::Record;
use crate::schema::{AttributeSchema, ID_ATTRIBUTE};
use crate::temp::TempKey;

/// A declared to-many association
#[derive(Debug, Clone)]
pub struct AssociationDef {
    name: String,
    target: Arc<EntityType>,
}

impl AssociationDef {
    /// Association name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Entity type of the referenced records
    pub fn target(&self) -> &Arc<EntityType> {
        &self.target
    }
}

/// Declares an entity type
///
/// # Example
///
/// ```ignore
/// let check = registry.define(
///     EntityType::builder("check")
///         .attribute("name", AttributeType::String)
///         .attribute("enabled", AttributeType::Boolean)
///         .declare("tags", "set")?
///         .index_by("enabled"),
/// )?;
/// ```
#[derive(Debug)]
pub struct EntityTypeBuilder {
    name: String,
    schema: AttributeSchema,
    indexed: Vec<String>,
    associations: Vec<AssociationDef>,
    error: Option<Error>,
}

impl EntityTypeBuilder {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            schema: AttributeSchema::new(),
            indexed: Vec::new(),
            associations: Vec::new(),
            error: None,
        }
    }

    /// Name of the type being declared
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declare an attribute
    ///
    /// A bad or duplicate name is reported when the type is built.
    pub fn attribute(mut self, name: &str, kind: AttributeType) -> Self {
        if let Err(e) = self.schema.declare(name, kind) {
            self.error.get_or_insert(e);
        }
        self
    }

    /// Declare an attribute by kind name; fails on an unrecognized kind
    pub fn declare(self, name: &str, kind: &str) -> Result<Self> {
        let kind: AttributeType = kind.parse()?;
        Ok(self.attribute(name, kind))
    }

    /// Maintain an index over a declared scalar attribute
    pub fn index_by(mut self, name: &str) -> Self {
        if !self.indexed.iter().any(|n| n == name) {
            self.indexed.push(name.to_string());
        }
        self
    }

    /// Declare a to-many association to records of `target`
    pub fn has_many(mut self, name: &str, target: &Arc<EntityType>) -> Self {
        self.associations.push(AssociationDef {
            name: name.to_string(),
            target: Arc::clone(target),
        });
        self
    }

    /// Validate the declaration and bind it to a store
    pub fn build(self, store: Arc<dyn Store>, keyspace: Keyspace) -> Result<EntityType> {
        if let Some(e) = self.error {
            return Err(e);
        }
        validate_segment(&self.name).map_err(|e| {
            Error::Schema(format!("Invalid entity type name {:?}: {}", self.name, e))
        })?;

        for name in &self.indexed {
            match self.schema.get(name) {
                None => {
                    return Err(Error::Schema(format!(
                        "Cannot index undeclared attribute '{}' of '{}'",
                        name, self.name
                    )))
                }
                Some(_) if name == ID_ATTRIBUTE => {
                    return Err(Error::Schema(format!(
                        "Cannot index '{}' of '{}'",
                        ID_ATTRIBUTE, self.name
                    )))
                }
                Some(kind) if !kind.is_indexable() => {
                    return Err(Error::Schema(format!(
                        "Attribute '{}' of '{}' has kind {} which cannot be indexed",
                        name, self.name, kind
                    )))
                }
                Some(_) => {}
            }
        }

        let mut seen = HashSet::new();
        for association in &self.associations {
            validate_segment(&association.name).map_err(|e| {
                Error::Schema(format!(
                    "Invalid association name {:?}: {}",
                    association.name, e
                ))
            })?;
            if !seen.insert(association.name.as_str()) {
                return Err(Error::Schema(format!(
                    "Association '{}' of '{}' is declared twice",
                    association.name, self.name
                )));
            }
        }

        Ok(EntityType {
            name: self.name,
            schema: self.schema,
            indexed: self.indexed,
            associations: self.associations,
            store,
            keyspace,
        })
    }
}

/// A registered kind of record
pub struct EntityType {
    name: String,
    schema: AttributeSchema,
    indexed: Vec<String>,
    associations: Vec<AssociationDef>,
    store: Arc<dyn Store>,
    keyspace: Keyspace,
}

impl EntityType {
    /// Start declaring an entity type
    pub fn builder(name: &str) -> EntityTypeBuilder {
        EntityTypeBuilder::new(name)
    }

    /// Entity type name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared attributes
    pub fn schema(&self) -> &AttributeSchema {
        &self.schema
    }

    /// Indexed attributes, in declaration order
    pub fn indexed_attributes(&self) -> &[String] {
        &self.indexed
    }

    /// Check whether an attribute carries an index
    pub fn is_indexed(&self, attribute: &str) -> bool {
        self.indexed.iter().any(|n| n == attribute)
    }

    /// Declared associations
    pub fn associations(&self) -> &[AssociationDef] {
        &self.associations
    }

    /// Association declaration by name
    pub fn association(&self, name: &str) -> Option<&AssociationDef> {
        self.associations.iter().find(|a| a.name == name)
    }

    /// Backing store
    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Key layout
    pub fn keyspace(&self) -> &Keyspace {
        &self.keyspace
    }

    /// Key of the set of persisted ids
    pub fn ids_key(&self) -> String {
        self.keyspace.ids_key(&self.name)
    }

    pub(crate) fn attribute_kind(&self, attribute: &str) -> Result<AttributeType> {
        self.schema
            .get(attribute)
            .ok_or_else(|| Error::UnknownAttribute {
                entity: self.name.clone(),
                attribute: attribute.to_string(),
            })
    }

    /// Index over an indexed attribute
    pub fn index(&self, attribute: &str) -> Result<Index> {
        self.attribute_kind(attribute)?;
        if !self.is_indexed(attribute) {
            return Err(Error::NotIndexed {
                entity: self.name.clone(),
                attribute: attribute.to_string(),
            });
        }
        Ok(Index::new(
            Arc::clone(&self.store),
            self.keyspace.clone(),
            &self.name,
            attribute,
        ))
    }

    // ========== Id-set ==========

    /// Number of persisted records
    pub fn count(&self) -> Result<usize> {
        self.store.set_count(&self.ids_key())
    }

    /// Ids of all persisted records
    pub fn ids(&self) -> Result<HashSet<String>> {
        self.store.set_members(&self.ids_key())
    }

    /// Add an id to the id-set directly
    pub fn add_id(&self, id: &str) -> Result<bool> {
        Ok(self.store.set_add(&self.ids_key(), &[id.to_string()])? > 0)
    }

    /// Remove an id from the id-set directly
    pub fn delete_id(&self, id: &str) -> Result<bool> {
        Ok(self.store.set_remove(&self.ids_key(), &[id.to_string()])? > 0)
    }

    /// Check whether a record with this id is persisted
    pub fn exists(&self, id: &str) -> Result<bool> {
        self.store.set_contains(&self.ids_key(), id)
    }

    // ========== Records ==========

    /// Empty, unsaved record
    pub fn new_record(self: &Arc<Self>) -> Record {
        Record::new(Arc::clone(self))
    }

    /// Unsaved record with the given attributes set
    pub fn build<K, V>(self: &Arc<Self>, attributes: impl IntoIterator<Item = (K, V)>) -> Result<Record>
    where
        K: AsRef<str>,
        V: Into<Value>,
    {
        let mut record = self.new_record();
        for (name, value) in attributes {
            record.set(name.as_ref(), value)?;
        }
        Ok(record)
    }

    /// Build and save a record; also returns whether the save succeeded
    pub fn create<K, V>(
        self: &Arc<Self>,
        attributes: impl IntoIterator<Item = (K, V)>,
    ) -> Result<(Record, bool)>
    where
        K: AsRef<str>,
        V: Into<Value>,
    {
        let mut record = self.build(attributes)?;
        let saved = record.save()?;
        Ok((record, saved))
    }

    /// Record with this id, loaded from the store
    ///
    /// A missing id yields an empty record; check
    /// [`Record::is_persisted`] or use [`find_by_id`](Self::find_by_id).
    pub fn load(self: &Arc<Self>, id: &str) -> Result<Record> {
        let mut record = self.new_record();
        record.set_id(id)?;
        record.refresh()?;
        Ok(record)
    }

    /// Persisted record with this id
    pub fn find_by_id(self: &Arc<Self>, id: &str) -> Result<Option<Record>> {
        if !self.exists(id)? {
            return Ok(None);
        }
        self.load(id).map(Some)
    }

    /// Load each id, ordered by id
    pub(crate) fn load_all(self: &Arc<Self>, ids: HashSet<String>) -> Result<Vec<Record>> {
        let mut ids: Vec<String> = ids.into_iter().collect();
        ids.sort();
        ids.iter().map(|id| self.load(id)).collect()
    }

    /// Every persisted record, ordered by id
    pub fn all(self: &Arc<Self>) -> Result<Vec<Record>> {
        self.load_all(self.ids()?)
    }

    /// Destroy every persisted record, one batch per record
    ///
    /// Returns how many records were destroyed.
    pub fn delete_all(self: &Arc<Self>) -> Result<usize> {
        let mut destroyed = 0;
        for mut record in self.all()? {
            if record.destroy()? {
                destroyed += 1;
            }
        }
        debug!(target: "keyrecord::record", entity = %self.name, destroyed, "Deleted all records");
        Ok(destroyed)
    }

    // ========== Queries ==========

    /// Records whose indexed `attribute` equals `value`, ordered by id
    pub fn find_by(self: &Arc<Self>, attribute: &str, value: impl Into<Value>) -> Result<Vec<Record>> {
        let ids = self.index(attribute)?.ids(&value.into())?;
        self.load_all(ids)
    }

    /// Records whose set attribute contains every one of `values`
    ///
    /// Scans every persisted record; cost grows with the number of records,
    /// not with the number of matches.
    pub fn find_by_set_intersection<S: AsRef<str>>(
        self: &Arc<Self>,
        attribute: &str,
        values: &[S],
    ) -> Result<Vec<Record>> {
        if self.attribute_kind(attribute)? != AttributeType::Set {
            return Err(Error::InvalidAttribute {
                entity: self.name.clone(),
                attribute: attribute.to_string(),
                reason: "subset lookup needs a set attribute".to_string(),
            });
        }
        if values.is_empty() {
            return Ok(Vec::new());
        }

        let candidates: Vec<String> = values.iter().map(|v| v.as_ref().to_string()).collect();
        let temp = TempKey::new(Arc::clone(&self.store), self.keyspace.temp_key(&self.name));
        self.store.set_add(temp.key(), &candidates)?;

        let mut matching = HashSet::new();
        for id in self.ids()? {
            let stored = self.keyspace.complex_key(&self.name, &id, attribute);
            let missing = self.store.set_diff(&[temp.key().to_string(), stored])?;
            if missing.is_empty() {
                matching.insert(id);
            }
        }
        drop(temp);

        self.load_all(matching)
    }

    /// Query composing equality constraints over indexed attributes
    pub fn filter<K, V>(self: &Arc<Self>, constraints: impl IntoIterator<Item = (K, V)>) -> Result<Filter>
    where
        K: AsRef<str>,
        V: Into<Value>,
    {
        Filter::new(Arc::clone(self), None).filter(constraints)
    }
}

impl std::fmt::Debug for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityType")
            .field("name", &self.name)
            .field("schema", &self.schema)
            .field("indexed", &self.indexed)
            .field(
                "associations",
                &self.associations.iter().map(|a| a.name.as_str()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
