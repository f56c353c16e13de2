//! Entity type registry
//!
//! A [`Registry`] binds entity type declarations to one store and keyspace
//! and hands out shared `Arc<EntityType>`s by name. Type-level state (id-sets,
//! indexes) stays in the store; the registry only holds declarations.
//!
//! One registry may be installed process-wide with
//! [`Registry::install_global`]. Tests and embedded uses create local
//! registries instead.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use once_cell::sync::OnceCell;
use tracing::info;

use keyrecord_core::{Error, KeyrecordConfig, Keyspace, Result, Store};

use crate::entity::{EntityType, EntityTypeBuilder};

/// Process-wide registry, set at most once
static GLOBAL: OnceCell<Registry> = OnceCell::new();

/// Entity types defined against one store
pub struct Registry {
    store: Arc<dyn Store>,
    keyspace: Keyspace,
    types: DashMap<String, Arc<EntityType>>,
}

impl Registry {
    /// Empty registry over `store`
    pub fn new(store: Arc<dyn Store>, keyspace: Keyspace) -> Self {
        Self {
            store,
            keyspace,
            types: DashMap::new(),
        }
    }

    /// Empty registry using the namespace from `config`
    pub fn from_config(store: Arc<dyn Store>, config: &KeyrecordConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(store, config.keyspace()))
    }

    /// Backing store
    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Key layout shared by every type
    pub fn keyspace(&self) -> &Keyspace {
        &self.keyspace
    }

    /// Validate and register an entity type
    ///
    /// Fails with `Error::Schema` for an invalid declaration, a name already
    /// in use, or an association whose target was not defined here.
    pub fn define(&self, builder: EntityTypeBuilder) -> Result<Arc<EntityType>> {
        let entity = builder.build(Arc::clone(&self.store), self.keyspace.clone())?;

        for association in entity.associations() {
            let target = association.target();
            let registered = self
                .types
                .get(target.name())
                .map(|t| Arc::ptr_eq(t.value(), target))
                .unwrap_or(false);
            if !registered {
                return Err(Error::Schema(format!(
                    "Association '{}' of '{}' targets unregistered type '{}'",
                    association.name(),
                    entity.name(),
                    target.name()
                )));
            }
        }

        match self.types.entry(entity.name().to_string()) {
            Entry::Occupied(_) => Err(Error::Schema(format!(
                "Entity type '{}' is already defined",
                entity.name()
            ))),
            Entry::Vacant(slot) => {
                let entity = Arc::new(entity);
                slot.insert(Arc::clone(&entity));
                info!(
                    target: "keyrecord::registry",
                    entity = %entity.name(),
                    attributes = entity.schema().len(),
                    indexes = entity.indexed_attributes().len(),
                    associations = entity.associations().len(),
                    "Entity type defined"
                );
                Ok(entity)
            }
        }
    }

    /// Entity type by name
    pub fn get(&self, name: &str) -> Option<Arc<EntityType>> {
        self.types.get(name).map(|t| Arc::clone(t.value()))
    }

    /// Entity type by name, failing with `Error::Schema` if undefined
    pub fn require(&self, name: &str) -> Result<Arc<EntityType>> {
        self.get(name)
            .ok_or_else(|| Error::Schema(format!("Entity type '{}' is not defined", name)))
    }

    /// Names of all defined types, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.types.iter().map(|t| t.key().clone()).collect();
        names.sort();
        names
    }

    /// Number of defined types
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Check if no types are defined
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Install `registry` as the process-wide registry
    ///
    /// Fails with `Error::Schema` if one is already installed.
    pub fn install_global(registry: Registry) -> Result<&'static Registry> {
        GLOBAL
            .set(registry)
            .map_err(|_| Error::Schema("A global registry is already installed".to_string()))?;
        GLOBAL
            .get()
            .ok_or_else(|| Error::Schema("Global registry unavailable".to_string()))
    }

    /// The process-wide registry, if installed
    pub fn global() -> Option<&'static Registry> {
        GLOBAL.get()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("keyspace", &self.keyspace)
            .field("types", &self.names())
            .finish()
    }
}
