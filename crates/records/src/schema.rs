//! Attribute schema of an entity type
//!
//! Maps attribute names to declared kinds, in declaration order. Every
//! schema starts with an implicit `id` attribute of kind `string`.

use keyrecord_core::{validate_segment, AttributeType, Error, Result};
use rustc_hash::FxHashMap;

/// Name of the implicit identifier attribute
pub const ID_ATTRIBUTE: &str = "id";

/// Declared attributes of one entity type
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeSchema {
    attributes: Vec<(String, AttributeType)>,
    positions: FxHashMap<String, usize>,
}

impl AttributeSchema {
    /// Schema holding only the implicit `id` attribute
    pub fn new() -> Self {
        let mut schema = Self {
            attributes: Vec::new(),
            positions: FxHashMap::default(),
        };
        schema.push(ID_ATTRIBUTE.to_string(), AttributeType::String);
        schema
    }

    fn push(&mut self, name: String, kind: AttributeType) {
        self.positions.insert(name.clone(), self.attributes.len());
        self.attributes.push((name, kind));
    }

    /// Declare an attribute
    ///
    /// Fails with `Error::Schema` if the name is not a valid key segment or
    /// is already declared.
    pub fn declare(&mut self, name: &str, kind: AttributeType) -> Result<()> {
        validate_segment(name)
            .map_err(|e| Error::Schema(format!("Invalid attribute name {:?}: {}", name, e)))?;
        if self.positions.contains_key(name) {
            return Err(Error::Schema(format!(
                "Attribute '{}' is already declared",
                name
            )));
        }
        self.push(name.to_string(), kind);
        Ok(())
    }

    /// Declare an attribute by kind name (`"string"`, `"set"`, ...)
    pub fn declare_str(&mut self, name: &str, kind: &str) -> Result<()> {
        self.declare(name, kind.parse()?)
    }

    /// Declared kind of an attribute
    pub fn get(&self, name: &str) -> Option<AttributeType> {
        self.positions.get(name).map(|&i| self.attributes[i].1)
    }

    /// Check whether an attribute is declared
    pub fn contains(&self, name: &str) -> bool {
        self.positions.contains_key(name)
    }

    /// All attributes in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, AttributeType)> {
        self.attributes.iter().map(|(n, k)| (n.as_str(), *k))
    }

    /// Attributes persisted in the record's field-map
    pub fn simple(&self) -> impl Iterator<Item = (&str, AttributeType)> {
        self.iter().filter(|(_, k)| !k.is_complex())
    }

    /// Attributes persisted under their own key
    pub fn complex(&self) -> impl Iterator<Item = (&str, AttributeType)> {
        self.iter().filter(|(_, k)| k.is_complex())
    }

    /// Number of declared attributes, `id` included
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// Always false; `id` is always declared
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

impl Default for AttributeSchema {
    fn default() -> Self {
        Self::new()
    }
}
