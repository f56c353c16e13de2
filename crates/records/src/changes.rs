//! Change tracking for record attributes
//!
//! A [`ChangeTracker`] remembers, per attribute, the value last loaded or
//! saved (`old`) and the value currently held (`new`). Setting an attribute
//! back to its old value forgets the change. After a successful save the
//! pending changes become the "previous" changes.

use std::collections::BTreeMap;

use keyrecord_core::Value;

/// Old and new value of one attribute
#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    /// Value as last loaded or saved
    pub old: Value,
    /// Value currently held
    pub new: Value,
}

/// Pending and previous attribute changes of one record
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeTracker {
    pending: BTreeMap<String, Change>,
    previous: BTreeMap<String, Change>,
}

impl ChangeTracker {
    /// Tracker with nothing recorded
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `attribute` moved from `old` to `new`
    ///
    /// The first recorded `old` is kept across repeated sets.
    pub fn record(&mut self, attribute: &str, old: Value, new: Value) {
        match self.pending.get_mut(attribute) {
            Some(change) => {
                if change.old == new {
                    self.pending.remove(attribute);
                } else {
                    change.new = new;
                }
            }
            None => {
                if old != new {
                    self.pending
                        .insert(attribute.to_string(), Change { old, new });
                }
            }
        }
    }

    /// Pending change of one attribute
    pub fn get(&self, attribute: &str) -> Option<&Change> {
        self.pending.get(attribute)
    }

    /// All pending changes, by attribute name
    pub fn pending(&self) -> &BTreeMap<String, Change> {
        &self.pending
    }

    /// Names of attributes with pending changes, sorted
    pub fn changed(&self) -> Vec<String> {
        self.pending.keys().cloned().collect()
    }

    /// Check whether an attribute has a pending change
    pub fn is_changed(&self, attribute: &str) -> bool {
        self.pending.contains_key(attribute)
    }

    /// Check whether nothing is pending
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Changes committed by the last successful save
    pub fn previous(&self) -> &BTreeMap<String, Change> {
        &self.previous
    }

    /// Move pending changes to previous
    pub fn commit(&mut self) {
        self.previous = std::mem::take(&mut self.pending);
    }

    /// Forget pending and previous changes
    pub fn clear(&mut self) {
        self.pending.clear();
        self.previous.clear();
    }
}
