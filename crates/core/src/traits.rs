//! Core traits for store abstraction
//!
//! This module defines the Store trait that maps records onto a key-value
//! store's native field-map, set and list structures. Implementations can
//! be swapped (in-process, networked) without touching the record layer.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use crate::batch::Batch;
use crate::error::Result;

/// Store primitives required by the record layer
///
/// Thread safety: all methods must be safe to call concurrently from
/// multiple threads (requires Send + Sync). No locking happens above this
/// trait; every multi-step mutation goes through [`Store::execute`].
///
/// Structures are never left empty: removing the last field, member or
/// element removes the key. Commands against a key holding a different
/// structure fail with `Error::WrongType`.
pub trait Store: Send + Sync {
    // ========== Field-maps ==========

    /// All fields of a field-map; empty if the key does not exist
    fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>>;

    /// Set or remove fields; a `None` value removes the field
    fn hash_set_fields(&self, key: &str, fields: &[(String, Option<String>)]) -> Result<()>;

    /// Add `by` to an integer field (missing fields start at 0)
    ///
    /// Returns the new value.
    fn hash_increment(&self, key: &str, field: &str, by: i64) -> Result<i64>;

    // ========== Sets ==========

    /// Add members; returns how many were not already present
    fn set_add(&self, key: &str, members: &[String]) -> Result<usize>;

    /// Remove members; returns how many were present
    fn set_remove(&self, key: &str, members: &[String]) -> Result<usize>;

    /// All members, in unspecified order
    fn set_members(&self, key: &str) -> Result<HashSet<String>>;

    /// Cardinality of a set (0 if missing)
    fn set_count(&self, key: &str) -> Result<usize>;

    /// Membership test
    fn set_contains(&self, key: &str, member: &str) -> Result<bool>;

    /// Members of the first set absent from all following sets
    fn set_diff(&self, keys: &[String]) -> Result<HashSet<String>>;

    /// Members present in every set
    fn set_intersect(&self, keys: &[String]) -> Result<HashSet<String>>;

    /// Store the intersection of `keys` in `dest`, replacing it
    ///
    /// Returns the cardinality of the result.
    fn set_intersect_store(&self, dest: &str, keys: &[String]) -> Result<usize>;

    // ========== Lists ==========

    /// Append values in order; returns the new length
    fn list_push(&self, key: &str, values: &[String]) -> Result<usize>;

    /// Whole list, in order
    fn list_all(&self, key: &str) -> Result<Vec<String>>;

    /// Remove and return the first element, waiting up to `timeout`
    /// for one to arrive
    fn list_pop_front_blocking(&self, key: &str, timeout: Duration) -> Result<Option<String>>;

    // ========== Keys ==========

    /// Delete a key of any structure; returns whether it existed
    fn delete(&self, key: &str) -> Result<bool>;

    /// Check whether a key exists
    fn exists(&self, key: &str) -> Result<bool>;

    // ========== Atomic batches ==========

    /// Apply every command of the batch as one indivisible unit
    ///
    /// Commands run in order. A command that fails (e.g. wrong structure)
    /// aborts the batch before anything is applied.
    fn execute(&self, batch: Batch) -> Result<()>;
}
