//! Scoped temporary store keys
//!
//! Set intersections and subset scans stage data in a store-side set. The
//! [`TempKey`] guard deletes that key when dropped, so it is released on
//! every exit path, including early `?` returns and panics.

use std::sync::Arc;

use keyrecord_core::Store;
use tracing::{trace, warn};

/// Owns a temporary key and deletes it on drop
pub struct TempKey {
    store: Arc<dyn Store>,
    key: String,
}

impl TempKey {
    /// Take ownership of `key`
    pub fn new(store: Arc<dyn Store>, key: String) -> Self {
        trace!(target: "keyrecord::filter", key = %key, "Temporary key acquired");
        Self { store, key }
    }

    /// The owned key
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for TempKey {
    fn drop(&mut self) {
        if let Err(e) = self.store.delete(&self.key) {
            warn!(target: "keyrecord::filter", key = %self.key, error = %e, "Failed to delete temporary key");
        }
    }
}

impl std::fmt::Debug for TempKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TempKey").field("key", &self.key).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keyrecord_storage::MemoryStore;

    #[test]
    fn test_key_deleted_on_drop() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        {
            let temp = TempKey::new(Arc::clone(&store), "t::tmp:abc".to_string());
            store.set_add(temp.key(), &["1".to_string()]).unwrap();
            assert!(store.exists("t::tmp:abc").unwrap());
        }
        assert!(!store.exists("t::tmp:abc").unwrap());
    }

    #[test]
    fn test_key_deleted_on_early_return() {
        fn failing(store: &Arc<dyn Store>) -> keyrecord_core::Result<()> {
            let temp = TempKey::new(Arc::clone(store), "t::tmp:early".to_string());
            store.set_add(temp.key(), &["1".to_string()])?;
            store.list_push(temp.key(), &["x".to_string()])?;
            Ok(())
        }

        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        assert!(failing(&store).is_err());
        assert!(!store.exists("t::tmp:early").unwrap());
    }
}
