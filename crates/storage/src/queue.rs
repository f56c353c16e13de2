//! Work queue for the delivery collaborator
//!
//! The notification side of the system only needs two things from the store:
//! take the next queued work item (blocking, with a timeout) and record how
//! the delivery went. Items are opaque strings; outcome counters live in a
//! field-map next to the queue list.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, trace};

use keyrecord_core::{KeyrecordConfig, Keyspace, Result, Store};

/// How a delivery attempt ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeliveryOutcome {
    /// The item reached its destination
    Delivered,
    /// The attempt failed; the item is not requeued
    Failed,
}

impl DeliveryOutcome {
    /// Field name of this outcome's counter
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryOutcome::Delivered => "delivered",
            DeliveryOutcome::Failed => "failed",
        }
    }
}

impl fmt::Display for DeliveryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named FIFO of work items backed by a store list
#[derive(Clone)]
pub struct WorkQueue {
    store: Arc<dyn Store>,
    key: String,
    outcomes_key: String,
    default_timeout: Duration,
}

impl WorkQueue {
    /// Queue `name` under the given keyspace, waiting at most one second by default
    pub fn new(store: Arc<dyn Store>, keyspace: &Keyspace, name: &str) -> Self {
        let key = keyspace.type_key(name);
        let outcomes_key = format!("{}:outcomes", key);
        Self {
            store,
            key,
            outcomes_key,
            default_timeout: KeyrecordConfig::default().pop_timeout(),
        }
    }

    /// Queue `name` using the namespace and pop timeout from `config`
    pub fn from_config(store: Arc<dyn Store>, config: &KeyrecordConfig, name: &str) -> Self {
        let mut queue = Self::new(store, &config.keyspace(), name);
        queue.default_timeout = config.pop_timeout();
        queue
    }

    /// Store key of the item list
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Store key of the outcome counters
    pub fn outcomes_key(&self) -> &str {
        &self.outcomes_key
    }

    /// Append an item; returns the queue length afterwards
    pub fn push(&self, item: impl Into<String>) -> Result<usize> {
        let len = self.store.list_push(&self.key, &[item.into()])?;
        trace!(target: "keyrecord::queue", queue = %self.key, len, "Item queued");
        Ok(len)
    }

    /// Take the oldest item, waiting up to `timeout` for one to arrive
    pub fn next(&self, timeout: Duration) -> Result<Option<String>> {
        let item = self.store.list_pop_front_blocking(&self.key, timeout)?;
        if item.is_none() {
            trace!(target: "keyrecord::queue", queue = %self.key, "No item before timeout");
        }
        Ok(item)
    }

    /// [`next`](Self::next) with the configured default timeout
    pub fn next_default(&self) -> Result<Option<String>> {
        self.next(self.default_timeout)
    }

    /// Items currently waiting, oldest first
    pub fn pending(&self) -> Result<Vec<String>> {
        self.store.list_all(&self.key)
    }

    /// Count one delivery outcome; returns the new total for that outcome
    pub fn record_outcome(&self, outcome: DeliveryOutcome) -> Result<i64> {
        let total = self
            .store
            .hash_increment(&self.outcomes_key, outcome.as_str(), 1)?;
        debug!(target: "keyrecord::queue", queue = %self.key, %outcome, total, "Outcome recorded");
        Ok(total)
    }

    /// Total recorded for one outcome (0 if never recorded)
    pub fn outcome_count(&self, outcome: DeliveryOutcome) -> Result<i64> {
        let counts = self.store.hash_get_all(&self.outcomes_key)?;
        match counts.get(outcome.as_str()) {
            None => Ok(0),
            Some(raw) => raw.parse::<i64>().map_err(|e| {
                keyrecord_core::Error::Decode {
                    attribute: outcome.as_str().to_string(),
                    value: raw.clone(),
                    reason: e.to_string(),
                }
            }),
        }
    }
}

impl fmt::Debug for WorkQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkQueue")
            .field("key", &self.key)
            .field("default_timeout", &self.default_timeout)
            .finish()
    }
}
