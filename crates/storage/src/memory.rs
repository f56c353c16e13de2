//! MemoryStore: in-process store backend
//!
//! This module implements the Store trait using:
//! - `FxHashMap<String, Entry>` where an entry is a field-map, set or list
//! - `parking_lot::RwLock` for thread-safe access
//! - `parking_lot::Condvar` to wake blocking list reads when items arrive
//!
//! # Design Notes
//!
//! - **Atomic batches**: a batch is type-checked against the current data and
//!   then applied under one write-lock acquisition, so readers never observe
//!   a partially applied batch and a rejected batch leaves no trace
//! - **No empty structures**: removing the last field/member/element removes
//!   the key, matching how the record layer treats absence
//! - **Wake-ups**: pushers notify while holding `signal`; blocking readers
//!   hold `signal` between their emptiness check and the wait, so a push can
//!   never slip in unnoticed

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, RwLock};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use keyrecord_core::{Batch, Command, Error, Result, Store};

/// One stored structure
#[derive(Debug, Clone)]
enum Entry {
    Hash(FxHashMap<String, String>),
    Set(FxHashSet<String>),
    List(VecDeque<String>),
}

/// Structure kind, used for type checks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Hash,
    Set,
    List,
}

impl Kind {
    fn name(self) -> &'static str {
        match self {
            Kind::Hash => "hash",
            Kind::Set => "set",
            Kind::List => "list",
        }
    }
}

impl Entry {
    fn kind(&self) -> Kind {
        match self {
            Entry::Hash(_) => Kind::Hash,
            Entry::Set(_) => Kind::Set,
            Entry::List(_) => Kind::List,
        }
    }

    fn is_empty(&self) -> bool {
        match self {
            Entry::Hash(h) => h.is_empty(),
            Entry::Set(s) => s.is_empty(),
            Entry::List(l) => l.is_empty(),
        }
    }
}

type Data = FxHashMap<String, Entry>;

fn wrong_type(key: &str, expected: Kind) -> Error {
    Error::WrongType {
        key: key.to_string(),
        expected: expected.name(),
    }
}

/// Fail unless `key` is missing or holds `expected`
fn check_kind(data: &Data, key: &str, expected: Kind) -> Result<()> {
    match data.get(key) {
        Some(entry) if entry.kind() != expected => Err(wrong_type(key, expected)),
        _ => Ok(()),
    }
}

fn remove_if_empty(data: &mut Data, key: &str) {
    if data.get(key).map(Entry::is_empty).unwrap_or(false) {
        data.remove(key);
    }
}

fn read_set<'a>(data: &'a Data, key: &str) -> Result<Option<&'a FxHashSet<String>>> {
    match data.get(key) {
        None => Ok(None),
        Some(Entry::Set(set)) => Ok(Some(set)),
        Some(_) => Err(wrong_type(key, Kind::Set)),
    }
}

// ============================================================================
// Mutations shared by single commands and batches
// ============================================================================

fn apply_hash_set_fields(
    data: &mut Data,
    key: &str,
    fields: &[(String, Option<String>)],
) -> Result<()> {
    check_kind(data, key, Kind::Hash)?;
    if fields.is_empty() {
        return Ok(());
    }
    let entry = data
        .entry(key.to_string())
        .or_insert_with(|| Entry::Hash(FxHashMap::default()));
    if let Entry::Hash(hash) = entry {
        for (field, value) in fields {
            match value {
                Some(v) => {
                    hash.insert(field.clone(), v.clone());
                }
                None => {
                    hash.remove(field);
                }
            }
        }
    }
    remove_if_empty(data, key);
    Ok(())
}

fn apply_set_add(data: &mut Data, key: &str, members: &[String]) -> Result<usize> {
    check_kind(data, key, Kind::Set)?;
    if members.is_empty() {
        return Ok(0);
    }
    let entry = data
        .entry(key.to_string())
        .or_insert_with(|| Entry::Set(FxHashSet::default()));
    let added = match entry {
        Entry::Set(set) => members.iter().filter(|m| set.insert((*m).clone())).count(),
        _ => 0,
    };
    Ok(added)
}

fn apply_set_remove(data: &mut Data, key: &str, members: &[String]) -> Result<usize> {
    check_kind(data, key, Kind::Set)?;
    let removed = match data.get_mut(key) {
        Some(Entry::Set(set)) => members.iter().filter(|m| set.remove(*m)).count(),
        _ => 0,
    };
    remove_if_empty(data, key);
    Ok(removed)
}

fn apply_list_push(data: &mut Data, key: &str, values: &[String]) -> Result<usize> {
    check_kind(data, key, Kind::List)?;
    if values.is_empty() {
        return Ok(data.get(key).map(list_len).unwrap_or(0));
    }
    let entry = data
        .entry(key.to_string())
        .or_insert_with(|| Entry::List(VecDeque::new()));
    let len = match entry {
        Entry::List(list) => {
            list.extend(values.iter().cloned());
            list.len()
        }
        _ => 0,
    };
    Ok(len)
}

fn list_len(entry: &Entry) -> usize {
    match entry {
        Entry::List(list) => list.len(),
        _ => 0,
    }
}

fn apply_command(data: &mut Data, command: &Command) -> Result<()> {
    match command {
        Command::HashSetFields { key, fields } => apply_hash_set_fields(data, key, fields),
        Command::SetAdd { key, members } => apply_set_add(data, key, members).map(|_| ()),
        Command::SetRemove { key, members } => apply_set_remove(data, key, members).map(|_| ()),
        Command::ListPush { key, values } => apply_list_push(data, key, values).map(|_| ()),
        Command::Delete { key } => {
            data.remove(key);
            Ok(())
        }
    }
}

/// Type-check a whole batch before touching any data.
///
/// Tracks the structure each key will hold after earlier commands of the
/// same batch, so `Delete` followed by a push of another kind is accepted.
fn precheck(data: &Data, commands: &[Command]) -> Result<()> {
    let mut overlay: FxHashMap<&str, Option<Kind>> = FxHashMap::default();
    for command in commands {
        let key = command.key();
        let current = match overlay.get(key) {
            Some(kind) => *kind,
            None => data.get(key).map(Entry::kind),
        };
        let (needed, after) = match command {
            Command::Delete { .. } => {
                overlay.insert(key, None);
                continue;
            }
            Command::HashSetFields { .. } => (Kind::Hash, Some(Kind::Hash)),
            Command::SetAdd { .. } => (Kind::Set, Some(Kind::Set)),
            Command::SetRemove { .. } => (Kind::Set, current),
            Command::ListPush { .. } => (Kind::List, Some(Kind::List)),
        };
        if let Some(kind) = current {
            if kind != needed {
                return Err(wrong_type(key, needed));
            }
        }
        overlay.insert(key, after);
    }
    Ok(())
}

/// In-process store backend
///
/// Implements every [`Store`] primitive. Thread-safe through
/// `parking_lot::RwLock`; cloning is not supported, share it behind an `Arc`.
///
/// # Example
///
/// ```ignore
/// use keyrecord_storage::MemoryStore;
/// use keyrecord_core::Store;
/// use std::sync::Arc;
///
/// let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
/// store.set_add("check::ids", &["abc".to_string()])?;
/// ```
pub struct MemoryStore {
    /// All keys and their structures
    data: RwLock<Data>,
    /// Held by blocking readers between the emptiness check and the wait
    signal: Mutex<()>,
    /// Notified after any list push
    pushed: Condvar,
    /// Batches applied so far (observational)
    batches: AtomicU64,
}

impl MemoryStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self {
            data: RwLock::new(FxHashMap::default()),
            signal: Mutex::new(()),
            pushed: Condvar::new(),
            batches: AtomicU64::new(0),
        }
    }

    /// Number of keys currently held
    pub fn key_count(&self) -> usize {
        self.data.read().len()
    }

    /// All keys, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.data.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Remove every key
    pub fn flush_all(&self) {
        self.data.write().clear();
    }

    /// Number of batches applied since creation
    pub fn batches_executed(&self) -> u64 {
        self.batches.load(Ordering::Relaxed)
    }

    fn notify_pushed(&self) {
        let _guard = self.signal.lock();
        self.pushed.notify_all();
    }

    fn pop_front(&self, key: &str) -> Result<Option<String>> {
        let mut data = self.data.write();
        check_kind(&data, key, Kind::List)?;
        let popped = match data.get_mut(key) {
            Some(Entry::List(list)) => list.pop_front(),
            _ => None,
        };
        remove_if_empty(&mut data, key);
        Ok(popped)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("key_count", &self.key_count())
            .field("batches_executed", &self.batches_executed())
            .finish()
    }
}

impl Store for MemoryStore {
    fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>> {
        let data = self.data.read();
        match data.get(key) {
            None => Ok(HashMap::new()),
            Some(Entry::Hash(hash)) => Ok(hash.iter().map(|(k, v)| (k.clone(), v.clone())).collect()),
            Some(_) => Err(wrong_type(key, Kind::Hash)),
        }
    }

    fn hash_set_fields(&self, key: &str, fields: &[(String, Option<String>)]) -> Result<()> {
        apply_hash_set_fields(&mut self.data.write(), key, fields)
    }

    fn hash_increment(&self, key: &str, field: &str, by: i64) -> Result<i64> {
        let mut data = self.data.write();
        check_kind(&data, key, Kind::Hash)?;
        let entry = data
            .entry(key.to_string())
            .or_insert_with(|| Entry::Hash(FxHashMap::default()));
        match entry {
            Entry::Hash(hash) => {
                let current = match hash.get(field) {
                    Some(raw) => raw.parse::<i64>().map_err(|_| {
                        Error::Store(format!("field '{}' of '{}' is not an integer", field, key))
                    })?,
                    None => 0,
                };
                let next = current
                    .checked_add(by)
                    .ok_or_else(|| Error::Store(format!("increment of '{}' overflows", field)))?;
                hash.insert(field.to_string(), next.to_string());
                Ok(next)
            }
            _ => Err(wrong_type(key, Kind::Hash)),
        }
    }

    fn set_add(&self, key: &str, members: &[String]) -> Result<usize> {
        apply_set_add(&mut self.data.write(), key, members)
    }

    fn set_remove(&self, key: &str, members: &[String]) -> Result<usize> {
        apply_set_remove(&mut self.data.write(), key, members)
    }

    fn set_members(&self, key: &str) -> Result<HashSet<String>> {
        let data = self.data.read();
        Ok(read_set(&data, key)?
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default())
    }

    fn set_count(&self, key: &str) -> Result<usize> {
        let data = self.data.read();
        Ok(read_set(&data, key)?.map(|set| set.len()).unwrap_or(0))
    }

    fn set_contains(&self, key: &str, member: &str) -> Result<bool> {
        let data = self.data.read();
        Ok(read_set(&data, key)?
            .map(|set| set.contains(member))
            .unwrap_or(false))
    }

    fn set_diff(&self, keys: &[String]) -> Result<HashSet<String>> {
        let data = self.data.read();
        let Some((first, rest)) = keys.split_first() else {
            return Ok(HashSet::new());
        };
        let mut others = Vec::with_capacity(rest.len());
        for key in rest {
            others.push(read_set(&data, key)?);
        }
        let Some(base) = read_set(&data, first)? else {
            return Ok(HashSet::new());
        };
        Ok(base
            .iter()
            .filter(|m| !others.iter().any(|o| o.map(|s| s.contains(*m)).unwrap_or(false)))
            .cloned()
            .collect())
    }

    fn set_intersect(&self, keys: &[String]) -> Result<HashSet<String>> {
        let data = self.data.read();
        intersect(&data, keys)
    }

    fn set_intersect_store(&self, dest: &str, keys: &[String]) -> Result<usize> {
        let mut data = self.data.write();
        let result = intersect(&data, keys)?;
        let count = result.len();
        data.remove(dest);
        if count > 0 {
            data.insert(dest.to_string(), Entry::Set(result.into_iter().collect()));
        }
        Ok(count)
    }

    fn list_push(&self, key: &str, values: &[String]) -> Result<usize> {
        let len = apply_list_push(&mut self.data.write(), key, values)?;
        if !values.is_empty() {
            self.notify_pushed();
        }
        Ok(len)
    }

    fn list_all(&self, key: &str) -> Result<Vec<String>> {
        let data = self.data.read();
        match data.get(key) {
            None => Ok(Vec::new()),
            Some(Entry::List(list)) => Ok(list.iter().cloned().collect()),
            Some(_) => Err(wrong_type(key, Kind::List)),
        }
    }

    fn list_pop_front_blocking(&self, key: &str, timeout: Duration) -> Result<Option<String>> {
        let deadline = Instant::now() + timeout;
        let mut guard = self.signal.lock();
        loop {
            if let Some(value) = self.pop_front(key)? {
                return Ok(Some(value));
            }
            if self.pushed.wait_until(&mut guard, deadline).timed_out() {
                return self.pop_front(key);
            }
        }
    }

    fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.data.write().remove(key).is_some())
    }

    fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.data.read().contains_key(key))
    }

    fn execute(&self, batch: Batch) -> Result<()> {
        let commands = batch.into_commands();
        let pushes = commands
            .iter()
            .any(|c| matches!(c, Command::ListPush { .. }));
        {
            let mut data = self.data.write();
            precheck(&data, &commands)?;
            for command in &commands {
                apply_command(&mut data, command)?;
            }
        }
        self.batches.fetch_add(1, Ordering::Relaxed);
        debug!(target: "keyrecord::store", commands = commands.len(), "Batch applied");
        if pushes {
            self.notify_pushed();
        }
        Ok(())
    }
}

fn intersect(data: &Data, keys: &[String]) -> Result<HashSet<String>> {
    let mut sets = Vec::with_capacity(keys.len());
    for key in keys {
        match read_set(data, key)? {
            Some(set) => sets.push(set),
            // A missing key is an empty set, so the intersection is empty
            None => return Ok(HashSet::new()),
        }
    }
    sets.sort_by_key(|s| s.len());
    let Some((smallest, rest)) = sets.split_first() else {
        return Ok(HashSet::new());
    };
    Ok(smallest
        .iter()
        .filter(|m| rest.iter().all(|s| s.contains(*m)))
        .cloned()
        .collect())
}
