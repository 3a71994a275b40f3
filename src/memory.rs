//! In-process reference implementation of [`HashStore`].
//!
//! Useful for tests and for embedding counters in a single process. It keeps every
//! hash in memory and never evicts.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};

use crate::store::{HashStore, StoreError};

/// A hash-of-fields store held in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    hashes: RwLock<HashMap<String, HashMap<String, i64>>>,
    read_calls: AtomicUsize,
    fields_read: AtomicUsize,
}

fn poisoned<T>(_: PoisonError<T>) -> StoreError {
    StoreError::Unavailable("memory store lock poisoned".to_string())
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of hashes holding at least one field.
    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.hashes.read().map_err(poisoned)?.len())
    }

    /// Returns `true` if nothing has been written.
    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    /// Number of fields stored under `hash`.
    pub fn hash_len(&self, hash: &str) -> Result<usize, StoreError> {
        let hashes = self.hashes.read().map_err(poisoned)?;
        Ok(hashes.get(hash).map_or(0, HashMap::len))
    }

    /// Removes every hash.
    pub fn clear(&self) -> Result<(), StoreError> {
        self.hashes.write().map_err(poisoned)?.clear();
        Ok(())
    }

    /// Number of `read_one`/`read_many` calls served since creation or the last reset.
    pub fn read_calls(&self) -> usize {
        self.read_calls.load(Ordering::Relaxed)
    }

    /// Number of individual fields looked up since creation or the last reset.
    pub fn fields_read(&self) -> usize {
        self.fields_read.load(Ordering::Relaxed)
    }

    /// Resets the read counters.
    pub fn reset_counters(&self) {
        self.read_calls.store(0, Ordering::Relaxed);
        self.fields_read.store(0, Ordering::Relaxed);
    }

    fn record_read(&self, fields: usize) {
        self.read_calls.fetch_add(1, Ordering::Relaxed);
        self.fields_read.fetch_add(fields, Ordering::Relaxed);
    }
}

impl HashStore for MemoryStore {
    fn increment(&self, hash: &str, field: &str, delta: i64) -> Result<(), StoreError> {
        let mut hashes = self.hashes.write().map_err(poisoned)?;
        let fields = hashes.entry(hash.to_string()).or_default();
        match fields.get_mut(field) {
            Some(value) => {
                *value = value.checked_add(delta).ok_or_else(|| StoreError::Overflow {
                    hash: hash.to_string(),
                    field: field.to_string(),
                })?;
            }
            None => {
                fields.insert(field.to_string(), delta);
            }
        }
        Ok(())
    }

    fn read_one(&self, hash: &str, field: &str) -> Result<Option<i64>, StoreError> {
        self.record_read(1);
        let hashes = self.hashes.read().map_err(poisoned)?;
        Ok(hashes.get(hash).and_then(|fields| fields.get(field)).copied())
    }

    fn read_many(&self, hash: &str, fields: &[String]) -> Result<Vec<Option<i64>>, StoreError> {
        self.record_read(fields.len());
        let hashes = self.hashes.read().map_err(poisoned)?;
        let Some(stored) = hashes.get(hash) else {
            return Ok(vec![None; fields.len()]);
        };
        Ok(fields
            .iter()
            .map(|field| stored.get(field).copied())
            .collect())
    }
}
