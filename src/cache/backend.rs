//! Key-value backends with per-key TTL.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::error::StorageError;

/// A TTL-capable key-value store.
///
/// `set` replaces the value and clears any previous expiry; `expire` applies
/// a TTL to an existing key and is a no-op for absent keys.
pub trait CacheBackend: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    fn set(&self, key: &str, value: &[u8]) -> Result<(), StorageError>;

    fn expire(&self, key: &str, ttl: Duration) -> Result<(), StorageError>;

    /// Drop every expired entry. Returns how many were removed.
    fn purge_expired(&self) -> Result<usize, StorageError>;
}

struct MemoryEntry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl MemoryEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.map(|at| now >= at).unwrap_or(false)
    }
}

/// Process-local backend. Expired entries are dropped on read and by
/// [`CacheBackend::purge_expired`].
#[derive(Default)]
pub struct MemoryCacheBackend {
    entries: Mutex<HashMap<String, MemoryEntry>>,
}

impl MemoryCacheBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, expired ones included until swept.
    pub fn stored(&self) -> usize {
        self.entries.lock().len()
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .lock()
            .values()
            .filter(|entry| !entry.is_expired(now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheBackend for MemoryCacheBackend {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(entry) if !entry.is_expired(Instant::now()) => {
                return Ok(Some(entry.value.clone()))
            }
            Some(_) => {}
            None => return Ok(None),
        }
        entries.remove(key);
        Ok(None)
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        self.entries.lock().insert(
            key.to_string(),
            MemoryEntry {
                value: value.to_vec(),
                expires_at: None,
            },
        );
        Ok(())
    }

    fn expire(&self, key: &str, ttl: Duration) -> Result<(), StorageError> {
        if let Some(entry) = self.entries.lock().get_mut(key) {
            entry.expires_at = Some(Instant::now() + ttl);
        }
        Ok(())
    }

    fn purge_expired(&self) -> Result<usize, StorageError> {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        Ok(before - entries.len())
    }
}
