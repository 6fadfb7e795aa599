//! Durable sled-backed cache backend.
//!
//! sled has no native expiry, so every value is stored inside an envelope
//! carrying its deadline. Reads past the deadline remove the entry.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sled::{Db, Tree};

use crate::cache::backend::CacheBackend;
use crate::error::StorageError;

const TREE_QUERY_CACHE: &str = "query_cache";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEnvelope {
    value: Vec<u8>,
    stored_at_ms: i64,
    expires_at_ms: Option<i64>,
}

impl CacheEnvelope {
    fn is_expired(&self, now_ms: i64) -> bool {
        self.expires_at_ms.map(|at| now_ms >= at).unwrap_or(false)
    }
}

#[derive(Clone)]
pub struct SledCacheBackend {
    db: Db,
    entries: Tree,
}

impl SledCacheBackend {
    /// Open (or create) a cache database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let db = sled::open(path).map_err(to_storage_io)?;
        Self::new(db)
    }

    pub fn new(db: Db) -> Result<Self, StorageError> {
        let entries = db.open_tree(TREE_QUERY_CACHE).map_err(to_storage_io)?;
        Ok(Self { db, entries })
    }

    pub fn db(&self) -> &Db {
        &self.db
    }

    /// Number of stored entries, expired ones included until swept.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn flush(&self) -> Result<(), StorageError> {
        self.db.flush().map_err(to_storage_io)?;
        Ok(())
    }
}

impl CacheBackend for SledCacheBackend {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let Some(raw) = self.entries.get(key.as_bytes()).map_err(to_storage_io)? else {
            return Ok(None);
        };
        let envelope = decode(&raw)?;
        if envelope.is_expired(now_ms()) {
            // Only drop the entry if nobody replaced it in the meantime.
            let _ = self
                .entries
                .compare_and_swap(key.as_bytes(), Some(raw), None as Option<&[u8]>)
                .map_err(to_storage_io)?;
            return Ok(None);
        }
        Ok(Some(envelope.value))
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        let envelope = CacheEnvelope {
            value: value.to_vec(),
            stored_at_ms: now_ms(),
            expires_at_ms: None,
        };
        let raw = bincode::serialize(&envelope).map_err(|e| StorageError::Encode(e.to_string()))?;
        self.entries
            .insert(key.as_bytes(), raw)
            .map_err(to_storage_io)?;
        Ok(())
    }

    fn expire(&self, key: &str, ttl: Duration) -> Result<(), StorageError> {
        let deadline = now_ms().saturating_add(ttl.as_millis() as i64);
        self.entries
            .fetch_and_update(key.as_bytes(), |current| {
                let mut envelope = decode(current?).ok()?;
                envelope.expires_at_ms = Some(deadline);
                bincode::serialize(&envelope).ok()
            })
            .map_err(to_storage_io)?;
        Ok(())
    }

    /// Also removes entries that no longer decode.
    fn purge_expired(&self) -> Result<usize, StorageError> {
        let now = now_ms();
        let mut stale = Vec::new();
        for item in self.entries.iter() {
            let (key, raw) = item.map_err(to_storage_io)?;
            match decode(&raw) {
                Ok(envelope) if !envelope.is_expired(now) => {}
                _ => stale.push(key),
            }
        }
        for key in &stale {
            self.entries.remove(key).map_err(to_storage_io)?;
        }
        Ok(stale.len())
    }
}

fn decode(raw: &[u8]) -> Result<CacheEnvelope, StorageError> {
    bincode::deserialize(raw).map_err(|e| StorageError::Decode(e.to_string()))
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn to_storage_io(err: sled::Error) -> StorageError {
    StorageError::IoError(std::io::Error::new(
        std::io::ErrorKind::Other,
        format!("sled cache error: {}", err),
    ))
}
