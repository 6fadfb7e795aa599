//! Response cache.
//!
//! Decides whether a task is cacheable, derives its key, and mediates
//! reads and writes against a TTL-capable [`CacheBackend`]. Backend and
//! decoding failures never reach the caller: reads degrade to a miss and
//! writes are reported only through logs and [`CacheEvent::WriteFailed`].

use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::config::{CacheBackendKind, CacheConfig};
use crate::error::StorageError;
use crate::task::Task;

pub mod backend;
pub mod events;
pub mod sled_backend;

pub use backend::{CacheBackend, MemoryCacheBackend};
pub use events::{CacheEvent, CacheEvents};
pub use sled_backend::SledCacheBackend;

/// Prefix shared by every cache key.
pub const CACHE_KEY_NAMESPACE: &str = "graphgate:cache:";

/// Successful writes between sweeps of expired entries.
pub const SWEEP_INTERVAL: u64 = 64;

/// Two-letter prefixes of update statements (INSERT, DELETE, CLEAR).
const UPDATE_PREFIXES: [&str; 3] = ["in", "de", "cl"];

/// True when the first two non-whitespace characters of `query` mark an
/// update statement.
///
/// `DESCRIBE` shares the `de` prefix, so it is never cached either.
pub fn is_update_query(query: &str) -> bool {
    let head: String = query
        .chars()
        .filter(|c| !c.is_whitespace())
        .take(2)
        .flat_map(char::to_lowercase)
        .collect();
    UPDATE_PREFIXES.contains(&head.as_str())
}

pub struct CacheStore {
    backend: Option<Arc<dyn CacheBackend>>,
    ttl: Duration,
    events: CacheEvents,
    writes: AtomicU64,
}

impl CacheStore {
    pub fn new(backend: Arc<dyn CacheBackend>, ttl: Duration) -> Self {
        Self {
            backend: Some(backend),
            ttl,
            events: CacheEvents::new(),
            writes: AtomicU64::new(0),
        }
    }

    /// A store with no backend: every fetch misses and every put is dropped.
    pub fn disabled() -> Self {
        Self {
            backend: None,
            ttl: Duration::ZERO,
            events: CacheEvents::new(),
            writes: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Result<Self, StorageError> {
        if !config.enabled {
            return Ok(Self::disabled());
        }
        let backend: Arc<dyn CacheBackend> = match config.backend {
            CacheBackendKind::Memory => Arc::new(MemoryCacheBackend::new()),
            CacheBackendKind::Sled => Arc::new(SledCacheBackend::open(config.resolved_path())?),
        };
        Ok(Self::new(backend, config.ttl()))
    }

    pub fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Namespaced hex BLAKE3 digest of the task's canonical serialization.
    pub fn derive_key(task: &Task) -> String {
        let digest = blake3::hash(&task.canonical_bytes());
        format!("{}{}", CACHE_KEY_NAMESPACE, hex::encode(digest.as_bytes()))
    }

    pub fn should_cache(task: &Task) -> bool {
        if task.options.cache == Some(false) {
            return false;
        }
        !is_update_query(&task.options.query)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.events.subscribe()
    }

    /// Look up a previously stored result.
    pub fn fetch(&self, task: &Task) -> Option<Value> {
        let backend = self.backend.as_ref()?;
        if !Self::should_cache(task) {
            return None;
        }

        let key = Self::derive_key(task);
        let cached = match backend.get(&key) {
            Ok(Some(bytes)) => match serde_json::from_slice::<Value>(&bytes) {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!(key = %key, error = %e, "Discarding undecodable cache entry");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(key = %key, error = %e, "Cache read failed, treating as miss");
                None
            }
        };

        match cached {
            Some(result) => {
                debug!(key = %key, method = %task.method, "Cache hit");
                self.events.publish(CacheEvent::Hit {
                    key,
                    task: task.clone(),
                    result: result.clone(),
                });
                Some(result)
            }
            None => {
                debug!(key = %key, method = %task.method, "Cache miss");
                self.events.publish(CacheEvent::Miss {
                    key,
                    task: task.clone(),
                });
                None
            }
        }
    }

    /// Store a fresh result, replacing any previous entry for the task.
    pub fn put(&self, task: &Task, result: &Value) {
        let Some(backend) = self.backend.as_ref() else {
            return;
        };
        if !Self::should_cache(task) {
            return;
        }

        let key = Self::derive_key(task);
        match self.write(backend.as_ref(), &key, result) {
            Ok(()) => {
                debug!(key = %key, method = %task.method, ttl_secs = self.ttl.as_secs(), "Cache put");
                self.events.publish(CacheEvent::Put {
                    key,
                    task: task.clone(),
                    result: result.clone(),
                });
                if (self.writes.fetch_add(1, Ordering::Relaxed) + 1) % SWEEP_INTERVAL == 0 {
                    self.sweep(backend.as_ref());
                }
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Cache write failed");
                self.events.publish(CacheEvent::WriteFailed {
                    key,
                    task: task.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    fn sweep(&self, backend: &dyn CacheBackend) {
        match backend.purge_expired() {
            Ok(0) => {}
            Ok(removed) => debug!(removed, "Swept expired cache entries"),
            Err(e) => warn!(error = %e, "Cache sweep failed"),
        }
    }

    fn write(
        &self,
        backend: &dyn CacheBackend,
        key: &str,
        result: &Value,
    ) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec(result).map_err(|e| StorageError::Encode(e.to_string()))?;
        backend.set(key, &bytes)?;
        backend.expire(key, self.ttl)
    }
}
