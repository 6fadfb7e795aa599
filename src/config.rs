//! Configuration System
//!
//! Process-wide settings consumed by the dispatch layer: the query endpoint,
//! the default database, the response cache and the retry queue. Values are
//! layered from defaults, config files and `GRAPHGATE_*` environment
//! variables by [`ConfigLoader`].

use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

mod defaults;
mod loader;
mod sources;

pub use loader::ConfigLoader;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphGateConfig {
    /// Database used when a query does not name one
    #[serde(default)]
    pub default_database: Option<String>,

    #[serde(default)]
    pub endpoint: EndpointConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub queue: QueueConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Query endpoint connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    #[serde(default = "default_endpoint_url")]
    pub url: String,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

const REDACTED: &str = "********";

fn default_endpoint_url() -> String {
    "http://localhost:5820".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    120
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            url: default_endpoint_url(),
            username: None,
            password: None,
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Which key-value store backs the response cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheBackendKind {
    #[default]
    Memory,
    Sled,
}

/// Response cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub backend: CacheBackendKind,

    /// sled database directory; defaults to the per-user cache directory
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Entry lifetime in seconds
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

fn default_true() -> bool {
    true
}

fn default_ttl_secs() -> u64 {
    60
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            backend: CacheBackendKind::default(),
            path: None,
            ttl_secs: default_ttl_secs(),
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    /// Directory for the sled backend.
    pub fn resolved_path(&self) -> PathBuf {
        if let Some(path) = &self.path {
            return path.clone();
        }
        directories::ProjectDirs::from("org", "graphgate", "graphgate")
            .map(|dirs| dirs.cache_dir().join("query-cache"))
            .unwrap_or_else(|| PathBuf::from(".graphgate/query-cache"))
    }
}

/// Dispatch queue settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Initial (and maximum) number of concurrently dispatching tasks
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Backoff floor between retries (milliseconds)
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Backoff ceiling between retries (milliseconds)
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Transport attempts per task, first attempt included
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_concurrency() -> usize {
    4
}

fn default_base_delay_ms() -> u64 {
    100
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_max_retries() -> u32 {
    3
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            max_retries: default_max_retries(),
        }
    }
}

impl QueueConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Endpoint(String),
    Cache(String),
    Queue(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Endpoint(msg) => write!(f, "Endpoint: {}", msg),
            ValidationError::Cache(msg) => write!(f, "Cache: {}", msg),
            ValidationError::Queue(msg) => write!(f, "Queue: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl GraphGateConfig {
    /// Validate the entire configuration, collecting every problem
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        let url = self.endpoint.url.trim();
        if url.is_empty() {
            errors.push(ValidationError::Endpoint("url cannot be empty".to_string()));
        } else if !(url.starts_with("http://") || url.starts_with("https://")) {
            errors.push(ValidationError::Endpoint(format!(
                "url must start with http:// or https:// (got '{}')",
                url
            )));
        }
        if self.endpoint.password.is_some() && self.endpoint.username.is_none() {
            errors.push(ValidationError::Endpoint(
                "password set without username".to_string(),
            ));
        }

        if let Some(db) = &self.default_database {
            if db.trim().is_empty() {
                errors.push(ValidationError::Endpoint(
                    "default_database cannot be blank".to_string(),
                ));
            }
        }

        if self.cache.enabled && self.cache.ttl_secs == 0 {
            errors.push(ValidationError::Cache("ttl_secs must be positive".to_string()));
        }

        if self.queue.concurrency == 0 {
            errors.push(ValidationError::Queue(
                "concurrency must be at least 1".to_string(),
            ));
        }
        if self.queue.max_retries == 0 {
            errors.push(ValidationError::Queue(
                "max_retries must be at least 1".to_string(),
            ));
        }
        if self.queue.base_delay_ms > self.queue.max_delay_ms {
            errors.push(ValidationError::Queue(format!(
                "base_delay_ms ({}) exceeds max_delay_ms ({})",
                self.queue.base_delay_ms, self.queue.max_delay_ms
            )));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Copy with secrets masked, for display.
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        if config.endpoint.password.is_some() {
            config.endpoint.password = Some(REDACTED.to_string());
        }
        config
    }

    /// Render as TOML (used by `graphgate config`).
    pub fn to_toml(&self) -> Result<String, crate::error::QueryError> {
        toml::to_string_pretty(self).map_err(|e| crate::error::QueryError::Config(e.to_string()))
    }
}
