//! Default layer: the values every other source overrides.

use config::builder::DefaultState;
use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("endpoint.url", "http://localhost:5820")?
        .set_default("cache.enabled", true)?
        .set_default("cache.backend", "memory")?
        .set_default("cache.ttl_secs", 60_i64)?
        .set_default("queue.concurrency", 4_i64)?
        .set_default("queue.base_delay_ms", 100_i64)?
        .set_default("queue.max_delay_ms", 30_000_i64)?
        .set_default("queue.max_retries", 3_i64)
}
