//! GraphGate: resilient dispatch for graph-query endpoints
//!
//! A caching, retrying, concurrency-adaptive client layer in front of a
//! SPARQL-style query endpoint, with per-query reasoning overrides that never
//! leak into other queries.

pub mod cache;
pub mod cli;
pub mod codec;
pub mod config;
pub mod connection;
pub mod dispatch;
pub mod error;
pub mod logging;
pub mod reasoning;
pub mod results;
pub mod task;
pub mod transport;

pub use connection::Connection;
pub use error::QueryError;
pub use task::{GraphForm, Method, QueryOptions, ReasoningMode, Task};
