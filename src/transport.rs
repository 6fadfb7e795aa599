//! Query execution transport.
//!
//! The dispatch queue talks to the data store only through [`Transport`].
//! Each call carries the effective reasoning mode explicitly, so transports
//! never depend on mutable session state.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::QueryError;
use crate::task::{Method, ReasoningMode, Task};

pub mod http;

pub use http::HttpTransport;

/// Mimetype requested for JSON-LD graph documents.
pub const JSON_LD_MIMETYPE: &str = "application/ld+json";
/// Mimetype requested for tabular results.
pub const SPARQL_RESULTS_MIMETYPE: &str = "application/sparql-results+json";

/// Operations the endpoint understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMethod {
    Query,
    QueryGraph,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransportRequest {
    pub method: TransportMethod,
    pub database: Option<String>,
    pub query: String,
    pub reasoning: ReasoningMode,
    pub mimetype: Option<String>,
}

impl TransportRequest {
    pub fn from_task(task: &Task, reasoning: ReasoningMode) -> Self {
        let options = &task.options;
        let (method, mimetype) = match task.method {
            Method::Query => (TransportMethod::Query, options.mimetype.clone()),
            Method::QueryGraph => (TransportMethod::QueryGraph, options.mimetype.clone()),
            Method::GetGraph => (
                TransportMethod::QueryGraph,
                Some(
                    options
                        .mimetype
                        .clone()
                        .unwrap_or_else(|| JSON_LD_MIMETYPE.to_string()),
                ),
            ),
        };
        Self {
            method,
            database: options.database.clone(),
            query: options.query.clone(),
            reasoning,
            mimetype,
        }
    }

    /// Accept header for this request.
    pub fn accept(&self) -> &str {
        match (&self.mimetype, self.method) {
            (Some(mimetype), _) => mimetype.as_str(),
            (None, TransportMethod::Query) => SPARQL_RESULTS_MIMETYPE,
            (None, TransportMethod::QueryGraph) => JSON_LD_MIMETYPE,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    pub body: Value,
    pub status: u16,
}

impl TransportResponse {
    pub fn ok(body: Value) -> Self {
        Self { body, status: 200 }
    }

    pub fn is_success(&self) -> bool {
        self.status == 200
    }

    /// Body rendered as text, for error payloads.
    pub fn body_text(&self) -> String {
        match &self.body {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        }
    }
}

/// Executes one query against the endpoint.
///
/// `Err` is a transport-level failure (connection, timeout); a response
/// with a non-200 status is returned as `Ok` and judged by the caller.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: &TransportRequest) -> Result<TransportResponse, QueryError>;
}
