//! Task model: the unit of dispatchable query work.
//!
//! A [`Task`] pairs a [`Method`] with the [`QueryOptions`] it runs with. Tasks
//! are immutable once enqueued and serialize canonically, so two tasks with
//! the same method and options always produce the same bytes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Dispatchable operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    /// Tabular (SELECT/ASK) or update query.
    Query,
    /// Graph-producing (CONSTRUCT/DESCRIBE) query in the requested mimetype.
    QueryGraph,
    /// Graph-producing query returned as a JSON-LD document.
    GetGraph,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Query => "query",
            Method::QueryGraph => "query_graph",
            Method::GetGraph => "get_graph",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reasoning mode applied by the query engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasoningMode {
    #[default]
    Disabled,
    Enabled,
    /// A named reasoning level such as `QL` or `RDFS`.
    Profile(String),
}

impl ReasoningMode {
    pub fn is_enabled(&self) -> bool {
        !matches!(self, ReasoningMode::Disabled)
    }

    /// Value sent to the endpoint's `reasoning` parameter.
    pub fn as_param(&self) -> &str {
        match self {
            ReasoningMode::Disabled => "false",
            ReasoningMode::Enabled => "true",
            ReasoningMode::Profile(level) => level,
        }
    }
}

impl From<bool> for ReasoningMode {
    fn from(enabled: bool) -> Self {
        if enabled {
            ReasoningMode::Enabled
        } else {
            ReasoningMode::Disabled
        }
    }
}

/// `"true"`/`"false"` map to the boolean modes; anything else names a level.
impl From<&str> for ReasoningMode {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "true" => ReasoningMode::Enabled,
            "false" | "" => ReasoningMode::Disabled,
            _ => ReasoningMode::Profile(value.trim().to_string()),
        }
    }
}

impl From<String> for ReasoningMode {
    fn from(value: String) -> Self {
        ReasoningMode::from(value.as_str())
    }
}

impl FromStr for ReasoningMode {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(ReasoningMode::from(s))
    }
}

impl fmt::Display for ReasoningMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_param())
    }
}

/// Output form for JSON-LD graph documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GraphForm {
    /// Document exactly as the endpoint returned it.
    #[default]
    Raw,
    Compact,
    Flatten,
    Expand,
}

impl FromStr for GraphForm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "raw" => Ok(GraphForm::Raw),
            "compact" => Ok(GraphForm::Compact),
            "flatten" => Ok(GraphForm::Flatten),
            "expand" => Ok(GraphForm::Expand),
            other => Err(format!(
                "unknown graph form '{}' (expected raw, compact, flatten or expand)",
                other
            )),
        }
    }
}

/// Per-call query options.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QueryOptions {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    /// Reasoning override for this call only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<ReasoningMode>,
    /// `Some(false)` bypasses the cache regardless of query shape.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mimetype: Option<String>,
    /// JSON-LD context used by compact and flatten.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form: Option<GraphForm>,
}

impl QueryOptions {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    pub fn with_reasoning(mut self, reasoning: impl Into<ReasoningMode>) -> Self {
        self.reasoning = Some(reasoning.into());
        self
    }

    pub fn with_cache(mut self, cache: bool) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_mimetype(mut self, mimetype: impl Into<String>) -> Self {
        self.mimetype = Some(mimetype.into());
        self
    }

    pub fn with_context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self
    }

    pub fn with_form(mut self, form: GraphForm) -> Self {
        self.form = Some(form);
        self
    }

    /// Whether the caller asked for a textual representation (`text/*`).
    pub fn wants_text(&self) -> bool {
        self.mimetype
            .as_deref()
            .map(|m| m.starts_with("text"))
            .unwrap_or(false)
    }
}

impl From<&str> for QueryOptions {
    fn from(query: &str) -> Self {
        QueryOptions::new(query)
    }
}

impl From<String> for QueryOptions {
    fn from(query: String) -> Self {
        QueryOptions::new(query)
    }
}

/// One unit of dispatchable work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub method: Method,
    pub options: QueryOptions,
}

impl Task {
    pub fn new(method: Method, options: QueryOptions) -> Self {
        Self { method, options }
    }

    /// Canonical serialization: JSON with object keys sorted at every depth.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        // Serializing plain data into a `Value` cannot fail.
        let value = serde_json::to_value(self).unwrap_or(Value::Null);
        serde_json::to_vec(&canonicalize(value)).unwrap_or_default()
    }
}

fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut sorted = Map::new();
            for (key, inner) in entries {
                sorted.insert(key, canonicalize(inner));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}
