//! RDF / JSON-LD codec seam.
//!
//! Graph documents are transformed by an external JSON-LD implementation
//! plugged in through [`GraphCodec`]. This module only decides which
//! transformation a request asks for.

use serde_json::{Map, Value};

use crate::error::QueryError;
use crate::task::GraphForm;

/// JSON-LD processor used for graph retrieval and insertion.
pub trait GraphCodec: Send + Sync {
    /// Canonical N-Quads text for a JSON-LD document.
    fn normalize_to_nquads(&self, graph: &Value) -> Result<String, QueryError>;

    /// JSON-LD document for N-Quads text.
    fn from_rdf(&self, nquads: &str) -> Result<Value, QueryError>;

    fn compact(&self, document: &Value, context: &Value) -> Result<Value, QueryError>;

    fn flatten(&self, document: &Value, context: Option<&Value>) -> Result<Value, QueryError>;

    fn expand(&self, document: &Value) -> Result<Value, QueryError>;
}

/// A graph handed to [`crate::connection::Connection::insert_graph`].
#[derive(Debug, Clone, PartialEq)]
pub enum GraphInput {
    /// JSON-LD document, normalized through the codec before insertion.
    JsonLd(Value),
    /// N-Triples / N-Quads text, inserted as given.
    NQuads(String),
}

impl GraphInput {
    /// Triple text ready to embed in an `INSERT DATA` block.
    pub fn to_nquads(&self, codec: Option<&dyn GraphCodec>) -> Result<String, QueryError> {
        match self {
            GraphInput::NQuads(text) => Ok(text.clone()),
            GraphInput::JsonLd(document) => require(codec)?.normalize_to_nquads(document),
        }
    }
}

impl From<Value> for GraphInput {
    fn from(document: Value) -> Self {
        GraphInput::JsonLd(document)
    }
}

impl From<String> for GraphInput {
    fn from(text: String) -> Self {
        GraphInput::NQuads(text)
    }
}

fn require(codec: Option<&dyn GraphCodec>) -> Result<&dyn GraphCodec, QueryError> {
    codec.ok_or_else(|| QueryError::Codec("No graph codec configured".to_string()))
}

/// Turn an endpoint graph response into a JSON-LD document in `form`.
///
/// Textual responses are parsed with [`GraphCodec::from_rdf`] first. A raw
/// JSON document with no form requested passes through without a codec.
pub fn shape_graph(
    codec: Option<&dyn GraphCodec>,
    body: Value,
    form: GraphForm,
    context: Option<&Value>,
) -> Result<Value, QueryError> {
    let document = match body {
        Value::String(text) => require(codec)?.from_rdf(&text)?,
        other => other,
    };

    match form {
        GraphForm::Raw => Ok(document),
        GraphForm::Compact => {
            let empty = Value::Object(Map::new());
            require(codec)?.compact(&document, context.unwrap_or(&empty))
        }
        GraphForm::Flatten => require(codec)?.flatten(&document, context),
        GraphForm::Expand => require(codec)?.expand(&document),
    }
}
