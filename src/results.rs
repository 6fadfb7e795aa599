//! SPARQL JSON results and the projections the façade offers over them.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::QueryError;

/// One bound cell of a result row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    /// `uri`, `literal`, `bnode`, ...
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datatype: Option<String>,
    #[serde(rename = "xml:lang", default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
}

impl Term {
    pub fn value(&self) -> &str {
        &self.value
    }
}

/// Variable name to bound term. Unbound variables are absent.
pub type Row = BTreeMap<String, Term>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultHead {
    #[serde(default)]
    pub vars: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultBindings {
    #[serde(default)]
    pub bindings: Vec<Row>,
}

/// A `application/sparql-results+json` document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SparqlResults {
    #[serde(default)]
    pub head: ResultHead,
    #[serde(default)]
    pub results: ResultBindings,
    /// ASK answer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boolean: Option<bool>,
}

impl SparqlResults {
    pub fn from_value(value: Value) -> Result<Self, QueryError> {
        if !value.is_object() {
            return Err(QueryError::Decode(format!(
                "expected a SPARQL results object, got {}",
                value
            )));
        }
        serde_json::from_value(value).map_err(|e| QueryError::Decode(e.to_string()))
    }

    pub fn vars(&self) -> &[String] {
        &self.head.vars
    }

    pub fn first_var(&self) -> Option<&str> {
        self.head.vars.first().map(String::as_str)
    }

    pub fn bindings(&self) -> &[Row] {
        &self.results.bindings
    }

    pub fn into_bindings(self) -> Vec<Row> {
        self.results.bindings
    }

    /// Rows with datatype and language stripped.
    pub fn rows_values(&self) -> Vec<BTreeMap<String, String>> {
        self.bindings()
            .iter()
            .map(|row| {
                row.iter()
                    .map(|(var, term)| (var.clone(), term.value.clone()))
                    .collect()
            })
            .collect()
    }

    /// Cells of the first variable, skipping rows where it is unbound.
    pub fn column(&self) -> Vec<Term> {
        let Some(var) = self.first_var() else {
            return Vec::new();
        };
        self.bindings()
            .iter()
            .filter_map(|row| row.get(var).cloned())
            .collect()
    }

    pub fn column_values(&self) -> Vec<String> {
        self.column().into_iter().map(|term| term.value).collect()
    }

    /// First row, first variable.
    pub fn var(&self) -> Option<Term> {
        let var = self.first_var()?;
        self.bindings().first()?.get(var).cloned()
    }

    pub fn var_value(&self) -> Option<String> {
        self.var().map(|term| term.value)
    }
}
