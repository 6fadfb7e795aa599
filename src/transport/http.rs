//! HTTP transport for SPARQL-protocol style endpoints.
//!
//! Read queries are posted to `{url}/{database}/query`, update statements to
//! `{url}/{database}/update`, both form-encoded.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use serde_json::{Map, Value};
use std::time::{Duration, Instant};
use tracing::debug;

use crate::cache::is_update_query;
use crate::config::EndpointConfig;
use crate::error::QueryError;
use crate::transport::{Transport, TransportRequest, TransportResponse};

fn map_http_error(error: reqwest::Error) -> QueryError {
    if error.is_timeout() {
        QueryError::Transport(format!("Request timeout: {}", error))
    } else if error.is_connect() {
        QueryError::Transport(format!("Connection error: {}", error))
    } else {
        QueryError::Transport(format!("HTTP error: {}", error))
    }
}

pub struct HttpTransport {
    client: Client,
    base_url: String,
    username: Option<String>,
    password: Option<String>,
}

impl HttpTransport {
    pub fn new(config: &EndpointConfig) -> Result<Self, QueryError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| QueryError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    fn endpoint_url(&self, request: &TransportRequest, update: bool) -> Result<String, QueryError> {
        let database = request.database.as_deref().ok_or_else(|| {
            QueryError::Config("No database given and no default database configured".to_string())
        })?;
        let operation = if update { "update" } else { "query" };
        Ok(format!("{}/{}/{}", self.base_url, database, operation))
    }
}

/// Update statements go to the update operation; `DESCRIBE` shares their
/// cache-policy prefix but is a read.
fn is_update_statement(query: &str) -> bool {
    is_update_query(query)
        && !query
            .trim_start()
            .get(..8)
            .map(|head| head.eq_ignore_ascii_case("describe"))
            .unwrap_or(false)
}

/// Decode a response body. An empty body becomes an empty JSON object, the
/// endpoint's "no content" signal.
fn decode_body(content_type: Option<&str>, text: String) -> Value {
    if text.trim().is_empty() {
        return Value::Object(Map::new());
    }
    let is_json = content_type.map(|ct| ct.contains("json")).unwrap_or(false);
    if is_json {
        if let Ok(value) = serde_json::from_str(&text) {
            return value;
        }
    }
    Value::String(text)
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: &TransportRequest) -> Result<TransportResponse, QueryError> {
        let update = is_update_statement(&request.query);
        let url = self.endpoint_url(request, update)?;

        let form: Vec<(&str, &str)> = if update {
            vec![("update", request.query.as_str())]
        } else {
            vec![
                ("query", request.query.as_str()),
                ("reasoning", request.reasoning.as_param()),
            ]
        };

        let mut builder = self
            .client
            .post(&url)
            .header(ACCEPT, request.accept())
            .form(&form);
        if let Some(username) = &self.username {
            builder = builder.basic_auth(username, self.password.as_ref());
        }

        let start = Instant::now();
        let response = builder.send().await.map_err(map_http_error)?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());
        let text = response.text().await.map_err(map_http_error)?;

        debug!(
            url = %url,
            status,
            reasoning = %request.reasoning,
            duration_ms = start.elapsed().as_millis(),
            response_chars = text.len(),
            "Endpoint responded"
        );

        Ok(TransportResponse {
            body: decode_body(content_type.as_deref(), text),
            status,
        })
    }
}
