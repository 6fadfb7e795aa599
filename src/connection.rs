//! Query Façade
//!
//! [`Connection`] is the public entry point: it normalizes per-call options,
//! fills in the default database, applies per-query reasoning overrides
//! around dispatch, and shapes results.

use parking_lot::RwLock;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::cache::{CacheEvent, CacheStore};
use crate::codec::{shape_graph, GraphCodec, GraphInput};
use crate::config::{GraphGateConfig, QueueConfig};
use crate::dispatch::{DispatchQueue, QueueStats};
use crate::error::QueryError;
use crate::reasoning::SessionReasoning;
use crate::results::{Row, SparqlResults, Term};
use crate::task::{Method, QueryOptions, ReasoningMode, Task};
use crate::transport::{HttpTransport, Transport};

pub struct Connection {
    queue: DispatchQueue,
    reasoning: Arc<SessionReasoning>,
    codec: Option<Arc<dyn GraphCodec>>,
    default_database: RwLock<Option<String>>,
}

impl Connection {
    pub fn new(transport: Arc<dyn Transport>, cache: Arc<CacheStore>, queue: &QueueConfig) -> Self {
        let reasoning = Arc::new(SessionReasoning::default());
        Self {
            queue: DispatchQueue::new(transport, cache, queue),
            reasoning,
            codec: None,
            default_database: RwLock::new(None),
        }
    }

    /// HTTP transport, cache and queue built from configuration.
    pub fn from_config(config: &GraphGateConfig) -> Result<Self, QueryError> {
        config.validate().map_err(|errors| {
            let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            QueryError::Config(messages.join("; "))
        })?;

        let transport = Arc::new(HttpTransport::new(&config.endpoint)?);
        let cache = Arc::new(CacheStore::from_config(&config.cache)?);
        info!(
            endpoint = %config.endpoint.url,
            cache_enabled = cache.is_enabled(),
            concurrency = config.queue.concurrency,
            "Connection configured"
        );

        let connection = Self::new(transport, cache, &config.queue);
        connection.set_default_database(config.default_database.clone());
        Ok(connection)
    }

    pub fn with_codec(mut self, codec: Arc<dyn GraphCodec>) -> Self {
        self.codec = Some(codec);
        self
    }

    pub fn with_default_database(self, database: impl Into<String>) -> Self {
        self.set_default_database(Some(database.into()));
        self
    }

    pub fn set_default_database(&self, database: Option<String>) {
        *self.default_database.write() = database;
    }

    pub fn default_database(&self) -> Option<String> {
        self.default_database.read().clone()
    }

    /// Ambient reasoning mode for queries without an override.
    pub fn reasoning(&self) -> ReasoningMode {
        self.reasoning.current()
    }

    /// Waits for in-flight reasoning overrides to finish.
    pub async fn set_reasoning(&self, mode: impl Into<ReasoningMode>) {
        self.reasoning.set(mode.into()).await;
    }

    pub fn set_concurrency(&self, concurrency: usize) {
        self.queue.set_concurrency(concurrency);
    }

    pub fn set_delay(&self, delay: Duration) {
        self.queue.set_delay(delay);
    }

    pub fn set_max_retries(&self, max_retries: u32) {
        self.queue.set_max_retries(max_retries);
    }

    pub fn stats(&self) -> QueueStats {
        self.queue.stats()
    }

    /// The underlying queue. Tasks enqueued here bypass the ambient mode and
    /// are sent with their own `options.reasoning`.
    pub fn queue(&self) -> &DispatchQueue {
        &self.queue
    }

    /// Cache hit/miss/put notifications.
    pub fn subscribe_cache(&self) -> broadcast::Receiver<CacheEvent> {
        self.queue.cache().subscribe()
    }

    /// Tabular or update query; returns the endpoint's response document.
    pub async fn query(&self, options: impl Into<QueryOptions>) -> Result<Value, QueryError> {
        self.dispatch(Method::Query, options.into()).await
    }

    /// Graph query in the requested mimetype, returned as the endpoint sent it.
    pub async fn query_graph(&self, options: impl Into<QueryOptions>) -> Result<Value, QueryError> {
        self.dispatch(Method::QueryGraph, options.into()).await
    }

    /// Graph query shaped as a JSON-LD document in `options.form`.
    pub async fn get_graph(&self, options: impl Into<QueryOptions>) -> Result<Value, QueryError> {
        let options = options.into();
        let form = options.form.unwrap_or_default();
        let context = options.context.clone();
        let body = self.dispatch(Method::GetGraph, options).await?;
        shape_graph(self.codec.as_deref(), body, form, context.as_ref())
    }

    pub async fn get_results(&self, options: impl Into<QueryOptions>) -> Result<Vec<Row>, QueryError> {
        Ok(self.select(options).await?.into_bindings())
    }

    /// Rows as variable to plain value.
    pub async fn get_results_values(
        &self,
        options: impl Into<QueryOptions>,
    ) -> Result<Vec<BTreeMap<String, String>>, QueryError> {
        Ok(self.select(options).await?.rows_values())
    }

    pub async fn get_col(&self, options: impl Into<QueryOptions>) -> Result<Vec<Term>, QueryError> {
        Ok(self.select(options).await?.column())
    }

    pub async fn get_col_values(
        &self,
        options: impl Into<QueryOptions>,
    ) -> Result<Vec<String>, QueryError> {
        Ok(self.select(options).await?.column_values())
    }

    /// First cell of the first row; `None` when there are no rows.
    pub async fn get_var(&self, options: impl Into<QueryOptions>) -> Result<Option<Term>, QueryError> {
        Ok(self.select(options).await?.var())
    }

    pub async fn get_var_value(
        &self,
        options: impl Into<QueryOptions>,
    ) -> Result<Option<String>, QueryError> {
        Ok(self.select(options).await?.var_value())
    }

    /// Insert a graph with `INSERT DATA`, into the named graph `graph_uri`
    /// when given. Never cached.
    pub async fn insert_graph(
        &self,
        graph: impl Into<GraphInput>,
        graph_uri: Option<&str>,
    ) -> Result<Value, QueryError> {
        let triples = graph.into().to_nquads(self.codec.as_deref())?;
        let statement = insert_data_statement(&triples, graph_uri);
        debug!(graph = graph_uri.unwrap_or("default"), "Inserting graph");
        self.query(QueryOptions::new(statement).with_cache(false)).await
    }

    async fn select(&self, options: impl Into<QueryOptions>) -> Result<SparqlResults, QueryError> {
        SparqlResults::from_value(self.query(options).await?)
    }

    async fn dispatch(&self, method: Method, options: QueryOptions) -> Result<Value, QueryError> {
        let mut options = self.with_defaults(options);
        let override_mode = options.reasoning.clone();
        self.reasoning
            .run_scoped(override_mode, async {
                // Under the gate the current mode is the override or a stable
                // ambient mode. Recording it keys the cache by what was sent.
                options.reasoning = Some(self.reasoning.current());
                self.queue.enqueue(Task::new(method, options)).await
            })
            .await
    }

    fn with_defaults(&self, mut options: QueryOptions) -> QueryOptions {
        if options.database.is_none() {
            options.database = self.default_database();
        }
        options
    }
}

fn insert_data_statement(triples: &str, graph_uri: Option<&str>) -> String {
    match graph_uri {
        Some(uri) => format!("INSERT DATA {{ GRAPH <{}> {{ {} }} }}", uri, triples),
        None => format!("INSERT DATA {{ {} }}", triples),
    }
}
