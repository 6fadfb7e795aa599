//! Shared test utilities for integration tests
//!
//! Scriptable transport and codec fakes plus connection builders.

use async_trait::async_trait;
use graphgate::cache::{CacheStore, MemoryCacheBackend};
use graphgate::codec::GraphCodec;
use graphgate::config::QueueConfig;
use graphgate::transport::{Transport, TransportRequest, TransportResponse};
use graphgate::{Connection, QueryError};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

type Reply = Result<TransportResponse, QueryError>;
type Hook = Box<dyn Fn(&TransportRequest) + Send + Sync>;

/// Transport that replays scripted replies and records every request.
///
/// Once the script is used up every call gets `fallback`.
pub struct MockTransport {
    script: Mutex<VecDeque<Reply>>,
    fallback: Reply,
    latency: Duration,
    requests: Mutex<Vec<TransportRequest>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    hook: Mutex<Option<Hook>>,
}

impl MockTransport {
    pub fn answering(body: Value) -> Arc<Self> {
        Self::scripted(Vec::new(), Ok(TransportResponse::ok(body)))
    }

    pub fn scripted(script: Vec<Reply>, fallback: Reply) -> Arc<Self> {
        Arc::new(Self::build(script, fallback, Duration::ZERO))
    }

    pub fn slow(body: Value, latency: Duration) -> Arc<Self> {
        Arc::new(Self::build(
            Vec::new(),
            Ok(TransportResponse::ok(body)),
            latency,
        ))
    }

    fn build(script: Vec<Reply>, fallback: Reply, latency: Duration) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
            latency,
            requests: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            hook: Mutex::new(None),
        }
    }

    /// Called with each request while it is being executed.
    pub fn on_execute(&self, hook: impl Fn(&TransportRequest) + Send + Sync + 'static) {
        *self.hook.lock() = Some(Box::new(hook));
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().clone()
    }

    pub fn queries(&self) -> Vec<String> {
        self.requests.lock().iter().map(|r| r.query.clone()).collect()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn execute(&self, request: &TransportRequest) -> Result<TransportResponse, QueryError> {
        self.requests.lock().push(request.clone());
        if let Some(hook) = self.hook.lock().as_ref() {
            hook(request);
        }

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let scripted = self.script.lock().pop_front();
        scripted.unwrap_or_else(|| self.fallback.clone())
    }
}

pub fn status(code: u16, body: &str) -> Reply {
    Ok(TransportResponse {
        body: json!(body),
        status: code,
    })
}

pub fn transport_error(message: &str) -> Reply {
    Err(QueryError::Transport(message.to_string()))
}

/// One-row result set: `?s = urn:a`, `?o = urn:b`.
pub fn single_row_results() -> Value {
    json!({
        "head": {"vars": ["s", "o"]},
        "results": {"bindings": [
            {"s": {"type": "uri", "value": "urn:a"}, "o": {"type": "uri", "value": "urn:b"}}
        ]}
    })
}

pub fn queue_config(concurrency: usize, max_retries: u32) -> QueueConfig {
    QueueConfig {
        concurrency,
        base_delay_ms: 1,
        max_delay_ms: 16,
        max_retries,
    }
}

pub fn memory_cache() -> Arc<CacheStore> {
    Arc::new(CacheStore::new(
        Arc::new(MemoryCacheBackend::new()),
        Duration::from_secs(60),
    ))
}

pub fn uncached_connection(transport: Arc<MockTransport>, queue: QueueConfig) -> Connection {
    Connection::new(transport, Arc::new(CacheStore::disabled()), &queue)
}

pub fn cached_connection(transport: Arc<MockTransport>, queue: QueueConfig) -> Connection {
    Connection::new(transport, memory_cache(), &queue)
}

/// Codec that wraps documents to show which operation ran.
pub struct FakeCodec;

impl GraphCodec for FakeCodec {
    fn normalize_to_nquads(&self, graph: &Value) -> Result<String, QueryError> {
        let id = graph
            .get("@id")
            .and_then(Value::as_str)
            .ok_or_else(|| QueryError::Codec("document has no @id".to_string()))?;
        Ok(format!("<{}> <urn:p> <urn:o> .", id))
    }

    fn from_rdf(&self, nquads: &str) -> Result<Value, QueryError> {
        Ok(json!({"@graph": [], "source": nquads}))
    }

    fn compact(&self, document: &Value, context: &Value) -> Result<Value, QueryError> {
        Ok(json!({"@context": context, "compacted": document}))
    }

    fn flatten(&self, document: &Value, _context: Option<&Value>) -> Result<Value, QueryError> {
        Ok(json!({"flattened": document}))
    }

    fn expand(&self, document: &Value) -> Result<Value, QueryError> {
        Ok(json!([{"expanded": document}]))
    }
}
