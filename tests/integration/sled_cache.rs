//! Persistent sled-backed caching through the full dispatch path.

use crate::integration::test_utils::*;
use graphgate::cache::{CacheBackend, CacheStore, SledCacheBackend, SWEEP_INTERVAL};
use graphgate::task::{Method, QueryOptions, Task};
use graphgate::Connection;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const SELECT: &str = "SELECT ?s ?o WHERE { ?s a ?o }";

fn sled_store(dir: &TempDir, ttl: Duration) -> (Arc<CacheStore>, SledCacheBackend) {
    let backend = SledCacheBackend::open(dir.path().join("cache")).unwrap();
    let store = Arc::new(CacheStore::new(Arc::new(backend.clone()), ttl));
    (store, backend)
}

#[tokio::test]
async fn cached_results_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let transport = MockTransport::answering(single_row_results());

    {
        let (store, backend) = sled_store(&dir, Duration::from_secs(60));
        let conn = Connection::new(transport.clone(), store, &queue_config(2, 3));
        conn.get_col_values(SELECT).await.unwrap();
        backend.flush().unwrap();
    }

    let (store, _backend) = sled_store(&dir, Duration::from_secs(60));
    let conn = Connection::new(transport.clone(), store, &queue_config(2, 3));
    assert_eq!(conn.get_col_values(SELECT).await.unwrap(), vec!["urn:a"]);
    assert_eq!(transport.calls(), 1);
    assert_eq!(conn.stats().cache_hits, 1);
}

#[tokio::test]
async fn expired_entries_are_dispatched_again() {
    let dir = TempDir::new().unwrap();
    let transport = MockTransport::answering(single_row_results());
    let (store, backend) = sled_store(&dir, Duration::ZERO);
    let conn = Connection::new(transport.clone(), store, &queue_config(2, 3));

    conn.query(SELECT).await.unwrap();
    conn.query(SELECT).await.unwrap();

    assert_eq!(transport.calls(), 2);
    assert_eq!(backend.purge_expired().unwrap(), 1);
    assert!(backend.is_empty());
}

#[tokio::test]
async fn fresh_dispatch_overwrites_entry() {
    let dir = TempDir::new().unwrap();
    let (store, backend) = sled_store(&dir, Duration::from_secs(60));
    let task = Task::new(Method::Query, QueryOptions::new(SELECT));

    store.put(&task, &json!({"version": 1}));
    store.put(&task, &json!({"version": 2}));

    assert_eq!(backend.len(), 1);
    assert_eq!(store.fetch(&task), Some(json!({"version": 2})));
    let raw = backend.get(&CacheStore::derive_key(&task)).unwrap().unwrap();
    assert_eq!(serde_json::from_slice::<serde_json::Value>(&raw).unwrap(), json!({"version": 2}));
}

#[tokio::test]
async fn distinct_queries_do_not_accumulate_expired_entries() {
    let dir = TempDir::new().unwrap();
    let transport = MockTransport::answering(single_row_results());
    let (store, backend) = sled_store(&dir, Duration::ZERO);
    let conn = Connection::new(transport.clone(), store, &queue_config(4, 3));

    for i in 0..SWEEP_INTERVAL {
        conn.query(format!("SELECT ?s WHERE {{ ?s a <urn:type:{}> }}", i))
            .await
            .unwrap();
    }

    assert_eq!(transport.calls() as u64, SWEEP_INTERVAL);
    assert!(backend.is_empty());
}
