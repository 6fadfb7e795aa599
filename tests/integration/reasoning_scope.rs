//! Per-query reasoning overrides against the ambient session mode.

use crate::integration::test_utils::*;
use graphgate::task::{Method, Task};
use graphgate::{Connection, QueryOptions, ReasoningMode};
use parking_lot::Mutex;
use serde_json::json;
use std::sync::{Arc, Weak};
use std::time::Duration;

/// Records the connection's ambient mode each time the transport runs.
fn observe_ambient(transport: &MockTransport, conn: &Arc<Connection>) -> Arc<Mutex<Vec<ReasoningMode>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let weak: Weak<Connection> = Arc::downgrade(conn);
    let sink = Arc::clone(&seen);
    transport.on_execute(move |_request| {
        if let Some(conn) = weak.upgrade() {
            sink.lock().push(conn.reasoning());
        }
    });
    seen
}

#[tokio::test]
async fn override_applies_during_dispatch_and_is_restored() {
    let transport = MockTransport::answering(single_row_results());
    let conn = Arc::new(uncached_connection(transport.clone(), queue_config(2, 3)));
    let seen = observe_ambient(&transport, &conn);
    assert_eq!(conn.reasoning(), ReasoningMode::Disabled);

    conn.query(QueryOptions::new("SELECT ?s WHERE { ?s a ?o }").with_reasoning(true))
        .await
        .unwrap();

    assert_eq!(transport.requests()[0].reasoning, ReasoningMode::Enabled);
    assert_eq!(*seen.lock(), vec![ReasoningMode::Enabled]);
    assert_eq!(conn.reasoning(), ReasoningMode::Disabled);
}

#[tokio::test]
async fn override_is_restored_when_dispatch_fails() {
    let transport = MockTransport::scripted(Vec::new(), transport_error("unreachable"));
    let conn = Arc::new(uncached_connection(transport.clone(), queue_config(2, 2)));
    let seen = observe_ambient(&transport, &conn);

    let result = conn
        .query(QueryOptions::new("SELECT ?s WHERE { ?s a ?o }").with_reasoning(true))
        .await;

    assert!(result.is_err());
    assert_eq!(transport.calls(), 2);
    assert!(transport
        .requests()
        .iter()
        .all(|r| r.reasoning == ReasoningMode::Enabled));
    assert_eq!(*seen.lock(), vec![ReasoningMode::Enabled, ReasoningMode::Enabled]);
    assert_eq!(conn.reasoning(), ReasoningMode::Disabled);
}

#[tokio::test]
async fn queries_without_override_use_ambient_mode() {
    let transport = MockTransport::answering(json!({}));
    let conn = uncached_connection(transport.clone(), queue_config(2, 3));

    conn.set_reasoning(ReasoningMode::Profile("RDFS".to_string())).await;
    conn.query("SELECT * WHERE { ?s ?p ?o }").await.unwrap();
    conn.query(QueryOptions::new("SELECT * WHERE { ?s ?p ?o }").with_reasoning(false))
        .await
        .unwrap();

    let modes: Vec<ReasoningMode> = transport.requests().into_iter().map(|r| r.reasoning).collect();
    assert_eq!(
        modes,
        vec![ReasoningMode::Profile("RDFS".to_string()), ReasoningMode::Disabled]
    );
    assert_eq!(conn.reasoning(), ReasoningMode::Profile("RDFS".to_string()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_scoped_and_unscoped_queries_do_not_interfere() {
    let transport = MockTransport::slow(json!({}), Duration::from_millis(5));
    let conn = Arc::new(uncached_connection(transport.clone(), queue_config(4, 3)));

    let mut handles = Vec::new();
    for i in 0..12 {
        let conn = Arc::clone(&conn);
        handles.push(tokio::spawn(async move {
            let mut options = QueryOptions::new(format!("SELECT * WHERE {{ ?s ?p {} }}", i));
            if i % 3 == 0 {
                options = options.with_reasoning(true);
            }
            conn.query(options).await.unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    for request in transport.requests() {
        let index: usize = request
            .query
            .trim_end_matches(" }")
            .rsplit(' ')
            .next()
            .unwrap()
            .parse()
            .unwrap();
        let expected = if index % 3 == 0 {
            ReasoningMode::Enabled
        } else {
            ReasoningMode::Disabled
        };
        assert_eq!(request.reasoning, expected, "query {}", index);
    }
    assert_eq!(transport.calls(), 12);
    assert_eq!(conn.reasoning(), ReasoningMode::Disabled);
}

#[tokio::test]
async fn cached_results_are_keyed_by_effective_mode() {
    let transport = MockTransport::answering(json!({"inferred": true}));
    let conn = cached_connection(transport.clone(), queue_config(2, 3));
    let query = "SELECT ?s WHERE { ?s a <urn:Film> }";

    conn.set_reasoning(true).await;
    conn.query(query).await.unwrap();
    conn.set_reasoning(false).await;
    conn.query(query).await.unwrap();
    assert_eq!(transport.calls(), 2);

    // Same effective mode, ambient or explicit, shares one entry.
    conn.query(QueryOptions::new(query).with_reasoning(true))
        .await
        .unwrap();
    conn.query(query).await.unwrap();
    assert_eq!(transport.calls(), 2);
    assert_eq!(conn.stats().cache_hits, 2);

    let modes: Vec<ReasoningMode> = transport.requests().into_iter().map(|r| r.reasoning).collect();
    assert_eq!(modes, vec![ReasoningMode::Enabled, ReasoningMode::Disabled]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn direct_queue_tasks_ignore_in_flight_overrides() {
    let transport = MockTransport::slow(json!({}), Duration::from_millis(50));
    let conn = Arc::new(uncached_connection(transport.clone(), queue_config(4, 3)));

    let scoped = {
        let conn = Arc::clone(&conn);
        tokio::spawn(async move {
            conn.query(QueryOptions::new("SELECT ?scoped {}").with_reasoning(true))
                .await
                .unwrap();
        })
    };
    while transport.calls() == 0 {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    assert_eq!(conn.reasoning(), ReasoningMode::Enabled);

    let direct = Task::new(Method::Query, QueryOptions::new("SELECT ?direct {}"));
    conn.queue().enqueue(direct).await.unwrap();
    scoped.await.unwrap();

    let direct_request = transport
        .requests()
        .into_iter()
        .find(|r| r.query.contains("?direct"))
        .unwrap();
    assert_eq!(direct_request.reasoning, ReasoningMode::Disabled);
    assert_eq!(conn.reasoning(), ReasoningMode::Disabled);
}
