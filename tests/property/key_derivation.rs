use graphgate::cache::{CacheStore, CACHE_KEY_NAMESPACE};
use graphgate::task::{Method, QueryOptions, ReasoningMode, Task};
use proptest::prelude::*;
use serde_json::json;

fn method() -> impl Strategy<Value = Method> {
    prop_oneof![
        Just(Method::Query),
        Just(Method::QueryGraph),
        Just(Method::GetGraph)
    ]
}

fn reasoning() -> impl Strategy<Value = Option<ReasoningMode>> {
    prop_oneof![
        Just(None),
        Just(Some(ReasoningMode::Disabled)),
        Just(Some(ReasoningMode::Enabled)),
        "[A-Z]{2,4}".prop_map(|level| Some(ReasoningMode::Profile(level))),
    ]
}

prop_compose! {
    fn task()(
        method in method(),
        query in "[A-Za-z ?{}<>:.]{0,40}",
        database in proptest::option::of("[a-z]{1,8}"),
        reasoning in reasoning(),
        cache in proptest::option::of(any::<bool>()),
        mimetype in proptest::option::of("(text/turtle|application/ld\\+json)"),
        context_keys in proptest::collection::vec("[a-z]{1,5}", 0..4),
    ) -> Task {
        let mut options = QueryOptions::new(query);
        options.database = database;
        options.reasoning = reasoning;
        options.cache = cache;
        options.mimetype = mimetype;
        if !context_keys.is_empty() {
            let context: serde_json::Map<String, serde_json::Value> = context_keys
                .into_iter()
                .map(|k| (k.clone(), json!(format!("urn:{}", k))))
                .collect();
            options.context = Some(serde_json::Value::Object(context));
        }
        Task::new(method, options)
    }
}

proptest! {
    /// Equal tasks produce equal keys, including independently built copies
    #[test]
    fn equal_tasks_share_a_key(task in task()) {
        let copy: Task = serde_json::from_slice(&serde_json::to_vec(&task).unwrap()).unwrap();
        prop_assert_eq!(CacheStore::derive_key(&task), CacheStore::derive_key(&copy));
    }

    /// Different tasks produce different keys
    #[test]
    fn different_tasks_differ(a in task(), b in task()) {
        prop_assume!(a != b);
        prop_assert_ne!(CacheStore::derive_key(&a), CacheStore::derive_key(&b));
    }

    #[test]
    fn keys_are_namespaced_hex(task in task()) {
        let key = CacheStore::derive_key(&task);
        prop_assert!(key.starts_with(CACHE_KEY_NAMESPACE));
        let digest = &key[CACHE_KEY_NAMESPACE.len()..];
        prop_assert_eq!(digest.len(), 64);
        prop_assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }

    /// Leading whitespace and case never hide an update statement
    #[test]
    fn updates_are_never_cacheable(
        padding in "[ \t\n]{0,4}",
        verb in prop_oneof![Just("INSERT"), Just("delete"), Just("Clear"), Just("iNsErT")],
        rest in "[ A-Za-z{}?]{0,20}",
        cache in proptest::option::of(any::<bool>()),
    ) {
        let mut options = QueryOptions::new(format!("{}{}{}", padding, verb, rest));
        options.cache = cache;
        prop_assert!(!CacheStore::should_cache(&Task::new(Method::Query, options)));
    }

    #[test]
    fn cache_false_is_never_cacheable(task in task()) {
        let mut task = task;
        task.options.cache = Some(false);
        prop_assert!(!CacheStore::should_cache(&task));
    }
}

#[test]
fn select_is_cacheable() {
    let task = Task::new(Method::Query, QueryOptions::new("SELECT * WHERE { ?s ?p ?o }"));
    assert!(CacheStore::should_cache(&task));
}
