//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check key determinism, capacity bounds, namespace
//! isolation and idempotent reads over generated inputs.

use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{CacheKey, ManualClock, NamespaceStore};
use crate::config::{CacheOptions, CacheSettings, NamespaceSettings, Ttl};
use crate::facade::Cache;
use crate::model::{Arg, Model, Opaque, Reply};

// == Test Configuration ==
const TEST_TTL: Ttl = Ttl::After(Duration::from_secs(300));

// == Strategies ==
/// Generates argument graphs of every kind, nested a few levels deep
fn arg_strategy() -> impl Strategy<Value = Arg> {
    let leaf = prop_oneof![
        Just(Arg::Null),
        any::<bool>().prop_map(Arg::Bool),
        any::<i64>().prop_map(Arg::Int),
        (-1.0e6f64..1.0e6).prop_map(Arg::Float),
        "[a-zA-Z0-9_ ]{0,16}".prop_map(Arg::Str),
        "Op\\.[a-z]{2,5}".prop_map(Arg::Symbol),
        "[a-z]{1,8}".prop_map(|tag| Arg::Opaque(Opaque::new(tag, Arc::new(())))),
    ];
    leaf.prop_recursive(4, 64, 8, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Arg::List),
            prop::collection::vec(("[a-z]{1,8}", inner.clone()), 0..6)
                .prop_map(|entries| Arg::map(entries)),
            ("[A-Z]{1,6}", prop::collection::vec(inner, 0..3))
                .prop_map(|(name, args)| Arg::function(name, args)),
        ]
    })
}

/// Rebuilds an argument graph from scratch, with fresh opaque handles.
fn rebuild(arg: &Arg) -> Arg {
    match arg {
        Arg::Null => Arg::Null,
        Arg::Bool(b) => Arg::Bool(*b),
        Arg::Int(i) => Arg::Int(*i),
        Arg::Float(x) => Arg::Float(*x),
        Arg::Str(s) => Arg::Str(s.clone()),
        Arg::List(items) => Arg::List(items.iter().map(rebuild).collect()),
        Arg::Map(entries) => Arg::Map(
            entries
                .iter()
                .map(|(k, v)| (rebuild(k), rebuild(v)))
                .collect(),
        ),
        Arg::Symbol(tag) => Arg::Symbol(tag.clone()),
        Arg::Function { name, args } => Arg::function(name.clone(), args.iter().map(rebuild).collect()),
        Arg::Opaque(opaque) => Arg::Opaque(Opaque::new(opaque.tag(), Arc::new(String::from("fresh")))),
    }
}

/// Model answering every read with its argument count.
struct CountingModel {
    name: &'static str,
    calls: AtomicUsize,
}

impl CountingModel {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            calls: AtomicUsize::new(0),
        }
    }
}

impl Model for CountingModel {
    type Record = usize;

    fn name(&self) -> &str {
        self.name
    }

    fn call<'a>(&'a self, _operation: &'a str, args: &'a [Arg]) -> Reply<'a, usize> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Reply::pending(async move { Ok(Some(args.len())) })
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // *For any* argument list, hashing the canonical form is stable across
    // repeated invocations and across independently rebuilt copies.
    #[test]
    fn prop_key_determinism(args in prop::collection::vec(arg_strategy(), 0..4)) {
        let rebuilt: Vec<Arg> = args.iter().map(rebuild).collect();

        let first = CacheKey::new("User", "findAll", &args);
        let again = CacheKey::new("User", "findAll", &args);
        let other = CacheKey::new("User", "findAll", &rebuilt);

        prop_assert_eq!(&first, &again);
        prop_assert_eq!(&first, &other);
        prop_assert_eq!(first.hash.len(), 32);
    }

    // *For any* pair of argument lists, equal keys imply equal canonical forms.
    #[test]
    fn prop_distinct_canonical_forms_get_distinct_keys(
        a in prop::collection::vec(arg_strategy(), 0..3),
        b in prop::collection::vec(arg_strategy(), 0..3)
    ) {
        let ka = CacheKey::new("User", "findAll", &a);
        let kb = CacheKey::new("User", "findAll", &b);
        prop_assert_eq!(ka.canonical == kb.canonical, ka.hash == kb.hash);
    }

    // *For any* sequence of inserts, the store never holds more than its
    // capacity, and holds exactly the capacity once that many distinct keys
    // have been written.
    #[test]
    fn prop_capacity_enforcement(
        keys in prop::collection::vec("[a-z]{1,12}", 1..200),
        capacity in 1usize..60
    ) {
        let clock = Arc::new(ManualClock::new());
        let store = NamespaceStore::new("User", capacity, clock.clone());
        let mut distinct = std::collections::HashSet::new();

        for key in keys {
            distinct.insert(key.clone());
            store.put(key, Arc::new(()), TEST_TTL);
            clock.advance(Duration::from_millis(1));
            prop_assert!(store.len() <= capacity, "size {} exceeds capacity {}", store.len(), capacity);
        }
        prop_assert_eq!(store.len(), distinct.len().min(capacity));
    }

    // *For any* workload across two namespaces, clearing one never removes
    // entries of the other.
    #[test]
    fn prop_namespace_isolation(
        user_args in prop::collection::vec(0i64..1000, 1..20),
        page_args in prop::collection::vec(0i64..1000, 1..20)
    ) {
        let settings = CacheSettings::new()
            .namespace("User", NamespaceSettings::new().with_limit(100))
            .namespace("Page", NamespaceSettings::new().with_limit(100));
        let cache = Cache::new(settings, CacheOptions::default()).unwrap();
        let users = cache.wrap(CountingModel::new("User"));
        let pages = cache.wrap(CountingModel::new("Page"));

        tokio_test::block_on(async {
            for id in &user_args {
                users.call("findByPk", &[Arg::Int(*id)]).await.unwrap();
            }
            for id in &page_args {
                pages.call("findByPk", &[Arg::Int(*id)]).await.unwrap();
            }
        });

        let page_size = cache.size(&["Page"]);
        users.clear_cache();

        prop_assert_eq!(cache.size(&["User"]), 0);
        prop_assert_eq!(cache.size(&["Page"]), page_size);
    }

    // *For any* read repeated N times with nothing in between, the model is
    // called once and every caller sees the same result.
    #[test]
    fn prop_idempotent_reads(arg in arg_strategy(), repeats in 1usize..10) {
        let settings = CacheSettings::new().namespace("User", NamespaceSettings::new());
        let cache = Cache::new(settings, CacheOptions::default()).unwrap();
        let users = cache.wrap(CountingModel::new("User"));
        let args = [arg];

        let results: Vec<Option<usize>> = tokio_test::block_on(async {
            let mut results = Vec::new();
            for _ in 0..repeats {
                results.push(users.call("findAll", &args).await.unwrap());
            }
            results
        });

        prop_assert!(results.iter().all(|r| *r == Some(1)));
        prop_assert_eq!(users.bypass_cache().calls.load(Ordering::SeqCst), 1);
        let stats = cache.stats();
        prop_assert_eq!(stats.miss, 1);
        prop_assert_eq!(stats.load, 1);
        prop_assert_eq!(stats.hit as usize, repeats - 1);
    }
}
