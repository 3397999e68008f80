//! Property-based tests for pagination and store semantics.
//!
//! # Tested Invariants
//!
//! - No page exceeds the limit
//! - Joining pages restores the joined input in order
//! - Every backend agrees with a map model under any set sequence
//!
//! ```bash
//! cargo test --test property_tests
//! ```

use kvshift::prelude::*;
use proptest::prelude::*;
use std::collections::BTreeMap;
use tempfile::TempDir;

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(future)
}

// =============================================================================
// Pagination
// =============================================================================

proptest! {
    #[test]
    fn pages_never_exceed_limit(
        items in prop::collection::vec("[a-zé]{0,8}", 0..40),
        limit in 8usize..40,
        separator in prop_oneof![Just(", "), Just("\n"), Just("")],
    ) {
        let pages = Paginator::new(separator, limit).unwrap().pages(items.clone()).unwrap();
        for page in &pages {
            prop_assert!(page.chars().count() <= limit);
        }
        if !items.is_empty() {
            prop_assert_eq!(pages.join(separator), items.join(separator));
        } else {
            prop_assert!(pages.is_empty());
        }
    }

    #[test]
    fn oversized_item_is_rejected(extra in 1usize..10, limit in 1usize..20) {
        let item = "x".repeat(limit + extra);
        let result = Paginator::new(", ", limit).unwrap().pages([item]);
        prop_assert!(result.is_err());
    }
}

// =============================================================================
// Store model
// =============================================================================

#[derive(Debug, Clone)]
struct Op {
    key: String,
    value: String,
}

fn ops() -> impl Strategy<Value = Vec<Op>> {
    prop::collection::vec(
        ("[a-c]{1,2}", prop_oneof![Just(String::new()), "[a-z0-9 ]{1,6}"])
            .prop_map(|(key, value)| Op { key, value }),
        0..24,
    )
}

async fn check_against_model(store: &dyn Store, ops: &[Op]) {
    let mut model = BTreeMap::new();
    for op in ops {
        store.set(&op.key, &op.value).await.unwrap();
        if op.value.is_empty() {
            model.remove(&op.key);
        } else {
            model.insert(op.key.clone(), op.value.clone());
        }
    }

    let mut keys = store.collect_keys().await.unwrap();
    keys.sort_unstable();
    assert_eq!(keys, model.keys().cloned().collect::<Vec<_>>());
    for (key, value) in &model {
        assert_eq!(&store.get(key).await.unwrap(), value);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn memory_store_matches_model(ops in ops()) {
        block_on(check_against_model(&MemoryStore::new(), &ops));
    }

    #[test]
    fn file_store_matches_model(ops in ops()) {
        let tmp = TempDir::new().unwrap();
        let store = FileStore::new(tmp.path().join("store.json"));
        block_on(check_against_model(&store, &ops));
    }

    #[test]
    fn sql_store_matches_model(ops in ops()) {
        let tmp = TempDir::new().unwrap();
        let store = SqlStore::new(tmp.path().join("store.sqlite3").display().to_string());
        block_on(check_against_model(&store, &ops));
    }

    #[test]
    fn migration_preserves_model(ops in ops()) {
        block_on(async {
            let source = std::sync::Arc::new(MemoryStore::new());
            for op in &ops {
                source.set(&op.key, &op.value).await.unwrap();
            }
            let expected = source.snapshot();
            let destination = std::sync::Arc::new(MemoryStore::new());
            let mover = MoveStore::new(source, destination.clone());
            mover.move_all().await.unwrap();
            assert_eq!(destination.snapshot(), expected);
        });
    }
}
