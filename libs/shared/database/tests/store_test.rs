use std::sync::Arc;

use assert_matches::assert_matches;
use tokio_test::assert_ok;
use serde::{Deserialize, Serialize};

use shared_database::*;

#[derive(Debug, Default, Serialize, Deserialize)]
struct Counter {
    value: u32,
}

#[tokio::test]
async fn test_set_and_get() {
    let store = InMemoryStore::new();

    assert_eq!(store.get("doctors:d1").await.unwrap(), None);
    assert_ok!(store.set("doctors:d1", "{}", None).await);
    assert_eq!(store.get("doctors:d1").await.unwrap(), Some("{}".to_string()));
}

#[tokio::test]
async fn test_set_if_absent_claims_once() {
    let store = InMemoryStore::new();

    assert!(store.set_if_absent("reminder_sent:a1:2024-01-10", "true", Some(86400)).await.unwrap());
    assert!(!store.set_if_absent("reminder_sent:a1:2024-01-10", "true", Some(86400)).await.unwrap());
}

#[tokio::test]
async fn test_expired_entries_are_invisible() {
    let store = InMemoryStore::new();

    store.set("reminder_sent:a1:2024-01-10", "true", Some(0)).await.unwrap();
    assert_eq!(store.get("reminder_sent:a1:2024-01-10").await.unwrap(), None);
    assert!(store.keys("reminder_sent:*").await.unwrap().is_empty());
    assert!(store.set_if_absent("reminder_sent:a1:2024-01-10", "true", Some(60)).await.unwrap());
}

#[tokio::test]
async fn test_keys_filters_by_pattern() {
    let store = InMemoryStore::new();
    store.set("reminders:u1", "[]", None).await.unwrap();
    store.set("reminders:u2", "[]", None).await.unwrap();
    store.set("reminder_sent:a1:2024-01-10", "true", Some(60)).await.unwrap();

    let keys = store.keys("reminders:*").await.unwrap();
    assert_eq!(keys, vec!["reminders:u1".to_string(), "reminders:u2".to_string()]);
}

#[tokio::test]
async fn test_compare_and_set_rejects_stale_version() {
    let store = InMemoryStore::new();

    let first = store.get_versioned("slots:d1").await.unwrap();
    assert_eq!(first.version, 0);
    assert!(store.compare_and_set("slots:d1", first.version, "[1]").await.unwrap());

    // A writer holding the old version loses.
    assert!(!store.compare_and_set("slots:d1", first.version, "[2]").await.unwrap());
    assert_eq!(store.get("slots:d1").await.unwrap(), Some("[1]".to_string()));
}

#[tokio::test]
async fn test_delete_keeps_version_monotonic() {
    let store = InMemoryStore::new();
    store.set("slots:d1", "[1]", None).await.unwrap();
    let before = store.get_versioned("slots:d1").await.unwrap();

    assert!(store.delete("slots:d1").await.unwrap());
    assert!(!store.delete("slots:d1").await.unwrap());

    let after = store.get_versioned("slots:d1").await.unwrap();
    assert_eq!(after.value, None);
    assert!(after.version > before.version);
    assert!(!store.compare_and_set("slots:d1", before.version, "[9]").await.unwrap());
}

#[tokio::test]
async fn test_update_json_serializes_concurrent_writers() {
    let store: Arc<dyn KeyValueStore> = Arc::new(InMemoryStore::new());

    let mut handles = Vec::new();
    for _ in 0..20 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            update_json(store.as_ref(), "counter", 50, |counter: &mut Counter| {
                counter.value += 1;
                Ok::<_, StoreError>(())
            })
            .await
        }));
    }

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let counter: Counter = get_json(store.as_ref(), "counter").await.unwrap().unwrap();
    assert_eq!(counter.value, 20);
}

#[tokio::test]
async fn test_update_json_abort_writes_nothing() {
    let store = InMemoryStore::new();

    let result = update_json(&store, "counter", 3, |_counter: &mut Counter| {
        Err::<(), _>(StoreError::Unavailable("aborted".to_string()))
    })
    .await;

    assert_matches!(result, Err(StoreError::Unavailable(_)));
    assert_eq!(store.get("counter").await.unwrap(), None);
}
