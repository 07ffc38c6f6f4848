//! Per-label exclusion and cancellation.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use secure_signing_core::{ErrorKind, KeyRequest, SecureSigning, SigningConfig};

use crate::support::{CountingStore, DetachedStore};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_create_yields_one_key() {
    let store = CountingStore::slow(Duration::from_millis(5));
    let signing = Arc::new(SecureSigning::new(store.clone(), SigningConfig::default()));

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let signing = Arc::clone(&signing);
            tokio::spawn(async move {
                signing
                    .create_key_pair_if_does_not_exist(&KeyRequest::new("shared"))
                    .await
            })
        })
        .collect();

    let mut keys = HashSet::new();
    for task in tasks {
        keys.insert(task.await.unwrap().unwrap().public_key);
    }

    assert_eq!(keys.len(), 1);
    assert_eq!(store.generated(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_generate_one_winner() {
    let store = CountingStore::slow(Duration::from_millis(5));
    let signing = Arc::new(SecureSigning::new(store.clone(), SigningConfig::default()));

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let signing = Arc::clone(&signing);
            tokio::spawn(async move { signing.generate_key_pair(&KeyRequest::new("k")).await })
        })
        .collect();

    let mut won = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => won += 1,
            Err(e) => assert_eq!(e.kind(), ErrorKind::KeyGenerationError),
        }
    }

    assert_eq!(won, 1);
    assert_eq!(store.generated(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn distinct_labels_get_distinct_keys() {
    let store = CountingStore::slow(Duration::from_millis(5));
    let signing = Arc::new(SecureSigning::new(store.clone(), SigningConfig::default()));

    let tasks: Vec<_> = (0..8)
        .map(|i| {
            let signing = Arc::clone(&signing);
            tokio::spawn(async move {
                signing
                    .create_key_pair_if_does_not_exist(&KeyRequest::new(format!("label-{i}")))
                    .await
            })
        })
        .collect();

    let mut keys = HashSet::new();
    for task in tasks {
        keys.insert(task.await.unwrap().unwrap().public_key);
    }

    assert_eq!(keys.len(), 8);
    assert_eq!(store.generated(), 8);
}

#[tokio::test]
async fn abandoned_create_leaves_consistent_store() {
    let store = CountingStore::slow(Duration::from_millis(50));
    let signing = SecureSigning::new(store.clone(), SigningConfig::default());
    let req = KeyRequest::new("k");

    let abandoned = tokio::time::timeout(
        Duration::from_millis(10),
        signing.create_key_pair_if_does_not_exist(&req),
    )
    .await;
    assert!(abandoned.is_err());

    // The label lock was released with the dropped future.
    let created = signing.create_key_pair_if_does_not_exist(&req).await.unwrap();
    let fetched = signing.get_key_pair(&req).await.unwrap();
    assert_eq!(created, fetched);
    assert_eq!(store.generated(), 1);
}

#[tokio::test]
async fn create_after_abandoned_detached_write_returns_stored_key() {
    let store = DetachedStore::new(Duration::from_millis(50));
    let signing = SecureSigning::new(store.clone(), SigningConfig::default());
    let req = KeyRequest::new("k");

    let abandoned = tokio::time::timeout(
        Duration::from_millis(10),
        signing.create_key_pair_if_does_not_exist(&req),
    )
    .await;
    assert!(abandoned.is_err());

    // The abandoned write lands while this call is generating.
    let created = signing.create_key_pair_if_does_not_exist(&req).await.unwrap();
    let fetched = signing.get_key_pair(&req).await.unwrap();
    assert_eq!(created, fetched);
    assert!(signing.does_key_pair_exist(&req).await.unwrap().is_existing);
    assert_eq!(store.generated(), 1);
}
