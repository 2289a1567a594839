//! Integration tests for the shared-root registry

mod common;

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;

use ::common::api::{DagStore, MemDagStore};
use ::common::fs::Fs;
use ::common::root::{BindingError, RootRegistry, PUBLIC_GATEWAY};

const ENDPOINT: &str = "http://localhost:5001";

fn slow_registry() -> RootRegistry {
    // long enough that the background flusher never fires during a test
    RootRegistry::new(Duration::from_secs(3600))
}

#[tokio::test]
async fn same_binding_shares_one_root() {
    let store: Arc<dyn DagStore> = Arc::new(MemDagStore::new());
    let registry = slow_registry();

    let first = registry.bind(store.clone(), ENDPOINT, "").await.unwrap();
    let second = registry.bind(store.clone(), ENDPOINT, "").await.unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(registry.len().await, 1);
}

#[tokio::test]
async fn distinct_bindings_get_distinct_roots() {
    let mem = MemDagStore::new();
    let seeded = common::seed_tree(&mem).await;
    let store: Arc<dyn DagStore> = Arc::new(mem);

    let registry = slow_registry();
    let mutable = registry.bind(store.clone(), ENDPOINT, "").await.unwrap();
    let immutable = registry
        .bind(store.clone(), ENDPOINT, &format!("/ipfs/{seeded}"))
        .await
        .unwrap();

    assert!(!Arc::ptr_eq(&mutable, &immutable));
    assert_eq!(registry.len().await, 2);
}

#[tokio::test]
async fn gateway_endpoint_cannot_bind_the_mutable_root() {
    let store: Arc<dyn DagStore> = Arc::new(MemDagStore::new());
    let registry = slow_registry();

    let err = registry
        .bind(store, PUBLIC_GATEWAY, "")
        .await
        .unwrap_err();
    assert!(matches!(err, BindingError::GatewayCannotBeMutableRoot));
    assert!(registry.is_empty().await);
}

#[tokio::test]
async fn instances_sharing_a_root_see_each_other() {
    let mem = MemDagStore::new();
    let store: Arc<dyn DagStore> = Arc::new(mem);
    let registry = slow_registry();

    let root = registry.bind(store.clone(), ENDPOINT, "").await.unwrap();
    let writer = Fs::new(store.clone(), root.clone(), "");
    let reader = Fs::new(store, root, "");

    writer
        .write("/shared.txt", Bytes::from_static(b"visible"))
        .await
        .unwrap();

    // the unflushed edit is visible through the other instance
    let data = reader.read("/shared.txt").await.unwrap();
    assert_eq!(&data[..], b"visible");
}

#[tokio::test]
async fn shutdown_flushes_every_dirty_root() {
    let mem = MemDagStore::new();
    let store: Arc<dyn DagStore> = Arc::new(mem.clone());
    let registry = slow_registry();

    let root = registry.bind(store.clone(), ENDPOINT, "").await.unwrap();
    let fs = Fs::new(store, root.clone(), "");
    fs.write("/a.txt", Bytes::from_static(b"a")).await.unwrap();
    assert_ne!(mem.files_root_hash(), root.read().await);

    registry.shutdown().await.unwrap();

    assert_eq!(mem.files_root_hash(), root.read().await);
    assert!(registry.is_empty().await);
}

#[tokio::test]
async fn periodic_flusher_persists_without_an_explicit_call() {
    let mem = MemDagStore::new();
    let store: Arc<dyn DagStore> = Arc::new(mem.clone());
    let registry = RootRegistry::new(Duration::from_millis(20));

    let root = registry.bind(store.clone(), ENDPOINT, "").await.unwrap();
    let fs = Fs::new(store, root.clone(), "");
    fs.write("/a.txt", Bytes::from_static(b"a")).await.unwrap();

    // wait out a few flush intervals
    for _ in 0..50 {
        if !root.is_dirty().await {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(!root.is_dirty().await);
    assert_eq!(mem.files_root_hash(), root.read().await);
}
