//! Integration tests for edit linearization through the shared root

mod common;

use std::sync::Arc;

use bytes::Bytes;

use ::common::api::{DagStore, MemDagStore};
use ::common::fs::FsError;
use ::common::root::{Root, RootError};

#[tokio::test]
async fn concurrent_writers_never_lose_an_edit() {
    let (_store, fs) = common::setup_writable_fs().await;

    let mut tasks = Vec::new();
    for i in 0..16 {
        let fs = fs.clone();
        tasks.push(tokio::spawn(async move {
            let path = format!("/file-{i}.txt");
            fs.write(&path, Bytes::from(format!("content {i}")))
                .await
                .unwrap();
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    // every write computed its hash from the root it observed under the
    // lock, so all sixteen survive
    let entries = fs.list("/").await.unwrap();
    assert_eq!(entries.len(), 16);
    assert!(fs.root().is_dirty().await);
}

#[tokio::test]
async fn failed_edit_leaves_the_current_hash_untouched() {
    let (_store, fs) = common::setup_writable_fs().await;

    fs.write("/a.txt", Bytes::from_static(b"a")).await.unwrap();
    let before = fs.root().read().await;

    let result = fs
        .root()
        .mutate(|_current| async move {
            Err::<_, FsError>(FsError::NotFound("simulated".to_string()))
        })
        .await;
    assert!(matches!(result, Err(FsError::NotFound(_))));

    assert_eq!(fs.root().read().await, before);
}

#[tokio::test]
async fn read_only_root_rejects_mutation_before_any_remote_call() {
    let store = MemDagStore::new();
    let dyn_store: Arc<dyn DagStore> = Arc::new(store.clone());
    let root = Root::bind(dyn_store, "/ipfs/somehash", false).await.unwrap();

    assert!(root.is_read_only());
    let ops_before = store.op_count();

    let result = root
        .mutate(|current| async move { Ok::<_, RootError>(current) })
        .await;
    assert!(matches!(result, Err(RootError::ReadOnlyRoot)));

    // rejected up front, without invoking the edit or touching the store
    assert_eq!(store.op_count(), ops_before);
}

#[tokio::test]
async fn initial_hash_only_advances_on_persistence() {
    let (_store, fs) = common::setup_writable_fs().await;

    let bound = fs.root().initial().await;
    fs.write("/a.txt", Bytes::from_static(b"a")).await.unwrap();

    assert_eq!(fs.root().initial().await, bound);
    assert_ne!(fs.root().read().await, bound);

    fs.root().persist().await.unwrap();
    assert_eq!(fs.root().initial().await, fs.root().read().await);
    assert!(!fs.root().is_dirty().await);
}
