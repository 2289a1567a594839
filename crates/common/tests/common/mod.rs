//! Shared test utilities for the root and filesystem integration tests
#![allow(dead_code)]

use std::sync::Arc;

use bytes::Bytes;

use ::common::api::{Cid, DagStore, MemDagStore};
use ::common::fs::Fs;
use ::common::root::Root;

/// In-memory store plus a filesystem bound to its mutable root.
pub async fn setup_writable_fs() -> (MemDagStore, Fs) {
    let store = MemDagStore::new();
    let dyn_store: Arc<dyn DagStore> = Arc::new(store.clone());
    let root = Root::bind(dyn_store.clone(), "", false).await.unwrap();
    let fs = Fs::new(dyn_store, Arc::new(root), "");
    (store, fs)
}

/// Build `docs/a.txt` and `docs/b.txt` under a fresh directory tree,
/// returning its root hash. The tree is standalone content, not linked
/// into the store's mutable root.
pub async fn seed_tree(store: &MemDagStore) -> Cid {
    let root = store.new_empty_dir().await.unwrap();
    let a = store
        .add("a.txt", Bytes::from_static(b"alpha"))
        .await
        .unwrap();
    let b = store
        .add("b.txt", Bytes::from_static(b"bravo"))
        .await
        .unwrap();
    let root = store.add_link(&root, "docs/a.txt", &a.hash).await.unwrap();
    store.add_link(&root, "docs/b.txt", &b.hash).await.unwrap()
}

/// Write `content` at `path` through the store's patch calls, moving the
/// externally-tracked mutable root. Simulates an out-of-band writer.
pub async fn external_write(store: &MemDagStore, path: &str, content: &[u8]) {
    let added = store
        .add(path, Bytes::copy_from_slice(content))
        .await
        .unwrap();
    let source = format!("/ipfs/{}", added.hash);
    // files_cp replaces an existing link, but only after the old one is
    // gone, matching how the persistence replay drives the store.
    let _ = store.files_rm(path).await;
    store.files_cp(&source, path).await.unwrap();
}
