//! Copy-on-write edits against a DAG root.
//!
//! Both operations are a single remote round trip and are pure with
//! respect to the input root: they return the hash of a new, distinct
//! tree with structural sharing of unaffected subtrees. Directory
//! emptiness for removal-with-rmdir semantics is a caller-side
//! precondition, checked by the filesystem layer.

use crate::api::{ApiError, Cid, DagStore};

#[derive(Debug, thiserror::Error)]
pub enum DagError {
    #[error("invalid link path: {0:?}")]
    LinkPathInvalid(String),
    #[error("path not found: {0}")]
    PathNotFound(String),
    #[error("api error: {0}")]
    Api(#[from] ApiError),
}

/// Link paths are relative to the root node: never empty, never
/// absolute.
fn validate_link_path(path: &str) -> Result<(), DagError> {
    if path.is_empty() || path.starts_with('/') {
        return Err(DagError::LinkPathInvalid(path.to_string()));
    }
    Ok(())
}

/// Insert or replace the link at `path` under `root` with `target`,
/// creating intermediate directory nodes as needed.
pub async fn add_link(
    store: &dyn DagStore,
    root: &Cid,
    path: &str,
    target: &Cid,
) -> Result<Cid, DagError> {
    validate_link_path(path)?;
    let new_root = store.add_link(root, path, target).await?;
    tracing::trace!(%root, %path, %target, %new_root, "add-link");
    Ok(new_root)
}

/// Remove the link at `path` under `root`.
pub async fn remove_link(store: &dyn DagStore, root: &Cid, path: &str) -> Result<Cid, DagError> {
    validate_link_path(path)?;
    let new_root = match store.rm_link(root, path).await {
        Ok(new_root) => new_root,
        Err(err) if err.is_not_found() => return Err(DagError::PathNotFound(path.to_string())),
        Err(err) => return Err(err.into()),
    };
    tracing::trace!(%root, %path, %new_root, "rm-link");
    Ok(new_root)
}

#[cfg(test)]
mod test {
    use bytes::Bytes;

    use crate::api::MemDagStore;

    use super::*;

    #[tokio::test]
    async fn add_then_remove_restores_the_root() {
        let store = MemDagStore::new();
        let root = store.new_empty_dir().await.unwrap();
        let file = store.add("f", Bytes::from_static(b"f")).await.unwrap();

        let edited = add_link(&store, &root, "dir/f", &file.hash).await.unwrap();
        assert_ne!(root, edited);

        let removed = remove_link(&store, &edited, "dir/f").await.unwrap();
        let removed = remove_link(&store, &removed, "dir").await.unwrap();
        assert_eq!(root, removed);
    }

    #[tokio::test]
    async fn same_edit_yields_same_hash() {
        let store = MemDagStore::new();
        let root = store.new_empty_dir().await.unwrap();
        let file = store.add("f", Bytes::from_static(b"f")).await.unwrap();

        let a = add_link(&store, &root, "a/b/f", &file.hash).await.unwrap();
        let b = add_link(&store, &root, "a/b/f", &file.hash).await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn rejects_invalid_paths_before_any_remote_call() {
        let store = MemDagStore::new();
        let root = store.new_empty_dir().await.unwrap();
        let calls = store.op_count();

        let err = add_link(&store, &root, "", &root).await.unwrap_err();
        assert!(matches!(err, DagError::LinkPathInvalid(_)));
        let err = remove_link(&store, &root, "/abs").await.unwrap_err();
        assert!(matches!(err, DagError::LinkPathInvalid(_)));
        assert_eq!(store.op_count(), calls);
    }

    #[tokio::test]
    async fn removing_a_missing_link_is_path_not_found() {
        let store = MemDagStore::new();
        let root = store.new_empty_dir().await.unwrap();
        let err = remove_link(&store, &root, "missing").await.unwrap_err();
        assert!(matches!(err, DagError::PathNotFound(_)));
    }
}
