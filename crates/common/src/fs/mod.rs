//! Conventional filesystem operations translated into DAG edits.
//!
//! Every reading operation snapshots the root hash under the shared
//! lock and addresses content as `<hash>/<relative path>`; every
//! mutating operation goes through [`Root::mutate`] so edits are
//! linearized per shared root.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::OnceCell;

use crate::api::{ApiError, Cid, DagStore};
use crate::dag::{self, DagError};
use crate::root::{Root, RootError, PUBLIC_GATEWAY};
use crate::size;

/// One directory entry, with the logical file size already decoded from
/// the store's cumulative size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    pub hash: Cid,
    pub size: u64,
    pub is_dir: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum FsError {
    #[error("directory not found: {0:?}")]
    DirNotFound(String),
    #[error("not found: {0:?}")]
    NotFound(String),
    #[error("not a file: {0:?}")]
    NotAFile(String),
    #[error("directory not empty: {0:?}")]
    DirNotEmpty(String),
    #[error(transparent)]
    Root(#[from] RootError),
    #[error(transparent)]
    Dag(#[from] DagError),
    #[error("api error: {0}")]
    Api(#[from] ApiError),
}

/// A filesystem view over one shared root, optionally scoped to a
/// sub-directory of the tree.
#[derive(Debug, Clone)]
pub struct Fs {
    store: Arc<dyn DagStore>,
    root: Arc<Root>,
    /// Sub-root inside the logical tree; "" addresses the whole tree.
    base: String,
    /// Gateway base for public links.
    gateway: String,
    /// Hash of an empty directory node, fetched once.
    empty_dir: Arc<OnceCell<Cid>>,
}

impl Fs {
    pub fn new(store: Arc<dyn DagStore>, root: Arc<Root>, base: &str) -> Self {
        Self {
            store,
            root,
            base: base.trim_matches('/').to_string(),
            gateway: PUBLIC_GATEWAY.to_string(),
            empty_dir: Arc::new(OnceCell::new()),
        }
    }

    pub fn with_gateway(mut self, gateway: &str) -> Self {
        self.gateway = gateway.trim_end_matches('/').to_string();
        self
    }

    pub fn root(&self) -> &Arc<Root> {
        &self.root
    }

    pub fn is_read_only(&self) -> bool {
        self.root.is_read_only()
    }

    /// Path of `remote` relative to the shared root (no leading slash).
    fn rel_path(&self, remote: &str) -> String {
        let remote = remote.trim_matches('/');
        match (self.base.is_empty(), remote.is_empty()) {
            (true, _) => remote.to_string(),
            (false, true) => self.base.clone(),
            (false, false) => format!("{}/{remote}", self.base),
        }
    }

    fn dag_path(hash: &Cid, rel: &str) -> String {
        if rel.is_empty() {
            hash.to_string()
        } else {
            format!("{hash}/{rel}")
        }
    }

    async fn empty_dir_hash(&self) -> Result<Cid, FsError> {
        let hash = self
            .empty_dir
            .get_or_try_init(|| self.store.new_empty_dir())
            .await?;
        Ok(hash.clone())
    }

    /// List a directory. Entries come back with decoded logical sizes;
    /// file type can only be obtained from the listing, so a missing
    /// directory surfaces as [`FsError::DirNotFound`].
    pub async fn list(&self, dir: &str) -> Result<Vec<Entry>, FsError> {
        let root_hash = self.root.read().await;
        let abs = Self::dag_path(&root_hash, &self.rel_path(dir));
        let links = match self.store.ls(&abs).await {
            Ok(links) => links,
            Err(ApiError::Transport(err)) => return Err(ApiError::Transport(err).into()),
            Err(_) => return Err(FsError::DirNotFound(dir.to_string())),
        };

        let mut entries = Vec::with_capacity(links.len());
        for link in links {
            if link.is_dir() {
                entries.push(Entry {
                    name: link.name,
                    hash: link.hash,
                    size: 0,
                    is_dir: true,
                });
            } else {
                let stat = self.store.object_stat(link.hash.as_str()).await?;
                entries.push(Entry {
                    name: link.name,
                    hash: link.hash,
                    size: size::logical_size(stat.cumulative_size, stat.block_size),
                    is_dir: false,
                });
            }
        }
        Ok(entries)
    }

    /// Stat one path. The root itself is always a directory.
    pub async fn stat(&self, remote: &str) -> Result<Entry, FsError> {
        let rel = self.rel_path(remote);
        let root_hash = self.root.read().await;
        if rel.is_empty() {
            return Ok(Entry {
                name: String::new(),
                hash: root_hash,
                size: 0,
                is_dir: true,
            });
        }

        let (parent, name) = match rel.rsplit_once('/') {
            Some((parent, name)) => (parent.to_string(), name.to_string()),
            None => (String::new(), rel.clone()),
        };
        let parent_path = Self::dag_path(&root_hash, &parent);
        let links = match self.store.ls(&parent_path).await {
            Ok(links) => links,
            Err(ApiError::Transport(err)) => return Err(ApiError::Transport(err).into()),
            Err(_) => return Err(FsError::NotFound(remote.to_string())),
        };
        let link = links
            .into_iter()
            .find(|l| l.name == name)
            .ok_or_else(|| FsError::NotFound(remote.to_string()))?;

        if link.is_dir() {
            return Ok(Entry {
                name,
                hash: link.hash,
                size: 0,
                is_dir: true,
            });
        }
        let stat = self
            .store
            .object_stat(&Self::dag_path(&root_hash, &rel))
            .await?;
        Ok(Entry {
            name,
            hash: stat.hash,
            size: size::logical_size(stat.cumulative_size, stat.block_size),
            is_dir: false,
        })
    }

    /// Read the whole content of a file.
    pub async fn read(&self, remote: &str) -> Result<Bytes, FsError> {
        let entry = self.stat(remote).await?;
        if entry.is_dir {
            return Err(FsError::NotAFile(remote.to_string()));
        }
        let root_hash = self.root.read().await;
        let abs = Self::dag_path(&root_hash, &self.rel_path(remote));
        Ok(self.store.cat(&abs).await?)
    }

    /// Add content at `remote`, inserting or replacing the link.
    pub async fn write(&self, remote: &str, data: Bytes) -> Result<Entry, FsError> {
        let rel = self.rel_path(remote);
        let name = rel.rsplit('/').next().unwrap_or(&rel).to_string();
        // The block is added outside the lock; only the link edit needs
        // to be serialized.
        let added = self.store.add(&name, data).await?;

        let store = self.store.clone();
        let target = added.hash;
        self.root
            .mutate(move |current| async move {
                Ok::<_, FsError>(dag::add_link(&*store, &current, &rel, &target).await?)
            })
            .await?;
        self.stat(remote).await
    }

    /// Create a directory (and any missing parents).
    pub async fn mkdir(&self, dir: &str) -> Result<(), FsError> {
        let rel = self.rel_path(dir);
        let empty = self.empty_dir_hash().await?;
        let store = self.store.clone();
        self.root
            .mutate(move |current| async move {
                Ok::<_, FsError>(dag::add_link(&*store, &current, &rel, &empty).await?)
            })
            .await?;
        Ok(())
    }

    /// Remove an empty directory. Fails with [`FsError::DirNotEmpty`]
    /// when it still has links; emptiness is checked under the same
    /// exclusive lock as the removal.
    pub async fn rmdir(&self, dir: &str) -> Result<(), FsError> {
        let rel = self.rel_path(dir);
        let store = self.store.clone();
        let dir_name = dir.to_string();
        self.root
            .mutate(move |current| async move {
                let abs = Self::dag_path(&current, &rel);
                let stat = match store.object_stat(&abs).await {
                    Ok(stat) => stat,
                    Err(ApiError::Transport(err)) => return Err(ApiError::Transport(err).into()),
                    Err(_) => return Err(FsError::DirNotFound(dir_name)),
                };
                if stat.num_links > 0 {
                    return Err(FsError::DirNotEmpty(dir_name));
                }
                Ok(dag::remove_link(&*store, &current, &rel).await?)
            })
            .await?;
        Ok(())
    }

    /// Remove a file link.
    pub async fn remove(&self, remote: &str) -> Result<(), FsError> {
        let rel = self.rel_path(remote);
        let store = self.store.clone();
        let result = self
            .root
            .mutate(move |current| async move {
                Ok::<_, FsError>(dag::remove_link(&*store, &current, &rel).await?)
            })
            .await;
        match result {
            Ok(_) => Ok(()),
            Err(FsError::Dag(DagError::PathNotFound(_))) => {
                Err(FsError::NotFound(remote.to_string()))
            }
            Err(err) => Err(err),
        }
    }

    /// Copy by hash: links the source node at the destination path.
    /// Structural sharing makes this a metadata-only edit.
    pub async fn copy(&self, src: &str, dst: &str) -> Result<Entry, FsError> {
        let src_rel = self.rel_path(src);
        let dst_rel = self.rel_path(dst);
        let store = self.store.clone();
        let src_name = src.to_string();
        self.root
            .mutate(move |current| async move {
                let abs = Self::dag_path(&current, &src_rel);
                let stat = match store.object_stat(&abs).await {
                    Ok(stat) => stat,
                    Err(ApiError::Transport(err)) => return Err(ApiError::Transport(err).into()),
                    Err(_) => return Err(FsError::NotFound(src_name)),
                };
                Ok(dag::add_link(&*store, &current, &dst_rel, &stat.hash).await?)
            })
            .await?;
        self.stat(dst).await
    }

    /// Move: link the source at the destination, then unlink the
    /// source, as one serialized edit sequence.
    pub async fn rename(&self, src: &str, dst: &str) -> Result<Entry, FsError> {
        let src_rel = self.rel_path(src);
        let dst_rel = self.rel_path(dst);
        let store = self.store.clone();
        let src_name = src.to_string();
        self.root
            .mutate(move |current| async move {
                let abs = Self::dag_path(&current, &src_rel);
                let stat = match store.object_stat(&abs).await {
                    Ok(stat) => stat,
                    Err(ApiError::Transport(err)) => return Err(ApiError::Transport(err).into()),
                    Err(_) => return Err(FsError::NotFound(src_name)),
                };
                let linked = dag::add_link(&*store, &current, &dst_rel, &stat.hash).await?;
                Ok::<_, FsError>(dag::remove_link(&*store, &linked, &src_rel).await?)
            })
            .await?;
        self.stat(dst).await
    }

    /// Drop everything under this view's base. With no base the whole
    /// tree is reset to an empty directory.
    pub async fn purge(&self) -> Result<(), FsError> {
        let base = self.base.clone();
        let store = self.store.clone();
        if base.is_empty() {
            let empty = self.empty_dir_hash().await?;
            self.root
                .mutate(move |_current| async move { Ok::<_, FsError>(empty) })
                .await?;
        } else {
            self.root
                .mutate(move |current| async move {
                    Ok::<_, FsError>(dag::remove_link(&*store, &current, &base).await?)
                })
                .await?;
        }
        Ok(())
    }

    /// Public gateway URL for a path, built from the binding kind and
    /// the current hash without a network call.
    pub async fn public_url(&self, remote: &str) -> String {
        let rel = self.rel_path(remote);
        self.root.public_url(&self.gateway, &rel).await
    }
}
