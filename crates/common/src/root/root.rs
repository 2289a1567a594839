use std::future::Future;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::api::{ApiError, Cid, DagStore};
use crate::dag::DagError;

use super::binding::{Binding, BindingError};

/// One logical mutable tree: the current and initial root hash, guarded
/// by a reader/writer lock, plus the fixed binding that decides where
/// (and whether) the tree persists.
///
/// All mutations are linearized through the write lock: an edit always
/// computes its new hash from the hash it observed under the lock, so no
/// edit is ever applied to a stale root. The invariants:
///
/// - `current` is always derived by edits from `initial`;
/// - `initial` only advances past a successful, verified persistence;
/// - a read-only binding rejects mutation before any remote call.
#[derive(Debug)]
pub struct Root {
    store: Arc<dyn DagStore>,
    binding: Binding,
    pub(super) inner: RwLock<RootInner>,
}

#[derive(Debug)]
pub(super) struct RootInner {
    pub(super) current: Cid,
    pub(super) initial: Cid,
    /// Set after a fatal persistence failure: the in-memory model of the
    /// external pointer can no longer be trusted, so further mutation is
    /// refused. The calling layer decides whether to escalate.
    pub(super) poisoned: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum RootError {
    #[error("root is read only")]
    ReadOnlyRoot,
    #[error("root refused the operation after a failed persistence")]
    Poisoned,
    #[error(transparent)]
    Dag(#[from] DagError),
    #[error("api error: {0}")]
    Api(#[from] ApiError),
}

impl Root {
    /// Bind a root against the store: classify the root path, resolve
    /// the initial hash, and construct the shared state. Binding errors
    /// abort creation entirely.
    pub async fn bind(
        store: Arc<dyn DagStore>,
        root_path: &str,
        is_gateway: bool,
    ) -> Result<Self, BindingError> {
        let (binding, initial) = Binding::resolve(&*store, root_path, is_gateway).await?;
        tracing::debug!(?binding, %initial, "bound root");
        Ok(Self {
            store,
            binding,
            inner: RwLock::new(RootInner {
                current: initial.clone(),
                initial,
                poisoned: false,
            }),
        })
    }

    pub fn store(&self) -> &Arc<dyn DagStore> {
        &self.store
    }

    pub fn binding(&self) -> &Binding {
        &self.binding
    }

    pub fn is_read_only(&self) -> bool {
        !self.binding.is_writable()
    }

    /// Current root hash, under the shared lock.
    pub async fn read(&self) -> Cid {
        self.inner.read().await.current.clone()
    }

    /// Root hash as of the last successful persistence (or bind).
    pub async fn initial(&self) -> Cid {
        self.inner.read().await.initial.clone()
    }

    /// Whether there are unpersisted edits.
    pub async fn is_dirty(&self) -> bool {
        let inner = self.inner.read().await;
        inner.current != inner.initial
    }

    /// Apply one edit under the exclusive lock.
    ///
    /// `edit` receives the current root hash and returns the hash of the
    /// edited tree; the lock is held across the remote round trip(s) it
    /// performs, serializing all writers of this root. On error the
    /// current hash is left untouched, so callers may retry.
    pub async fn mutate<F, Fut, E>(&self, edit: F) -> Result<Cid, E>
    where
        F: FnOnce(Cid) -> Fut,
        Fut: Future<Output = Result<Cid, E>>,
        E: From<RootError>,
    {
        if self.is_read_only() {
            return Err(RootError::ReadOnlyRoot.into());
        }
        let mut inner = self.inner.write().await;
        if inner.poisoned {
            return Err(RootError::Poisoned.into());
        }
        let new_root = edit(inner.current.clone()).await?;
        inner.current = new_root.clone();
        Ok(new_root)
    }

    /// Public URL for a path inside the tree, built from the binding
    /// kind and the current hash. No network call.
    pub async fn public_url(&self, gateway: &str, path: &str) -> String {
        let gateway = gateway.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        let base = match &self.binding {
            Binding::NameRecord { name, .. } => format!("{gateway}/ipns/{name}"),
            _ => {
                let current = self.read().await;
                format!("{gateway}/ipfs/{current}")
            }
        };
        if path.is_empty() {
            base
        } else {
            format!("{base}/{path}")
        }
    }
}
