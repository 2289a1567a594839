use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use crate::api::DagStore;

use super::binding::{Binding, BindingError, PUBLIC_GATEWAY};
use super::persist::{PersistError, DEFAULT_PERSIST_INTERVAL};
use super::root::Root;

/// Process-wide registry of shared roots, keyed by (endpoint, root
/// path).
///
/// Every filesystem instance addressing the same endpoint and binding
/// shares one `Root`, so concurrent instances serialize their edits
/// through one lock instead of diverging. Explicit and injectable:
/// construct one per process (or per test) and tear it down with
/// [`RootRegistry::shutdown`].
#[derive(Debug)]
pub struct RootRegistry {
    persist_interval: Duration,
    roots: Mutex<HashMap<RootKey, RootEntry>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RootKey {
    endpoint: String,
    root_path: String,
}

#[derive(Debug)]
struct RootEntry {
    root: Arc<Root>,
    flusher: Option<tokio::task::JoinHandle<()>>,
}

impl Default for RootRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_PERSIST_INTERVAL)
    }
}

impl RootRegistry {
    pub fn new(persist_interval: Duration) -> Self {
        Self {
            persist_interval,
            roots: Mutex::new(HashMap::new()),
        }
    }

    /// Get the shared root for (endpoint, root path), binding it lazily
    /// on first use. The map lock is held across the bind so two
    /// concurrent first users cannot create diverging roots.
    pub async fn bind(
        &self,
        store: Arc<dyn DagStore>,
        endpoint: &str,
        root_path: &str,
    ) -> Result<Arc<Root>, BindingError> {
        let key = RootKey {
            endpoint: endpoint.to_string(),
            root_path: root_path.to_string(),
        };
        let mut roots = self.roots.lock().await;
        if let Some(entry) = roots.get(&key) {
            return Ok(entry.root.clone());
        }

        let is_gateway = endpoint.trim_end_matches('/') == PUBLIC_GATEWAY;
        let root = Arc::new(Root::bind(store, root_path, is_gateway).await?);

        // Only the mutable root flushes in the background; name records
        // publish once at shutdown.
        let flusher = match root.binding() {
            Binding::MutableRoot => Some(root.spawn_periodic_persist(self.persist_interval)),
            _ => None,
        };

        roots.insert(
            key,
            RootEntry {
                root: root.clone(),
                flusher,
            },
        );
        Ok(root)
    }

    /// Number of live shared roots.
    pub async fn len(&self) -> usize {
        self.roots.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.roots.lock().await.is_empty()
    }

    /// Final flush: stop the background flushers and persist every
    /// writable root exactly once. Returns the first error; fatal
    /// errors should be escalated by the caller.
    pub async fn shutdown(&self) -> Result<(), PersistError> {
        let entries: Vec<RootEntry> = {
            let mut roots = self.roots.lock().await;
            roots.drain().map(|(_, entry)| entry).collect()
        };
        let mut first_error = None;
        for entry in entries {
            if let Some(flusher) = entry.flusher {
                flusher.abort();
            }
            if let Err(err) = entry.root.persist().await {
                tracing::error!(error = %err, "final persistence failed");
                first_error.get_or_insert(err);
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
