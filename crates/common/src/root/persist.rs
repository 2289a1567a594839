use std::sync::{Arc, Weak};
use std::time::Duration;

use crate::api::{ApiError, Cid};

use super::binding::Binding;
use super::root::{Root, RootInner};

/// How often a mutable-root binding flushes in the background.
pub const DEFAULT_PERSIST_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    /// The external pointer was modified out-of-band in a way that
    /// overlaps this session's edits. Nothing was written.
    #[error("concurrent modification of the external root, consistency not guaranteed")]
    ConcurrentModificationConflict,
    /// A replay step failed midway: the external pointer may hold a
    /// partial update. Best-effort, not transactional.
    #[error("persistence aborted midway, the external root may hold a partial update: {source}")]
    PersistencePartialFailure {
        #[source]
        source: ApiError,
    },
    #[error("root refused persistence after an earlier fatal failure")]
    Poisoned,
    #[error("api error: {0}")]
    Api(#[from] ApiError),
}

impl PersistError {
    /// Fatal errors mean the in-memory view of the external pointer can
    /// no longer be trusted; the root poisons itself and the calling
    /// layer chooses how hard to stop.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            PersistError::ConcurrentModificationConflict
                | PersistError::PersistencePartialFailure { .. }
        )
    }
}

/// Two changed paths conflict when one edit touches an ancestor or a
/// descendant of the other. Sibling edits under unrelated subtrees are
/// allowed to coexist: neither session can have observed or overwritten
/// the other's nodes. Deliberately conservative.
fn paths_overlap(a: &str, b: &str) -> bool {
    a.starts_with(b) || b.starts_with(a)
}

impl Root {
    /// Reconcile and persist the current hash to the external pointer.
    ///
    /// Runs under the exclusive lock, so it serializes against in-flight
    /// mutations and against its own periodic/shutdown triggers. A no-op
    /// when nothing changed or the binding is not writable. On success
    /// `initial` advances to the freshly observed external hash.
    pub async fn persist(&self) -> Result<(), PersistError> {
        if self.is_read_only() {
            return Ok(());
        }
        let mut inner = self.inner.write().await;
        if inner.poisoned {
            return Err(PersistError::Poisoned);
        }
        if inner.current == inner.initial {
            return Ok(());
        }
        let result = match self.binding() {
            Binding::MutableRoot => self.persist_to_mutable_root(&mut inner).await,
            Binding::NameRecord {
                name,
                key: Some(key),
            } => self.persist_to_name_record(&mut inner, name, key).await,
            _ => Ok(()),
        };
        if let Err(err) = &result {
            tracing::error!(error = %err, "persistence failed");
            if err.is_fatal() {
                inner.poisoned = true;
            }
        }
        result
    }

    /// Replay this session's changes onto the externally-tracked mutable
    /// root, after checking that any out-of-band edits are disjoint from
    /// ours.
    async fn persist_to_mutable_root(&self, inner: &mut RootInner) -> Result<(), PersistError> {
        let store = self.store();

        let external = store.files_stat("/").await?.hash;

        // Paths edited by this session.
        let local_changes = store.diff(&inner.initial, &inner.current).await?;

        if external != inner.initial {
            // Something else moved the external pointer since the session
            // began. Abort unless its edits are disjoint from ours.
            let external_changes = store.diff(&external, &inner.initial).await?;
            for external_path in external_changes.paths() {
                for local_path in local_changes.paths() {
                    if paths_overlap(external_path, local_path) {
                        tracing::error!(
                            external = %external_path,
                            local = %local_path,
                            "overlapping concurrent modification of the mutable root"
                        );
                        return Err(PersistError::ConcurrentModificationConflict);
                    }
                }
            }
        }

        // Apply the changes in diff order. Each step is a single remote
        // call; a failure here leaves the external pointer mid-update.
        for change in &local_changes.changes {
            let file_path = format!("/{}", change.path);
            if change.before().is_some() {
                store
                    .files_rm(&file_path)
                    .await
                    .map_err(|source| PersistError::PersistencePartialFailure { source })?;
            }
            if let Some(after) = change.after() {
                let source_path = format!("/ipfs/{after}");
                store
                    .files_cp(&source_path, &file_path)
                    .await
                    .map_err(|source| PersistError::PersistencePartialFailure { source })?;
            }
        }
        tracing::debug!(hash = %inner.current, "persisted root to the mutable root");

        // Advance to the hash the store actually landed on: individual
        // edits may have been normalized differently than our in-memory
        // diff predicted.
        let stat = store
            .files_stat("/")
            .await
            .map_err(|source| PersistError::PersistencePartialFailure { source })?;
        inner.current = stat.hash.clone();
        inner.initial = stat.hash;
        Ok(())
    }

    /// Re-publish a name record: verify it still resolves to the hash
    /// this session started from, then point it at the current hash.
    async fn persist_to_name_record(
        &self,
        inner: &mut RootInner,
        name: &str,
        key: &str,
    ) -> Result<(), PersistError> {
        let store = self.store();

        let resolved = store.name_resolve(name).await?;
        if resolved != inner.initial {
            tracing::error!(
                %name,
                expected = %inner.initial,
                found = %resolved,
                "name record moved out-of-band"
            );
            return Err(PersistError::ConcurrentModificationConflict);
        }

        store.name_publish(&inner.current, key).await?;
        tracing::debug!(%name, hash = %inner.current, "published root to name record");

        inner.initial = inner.current.clone();
        Ok(())
    }

    /// Background flush loop for a mutable-root binding. Holds only a
    /// weak reference so the task dies with its root; stops early after
    /// a fatal failure since the root is poisoned anyway.
    pub(super) fn spawn_periodic_persist(
        self: &Arc<Self>,
        interval: Duration,
    ) -> tokio::task::JoinHandle<()> {
        let root: Weak<Root> = Arc::downgrade(self);
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                let Some(root) = root.upgrade() else {
                    break;
                };
                match root.persist().await {
                    Ok(()) => {}
                    Err(err) if err.is_fatal() => break,
                    Err(err) => {
                        tracing::warn!(error = %err, "periodic persistence failed, will retry");
                    }
                }
            }
        })
    }

    /// The external pointer hash this root would reconcile against right
    /// now. Test and diagnostics helper.
    pub async fn external_pointer(&self) -> Result<Option<Cid>, ApiError> {
        match self.binding() {
            Binding::MutableRoot => Ok(Some(self.store().files_stat("/").await?.hash)),
            Binding::NameRecord { name, .. } => {
                Ok(Some(self.store().name_resolve(name).await?))
            }
            Binding::Immutable(_) => Ok(None),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn overlap_is_prefix_based_in_both_directions() {
        assert!(paths_overlap("a/b", "a/b/c"));
        assert!(paths_overlap("a/b/c", "a/b"));
        assert!(paths_overlap("a", "a"));
        assert!(!paths_overlap("a/b", "a/c"));
        assert!(!paths_overlap("x", "y"));
    }
}
