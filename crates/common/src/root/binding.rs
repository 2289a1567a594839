use crate::api::{ApiError, Cid, DagStore};

/// Endpoint identity of the shared, non-authoritative read-only gateway.
/// A gateway has no mutable root to persist to.
pub const PUBLIC_GATEWAY: &str = "https://ipfs.io";

/// Configuration-determined relationship between a root and its external
/// authoritative pointer. Fixed at bind time, never changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    /// A fixed content path (`/ipfs/<hash>`). Always read only.
    Immutable(Cid),
    /// A name record (`/ipns/<name>`). Writable only when the endpoint
    /// holds the signing key for the record.
    NameRecord { name: String, key: Option<String> },
    /// The endpoint's externally-tracked mutable root. Writable,
    /// periodically flushed.
    MutableRoot,
}

#[derive(Debug, thiserror::Error)]
pub enum BindingError {
    #[error("store unreachable while resolving the mutable root: {0}")]
    BindingUnavailable(#[source] ApiError),
    #[error("failed to resolve name record {name:?}: {source}")]
    NameResolutionFailed {
        name: String,
        #[source]
        source: ApiError,
    },
    #[error("invalid root path {0:?}: expected \"\", \"/ipfs/<hash>\" or \"/ipns/<name>\"")]
    InvalidBindingPath(String),
    #[error("a read-only public gateway cannot track a mutable root; pass an /ipfs/ or /ipns/ root path")]
    GatewayCannotBeMutableRoot,
    #[error("api error: {0}")]
    Api(#[from] ApiError),
}

impl Binding {
    /// Classify a root path into exactly one binding variant and resolve
    /// its initial hash.
    pub async fn resolve(
        store: &dyn DagStore,
        root_path: &str,
        is_gateway: bool,
    ) -> Result<(Self, Cid), BindingError> {
        if root_path.is_empty() {
            if is_gateway {
                return Err(BindingError::GatewayCannotBeMutableRoot);
            }
            let stat = store
                .files_stat("/")
                .await
                .map_err(BindingError::BindingUnavailable)?;
            return Ok((Binding::MutableRoot, stat.hash));
        }

        if let Some(hash) = root_path.strip_prefix("/ipfs/") {
            if hash.is_empty() || hash.contains('/') {
                return Err(BindingError::InvalidBindingPath(root_path.to_string()));
            }
            tracing::warn!(root = %root_path, "immutable root path, tree is read only");
            let hash = Cid::new(hash);
            return Ok((Binding::Immutable(hash.clone()), hash));
        }

        if let Some(name) = root_path.strip_prefix("/ipns/") {
            if name.is_empty() || name.contains('/') {
                return Err(BindingError::InvalidBindingPath(root_path.to_string()));
            }
            let key = if is_gateway {
                tracing::warn!(
                    root = %root_path,
                    "name record is read only: the endpoint is a read-only public gateway"
                );
                None
            } else {
                let keys = store.key_list().await?;
                let key = keys.into_iter().find(|k| k.id == name).map(|k| k.name);
                if key.is_none() {
                    tracing::warn!(
                        root = %root_path,
                        "name record is read only: the endpoint does not hold its signing key"
                    );
                }
                key
            };
            let resolved = store.name_resolve(name).await.map_err(|source| {
                BindingError::NameResolutionFailed {
                    name: name.to_string(),
                    source,
                }
            })?;
            return Ok((
                Binding::NameRecord {
                    name: name.to_string(),
                    key,
                },
                resolved,
            ));
        }

        Err(BindingError::InvalidBindingPath(root_path.to_string()))
    }

    /// Whether mutations against this binding can ever be persisted.
    pub fn is_writable(&self) -> bool {
        match self {
            Binding::Immutable(_) => false,
            Binding::NameRecord { key, .. } => key.is_some(),
            Binding::MutableRoot => true,
        }
    }
}
