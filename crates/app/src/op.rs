use std::sync::Arc;
use std::time::Duration;

use common::api::{ApiError, DagStore, HttpDagStore};
use common::fs::Fs;
use common::root::{BindingError, RootRegistry};

/// One executable CLI operation.
#[async_trait::async_trait]
pub trait Op {
    type Error: std::error::Error + Send + Sync + 'static;
    type Output: std::fmt::Display;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error>;
}

/// Shared context for ops: the API client, the root registry, and the
/// binding configuration.
#[derive(Debug)]
pub struct OpContext {
    endpoint: String,
    root_path: String,
    store: Arc<dyn DagStore>,
    registry: RootRegistry,
}

impl OpContext {
    pub fn new(
        endpoint: String,
        root_path: String,
        flush_interval: Duration,
    ) -> Result<Self, ApiError> {
        let store: Arc<dyn DagStore> = Arc::new(HttpDagStore::new(&endpoint)?);
        Ok(Self {
            endpoint,
            root_path,
            store,
            registry: RootRegistry::new(flush_interval),
        })
    }

    /// Filesystem view over the configured binding, sharing the root
    /// through the registry.
    pub async fn fs(&self) -> Result<Fs, BindingError> {
        let root = self
            .registry
            .bind(self.store.clone(), &self.endpoint, &self.root_path)
            .await?;
        Ok(Fs::new(self.store.clone(), root, ""))
    }

    pub fn registry(&self) -> &RootRegistry {
        &self.registry
    }
}
