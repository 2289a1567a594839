use std::path::PathBuf;

use bytes::Bytes;
use common::fs::FsError;
use common::root::BindingError;

/// Add a local file to the tree.
#[derive(Debug, clap::Args)]
pub struct Add {
    /// Local file to read
    source: PathBuf,
    /// Destination path in the tree
    dest: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AddError {
    #[error("binding error: {0}")]
    Binding(#[from] BindingError),
    #[error(transparent)]
    Fs(#[from] FsError),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[async_trait::async_trait]
impl crate::op::Op for Add {
    type Error = AddError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let data = tokio::fs::read(&self.source)
            .await
            .map_err(|source| AddError::Io {
                path: self.source.clone(),
                source,
            })?;
        let fs = ctx.fs().await?;
        let entry = fs.write(&self.dest, Bytes::from(data)).await?;
        Ok(format!("added {} ({} bytes, {})", self.dest, entry.size, entry.hash))
    }
}
