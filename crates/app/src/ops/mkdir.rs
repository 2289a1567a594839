use common::fs::FsError;
use common::root::BindingError;

/// Create a directory (and missing parents).
#[derive(Debug, clap::Args)]
pub struct Mkdir {
    /// Directory to create
    path: String,
}

#[derive(Debug, thiserror::Error)]
pub enum MkdirError {
    #[error("binding error: {0}")]
    Binding(#[from] BindingError),
    #[error(transparent)]
    Fs(#[from] FsError),
}

#[async_trait::async_trait]
impl crate::op::Op for Mkdir {
    type Error = MkdirError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let fs = ctx.fs().await?;
        fs.mkdir(&self.path).await?;
        Ok(format!("created {}", self.path))
    }
}
