use common::fs::FsError;
use common::root::BindingError;

/// Move a file or directory within the tree.
#[derive(Debug, clap::Args)]
pub struct Mv {
    /// Source path
    source: String,
    /// Destination path
    dest: String,
}

#[derive(Debug, thiserror::Error)]
pub enum MvError {
    #[error("binding error: {0}")]
    Binding(#[from] BindingError),
    #[error(transparent)]
    Fs(#[from] FsError),
}

#[async_trait::async_trait]
impl crate::op::Op for Mv {
    type Error = MvError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let fs = ctx.fs().await?;
        fs.rename(&self.source, &self.dest).await?;
        Ok(format!("moved {} -> {}", self.source, self.dest))
    }
}
