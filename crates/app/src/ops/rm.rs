use common::fs::FsError;
use common::root::BindingError;

/// Remove a file, or an empty directory with --dir.
#[derive(Debug, clap::Args)]
pub struct Rm {
    /// Path to remove
    path: String,
    /// Remove an (empty) directory instead of a file
    #[arg(long)]
    dir: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum RmError {
    #[error("binding error: {0}")]
    Binding(#[from] BindingError),
    #[error(transparent)]
    Fs(#[from] FsError),
}

#[async_trait::async_trait]
impl crate::op::Op for Rm {
    type Error = RmError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let fs = ctx.fs().await?;
        if self.dir {
            fs.rmdir(&self.path).await?;
        } else {
            fs.remove(&self.path).await?;
        }
        Ok(format!("removed {}", self.path))
    }
}
