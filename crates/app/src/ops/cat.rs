use common::fs::FsError;
use common::root::BindingError;

/// Print the content of a file.
#[derive(Debug, clap::Args)]
pub struct Cat {
    /// File to read
    path: String,
}

#[derive(Debug, thiserror::Error)]
pub enum CatError {
    #[error("binding error: {0}")]
    Binding(#[from] BindingError),
    #[error(transparent)]
    Fs(#[from] FsError),
}

#[async_trait::async_trait]
impl crate::op::Op for Cat {
    type Error = CatError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let fs = ctx.fs().await?;
        let data = fs.read(&self.path).await?;
        Ok(String::from_utf8_lossy(&data).into_owned())
    }
}
