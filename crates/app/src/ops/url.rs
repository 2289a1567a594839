use common::root::BindingError;

/// Public gateway URL for a path, built from the current root hash.
#[derive(Debug, clap::Args)]
pub struct Url {
    /// Path inside the tree
    #[arg(default_value = "/")]
    path: String,
}

#[derive(Debug, thiserror::Error)]
pub enum UrlError {
    #[error("binding error: {0}")]
    Binding(#[from] BindingError),
}

#[async_trait::async_trait]
impl crate::op::Op for Url {
    type Error = UrlError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let fs = ctx.fs().await?;
        Ok(fs.public_url(&self.path).await)
    }
}
