use common::fs::FsError;
use common::root::BindingError;

/// List a directory of the tree.
#[derive(Debug, clap::Args)]
pub struct Ls {
    /// Directory to list
    #[arg(default_value = "/")]
    path: String,
}

#[derive(Debug, thiserror::Error)]
pub enum LsError {
    #[error("binding error: {0}")]
    Binding(#[from] BindingError),
    #[error(transparent)]
    Fs(#[from] FsError),
}

#[async_trait::async_trait]
impl crate::op::Op for Ls {
    type Error = LsError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let fs = ctx.fs().await?;
        let entries = fs.list(&self.path).await?;
        if entries.is_empty() {
            return Ok("(empty)".to_string());
        }
        let output = entries
            .iter()
            .map(|e| {
                if e.is_dir {
                    format!("{:>12}  {}/", "-", e.name)
                } else {
                    format!("{:>12}  {}", e.size, e.name)
                }
            })
            .collect::<Vec<_>>()
            .join("\n");
        Ok(output)
    }
}
