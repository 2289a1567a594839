mod op;
mod ops;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use op::{Op, OpContext};
use ops::{Add, Cat, Ls, Mkdir, Mv, Rm, Url};

#[derive(Debug, Parser)]
#[command(name = "dagfs", about = "Mutable file tree over an IPFS-like DAG store", version)]
struct Args {
    /// URL of the store's HTTP API server
    #[arg(long, env = "DAGFS_API", default_value = "http://localhost:5001")]
    endpoint: String,

    /// Root binding: empty for the mutable root, or an
    /// /ipfs/<hash> or /ipns/<name> path
    #[arg(long, env = "DAGFS_ROOT", default_value = "")]
    root: String,

    /// Seconds between background flushes of the mutable root
    #[arg(long, default_value_t = 1)]
    flush_interval: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    Ls(Ls),
    Cat(Cat),
    Add(Add),
    Mkdir(Mkdir),
    Rm(Rm),
    Mv(Mv),
    Url(Url),
}

impl Command {
    async fn execute(&self, ctx: &OpContext) -> Result<String, anyhow::Error> {
        match self {
            Command::Ls(op) => Ok(op.execute(ctx).await?),
            Command::Cat(op) => Ok(op.execute(ctx).await?),
            Command::Add(op) => Ok(op.execute(ctx).await?),
            Command::Mkdir(op) => Ok(op.execute(ctx).await?),
            Command::Rm(op) => Ok(op.execute(ctx).await?),
            Command::Mv(op) => Ok(op.execute(ctx).await?),
            Command::Url(op) => Ok(op.execute(ctx).await?),
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    tracing::debug!(endpoint = %args.endpoint, root = %args.root, "starting");

    let ctx = match OpContext::new(
        args.endpoint,
        args.root,
        std::time::Duration::from_secs(args.flush_interval),
    ) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Error: failed to create API client: {e}");
            std::process::exit(1);
        }
    };

    let result = args.command.execute(&ctx).await;

    // Final flush of every writable root. A fatal persistence error
    // means the external pointer can no longer be trusted; escalate.
    if let Err(e) = ctx.registry().shutdown().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }

    match result {
        Ok(output) => {
            if !output.is_empty() {
                println!("{output}");
            }
        }
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
