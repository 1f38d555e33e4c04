//! Stdio MCP server exposing the knowledge base.
//!
//! Launched as a subprocess by the client; stdout carries the protocol, so
//! logs go to stderr.

use std::path::PathBuf;

use clap::Parser;
use knowledge::{KnowledgeBase, KnowledgeTools};
use mcp::StdioServer;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "knowledge-server")]
#[command(about = "Serve a question/answer knowledge base as MCP tools over stdio")]
#[command(version)]
struct Args {
    /// SQLite database holding the `main` question/answer table
    #[arg(long, default_value = "data.db")]
    db: PathBuf,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let kb = KnowledgeBase::open(&args.db)?;
    tracing::info!(db = %args.db.display(), entries = kb.len()?, "knowledge base opened");

    StdioServer::new(KnowledgeTools::new(kb)).serve_stdio().await?;
    Ok(())
}
