mod config;
mod error;
mod http;
mod repl;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use runtime::{Client, McpSession, OllamaBackend, ServerConfig, StdioConnector};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::{Config, DEFAULT_CONFIG_FILE};
use error::Result;

type McpClient = Client<OllamaBackend, McpSession>;

#[derive(Parser)]
#[command(name = "mooring")]
#[command(about = "Chat with a local model that can call tools on MCP servers", long_about = None)]
#[command(version)]
struct Cli {
    /// Settings file
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Tool-server configuration (JSON), overriding the settings file
    #[arg(short, long, global = true)]
    servers: Option<PathBuf>,

    /// Model name, overriding the settings file
    #[arg(short, long, global = true)]
    model: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive chat session
    Chat,
    /// Serve the chat page and streaming endpoint over HTTP
    Serve {
        /// Address to listen on, overriding the settings file
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Connect to every server and list the merged tool catalog
    Tools,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load_or_default(&cli.config)?;
    if let Some(servers) = cli.servers {
        config.servers = servers;
    }
    if let Some(model) = cli.model {
        config.backend.model = model;
    }

    match cli.command {
        Some(Commands::Chat) | None => repl::run(&config).await,
        Some(Commands::Serve { bind }) => {
            if let Some(bind) = bind {
                config.http.bind = bind;
            }
            http::serve(config).await
        }
        Some(Commands::Tools) => cmd_tools(&config).await,
    }
}

/// Build a client from the settings: load servers, connect, wire the backend.
async fn connect(config: &Config) -> runtime::Result<McpClient> {
    let servers = ServerConfig::load(&config.servers)?;
    let backend = config.backend()?;
    Client::connect(backend, &StdioConnector, &servers, config.client_options()).await
}

async fn cmd_tools(config: &Config) -> Result<()> {
    let mut client = connect(config).await?;
    for server in client.servers() {
        println!("{server}");
    }
    println!();
    repl::print_tools(&client.tools());
    client.close().await;
    Ok(())
}
