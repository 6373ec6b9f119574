//! `ragsmith` binary: the stdio JSON-RPC entry point for the ingestion &
//! retrieval engine (spec.md §6). `ragsmith_api` is the SSE-over-HTTP
//! counterpart; both share `Deps::from_config`.

use clap::Parser;
use ragsmith_cli::stdio;
use ragsmith_common::config::EngineConfig;
use ragsmith_mcp_tools::Deps;
use tracing::info;

#[derive(Parser)]
#[command(name = "ragsmith")]
#[command(version = "0.1.0")]
#[command(about = "RAG ingestion & retrieval engine, stdio JSON-RPC transport")]
struct Cli {
    /// Path to a .env file to load before reading the environment.
    #[arg(long)]
    env_file: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.env_file {
        dotenvy::from_path(path).ok();
    } else {
        dotenvy::dotenv().ok();
    }

    // Logging MUST go to stderr only; stdout is reserved for JSON-RPC bytes.
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive("info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let config = EngineConfig::from_env();
    info!("ragsmith starting in stdio mode");
    let deps = Deps::from_config(config).await?;

    stdio::serve(&deps).await
}
