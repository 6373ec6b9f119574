//! `ragsmith-server` binary: the SSE-over-HTTP entry point (spec.md §6).

use clap::Parser;
use ragsmith_api::ApiServer;
use ragsmith_common::config::EngineConfig;
use ragsmith_mcp_tools::Deps;
use tracing::info;

#[derive(Parser)]
#[command(name = "ragsmith-server")]
#[command(version = "0.1.0")]
#[command(about = "RAG ingestion & retrieval engine, SSE-over-HTTP transport")]
struct Cli {
    #[arg(long, default_value = "0.0.0.0:8080")]
    addr: String,

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

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let config = EngineConfig::from_env();
    info!(addr = %cli.addr, "ragsmith-api starting in sse mode");
    let deps = Deps::from_config(config).await?;

    ApiServer::new(deps).run(&cli.addr).await
}
