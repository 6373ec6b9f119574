use axum::{routing::get, Router};
use ragsmith_mcp_tools::Deps;
use std::sync::Arc;

use crate::routes;

#[derive(Clone)]
pub struct AppState {
    pub deps: Arc<Deps>,
}

pub struct ApiServer {
    state: AppState,
}

impl ApiServer {
    pub fn new(deps: Deps) -> Self {
        ApiServer {
            state: AppState { deps: Arc::new(deps) },
        }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/health", get(health_check))
            .route("/tools/:name", axum::routing::post(routes::tools::call_tool))
            .route("/tools/:name/stream", get(routes::tools::stream_tool))
            .layer(axum::middleware::from_fn(crate::middleware::logging::logging_middleware))
            .layer(crate::middleware::logging::get_tracing_layer())
            .with_state(self.state.clone())
    }

    pub async fn run(self, addr: &str) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!(%addr, "ragsmith-api listening");
        axum::serve(listener, self.router()).await?;
        Ok(())
    }
}

async fn health_check() -> &'static str {
    "ok"
}
