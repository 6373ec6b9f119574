//! Injected dependency bundle (spec.md §9 "global process-wide state for
//! client singletons" → inject a `Deps` struct at init instead). Every tool
//! operation takes `&Deps` rather than reaching for a module-level global.

use ragsmith_common::config::EngineConfig;
use ragsmith_common::Result;
use ragsmith_indexing::contextual::{ChatClient, HttpChatClient};
use ragsmith_indexing::embed::{EmbeddingProvider, HttpEmbeddingProvider};
use ragsmith_indexing::fetch::{Fetcher, HttpFetcher};
use ragsmith_rag::rerank::{CrossEncoder, LexicalOverlapReranker};
use ragsmith_storage::{GraphStore, PgVectorStore};
use std::sync::Arc;

#[derive(Clone)]
pub struct Deps {
    pub fetcher: Arc<dyn Fetcher>,
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub chat: Arc<dyn ChatClient>,
    pub reranker: Arc<dyn CrossEncoder>,
    pub vector_store: Arc<PgVectorStore>,
    pub graph_store: Option<Arc<GraphStore>>,
    pub config: Arc<EngineConfig>,
}

impl Deps {
    /// Wire up every client singleton from `config` (spec.md §6
    /// "Configuration, process-wide, from env"). Both transports (stdio,
    /// SSE) call this once at startup.
    pub async fn from_config(config: EngineConfig) -> Result<Self> {
        let fetcher: Arc<dyn Fetcher> = Arc::new(HttpFetcher::new()?);
        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(HttpEmbeddingProvider::new(
            config.embedding.endpoint.clone(),
            config.embedding.api_key.clone(),
            config.embedding.model.clone(),
            config.embedding.dimensions,
            config.tunables.embedding_batch,
            config.tunables.max_retries,
        ));
        let chat: Arc<dyn ChatClient> = Arc::new(HttpChatClient::new(
            config.chat.endpoint.clone(),
            config.chat.api_key.clone(),
            config.chat.model.clone(),
        ));
        let reranker: Arc<dyn CrossEncoder> = Arc::new(LexicalOverlapReranker);
        let vector_store = Arc::new(PgVectorStore::connect(&config.vector_store.url).await?);
        let graph_store = if config.graph_store.is_configured() {
            let g = &config.graph_store;
            let store = GraphStore::connect(
                g.uri.as_deref().unwrap_or_default(),
                g.user.as_deref().unwrap_or_default(),
                g.password.as_deref().unwrap_or_default(),
            )
            .await?;
            Some(Arc::new(store))
        } else {
            None
        };

        Ok(Deps {
            fetcher,
            embedder,
            chat,
            reranker,
            vector_store,
            graph_store,
            config: Arc::new(config),
        })
    }
}
