use serde::{Deserialize, Serialize};

/// Process-wide configuration, loaded from environment variables (spec.md §6).
///
/// Loading itself is ambient scaffolding, not part of the engine's core
/// contract; the shape mirrors the teacher's `SystemConfig` — one sub-struct
/// per concern, a single constructor, defaults matching the documented ones.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub transport: Transport,
    pub embedding: EmbeddingConfig,
    pub chat: ChatConfig,
    pub vector_store: VectorStoreConfig,
    pub graph_store: GraphStoreConfig,
    pub features: FeatureFlags,
    pub tunables: Tunables,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transport {
    Stdio,
    Sse,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
    /// Fixed dimensionality D; every stored embedding must have this length.
    pub dimensions: usize,
}

/// Chat-completions endpoint used for contextual summaries, code-block
/// summaries, and GraphRAG entity extraction (spec.md §4.5, §4.6, §4.12).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorStoreConfig {
    pub url: String,
    pub service_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphStoreConfig {
    pub uri: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
}

impl GraphStoreConfig {
    pub fn is_configured(&self) -> bool {
        self.uri.is_some()
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct FeatureFlags {
    pub use_contextual_embeddings: bool,
    pub use_hybrid_search: bool,
    pub use_agentic_rag: bool,
    pub use_reranking: bool,
    pub use_knowledge_graph: bool,
    pub use_graphrag: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Tunables {
    pub max_concurrent_crawls: usize,
    pub default_chunk_size: usize,
    pub min_code_block_len: usize,
    pub max_retries: u32,
    pub embedding_batch: usize,
    pub vector_store_write_batch: usize,
    pub fetch_timeout_secs: u64,
    pub memory_threshold_mb: u64,
    pub relevance_threshold: f32,
    pub max_depth: u32,
}

impl Default for Tunables {
    fn default() -> Self {
        Self {
            max_concurrent_crawls: 10,
            default_chunk_size: 5000,
            min_code_block_len: 300,
            max_retries: 3,
            embedding_batch: 20,
            vector_store_write_batch: 20,
            fetch_timeout_secs: 30,
            memory_threshold_mb: 1024,
            relevance_threshold: 0.3,
            max_depth: 3,
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_flag(key: &str) -> bool {
    std::env::var(key)
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl EngineConfig {
    /// Load configuration from the process environment, falling back to the
    /// documented defaults (spec.md §6) for anything unset.
    pub fn from_env() -> Self {
        let default_tunables = Tunables::default();

        let transport = match env_or("TRANSPORT", "stdio").to_lowercase().as_str() {
            "sse" => Transport::Sse,
            _ => Transport::Stdio,
        };

        EngineConfig {
            transport,
            embedding: EmbeddingConfig {
                endpoint: env_or("EMBEDDING_ENDPOINT", "https://api.openai.com/v1/embeddings"),
                api_key: std::env::var("EMBEDDING_API_KEY").ok(),
                model: env_or("EMBEDDING_MODEL", "text-embedding-3-small"),
                dimensions: env_usize("EMBEDDING_DIMENSIONS", 1536),
            },
            chat: ChatConfig {
                endpoint: env_or("CHAT_ENDPOINT", "https://api.openai.com/v1/chat/completions"),
                api_key: std::env::var("CHAT_API_KEY").ok(),
                model: env_or("CHAT_MODEL", "gpt-4o-mini"),
            },
            vector_store: VectorStoreConfig {
                url: env_or("VECTOR_STORE_URL", "postgres://localhost/ragsmith"),
                service_key: std::env::var("VECTOR_STORE_SERVICE_KEY").ok(),
            },
            graph_store: GraphStoreConfig {
                uri: std::env::var("GRAPH_STORE_URI").ok(),
                user: std::env::var("GRAPH_STORE_USER").ok(),
                password: std::env::var("GRAPH_STORE_PASSWORD").ok(),
            },
            features: FeatureFlags {
                use_contextual_embeddings: env_flag("USE_CONTEXTUAL_EMBEDDINGS"),
                use_hybrid_search: env_flag("USE_HYBRID_SEARCH"),
                use_agentic_rag: env_flag("USE_AGENTIC_RAG"),
                use_reranking: env_flag("USE_RERANKING"),
                use_knowledge_graph: env_flag("USE_KNOWLEDGE_GRAPH"),
                use_graphrag: env_flag("USE_GRAPHRAG"),
            },
            tunables: Tunables {
                max_concurrent_crawls: env_usize(
                    "MAX_CONCURRENT_CRAWLS",
                    default_tunables.max_concurrent_crawls,
                ),
                default_chunk_size: env_usize(
                    "DEFAULT_CHUNK_SIZE",
                    default_tunables.default_chunk_size,
                ),
                min_code_block_len: env_usize(
                    "MIN_CODE_BLOCK_LEN",
                    default_tunables.min_code_block_len,
                ),
                max_retries: env_usize("MAX_RETRIES", default_tunables.max_retries as usize) as u32,
                embedding_batch: env_usize("EMBEDDING_BATCH", default_tunables.embedding_batch),
                ..default_tunables
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let t = Tunables::default();
        assert_eq!(t.max_concurrent_crawls, 10);
        assert_eq!(t.default_chunk_size, 5000);
        assert_eq!(t.min_code_block_len, 300);
        assert_eq!(t.max_retries, 3);
        assert_eq!(t.embedding_batch, 20);
        assert_eq!(t.fetch_timeout_secs, 30);
        assert_eq!(t.relevance_threshold, 0.3);
        assert_eq!(t.max_depth, 3);
    }
}
