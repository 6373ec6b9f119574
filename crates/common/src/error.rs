use thiserror::Error;

/// Error taxonomy for the ingestion & retrieval engine (spec.md §7).
///
/// Every surfaced error carries an `error_type()` so the tool-call envelope
/// `{success: false, error, error_type}` exposes a machine-readable kind
/// without callers having to pattern-match the display string.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("fetch error for {url}: {message}")]
    Fetch { url: String, message: String },

    #[error("embedding error: {0}")]
    Embedding(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("knowledge graph unavailable: {0}")]
    GraphUnavailable(String),

    #[error("operation cancelled after partial progress: {0}")]
    Cancelled(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("unknown error: {0}")]
    Unknown(String),
}

impl EngineError {
    /// Stable machine-readable discriminant for the tool-response envelope.
    pub fn error_type(&self) -> &'static str {
        match self {
            EngineError::Validation(_) => "validation_error",
            EngineError::Fetch { .. } => "fetch_error",
            EngineError::Embedding(_) => "embedding_error",
            EngineError::Store(_) => "store_error",
            EngineError::GraphUnavailable(_) => "graph_unavailable",
            EngineError::Cancelled(_) => "cancellation_error",
            EngineError::Io(_) => "io_error",
            EngineError::Serialization(_) => "serialization_error",
            EngineError::Unknown(_) => "unknown_error",
        }
    }

    pub fn fetch(url: impl Into<String>, message: impl Into<String>) -> Self {
        EngineError::Fetch {
            url: url.into(),
            message: message.into(),
        }
    }
}

impl From<anyhow::Error> for EngineError {
    fn from(err: anyhow::Error) -> Self {
        EngineError::Unknown(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
