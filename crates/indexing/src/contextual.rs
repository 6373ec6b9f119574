//! Contextual summarizer (spec.md §4.5): optionally prepends a short
//! situating summary to each chunk before embedding.

use async_trait::async_trait;
use ragsmith_common::{EngineError, Result};
use serde::{Deserialize, Serialize};

/// Seam for any LLM call the indexing pipeline needs (contextual summaries,
/// code-block summaries, GraphRAG extraction). A single-method trait keeps
/// tests able to substitute a deterministic stub.
#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String>;
}

/// Chat-completions-style HTTP client, the `ChatClient` counterpart to
/// `HttpEmbeddingProvider`: one request, no batching or retry (spec.md §1
/// treats the chat/embedding provider API as an external black box — callers
/// of `ChatClient::complete` already handle failure by falling back, so no
/// retry belongs at this layer).
pub struct HttpChatClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
}

impl HttpChatClient {
    pub fn new(endpoint: String, api_key: Option<String>, model: String) -> Self {
        HttpChatClient {
            client: reqwest::Client::new(),
            endpoint,
            api_key,
            model,
        }
    }
}

#[async_trait]
impl ChatClient for HttpChatClient {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String> {
        #[derive(Serialize)]
        struct Message<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Message<'a>>,
        }
        #[derive(Deserialize)]
        struct RespChoiceMessage {
            content: String,
        }
        #[derive(Deserialize)]
        struct RespChoice {
            message: RespChoiceMessage,
        }
        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<RespChoice>,
        }

        let mut req = self.client.post(&self.endpoint).json(&Req {
            model: &self.model,
            messages: vec![
                Message { role: "system", content: system },
                Message { role: "user", content: prompt },
            ],
        });
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req.send().await.map_err(|e| EngineError::Unknown(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(EngineError::Unknown(format!("chat endpoint returned {}", resp.status())));
        }
        let mut parsed: Resp = resp.json().await.map_err(|e| EngineError::Unknown(e.to_string()))?;
        parsed
            .choices
            .drain(..)
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| EngineError::Unknown("chat endpoint returned no choices".to_string()))
    }
}

/// Produce a 1-3 sentence summary of `chunk` situating it within `document`.
/// On LLM failure, returns `None` so the caller falls back to the raw chunk
/// rather than failing the ingest (spec.md §4.5 failure mode).
pub async fn summarize_chunk_in_document(client: &dyn ChatClient, document: &str, chunk: &str) -> Option<String> {
    let prompt = format!(
        "Document:\n{document}\n\nChunk:\n{chunk}\n\nGive a 1-3 sentence summary of how this chunk \
         situates within the overall document. Respond with the summary only."
    );
    match client.complete("You summarize document context concisely.", &prompt).await {
        Ok(summary) => Some(summary),
        Err(e) => {
            tracing::warn!(error = %e, "contextual summarization failed, falling back to raw chunk");
            None
        }
    }
}

/// Summarize a source from up to its first 25 chunks (spec.md §4.8),
/// clamped to 500 chars. On LLM failure, returns an empty string so a
/// summary outage never blocks the source upsert, matching
/// `summarize_chunk_in_document`'s fallback.
pub async fn summarize_source(client: &dyn ChatClient, chunks: &[String]) -> String {
    let joined = chunks.iter().take(25).map(String::as_str).collect::<Vec<_>>().join("\n\n");
    let prompt = format!("Content:\n{joined}\n\nGive a 2-3 sentence summary of what this source covers. Respond with the summary only.");
    let summary = match client.complete("You summarize documentation sources concisely.", &prompt).await {
        Ok(summary) => summary,
        Err(e) => {
            tracing::warn!(error = %e, "source summarization failed, falling back to empty summary");
            return String::new();
        }
    };
    summary.trim().chars().take(500).collect()
}

/// Per spec.md §4.5 and Open Question 3: the summary, when present, is
/// prepended to `content` itself (visible to queries), not just to the
/// embedding input.
pub fn with_contextual_prefix(chunk: &str, summary: Option<&str>) -> String {
    match summary {
        Some(s) if !s.trim().is_empty() => format!("{}\n\n{}", s.trim(), chunk),
        _ => chunk.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubClient {
        response: Result<String>,
    }

    #[async_trait]
    impl ChatClient for StubClient {
        async fn complete(&self, _system: &str, _prompt: &str) -> Result<String> {
            match &self.response {
                Ok(s) => Ok(s.clone()),
                Err(e) => Err(ragsmith_common::EngineError::Unknown(e.to_string())),
            }
        }
    }

    #[tokio::test]
    async fn successful_summary_is_returned() {
        let client = StubClient {
            response: Ok("This chunk explains setup.".to_string()),
        };
        let summary = summarize_chunk_in_document(&client, "doc", "chunk").await;
        assert_eq!(summary.as_deref(), Some("This chunk explains setup."));
    }

    #[tokio::test]
    async fn failure_falls_back_to_none() {
        let client = StubClient {
            response: Err(ragsmith_common::EngineError::Unknown("boom".into())),
        };
        let summary = summarize_chunk_in_document(&client, "doc", "chunk").await;
        assert!(summary.is_none());
    }

    #[tokio::test]
    async fn source_summary_falls_back_to_empty_on_failure() {
        let client = StubClient {
            response: Err(ragsmith_common::EngineError::Unknown("boom".into())),
        };
        let chunks = vec!["a".to_string(), "b".to_string()];
        assert_eq!(summarize_source(&client, &chunks).await, "");
    }

    #[tokio::test]
    async fn source_summary_is_clamped_to_500_chars() {
        let client = StubClient {
            response: Ok("x".repeat(600)),
        };
        let chunks = vec!["a".to_string()];
        assert_eq!(summarize_source(&client, &chunks).await.len(), 500);
    }

    #[test]
    fn contextual_prefix_is_prepended_to_content() {
        let result = with_contextual_prefix("raw chunk", Some("context summary"));
        assert_eq!(result, "context summary\n\nraw chunk");
    }

    #[test]
    fn no_summary_leaves_content_untouched() {
        assert_eq!(with_contextual_prefix("raw chunk", None), "raw chunk");
    }
}
