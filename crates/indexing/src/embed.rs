//! Embedding client (spec.md §4.7): batches texts, retries transient upstream
//! failures with jittered exponential backoff, and degrades to per-item zero
//! vectors rather than ever failing the caller.

use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Contract: `embed(texts) -> vectors`, same length and order as the input,
/// each of dimensionality `D`. Infallible at the call site — all retry and
/// fallback logic lives inside the implementation (spec.md §4.7).
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    fn dimensions(&self) -> usize;
    async fn embed(&self, texts: &[String]) -> Vec<Vec<f32>>;
}

/// Batches up to `batch_size` items per upstream call. On terminal batch
/// failure, falls back to per-item embedding; any item still failing gets a
/// zero vector.
pub struct HttpEmbeddingProvider {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    dimensions: usize,
    batch_size: usize,
    max_retries: u32,
}

impl HttpEmbeddingProvider {
    pub fn new(
        endpoint: String,
        api_key: Option<String>,
        model: String,
        dimensions: usize,
        batch_size: usize,
        max_retries: u32,
    ) -> Self {
        HttpEmbeddingProvider {
            client: reqwest::Client::new(),
            endpoint,
            api_key,
            model,
            dimensions,
            batch_size,
            max_retries,
        }
    }

    async fn call_upstream(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, String> {
        #[derive(Serialize)]
        struct Req<'a> {
            input: &'a [String],
            model: &'a str,
        }
        #[derive(Deserialize)]
        struct RespItem {
            embedding: Vec<f32>,
        }
        #[derive(Deserialize)]
        struct Resp {
            data: Vec<RespItem>,
        }

        let mut req = self.client.post(&self.endpoint).json(&Req {
            input: texts,
            model: &self.model,
        });
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req.send().await.map_err(|e| e.to_string())?;
        if !resp.status().is_success() {
            return Err(format!("embedding endpoint returned {}", resp.status()));
        }
        let parsed: Resp = resp.json().await.map_err(|e| e.to_string())?;
        Ok(parsed.data.into_iter().map(|i| i.embedding).collect())
    }

    async fn embed_batch_with_retry(&self, texts: &[String]) -> Vec<Vec<f32>> {
        if texts.iter().all(|t| t.is_empty()) {
            return texts.iter().map(|_| vec![0.0; self.dimensions]).collect();
        }

        let mut attempt = 0u32;
        loop {
            match self.call_upstream(texts).await {
                Ok(vectors) if vectors.len() == texts.len() => return vectors,
                Ok(_) => {
                    tracing::warn!("embedding provider returned mismatched vector count");
                    break;
                }
                Err(e) => {
                    attempt += 1;
                    if attempt > self.max_retries {
                        tracing::warn!(error = %e, attempts = attempt, "embedding batch failed after retries");
                        break;
                    }
                    let backoff_ms = 100u64.saturating_mul(1u64 << attempt.min(10));
                    let jitter_ms = rand::thread_rng().gen_range(0..=backoff_ms / 4 + 1);
                    tokio::time::sleep(Duration::from_millis(backoff_ms + jitter_ms)).await;
                }
            }
        }

        // Terminal batch failure: fall back to per-item embedding.
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            match self.call_upstream(std::slice::from_ref(text)).await {
                Ok(mut v) if v.len() == 1 => out.push(v.remove(0)),
                _ => {
                    tracing::warn!("embedding item failed, substituting zero vector");
                    out.push(vec![0.0; self.dimensions]);
                }
            }
        }
        out
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, texts: &[String]) -> Vec<Vec<f32>> {
        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size.max(1)) {
            out.extend(self.embed_batch_with_retry(batch).await);
        }
        out
    }
}

/// Deterministic test double: every non-empty text gets a fixed-dimension
/// vector derived from its byte length (stable, cheap, good enough to
/// exercise downstream ordering/similarity code in tests).
pub struct FixedDimEmbeddingProvider {
    pub dimensions: usize,
    pub fail_predicate: Option<Box<dyn Fn(&str) -> bool + Send + Sync>>,
}

impl FixedDimEmbeddingProvider {
    pub fn new(dimensions: usize) -> Self {
        FixedDimEmbeddingProvider {
            dimensions,
            fail_predicate: None,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for FixedDimEmbeddingProvider {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, texts: &[String]) -> Vec<Vec<f32>> {
        texts
            .iter()
            .map(|t| {
                if t.is_empty() {
                    return vec![0.0; self.dimensions];
                }
                if let Some(pred) = &self.fail_predicate {
                    if pred(t) {
                        return vec![0.0; self.dimensions];
                    }
                }
                let seed = t.bytes().map(|b| b as f32).sum::<f32>() / (t.len() as f32);
                (0..self.dimensions)
                    .map(|i| ((seed + i as f32).sin()))
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_string_yields_zero_vector_not_an_error() {
        let provider = FixedDimEmbeddingProvider::new(8);
        let vectors = provider.embed(&["".to_string()]).await;
        assert_eq!(vectors.len(), 1);
        assert!(vectors[0].iter().all(|&x| x == 0.0));
    }

    #[tokio::test]
    async fn output_length_matches_input_length() {
        let provider = FixedDimEmbeddingProvider::new(4);
        let texts = vec!["a".to_string(), "bb".to_string(), "".to_string()];
        let vectors = provider.embed(&texts).await;
        assert_eq!(vectors.len(), 3);
        assert!(vectors.iter().all(|v| v.len() == 4));
    }

    /// S5 — embedding partial failure: item 2 fails permanently, the
    /// returned sequence still has the same length and the failed item is
    /// a zero vector.
    #[tokio::test]
    async fn partial_failure_degrades_failed_item_to_zero_vector() {
        let provider = FixedDimEmbeddingProvider {
            dimensions: 4,
            fail_predicate: Some(Box::new(|t| t == "bad")),
        };
        let texts = vec!["good1".to_string(), "bad".to_string(), "good2".to_string()];
        let vectors = provider.embed(&texts).await;
        assert_eq!(vectors.len(), 3);
        assert!(vectors[1].iter().all(|&x| x == 0.0));
        assert!(!vectors[0].iter().all(|&x| x == 0.0));
    }
}
