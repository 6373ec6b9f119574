//! Cross-encoder reranking (spec.md §4.9 step 4): a second-pass score over
//! `(query, candidate)` pairs used to reorder the first-pass hybrid results.

use async_trait::async_trait;

/// Contract: score each candidate against the query, higher is more
/// relevant. Implementations may call out to a model; the seam exists so
/// tests can substitute a cheap deterministic scorer, the same way the
/// embedding client separates `EmbeddingProvider` from its HTTP backend.
#[async_trait]
pub trait CrossEncoder: Send + Sync {
    async fn score(&self, query: &str, candidates: &[String]) -> Vec<f32>;
}

/// Lexical term-overlap scorer: fraction of the query's distinct terms that
/// appear in the candidate, case-insensitive. Deterministic and free of any
/// external model, used as the default cross-encoder until a real model is
/// wired in.
pub struct LexicalOverlapReranker;

#[async_trait]
impl CrossEncoder for LexicalOverlapReranker {
    async fn score(&self, query: &str, candidates: &[String]) -> Vec<f32> {
        let terms: Vec<String> = query
            .split_whitespace()
            .map(|t| t.to_lowercase())
            .collect();
        if terms.is_empty() {
            return vec![0.0; candidates.len()];
        }
        candidates
            .iter()
            .map(|c| {
                let lower = c.to_lowercase();
                let hits = terms.iter().filter(|t| lower.contains(t.as_str())).count();
                hits as f32 / terms.len() as f32
            })
            .collect()
    }
}

/// Sort `items` by descending rerank score and truncate to `keep`.
pub fn sort_and_truncate<T>(mut items: Vec<(T, f32)>, keep: usize) -> Vec<T> {
    items.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    items.truncate(keep);
    items.into_iter().map(|(item, _)| item).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scores_reflect_term_overlap_fraction() {
        let reranker = LexicalOverlapReranker;
        let scores = reranker
            .score(
                "rust async channels",
                &["rust has async runtimes".to_string(), "unrelated text".to_string()],
            )
            .await;
        assert!(scores[0] > scores[1]);
    }

    #[test]
    fn sort_and_truncate_keeps_highest_scores_first() {
        let items = vec![("a", 0.2), ("b", 0.9), ("c", 0.5)];
        let sorted = sort_and_truncate(items, 2);
        assert_eq!(sorted, vec!["b", "c"]);
    }
}
