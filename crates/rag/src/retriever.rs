//! Hybrid retriever (spec.md §4.9): vector search, optional full-text merge,
//! optional cross-encoder rerank, optional graph-context enrichment.

use crate::rerank::{sort_and_truncate, CrossEncoder};
use ragsmith_common::{GraphContextEntry, Result, RetrievalResult};
use ragsmith_indexing::embed::EmbeddingProvider;
use ragsmith_storage::{GraphStore, PgVectorStore};
use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct RetrieveOptions {
    pub match_count: usize,
    pub source_filter: Option<String>,
    pub hybrid: bool,
    pub rerank: bool,
    pub graph_enrich: bool,
}

impl Default for RetrieveOptions {
    fn default() -> Self {
        RetrieveOptions {
            match_count: 10,
            source_filter: None,
            hybrid: false,
            rerank: false,
            graph_enrich: false,
        }
    }
}

const GRAPH_ENRICH_TOP_K: usize = 5;
const GRAPH_ENRICH_ENTITIES_PER_CHUNK: usize = 3;

pub async fn retrieve(
    vector_store: &PgVectorStore,
    graph_store: Option<&GraphStore>,
    reranker: Option<&dyn CrossEncoder>,
    embedder: &dyn EmbeddingProvider,
    query: &str,
    opts: &RetrieveOptions,
) -> Result<Vec<RetrievalResult>> {
    let embedding = embedder
        .embed(&[query.to_string()])
        .await
        .into_iter()
        .next()
        .unwrap_or_default();

    let vector_results = vector_store
        .vector_search(&embedding, opts.match_count, opts.source_filter.as_deref())
        .await?;

    let mut merged = if opts.hybrid {
        let text_results = vector_store
            .fulltext_search(query, opts.match_count, opts.source_filter.as_deref())
            .await?;
        merge_hybrid(&vector_results, &text_results, opts.match_count)
    } else {
        vector_results
    };

    if opts.rerank {
        if let Some(reranker) = reranker {
            merged = apply_rerank(reranker, query, merged, opts.match_count).await;
        }
    }

    if opts.graph_enrich {
        if let Some(graph) = graph_store {
            enrich_with_graph(&mut merged, graph).await;
        }
    }

    Ok(merged)
}

pub async fn search_code_examples(
    vector_store: &PgVectorStore,
    graph_store: Option<&GraphStore>,
    reranker: Option<&dyn CrossEncoder>,
    embedder: &dyn EmbeddingProvider,
    query: &str,
    opts: &RetrieveOptions,
) -> Result<Vec<RetrievalResult>> {
    let embedding = embedder
        .embed(&[query.to_string()])
        .await
        .into_iter()
        .next()
        .unwrap_or_default();

    let mut results = vector_store
        .vector_search_code_examples(&embedding, opts.match_count, opts.source_filter.as_deref())
        .await?;

    if opts.rerank {
        if let Some(reranker) = reranker {
            results = apply_rerank(reranker, query, results, opts.match_count).await;
        }
    }

    if opts.graph_enrich {
        if let Some(graph) = graph_store {
            enrich_with_graph(&mut results, graph).await;
        }
    }

    Ok(results)
}

async fn apply_rerank(
    reranker: &dyn CrossEncoder,
    query: &str,
    results: Vec<RetrievalResult>,
    match_count: usize,
) -> Vec<RetrievalResult> {
    let contents: Vec<String> = results.iter().map(|r| r.content.clone()).collect();
    let scores = reranker.score(query, &contents).await;
    let paired: Vec<(RetrievalResult, f32)> = results.into_iter().zip(scores).collect();
    sort_and_truncate(paired, match_count)
}

/// Results appearing in both sets come first, in vector-rank order; then
/// remaining vector-only results; then remaining text-only results (spec.md
/// §4.9 step 3, scenario S3).
pub fn merge_hybrid(
    vector: &[RetrievalResult],
    text: &[RetrievalResult],
    match_count: usize,
) -> Vec<RetrievalResult> {
    let text_urls: HashSet<&str> = text.iter().map(|r| r.url.as_str()).collect();
    let vector_urls: HashSet<&str> = vector.iter().map(|r| r.url.as_str()).collect();

    let mut merged: Vec<RetrievalResult> = Vec::new();
    for r in vector {
        if text_urls.contains(r.url.as_str()) {
            merged.push(r.clone());
        }
    }
    for r in vector {
        if !text_urls.contains(r.url.as_str()) {
            merged.push(r.clone());
        }
    }
    for r in text {
        if !vector_urls.contains(r.url.as_str()) {
            merged.push(r.clone());
        }
    }
    merged.truncate(match_count);
    merged
}

/// Non-fatal: failures or an absent graph simply leave `graph_context` unset
/// on the affected results (spec.md §4.9 step 5, §7).
async fn enrich_with_graph(results: &mut [RetrievalResult], graph: &GraphStore) {
    for result in results.iter_mut().take(GRAPH_ENRICH_TOP_K) {
        let entities = match graph
            .document_entities(&result.url, GRAPH_ENRICH_ENTITIES_PER_CHUNK)
            .await
        {
            Ok(entities) => entities,
            Err(e) => {
                tracing::warn!(url = %result.url, error = %e, "graph enrichment skipped");
                continue;
            }
        };

        let mut context = Vec::with_capacity(entities.len());
        for entity in entities {
            let neighbors = graph.entity_neighbors(&entity.name, 10).await.unwrap_or_default();
            context.push(GraphContextEntry {
                entity_name: entity.name,
                entity_type: entity.entity_type,
                neighbors,
            });
        }
        result.graph_context = Some(context);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragsmith_common::ChunkMetadata;
    use chrono::Utc;

    fn result(url: &str, similarity: f32) -> RetrievalResult {
        RetrievalResult {
            url: url.to_string(),
            content: format!("content for {url}"),
            metadata: ChunkMetadata {
                headers: String::new(),
                char_count: 0,
                word_count: 0,
                chunk_index: 0,
                url: url.to_string(),
                source_id: "s".to_string(),
                crawl_time: Utc::now(),
                contextual_embedding: false,
                extracted_tables: vec![],
            },
            similarity,
            graph_context: None,
        }
    }

    /// S3 — hybrid merge order: vector `[u1,u2,u3]`, text `[u3,u4]`,
    /// `match_count=4` → `[u3,u1,u2,u4]`.
    #[test]
    fn hybrid_merge_matches_scenario_s3() {
        let vector = vec![result("u1", 0.9), result("u2", 0.8), result("u3", 0.7)];
        let text = vec![result("u3", 0.5), result("u4", 0.4)];
        let merged = merge_hybrid(&vector, &text, 4);
        let urls: Vec<&str> = merged.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(urls, vec!["u3", "u1", "u2", "u4"]);
    }

    #[test]
    fn hybrid_merge_truncates_to_match_count() {
        let vector = vec![result("u1", 0.9), result("u2", 0.8)];
        let text = vec![result("u3", 0.5)];
        let merged = merge_hybrid(&vector, &text, 2);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn hybrid_merge_with_no_overlap_is_vector_then_text() {
        let vector = vec![result("u1", 0.9)];
        let text = vec![result("u2", 0.5)];
        let merged = merge_hybrid(&vector, &text, 10);
        let urls: Vec<&str> = merged.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(urls, vec!["u1", "u2"]);
    }
}
