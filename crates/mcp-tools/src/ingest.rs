//! Shared per-document ingestion pipeline (spec.md §4.3-§4.8): chunk →
//! optional contextual summary → metadata → optional code-block extraction →
//! embed → write. Every crawl operation funnels its fetched [`Document`]s
//! through [`ingest_document`] so the steps are done exactly once.

use crate::deps::Deps;
use ragsmith_common::{Chunk, CodeExample, CrawlStats, Document, EngineError, Result};
use ragsmith_indexing::chunk::chunk_markdown;
use ragsmith_indexing::codeblock::{code_example_metadata, embedding_input, extract_code_blocks, summarize_code_block};
use ragsmith_indexing::contextual::{summarize_chunk_in_document, summarize_source, with_contextual_prefix};
use ragsmith_indexing::metadata::extract_chunk_metadata;
use ragsmith_rag::graphrag::extract_and_write_document;

/// Hostname-derived grouping key for a URL, used as `source_id` (spec.md §3).
pub fn source_id_for(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| url.to_string())
}

/// Chunk, enrich, embed, and store one document. Empty markdown is a no-op
/// (spec.md §8 boundary case: zero chunks, zero store writes, success).
/// `chunk_size` overrides `Tunables::default_chunk_size` when the caller
/// passed one explicitly (e.g. `smart_crawl_url`'s `chunk_size` input).
pub async fn ingest_document(deps: &Deps, document: &Document, chunk_size: Option<usize>) -> Result<CrawlStats> {
    let chunk_size = chunk_size.unwrap_or(deps.config.tunables.default_chunk_size);
    let raw_chunks = chunk_markdown(&document.markdown, chunk_size);
    if raw_chunks.is_empty() {
        return Ok(CrawlStats::default());
    }

    let source_id = source_id_for(&document.url);
    let use_contextual = deps.config.features.use_contextual_embeddings;

    let mut contents = Vec::with_capacity(raw_chunks.len());
    for raw in &raw_chunks {
        let content = if use_contextual {
            let summary = summarize_chunk_in_document(deps.chat.as_ref(), &document.markdown, raw).await;
            with_contextual_prefix(raw, summary.as_deref())
        } else {
            raw.clone()
        };
        contents.push(content);
    }

    let embeddings = deps.embedder.embed(&contents).await;

    let chunks: Vec<Chunk> = contents
        .into_iter()
        .zip(embeddings)
        .enumerate()
        .map(|(i, (content, embedding))| {
            let metadata = extract_chunk_metadata(&content, &document.url, &source_id, i as i32, use_contextual);
            Chunk {
                url: document.url.clone(),
                chunk_number: i as i32,
                content,
                metadata,
                embedding,
                source_id: source_id.clone(),
            }
        })
        .collect();

    let examples = if deps.config.features.use_agentic_rag {
        build_code_examples(deps, document, &source_id).await?
    } else {
        Vec::new()
    };

    deps.vector_store
        .replace_url_contents(&document.url, &chunks, &examples, deps.config.tunables.vector_store_write_batch)
        .await?;

    let total_word_count: i64 = chunks.iter().map(|c| c.metadata.word_count as i64).sum();
    let chunk_contents: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
    let summary = summarize_source(deps.chat.as_ref(), &chunk_contents).await;
    deps.vector_store.upsert_source(&source_id, &summary, total_word_count).await?;

    if deps.config.features.use_graphrag {
        let graph = deps
            .graph_store
            .as_ref()
            .ok_or_else(|| EngineError::GraphUnavailable("USE_GRAPHRAG is set but no graph store is configured".into()))?;
        extract_and_write_document(deps.chat.as_ref(), graph, &document.url, &chunks, None).await?;
    }

    Ok(CrawlStats {
        pages_crawled: 1,
        chunks_stored: chunks.len(),
        code_examples_stored: examples.len(),
    })
}

async fn build_code_examples(deps: &Deps, document: &Document, source_id: &str) -> Result<Vec<CodeExample>> {
    let blocks = extract_code_blocks(&document.markdown, deps.config.tunables.min_code_block_len);
    if blocks.is_empty() {
        return Ok(Vec::new());
    }

    let mut summaries = Vec::with_capacity(blocks.len());
    for block in &blocks {
        summaries.push(summarize_code_block(deps.chat.as_ref(), block).await);
    }

    let embedding_inputs: Vec<String> = blocks
        .iter()
        .zip(&summaries)
        .map(|(b, s)| embedding_input(&b.code, s))
        .collect();
    let embeddings = deps.embedder.embed(&embedding_inputs).await;

    Ok(blocks
        .into_iter()
        .zip(summaries)
        .zip(embeddings)
        .map(|((block, summary), embedding)| CodeExample {
            url: document.url.clone(),
            chunk_number: block.block_index,
            metadata: code_example_metadata(&block),
            code: block.code,
            summary,
            embedding,
            source_id: source_id.to_string(),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_id_is_the_url_host() {
        assert_eq!(source_id_for("https://x.test/a/b"), "x.test");
    }

    #[test]
    fn unparseable_url_falls_back_to_itself() {
        assert_eq!(source_id_for("not a url"), "not a url");
    }
}
