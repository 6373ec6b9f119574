//! GraphRAG entity extractor (spec.md §4.12): one LLM call per chunk,
//! bounded by a semaphore, writing entities/relationships/mentions to the
//! property graph with idempotent upserts.

use ragsmith_common::{Chunk, Entity, GraphRagExtraction, Result};
use ragsmith_indexing::contextual::ChatClient;
use ragsmith_storage::GraphStore;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;

const DEFAULT_MAX_CONCURRENT: usize = 3;

/// Ask the model for `{"entities": [...], "relationships": [...]}`. Malformed
/// JSON degrades to an empty extraction for that chunk (logged), never
/// aborting the ingest (spec.md §4.12, §7).
pub async fn extract_chunk_entities(client: &dyn ChatClient, chunk_content: &str) -> GraphRagExtraction {
    let prompt = format!(
        "Extract named entities and relationships from the following text. \
         Respond with JSON only, shaped {{\"entities\": [{{\"name\": str, \"entity_type\": \
         PERSON|ORG|TECHNOLOGY|CONCEPT|LOCATION|EVENT|PRODUCT|OTHER}}], \"relationships\": \
         [{{\"from\": str, \"to\": str, \"relation_type\": str, \"confidence\": number}}]}}.\n\n{chunk_content}"
    );
    match client
        .complete("You extract structured entities and relationships from text.", &prompt)
        .await
    {
        Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "GraphRAG extraction returned malformed JSON, skipping chunk");
            GraphRagExtraction::default()
        }),
        Err(e) => {
            tracing::warn!(error = %e, "GraphRAG extraction LLM call failed, skipping chunk");
            GraphRagExtraction::default()
        }
    }
}

/// Process every chunk of one document concurrently under a semaphore of
/// `max_concurrent`, then write the combined extraction to the graph with
/// mention counts aggregated across all of the document's chunks.
pub async fn extract_and_write_document(
    client: &dyn ChatClient,
    graph: &GraphStore,
    document_url: &str,
    chunks: &[Chunk],
    max_concurrent: Option<usize>,
) -> Result<()> {
    let semaphore = Arc::new(Semaphore::new(max_concurrent.unwrap_or(DEFAULT_MAX_CONCURRENT).max(1)));

    let extractions = futures::future::join_all(chunks.iter().map(|chunk| {
        let semaphore = semaphore.clone();
        let content = chunk.content.clone();
        async move {
            let _permit = semaphore.acquire().await.expect("semaphore is never closed");
            extract_chunk_entities(client, &content).await
        }
    }))
    .await;

    let mut mention_counts: HashMap<(String, ragsmith_common::EntityType), (Entity, i64)> = HashMap::new();
    let mut relationships = Vec::new();

    for extraction in extractions {
        for entity in extraction.entities {
            let key = (entity.name.clone(), entity.entity_type);
            mention_counts
                .entry(key)
                .and_modify(|(_, count)| *count += 1)
                .or_insert((entity, 1));
        }
        relationships.extend(extraction.relationships);
    }

    for (entity, count) in mention_counts.values() {
        graph.upsert_entity(entity).await?;
        graph.mention(document_url, entity, *count).await?;
    }
    for rel in &relationships {
        graph
            .upsert_relation(&rel.from, &rel.to, &rel.relation_type, rel.confidence)
            .await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct StubClient(&'static str);

    #[async_trait]
    impl ChatClient for StubClient {
        async fn complete(&self, _system: &str, _prompt: &str) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    #[tokio::test]
    async fn well_formed_json_parses_into_entities_and_relationships() {
        let client = StubClient(
            r#"{"entities":[{"name":"Rust","entity_type":"TECHNOLOGY"}],"relationships":[]}"#,
        );
        let extraction = extract_chunk_entities(&client, "Rust is a systems language.").await;
        assert_eq!(extraction.entities.len(), 1);
        assert_eq!(extraction.entities[0].name, "Rust");
    }

    #[tokio::test]
    async fn malformed_json_degrades_to_empty_extraction() {
        let client = StubClient("not json");
        let extraction = extract_chunk_entities(&client, "text").await;
        assert!(extraction.entities.is_empty());
        assert!(extraction.relationships.is_empty());
    }
}
