//! Query operations (spec.md §6): `get_available_sources`,
//! `perform_rag_query`, `search_code_examples`, `graphrag_query`.

use crate::deps::Deps;
use ragsmith_common::{RetrievalResult, Result, Source};
use ragsmith_rag::retriever::{self, RetrieveOptions};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct GetAvailableSourcesOutput {
    pub sources: Vec<Source>,
}

pub async fn get_available_sources(deps: &Deps) -> Result<GetAvailableSourcesOutput> {
    let sources = deps.vector_store.list_sources().await?;
    Ok(GetAvailableSourcesOutput { sources })
}

#[derive(Debug, Deserialize)]
pub struct PerformRagQueryInput {
    pub query: String,
    pub source_filter: Option<String>,
    pub match_count: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct QueryResultsOutput {
    pub results: Vec<RetrievalResult>,
}

pub async fn perform_rag_query(deps: &Deps, input: PerformRagQueryInput) -> Result<QueryResultsOutput> {
    let opts = RetrieveOptions {
        match_count: input.match_count.unwrap_or(10),
        source_filter: input.source_filter,
        hybrid: deps.config.features.use_hybrid_search,
        rerank: deps.config.features.use_reranking,
        graph_enrich: false,
    };
    let results = retriever::retrieve(
        &deps.vector_store,
        deps.graph_store.as_deref(),
        Some(deps.reranker.as_ref()),
        deps.embedder.as_ref(),
        &input.query,
        &opts,
    )
    .await?;
    Ok(QueryResultsOutput { results })
}

#[derive(Debug, Deserialize)]
pub struct SearchCodeExamplesInput {
    pub query: String,
    pub source_id: Option<String>,
    pub match_count: Option<usize>,
}

pub async fn search_code_examples(deps: &Deps, input: SearchCodeExamplesInput) -> Result<QueryResultsOutput> {
    let opts = RetrieveOptions {
        match_count: input.match_count.unwrap_or(10),
        source_filter: input.source_id,
        hybrid: false,
        rerank: deps.config.features.use_reranking,
        graph_enrich: false,
    };
    let results = retriever::search_code_examples(
        &deps.vector_store,
        deps.graph_store.as_deref(),
        Some(deps.reranker.as_ref()),
        deps.embedder.as_ref(),
        &input.query,
        &opts,
    )
    .await?;
    Ok(QueryResultsOutput { results })
}

#[derive(Debug, Deserialize)]
pub struct GraphragQueryInput {
    pub query: String,
    pub source_filter: Option<String>,
    pub use_graph_enrichment: Option<bool>,
}

/// `graphrag_query`: the same hybrid retrieval as `perform_rag_query`, with
/// graph-context enrichment requested explicitly. Non-fatal if the graph is
/// unconfigured — [`retriever::retrieve`] simply skips enrichment then
/// (spec.md Open Question 5).
pub async fn graphrag_query(deps: &Deps, input: GraphragQueryInput) -> Result<QueryResultsOutput> {
    let opts = RetrieveOptions {
        match_count: 10,
        source_filter: input.source_filter,
        hybrid: deps.config.features.use_hybrid_search,
        rerank: deps.config.features.use_reranking,
        graph_enrich: input.use_graph_enrichment.unwrap_or(true),
    };
    let results = retriever::retrieve(
        &deps.vector_store,
        deps.graph_store.as_deref(),
        Some(deps.reranker.as_ref()),
        deps.embedder.as_ref(),
        &input.query,
        &opts,
    )
    .await?;
    Ok(QueryResultsOutput { results })
}
