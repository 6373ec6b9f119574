//! Tool-call surface (spec.md §6): a typed [`ToolRequest`] enum in place of
//! dynamic dispatch over ad-hoc dicts (spec.md §9), routed through
//! [`dispatch`] to one of the 14 operations and wrapped in the
//! success/error [`envelope`].

pub mod deps;
pub mod envelope;
pub mod ingest;
pub mod ops;

pub use deps::Deps;
use envelope::envelope;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
#[serde(tag = "tool", content = "input", rename_all = "snake_case")]
pub enum ToolRequest {
    CrawlSinglePage(ops::crawl::CrawlSinglePageInput),
    SmartCrawlUrl(ops::crawl::SmartCrawlUrlInput),
    CrawlWithStealthMode(ops::crawl::CrawlWithStealthModeInput),
    CrawlWithMultiUrlConfig(ops::crawl::CrawlWithMultiUrlConfigInput),
    CrawlWithMemoryMonitoring(ops::crawl::CrawlWithMemoryMonitoringInput),
    AdaptiveDeepCrawl(ops::crawl::AdaptiveDeepCrawlInput),
    GetAvailableSources,
    PerformRagQuery(ops::query::PerformRagQueryInput),
    SearchCodeExamples(ops::query::SearchCodeExamplesInput),
    GraphragQuery(ops::query::GraphragQueryInput),
    ParseGithubRepository(ops::repo::ParseGithubRepositoryInput),
    ParseGithubRepositoriesBatch(ops::repo::ParseGithubRepositoriesBatchInput),
    CheckAiScriptHallucinations(ops::repo::CheckAiScriptHallucinationsInput),
    QueryKnowledgeGraph(ops::repo::QueryKnowledgeGraphInput),
}

/// Route a decoded request to its operation and envelope the result. This is
/// the single entry point both transports (stdio JSON-RPC, SSE-over-HTTP)
/// call into.
pub async fn dispatch(deps: &Deps, request: ToolRequest) -> Value {
    match request {
        ToolRequest::CrawlSinglePage(input) => envelope(ops::crawl::crawl_single_page(deps, input).await),
        ToolRequest::SmartCrawlUrl(input) => envelope(ops::crawl::smart_crawl_url(deps, input).await),
        ToolRequest::CrawlWithStealthMode(input) => envelope(ops::crawl::crawl_with_stealth_mode(deps, input).await),
        ToolRequest::CrawlWithMultiUrlConfig(input) => envelope(ops::crawl::crawl_with_multi_url_config(deps, input).await),
        ToolRequest::CrawlWithMemoryMonitoring(input) => envelope(ops::crawl::crawl_with_memory_monitoring(deps, input).await),
        ToolRequest::AdaptiveDeepCrawl(input) => envelope(ops::crawl::adaptive_deep_crawl(deps, input).await),
        ToolRequest::GetAvailableSources => envelope(ops::query::get_available_sources(deps).await),
        ToolRequest::PerformRagQuery(input) => envelope(ops::query::perform_rag_query(deps, input).await),
        ToolRequest::SearchCodeExamples(input) => envelope(ops::query::search_code_examples(deps, input).await),
        ToolRequest::GraphragQuery(input) => envelope(ops::query::graphrag_query(deps, input).await),
        ToolRequest::ParseGithubRepository(input) => envelope(ops::repo::parse_github_repository(deps, input).await),
        ToolRequest::ParseGithubRepositoriesBatch(input) => envelope(ops::repo::parse_github_repositories_batch(deps, input).await),
        ToolRequest::CheckAiScriptHallucinations(input) => envelope(ops::repo::check_ai_script_hallucinations(deps, input).await),
        ToolRequest::QueryKnowledgeGraph(input) => envelope(ops::repo::query_knowledge_graph(deps, input).await),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_request_decodes_tagged_json() {
        let raw = serde_json::json!({"tool": "crawl_single_page", "input": {"url": "https://x.test"}});
        let req: ToolRequest = serde_json::from_value(raw).unwrap();
        assert!(matches!(req, ToolRequest::CrawlSinglePage(_)));
    }

    #[test]
    fn unit_variant_needs_no_input_field() {
        let raw = serde_json::json!({"tool": "get_available_sources"});
        let req: ToolRequest = serde_json::from_value(raw).unwrap();
        assert!(matches!(req, ToolRequest::GetAvailableSources));
    }
}
