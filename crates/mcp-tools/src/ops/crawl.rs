//! Crawl operations (spec.md §6): `crawl_single_page`, `smart_crawl_url`,
//! `crawl_with_stealth_mode`, `crawl_with_multi_url_config`,
//! `crawl_with_memory_monitoring`, `adaptive_deep_crawl`.

use crate::deps::Deps;
use crate::ingest::ingest_document;
use futures::StreamExt;
use ragsmith_common::{CrawlStats, Document, EngineError, MemoryStats, Result, UrlKind};
use ragsmith_indexing::classify::{classify, ClassifyHints};
use ragsmith_indexing::dispatch::{
    crawl_adaptive, crawl_recursive, crawl_sitemap, crawl_text_file, relevance_score, AdaptiveOpts,
    AdaptiveStrategy as DispatchStrategy, MemorySupervisor, RecursiveOpts,
};
use ragsmith_indexing::fetch::FetchOpts;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

fn add_stats(a: &mut CrawlStats, b: &CrawlStats) {
    a.pages_crawled += b.pages_crawled;
    a.chunks_stored += b.chunks_stored;
    a.code_examples_stored += b.code_examples_stored;
}

/// Classify `url` and run whichever crawl strategy it resolves to, ingesting
/// every document produced. `smart_crawl_url` and `crawl_with_multi_url_config`
/// share this: per-URL config is *inferred*, not passed explicitly.
///
/// `fetch_semaphore` gates the sitemap/recursive strategies' per-page fetch
/// concurrency. When `None`, a fresh `Semaphore::new(max_concurrent)` is
/// built for this call alone; `crawl_with_memory_monitoring` passes one it
/// shares with a [`MemorySupervisor`] so RSS pressure actually throttles
/// in-flight fetches rather than just being reported (spec.md §4.2).
async fn crawl_with_inferred_strategy(
    deps: &Deps,
    url: &str,
    max_depth: u32,
    max_concurrent: usize,
    chunk_size: Option<usize>,
    fetch_semaphore: Option<Arc<Semaphore>>,
) -> Result<(&'static str, CrawlStats)> {
    let kind = classify(url, &ClassifyHints::default());
    let fetch_opts = FetchOpts {
        timeout: Duration::from_secs(deps.config.tunables.fetch_timeout_secs),
        ..FetchOpts::default()
    };
    let semaphore = fetch_semaphore.unwrap_or_else(|| Arc::new(Semaphore::new(max_concurrent.max(1))));

    let strategy_name = match kind {
        UrlKind::Sitemap => "sitemap",
        UrlKind::TextFile => "text_file",
        UrlKind::Recursive => "recursive",
        UrlKind::SinglePage => "single_page",
        UrlKind::Adaptive => "recursive",
    };

    let mut stream = match kind {
        UrlKind::Sitemap => crawl_sitemap(deps.fetcher.clone(), url, fetch_opts, semaphore).await,
        UrlKind::TextFile => crawl_text_file(deps.fetcher.clone(), url, fetch_opts).await,
        UrlKind::SinglePage => ragsmith_indexing::dispatch::crawl_single_page(deps.fetcher.clone(), url, fetch_opts).await,
        UrlKind::Recursive | UrlKind::Adaptive => {
            crawl_recursive(deps.fetcher.clone(), url, fetch_opts, RecursiveOpts { max_depth }, semaphore).await
        }
    };

    let mut stats = CrawlStats::default();
    while let Some(document) = stream.next().await {
        let doc_stats = ingest_document(deps, &document, chunk_size).await?;
        add_stats(&mut stats, &doc_stats);
    }
    Ok((strategy_name, stats))
}

#[derive(Debug, Deserialize)]
pub struct CrawlSinglePageInput {
    pub url: String,
}

/// `crawl_single_page`: one fetch, surfaced `FetchError` on failure (spec.md
/// §7 — single-page fetch failures are not swallowed the way sitemap/
/// recursive ones are).
pub async fn crawl_single_page(deps: &Deps, input: CrawlSinglePageInput) -> Result<CrawlStats> {
    let fetch_opts = FetchOpts {
        timeout: Duration::from_secs(deps.config.tunables.fetch_timeout_secs),
        ..FetchOpts::default()
    };
    let outcome = deps.fetcher.fetch(&input.url, &fetch_opts).await?;
    let document = Document {
        url: input.url,
        markdown: outcome.markdown,
        links: outcome.links,
    };
    ingest_document(deps, &document, None).await
}

#[derive(Debug, Deserialize)]
pub struct SmartCrawlUrlInput {
    pub url: String,
    pub max_depth: Option<u32>,
    pub max_concurrent: Option<usize>,
    pub chunk_size: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct SmartCrawlUrlOutput {
    pub pages_crawled: usize,
    pub chunks_stored: usize,
    pub strategy_used: &'static str,
}

pub async fn smart_crawl_url(deps: &Deps, input: SmartCrawlUrlInput) -> Result<SmartCrawlUrlOutput> {
    let max_depth = input.max_depth.unwrap_or(deps.config.tunables.max_depth);
    let max_concurrent = input.max_concurrent.unwrap_or(deps.config.tunables.max_concurrent_crawls);
    let (strategy_used, stats) =
        crawl_with_inferred_strategy(deps, &input.url, max_depth, max_concurrent, input.chunk_size, None).await?;
    Ok(SmartCrawlUrlOutput {
        pages_crawled: stats.pages_crawled,
        chunks_stored: stats.chunks_stored,
        strategy_used,
    })
}

#[derive(Debug, Deserialize)]
pub struct CrawlWithStealthModeInput {
    pub url: String,
    pub extra_wait: Option<u64>,
    pub simulate_user: Option<bool>,
}

/// `crawl_with_stealth_mode`: a single-page fetch with header/anti-bot
/// adjustments (spec.md §4.2, `Fetcher::fetch`'s `stealth`/`simulate_user`
/// flags — real evasion lives behind that trait, out of scope here).
pub async fn crawl_with_stealth_mode(deps: &Deps, input: CrawlWithStealthModeInput) -> Result<CrawlStats> {
    if let Some(secs) = input.extra_wait {
        tokio::time::sleep(Duration::from_secs(secs)).await;
    }
    let fetch_opts = FetchOpts {
        wait_for: input.extra_wait.map(Duration::from_secs),
        simulate_user: input.simulate_user.unwrap_or(false),
        stealth: true,
        timeout: Duration::from_secs(deps.config.tunables.fetch_timeout_secs),
    };
    let outcome = deps.fetcher.fetch(&input.url, &fetch_opts).await?;
    let document = Document {
        url: input.url,
        markdown: outcome.markdown,
        links: outcome.links,
    };
    ingest_document(deps, &document, None).await
}

#[derive(Debug, Deserialize)]
pub struct CrawlWithMultiUrlConfigInput {
    pub urls: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct PerUrlStats {
    pub url: String,
    pub strategy_used: &'static str,
    pub pages_crawled: usize,
    pub chunks_stored: usize,
}

#[derive(Debug, Serialize)]
pub struct CrawlWithMultiUrlConfigOutput {
    pub results: Vec<PerUrlStats>,
}

/// `crawl_with_multi_url_config`: each URL gets its own inferred strategy
/// (spec.md §6), run concurrently up to `MAX_CONCURRENT_CRAWLS`.
pub async fn crawl_with_multi_url_config(deps: &Deps, input: CrawlWithMultiUrlConfigInput) -> Result<CrawlWithMultiUrlConfigOutput> {
    let max_depth = deps.config.tunables.max_depth;
    let max_concurrent = deps.config.tunables.max_concurrent_crawls;
    let semaphore = std::sync::Arc::new(tokio::sync::Semaphore::new(max_concurrent.max(1)));

    let mut tasks = Vec::with_capacity(input.urls.len());
    for url in input.urls {
        let deps = deps.clone();
        let semaphore = semaphore.clone();
        tasks.push(tokio::spawn(async move {
            let _permit = semaphore.acquire_owned().await.ok();
            let outcome = crawl_with_inferred_strategy(&deps, &url, max_depth, max_concurrent, None, None).await;
            (url, outcome)
        }));
    }

    let mut results = Vec::with_capacity(tasks.len());
    for task in tasks {
        let (url, outcome) = task
            .await
            .map_err(|e| EngineError::Unknown(format!("multi-url crawl task panicked: {e}")))?;
        let (strategy_used, stats) = outcome?;
        results.push(PerUrlStats {
            url,
            strategy_used,
            pages_crawled: stats.pages_crawled,
            chunks_stored: stats.chunks_stored,
        });
    }
    Ok(CrawlWithMultiUrlConfigOutput { results })
}

#[derive(Debug, Deserialize)]
pub struct CrawlWithMemoryMonitoringInput {
    pub url: String,
    pub memory_threshold_mb: Option<u64>,
    pub max_concurrent: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct CrawlWithMemoryMonitoringOutput {
    pub pages_crawled: usize,
    pub chunks_stored: usize,
    pub code_examples_stored: usize,
    pub memory_stats: MemoryStats,
}

/// `crawl_with_memory_monitoring`: runs [`MemorySupervisor`] alongside a
/// recursive/sitemap crawl, throttling concurrency on RSS pressure (spec.md
/// §4.2, §5).
pub async fn crawl_with_memory_monitoring(deps: &Deps, input: CrawlWithMemoryMonitoringInput) -> Result<CrawlWithMemoryMonitoringOutput> {
    let threshold_mb = input.memory_threshold_mb.unwrap_or(deps.config.tunables.memory_threshold_mb);
    let max_concurrent = input.max_concurrent.unwrap_or(deps.config.tunables.max_concurrent_crawls);
    let max_depth = deps.config.tunables.max_depth;

    let semaphore = Arc::new(Semaphore::new(max_concurrent.max(1)));
    let supervisor = MemorySupervisor::new(semaphore.clone(), max_concurrent, threshold_mb);
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel();
    let supervisor_task = tokio::spawn(supervisor.run(stop_rx));

    let crawl_result = crawl_with_inferred_strategy(deps, &input.url, max_depth, max_concurrent, None, Some(semaphore)).await;

    let _ = stop_tx.send(());
    let memory_stats = supervisor_task
        .await
        .map_err(|e| EngineError::Unknown(format!("memory supervisor task panicked: {e}")))?;

    let (_, stats) = crawl_result?;
    Ok(CrawlWithMemoryMonitoringOutput {
        pages_crawled: stats.pages_crawled,
        chunks_stored: stats.chunks_stored,
        code_examples_stored: stats.code_examples_stored,
        memory_stats,
    })
}

#[derive(Debug, Deserialize)]
pub struct AdaptiveDeepCrawlInput {
    pub url: String,
    pub query: String,
    pub strategy: String,
    pub max_pages: Option<usize>,
    pub relevance_threshold: Option<f32>,
    pub max_depth: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct ScoredSource {
    pub url: String,
    pub score: f32,
}

#[derive(Debug, Serialize)]
pub struct AdaptiveDeepCrawlOutput {
    pub pages_crawled: usize,
    pub top_sources: Vec<ScoredSource>,
}

fn parse_strategy(s: &str) -> Result<DispatchStrategy> {
    match s {
        "best_first" => Ok(DispatchStrategy::BestFirst),
        "bfs" => Ok(DispatchStrategy::Bfs),
        "dfs" => Ok(DispatchStrategy::Dfs),
        other => Err(EngineError::Validation(format!("unknown adaptive crawl strategy `{other}`"))),
    }
}

/// `adaptive_deep_crawl`: frontier-scored crawl toward `query`, never
/// emitting a page below `relevance_threshold` (spec.md §4.2, scenario S4).
pub async fn adaptive_deep_crawl(deps: &Deps, input: AdaptiveDeepCrawlInput) -> Result<AdaptiveDeepCrawlOutput> {
    let strategy = parse_strategy(&input.strategy)?;
    let fetch_opts = FetchOpts {
        timeout: Duration::from_secs(deps.config.tunables.fetch_timeout_secs),
        ..FetchOpts::default()
    };
    let opts = AdaptiveOpts {
        query: input.query.clone(),
        strategy,
        max_pages: input.max_pages.unwrap_or(deps.config.tunables.max_concurrent_crawls),
        relevance_threshold: input.relevance_threshold.unwrap_or(deps.config.tunables.relevance_threshold),
        max_depth: input.max_depth.unwrap_or(deps.config.tunables.max_depth),
    };

    let mut stream = crawl_adaptive(deps.fetcher.clone(), &input.url, fetch_opts, opts).await;
    let mut scored = Vec::new();
    let mut pages_crawled = 0usize;
    while let Some(document) = stream.next().await {
        let score = relevance_score(&input.query, &document.markdown);
        ingest_document(deps, &document, None).await?;
        pages_crawled += 1;
        scored.push(ScoredSource { url: document.url, score });
    }
    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

    Ok(AdaptiveDeepCrawlOutput {
        pages_crawled,
        top_sources: scored,
    })
}
