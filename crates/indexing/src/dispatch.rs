//! Crawl dispatcher (spec.md §4.2): executes the strategy chosen by
//! [`crate::classify`], producing a stream of [`Document`]s.
//!
//! Strategies are modeled as free functions rather than a trait registry —
//! classification already picks the one strategy to run, so there is no
//! first-match-wins scan here (that pattern is used by
//! [`crate::classify::classify`] itself). Each strategy pushes documents
//! into an mpsc channel and closes it on completion, per the "async
//! generators as channels with a sentinel close" design note.

use futures::stream::{FuturesUnordered, StreamExt};
use ragsmith_common::{Document, MemoryStats};
use std::collections::{BinaryHeap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use sysinfo::{Pid, System};
use tokio::sync::{mpsc, Semaphore};
use tokio_stream::wrappers::ReceiverStream;
use url::Url;

use crate::fetch::{FetchOpts, Fetcher};
use crate::sitemap::fetch_sitemap_urls;

pub type DocumentStream = ReceiverStream<Document>;

#[derive(Debug, Clone)]
pub struct RecursiveOpts {
    pub max_depth: u32,
}

impl Default for RecursiveOpts {
    fn default() -> Self {
        RecursiveOpts { max_depth: 3 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdaptiveStrategy {
    BestFirst,
    Bfs,
    Dfs,
}

#[derive(Debug, Clone)]
pub struct AdaptiveOpts {
    pub query: String,
    pub strategy: AdaptiveStrategy,
    pub max_pages: usize,
    pub relevance_threshold: f32,
    pub max_depth: u32,
}

/// Canonicalize a URL for frontier dedup: strip the fragment only (Open
/// Question 2 resolved this way — query strings are left untouched).
pub fn canonicalize(url: &str) -> String {
    match Url::parse(url) {
        Ok(mut u) => {
            u.set_fragment(None);
            u.to_string()
        }
        Err(_) => url.to_string(),
    }
}

/// Whether `candidate` is on the same registrable domain as `start`, via
/// simple host-string equality (a simplification of full public-suffix-list
/// matching, per DESIGN.md).
pub fn is_internal_link(start: &Url, candidate: &str) -> bool {
    match Url::parse(candidate).or_else(|_| start.join(candidate)) {
        Ok(u) => u
            .host_str()
            .zip(start.host_str())
            .map(|(a, b)| a.eq_ignore_ascii_case(b))
            .unwrap_or(false),
        Err(_) => false,
    }
}

/// One fetch, one document.
pub async fn crawl_single_page(fetcher: Arc<dyn Fetcher>, url: &str, opts: FetchOpts) -> DocumentStream {
    let (tx, rx) = mpsc::channel(1);
    let url = url.to_string();
    tokio::spawn(async move {
        if let Ok(outcome) = fetcher.fetch(&url, &opts).await {
            let _ = tx
                .send(Document {
                    url,
                    markdown: outcome.markdown,
                    links: outcome.links,
                })
                .await;
        }
    });
    ReceiverStream::new(rx)
}

/// One fetch; the fetched body is treated as markdown verbatim (no HTML
/// conversion, since it already is plain text).
pub async fn crawl_text_file(fetcher: Arc<dyn Fetcher>, url: &str, opts: FetchOpts) -> DocumentStream {
    crawl_single_page(fetcher, url, opts).await
}

/// Fetch-and-parse the sitemap, then fan out to a worker pool gated by
/// `semaphore`. Partial per-URL failures are skipped, not fatal. `semaphore`
/// is shared with the caller so a [`MemorySupervisor`] can shrink/grow the
/// effective concurrency mid-crawl (spec.md §4.2).
pub async fn crawl_sitemap(
    fetcher: Arc<dyn Fetcher>,
    sitemap_url: &str,
    opts: FetchOpts,
    semaphore: Arc<Semaphore>,
) -> DocumentStream {
    let urls = fetch_sitemap_urls(fetcher.as_ref(), sitemap_url).await;
    let (tx, rx) = mpsc::channel(urls.len().max(1));
    tokio::spawn(async move {
        let mut tasks = FuturesUnordered::new();
        for url in urls {
            let fetcher = fetcher.clone();
            let opts = opts.clone();
            let semaphore = semaphore.clone();
            let tx = tx.clone();
            tasks.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                if let Ok(outcome) = fetcher.fetch(&url, &opts).await {
                    let _ = tx
                        .send(Document {
                            url,
                            markdown: outcome.markdown,
                            links: outcome.links,
                        })
                        .await;
                }
            }));
        }
        while tasks.next().await.is_some() {}
    });
    ReceiverStream::new(rx)
}

/// BFS from `start_url`, up to `opts.max_depth`. Frontier deduplicated by
/// canonical URL; only internal links are followed. `semaphore` is shared
/// with the caller so a [`MemorySupervisor`] can shrink/grow the effective
/// concurrency mid-crawl (spec.md §4.2).
pub async fn crawl_recursive(
    fetcher: Arc<dyn Fetcher>,
    start_url: &str,
    fetch_opts: FetchOpts,
    opts: RecursiveOpts,
    semaphore: Arc<Semaphore>,
) -> DocumentStream {
    let (tx, rx) = mpsc::channel(64);
    let start_url = start_url.to_string();
    tokio::spawn(async move {
        let Ok(start) = Url::parse(&start_url) else {
            return;
        };
        let mut visited: HashSet<String> = HashSet::new();
        visited.insert(canonicalize(&start_url));
        let mut frontier = vec![start_url];

        for _depth in 0..=opts.max_depth {
            if frontier.is_empty() {
                break;
            }
            let mut tasks = FuturesUnordered::new();
            for url in frontier.drain(..) {
                let fetcher = fetcher.clone();
                let fetch_opts = fetch_opts.clone();
                let semaphore = semaphore.clone();
                tasks.push(tokio::spawn(async move {
                    let _permit = semaphore.acquire_owned().await.ok();
                    fetcher.fetch(&url, &fetch_opts).await.ok().map(|o| (url, o))
                }));
            }

            let mut next_frontier = Vec::new();
            while let Some(joined) = tasks.next().await {
                let Ok(Some((url, outcome))) = joined else {
                    continue;
                };
                for link in &outcome.links {
                    if is_internal_link(&start, link) {
                        let canon = canonicalize(link);
                        if visited.insert(canon) {
                            next_frontier.push(link.clone());
                        }
                    }
                }
                if tx
                    .send(Document {
                        url,
                        markdown: outcome.markdown,
                        links: outcome.links,
                    })
                    .await
                    .is_err()
                {
                    return;
                }
            }
            frontier = next_frontier;
        }
    });
    ReceiverStream::new(rx)
}

/// Keyword-overlap relevance score of `query` against `text`, in `[0, 1]`.
pub fn relevance_score(query: &str, text: &str) -> f32 {
    let query_terms: HashSet<String> = query
        .split_whitespace()
        .map(|w| w.to_lowercase())
        .filter(|w| !w.is_empty())
        .collect();
    if query_terms.is_empty() {
        return 0.0;
    }
    let text_lower = text.to_lowercase();
    let hits = query_terms
        .iter()
        .filter(|t| text_lower.contains(t.as_str()))
        .count();
    hits as f32 / query_terms.len() as f32
}

struct ScoredUrl {
    score: f32,
    url: String,
}

impl PartialEq for ScoredUrl {
    fn eq(&self, other: &Self) -> bool {
        self.score == other.score
    }
}
impl Eq for ScoredUrl {}
impl PartialOrd for ScoredUrl {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for ScoredUrl {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.score.partial_cmp(&other.score).unwrap_or(std::cmp::Ordering::Equal)
    }
}

/// Frontier-scored BFS/DFS/best-first crawl, stopping at `max_pages`, an
/// empty frontier, or `max_depth` exceeded. Never emits a page scoring below
/// `relevance_threshold`.
///
/// The start URL is always fetched once to discover its outgoing links —
/// that seed fetch is not itself subject to relevance thresholding and does
/// not count against `max_pages`; only the discovered candidates do.
pub async fn crawl_adaptive(
    fetcher: Arc<dyn Fetcher>,
    start_url: &str,
    fetch_opts: FetchOpts,
    opts: AdaptiveOpts,
) -> DocumentStream {
    let (tx, rx) = mpsc::channel(64);
    let start_url = start_url.to_string();
    tokio::spawn(async move {
        let Ok(start) = Url::parse(&start_url) else {
            return;
        };
        if opts.max_pages == 0 {
            return;
        }
        let Ok(seed) = fetcher.fetch(&start_url, &fetch_opts).await else {
            return;
        };

        let mut visited: HashSet<String> = HashSet::new();
        visited.insert(canonicalize(&start_url));
        let mut emitted = 0usize;

        let mut best_first: BinaryHeap<ScoredUrl> = BinaryHeap::new();
        let mut bfs_queue: VecDeque<String> = VecDeque::new();
        let mut dfs_stack: Vec<String> = Vec::new();

        for link in &seed.links {
            if !is_internal_link(&start, link) {
                continue;
            }
            let canon = canonicalize(link);
            if !visited.insert(canon) {
                continue;
            }
            match opts.strategy {
                AdaptiveStrategy::BestFirst => best_first.push(ScoredUrl {
                    score: relevance_score(&opts.query, link),
                    url: link.clone(),
                }),
                AdaptiveStrategy::Bfs => bfs_queue.push_back(link.clone()),
                AdaptiveStrategy::Dfs => dfs_stack.push(link.clone()),
            }
        }

        // `expansions` bounds total frontier pops (not link-depth levels,
        // since the frontier here is priority/stack-ordered rather than
        // level-by-level) as a safety net against runaway adaptive crawls.
        let max_expansions = opts.max_pages.saturating_mul(opts.max_depth.max(1) as usize + 1);
        let mut expansions = 0usize;
        loop {
            if emitted >= opts.max_pages || expansions >= max_expansions {
                break;
            }
            let next_url = match opts.strategy {
                AdaptiveStrategy::BestFirst => best_first.pop().map(|s| s.url),
                AdaptiveStrategy::Bfs => bfs_queue.pop_front(),
                AdaptiveStrategy::Dfs => dfs_stack.pop(),
            };
            let Some(url) = next_url else {
                break;
            };

            expansions += 1;
            let pre_score = relevance_score(&opts.query, &url);
            if pre_score < opts.relevance_threshold {
                continue;
            }

            let Ok(outcome) = fetcher.fetch(&url, &fetch_opts).await else {
                continue;
            };
            let page_score = relevance_score(&opts.query, &outcome.markdown).max(pre_score);
            if page_score < opts.relevance_threshold {
                continue;
            }

            for link in &outcome.links {
                if is_internal_link(&start, link) {
                    let canon = canonicalize(link);
                    if visited.insert(canon) {
                        match opts.strategy {
                            AdaptiveStrategy::BestFirst => best_first.push(ScoredUrl {
                                score: relevance_score(&opts.query, link),
                                url: link.clone(),
                            }),
                            AdaptiveStrategy::Bfs => bfs_queue.push_back(link.clone()),
                            AdaptiveStrategy::Dfs => dfs_stack.push(link.clone()),
                        }
                    }
                }
            }

            if tx
                .send(Document {
                    url,
                    markdown: outcome.markdown,
                    links: outcome.links,
                })
                .await
                .is_err()
            {
                return;
            }
            emitted += 1;
        }
    });
    ReceiverStream::new(rx)
}

/// Supervises a running crawl, sampling RSS roughly every second and
/// shrinking/growing the crawl's own [`Semaphore`] when the process crosses
/// `memory_threshold_mb` (spec.md §4.2 memory-adaptive mode). Shrinking
/// forgets an acquired permit outright (permanently lowering the
/// semaphore's capacity until restored); growing adds one back. This is the
/// same `semaphore` that `crawl_recursive`/`crawl_sitemap` acquire from, so
/// the throttling is not just reported in `MemoryStats` but actually gates
/// in-flight fetches.
pub struct MemorySupervisor {
    semaphore: Arc<Semaphore>,
    max_concurrent: usize,
    threshold_mb: u64,
    reduced: AtomicUsize,
}

impl MemorySupervisor {
    pub fn new(semaphore: Arc<Semaphore>, max_concurrent: usize, threshold_mb: u64) -> Self {
        MemorySupervisor {
            semaphore,
            max_concurrent: max_concurrent.max(1),
            threshold_mb,
            reduced: AtomicUsize::new(0),
        }
    }

    /// Run the supervisor loop until `stop` fires, recording start/end/peak/
    /// avg RSS and elapsed wall time.
    pub async fn run(self, mut stop: tokio::sync::oneshot::Receiver<()>) -> MemoryStats {
        let mut sys = System::new();
        let pid = Pid::from_u32(std::process::id());
        let start = Instant::now();

        sys.refresh_process(pid);
        let start_mb = process_rss_mb(&sys, pid);
        let mut peak_mb = start_mb;
        let mut sum_mb = start_mb;
        let mut samples = 1u64;
        let mut under_threshold_streak = 0u32;

        loop {
            tokio::select! {
                _ = &mut stop => break,
                _ = tokio::time::sleep(Duration::from_secs(1)) => {
                    sys.refresh_process(pid);
                    let current_mb = process_rss_mb(&sys, pid);
                    peak_mb = peak_mb.max(current_mb);
                    sum_mb += current_mb;
                    samples += 1;

                    if current_mb > self.threshold_mb as f64 {
                        under_threshold_streak = 0;
                        let reduced = self.reduced.load(Ordering::SeqCst);
                        if reduced < self.max_concurrent - 1 {
                            if let Ok(permit) = self.semaphore.try_acquire() {
                                permit.forget();
                                self.reduced.store(reduced + 1, Ordering::SeqCst);
                            }
                        }
                    } else {
                        under_threshold_streak += 1;
                        if under_threshold_streak >= 3 {
                            let reduced = self.reduced.load(Ordering::SeqCst);
                            if reduced > 0 {
                                self.semaphore.add_permits(1);
                                self.reduced.store(reduced - 1, Ordering::SeqCst);
                            }
                        }
                    }
                }
            }
        }

        sys.refresh_process(pid);
        let end_mb = process_rss_mb(&sys, pid);
        MemoryStats {
            start_mb,
            end_mb,
            peak_mb,
            avg_mb: sum_mb / samples as f64,
            elapsed_s: start.elapsed().as_secs_f64(),
        }
    }
}

fn process_rss_mb(sys: &System, pid: Pid) -> f64 {
    sys.process(pid)
        .map(|p| p.memory() as f64 / (1024.0 * 1024.0))
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalize_strips_fragment_not_query() {
        assert_eq!(
            canonicalize("https://x.test/a?b=1#frag"),
            "https://x.test/a?b=1"
        );
    }

    #[test]
    fn is_internal_link_matches_same_host() {
        let start = Url::parse("https://x.test/a").unwrap();
        assert!(is_internal_link(&start, "https://x.test/b"));
        assert!(!is_internal_link(&start, "https://other.test/b"));
    }

    #[test]
    fn is_internal_link_resolves_relative_paths() {
        let start = Url::parse("https://x.test/a").unwrap();
        assert!(is_internal_link(&start, "/b"));
    }

    #[test]
    fn relevance_score_is_fraction_of_matched_terms() {
        let score = relevance_score("auth token", "this page explains the auth flow");
        assert_eq!(score, 0.5);
    }

    #[test]
    fn relevance_score_zero_for_empty_query() {
        assert_eq!(relevance_score("", "anything"), 0.0);
    }

    struct StubFetcher {
        pages: std::collections::HashMap<String, crate::fetch::FetchOutcome>,
    }

    #[async_trait::async_trait]
    impl Fetcher for StubFetcher {
        async fn fetch(&self, url: &str, _opts: &FetchOpts) -> ragsmith_common::Result<crate::fetch::FetchOutcome> {
            self.pages
                .get(url)
                .cloned()
                .ok_or_else(|| ragsmith_common::EngineError::fetch(url, "not found"))
        }
    }

    /// S4 — adaptive best-first terminates after exactly `max_pages`,
    /// keeping the highest-scoring leaves. Query has 10 distinct terms;
    /// leaf `i`'s body contains the first `9-i` of them, so
    /// `relevance_score == (9-i)/10`, reproducing the `[0.9, 0.8, ..., 0.0]`
    /// scenario scores exactly.
    #[tokio::test]
    async fn adaptive_best_first_keeps_top_n_by_score() {
        let query_terms: Vec<String> = (0..10).map(|i| format!("term{i}")).collect();
        let query = query_terms.join(" ");
        let links: Vec<String> = (0..10).map(|i| format!("https://x.test/leaf{i}")).collect();

        let mut pages = std::collections::HashMap::new();
        pages.insert(
            "https://x.test/start".to_string(),
            crate::fetch::FetchOutcome {
                markdown: String::new(),
                links: links.clone(),
                status: 200,
            },
        );
        for (i, url) in links.iter().enumerate() {
            let body = query_terms[..9 - i].join(" ");
            pages.insert(
                url.clone(),
                crate::fetch::FetchOutcome {
                    markdown: body,
                    links: vec![],
                    status: 200,
                },
            );
        }
        let fetcher: Arc<dyn Fetcher> = Arc::new(StubFetcher { pages });

        let opts = AdaptiveOpts {
            query,
            strategy: AdaptiveStrategy::BestFirst,
            max_pages: 3,
            relevance_threshold: 0.5,
            max_depth: 5,
        };

        let mut stream = crawl_adaptive(fetcher, "https://x.test/start", FetchOpts::default(), opts).await;
        let mut fetched = Vec::new();
        while let Some(doc) = stream.next().await {
            fetched.push(doc.url);
        }

        assert_eq!(fetched.len(), 3);
        for expected in ["leaf0", "leaf1", "leaf2"] {
            assert!(
                fetched.iter().any(|u| u.contains(expected)),
                "expected {expected} among top-3, got {fetched:?}"
            );
        }
    }

    #[tokio::test]
    async fn adaptive_max_pages_zero_yields_nothing() {
        let fetcher: Arc<dyn Fetcher> = Arc::new(StubFetcher {
            pages: std::collections::HashMap::new(),
        });
        let opts = AdaptiveOpts {
            query: "x".into(),
            strategy: AdaptiveStrategy::BestFirst,
            max_pages: 0,
            relevance_threshold: 0.3,
            max_depth: 3,
        };
        let mut stream = crawl_adaptive(fetcher, "https://x.test/start", FetchOpts::default(), opts).await;
        assert!(stream.next().await.is_none());
    }
}
