//! Fetcher interface (spec.md §2.1): a capability the core consumes, not a
//! component it owns. The HTML-to-markdown conversion itself is delegated —
//! out of scope per spec.md §1 — so `HttpFetcher` does the minimum needed to
//! turn a page into markdown-ish text and a link list; production deployments
//! are expected to swap in a richer `Fetcher` behind this trait.

use async_trait::async_trait;
use ragsmith_common::{EngineError, Result};
use scraper::{Html, Selector};
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone)]
pub struct FetchOpts {
    pub wait_for: Option<Duration>,
    pub simulate_user: bool,
    pub stealth: bool,
    pub timeout: Duration,
}

impl Default for FetchOpts {
    fn default() -> Self {
        FetchOpts {
            wait_for: None,
            simulate_user: false,
            stealth: false,
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub markdown: String,
    pub links: Vec<String>,
    pub status: u16,
}

#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str, opts: &FetchOpts) -> Result<FetchOutcome>;

    /// Stream-of-pages variant for deep/recursive crawls that want to fetch
    /// many URLs without waiting for the whole batch; the default
    /// implementation just calls `fetch` once per URL sequentially.
    async fn fetch_many(&self, urls: &[String], opts: &FetchOpts) -> Vec<(String, Result<FetchOutcome>)> {
        let mut out = Vec::with_capacity(urls.len());
        for url in urls {
            out.push((url.clone(), self.fetch(url, opts).await));
        }
        out
    }
}

/// A plain `reqwest`-backed fetcher. Stealth/simulate-user flags only adjust
/// headers; there is no real anti-bot evasion here — that lives behind this
/// trait in a production fetcher, per spec.md §1.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| EngineError::fetch("<client-init>", e.to_string()))?;
        Ok(HttpFetcher { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, opts: &FetchOpts) -> Result<FetchOutcome> {
        let mut req = self.client.get(url).timeout(opts.timeout);
        if opts.simulate_user || opts.stealth {
            req = req.header(
                "User-Agent",
                "Mozilla/5.0 (compatible; ragsmith/1.0; +https://example.invalid/bot)",
            );
        }

        let resp = req
            .send()
            .await
            .map_err(|e| EngineError::fetch(url, e.to_string()))?;
        let status = resp.status().as_u16();

        if !resp.status().is_success() {
            return Err(EngineError::fetch(url, format!("http status {status}")));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| EngineError::fetch(url, e.to_string()))?;

        let (markdown, links) = html_to_markdown_and_links(&body, url);
        Ok(FetchOutcome {
            markdown,
            links,
            status,
        })
    }
}

/// Minimal HTML → markdown-ish text conversion plus outgoing link
/// extraction. This is intentionally naive: spec.md §1 treats real
/// conversion as an external black box.
fn html_to_markdown_and_links(body: &str, base_url: &str) -> (String, Vec<String>) {
    let document = Html::parse_document(body);
    let text_selector = Selector::parse("body").unwrap_or_else(|_| Selector::parse("html").unwrap());
    let markdown = document
        .select(&text_selector)
        .next()
        .map(|el| el.text().collect::<Vec<_>>().join(" "))
        .unwrap_or_default();

    let base = Url::parse(base_url).ok();
    let link_selector = Selector::parse("a[href]").unwrap();
    let mut links = Vec::new();
    for el in document.select(&link_selector) {
        if let Some(href) = el.value().attr("href") {
            let resolved = match &base {
                Some(b) => b.join(href).ok().map(|u| u.to_string()),
                None => Some(href.to_string()),
            };
            if let Some(link) = resolved {
                links.push(link);
            }
        }
    }
    (markdown, links)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_links_and_resolves_relative_hrefs() {
        let html = r#"<html><body>Hello <a href="/b">B</a> <a href="https://x.test/c">C</a></body></html>"#;
        let (markdown, links) = html_to_markdown_and_links(html, "https://x.test/a");
        assert!(markdown.contains("Hello"));
        assert_eq!(links, vec!["https://x.test/b", "https://x.test/c"]);
    }

    #[test]
    fn default_opts_have_thirty_second_timeout() {
        assert_eq!(FetchOpts::default().timeout, Duration::from_secs(30));
    }
}
