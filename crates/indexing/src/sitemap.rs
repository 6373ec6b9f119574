//! Sitemap parser (spec.md §4.2 "Sitemap"): fetches an XML sitemap and
//! yields the URL list. Fails soft — malformed input yields an empty list,
//! never an error, matching the dispatcher's "success=true, zero pages"
//! contract for a broken sitemap.

use crate::fetch::{FetchOpts, Fetcher};

/// Parse `<loc>...</loc>` entries out of a sitemap XML document. Deliberately
/// tolerant: this is a substring scan, not a validating XML parser, so a
/// sitemap with extra/unexpected elements still yields its URLs.
pub fn parse_sitemap_urls(xml: &str) -> Vec<String> {
    let mut urls = Vec::new();
    let mut rest = xml;
    while let Some(start) = rest.find("<loc>") {
        let after_open = &rest[start + "<loc>".len()..];
        let Some(end) = after_open.find("</loc>") else {
            break;
        };
        let url = after_open[..end].trim();
        if !url.is_empty() {
            urls.push(url.to_string());
        }
        rest = &after_open[end + "</loc>".len()..];
    }
    urls
}

/// Fetch and parse a sitemap. On any fetch or parse failure, returns an
/// empty list rather than an error (spec.md §4.2 failure model).
pub async fn fetch_sitemap_urls(fetcher: &dyn Fetcher, sitemap_url: &str) -> Vec<String> {
    match fetcher.fetch(sitemap_url, &FetchOpts::default()).await {
        Ok(outcome) => parse_sitemap_urls(&outcome.markdown),
        Err(e) => {
            tracing::warn!(url = sitemap_url, error = %e, "sitemap fetch failed, yielding zero urls");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_multiple_loc_entries() {
        let xml = r#"<?xml version="1.0"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url><loc>https://x.test/a</loc></url>
  <url><loc>https://x.test/b</loc></url>
</urlset>"#;
        assert_eq!(
            parse_sitemap_urls(xml),
            vec!["https://x.test/a".to_string(), "https://x.test/b".to_string()]
        );
    }

    #[test]
    fn malformed_xml_yields_empty_list() {
        assert_eq!(parse_sitemap_urls("not xml at all"), Vec::<String>::new());
    }

    #[test]
    fn empty_sitemap_yields_empty_list() {
        let xml = r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9"></urlset>"#;
        assert_eq!(parse_sitemap_urls(xml), Vec::<String>::new());
    }
}
