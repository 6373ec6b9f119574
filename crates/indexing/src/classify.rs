//! URL classification: a pure function deciding which crawl strategy a URL
//! should be dispatched to (spec.md §4.1).

use ragsmith_common::UrlKind;

/// Caller-supplied hints that influence classification ahead of the URL
/// shape itself — a query string means "adaptive", an explicit
/// single-page request short-circuits everything else.
#[derive(Debug, Clone, Default)]
pub struct ClassifyHints {
    pub force_single_page: bool,
    pub query: Option<String>,
}

/// Classify a URL into the strategy that should crawl it.
///
/// Order of precedence, first match wins: Sitemap, TextFile, SinglePage
/// (forced), Adaptive (query present), else Recursive.
pub fn classify(url: &str, hints: &ClassifyHints) -> UrlKind {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let lower = path.to_lowercase();

    if lower.ends_with("sitemap.xml") || (lower.contains("sitemap") && lower.ends_with(".xml")) {
        return UrlKind::Sitemap;
    }
    if lower.ends_with(".txt") {
        return UrlKind::TextFile;
    }
    if hints.force_single_page {
        return UrlKind::SinglePage;
    }
    if hints.query.is_some() {
        return UrlKind::Adaptive;
    }
    UrlKind::Recursive
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hints() -> ClassifyHints {
        ClassifyHints::default()
    }

    #[test]
    fn sitemap_by_exact_name() {
        assert_eq!(
            classify("https://x.test/sitemap.xml", &hints()),
            UrlKind::Sitemap
        );
    }

    #[test]
    fn sitemap_by_substring() {
        assert_eq!(
            classify("https://x.test/sitemap_index.xml", &hints()),
            UrlKind::Sitemap
        );
    }

    #[test]
    fn text_file_by_extension() {
        assert_eq!(
            classify("https://x.test/llms.txt", &hints()),
            UrlKind::TextFile
        );
    }

    #[test]
    fn forced_single_page_wins_over_recursive() {
        let h = ClassifyHints {
            force_single_page: true,
            ..hints()
        };
        assert_eq!(classify("https://x.test/doc", &h), UrlKind::SinglePage);
    }

    #[test]
    fn query_present_means_adaptive() {
        let h = ClassifyHints {
            query: Some("how does auth work".into()),
            ..hints()
        };
        assert_eq!(classify("https://x.test/docs", &h), UrlKind::Adaptive);
    }

    #[test]
    fn default_is_recursive() {
        assert_eq!(classify("https://x.test/docs", &hints()), UrlKind::Recursive);
    }

    #[test]
    fn fragment_and_query_stripped_before_classification() {
        assert_eq!(
            classify("https://x.test/sitemap.xml?x=1#frag", &hints()),
            UrlKind::Sitemap
        );
    }
}
