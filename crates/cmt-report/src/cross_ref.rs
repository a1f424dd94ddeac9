//! Confirms AI Overview mentions against the HTML of the cited pages.

use cmt_core::SourcePage;

use crate::matcher::CouponMatcher;

/// URLs of the `sources` whose HTML contains `code` as a whole word.
///
/// Pages without HTML are skipped and source order is kept. A code the
/// matcher does not track yields an empty list.
#[must_use]
pub fn find_in_sources(matcher: &CouponMatcher, code: &str, sources: &[SourcePage]) -> Vec<String> {
    let Some(pattern) = matcher.pattern_for(code) else {
        return Vec::new();
    };

    sources
        .iter()
        .filter(|page| page.html.as_deref().is_some_and(|html| pattern.is_match(html)))
        .map(|page| page.url.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(url: &str, html: Option<&str>) -> SourcePage {
        SourcePage {
            url: url.to_string(),
            domain: "example.com".to_string(),
            html: html.map(str::to_string),
            page_title: None,
            scraped_at: None,
            scrape_status: Some("success".to_string()),
        }
    }

    #[test]
    fn returns_urls_in_source_order() {
        let matcher = CouponMatcher::new(["SAVE10"]);
        let sources = vec![
            page("https://b.example", Some("<b>SAVE10</b>")),
            page("https://x.example", Some("<p>nothing</p>")),
            page("https://a.example", Some("use save10 now")),
        ];

        let urls = find_in_sources(&matcher, "SAVE10", &sources);
        assert_eq!(urls, vec!["https://b.example", "https://a.example"]);
    }

    #[test]
    fn lowercase_code_argument_still_resolves() {
        let matcher = CouponMatcher::new(["SAVE10"]);
        let sources = vec![page("https://a.example", Some("SAVE10"))];
        assert_eq!(find_in_sources(&matcher, "save10", &sources).len(), 1);
    }

    #[test]
    fn skips_pages_without_html() {
        let matcher = CouponMatcher::new(["SAVE10"]);
        let sources = vec![page("https://a.example", None)];
        assert!(find_in_sources(&matcher, "SAVE10", &sources).is_empty());
    }

    #[test]
    fn untracked_code_returns_nothing() {
        let matcher = CouponMatcher::new(["SAVE10"]);
        let sources = vec![page("https://a.example", Some("NEW20"))];
        assert!(find_in_sources(&matcher, "NEW20", &sources).is_empty());
    }

    #[test]
    fn requires_whole_word_in_html() {
        let matcher = CouponMatcher::new(["SAVE10"]);
        let sources = vec![page("https://a.example", Some("SAVE100 and XSAVE10"))];
        assert!(find_in_sources(&matcher, "SAVE10", &sources).is_empty());
    }
}
