use chrono::NaiveDate;
use uuid::Uuid;

use super::*;

fn prompt(text: &str, location: Option<&str>) -> Prompt {
    Prompt {
        id: Uuid::new_v4(),
        prompt_text: text.to_string(),
        primary_product: "nordvpn".to_string(),
        location: location.map(str::to_string),
        status: Some("active".to_string()),
        tags: None,
        created_at: None,
    }
}

fn result(prompt: &Prompt, text: Option<&str>) -> OverviewResult {
    OverviewResult {
        id: Uuid::new_v4(),
        prompt_id: prompt.id,
        provider: "google_ai_overview".to_string(),
        scraped_date: NaiveDate::from_ymd_opt(2026, 1, 2).unwrap(),
        scraped_at: None,
        response_text: text.map(str::to_string),
        sources: None,
        ahrefs_volume: None,
        sentiment_label: None,
    }
}

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
fn normalizes_codes_on_construction() {
    let matcher = CouponMatcher::new([" save10 ", "", "   ", "NEW20", "Save10"]);
    assert_eq!(matcher.tracked_coupons(), ["SAVE10", "NEW20"]);
    assert_eq!(matcher.len(), 2);
    assert!(!matcher.is_empty());
}

#[test]
fn find_matches_word_boundaries_and_case_insensitive() {
    let matcher = CouponMatcher::new(["save10"]);
    let matches = matcher.find_matches("Use SAVE10 today or save10 tomorrow");

    let codes: Vec<&str> = matches.iter().map(|m| m.coupon_code.as_str()).collect();
    assert_eq!(codes, ["SAVE10", "SAVE10"]);
    assert!(matches
        .iter()
        .all(|m| m.context.to_uppercase().contains("SAVE10")));
    assert!(matches[0].start < matches[1].start, "occurrences run left to right");
}

#[test]
fn find_matches_does_not_match_substrings() {
    let matcher = CouponMatcher::new(["ABC"]);
    assert!(matcher.find_matches("Use ABCD or XABC").is_empty());
}

#[test]
fn find_matches_empty_text_returns_nothing() {
    let matcher = CouponMatcher::new(["SAVE10"]);
    assert!(matcher.find_matches("").is_empty());
}

#[test]
fn find_matches_without_tracked_codes_returns_nothing() {
    let matcher = CouponMatcher::new(Vec::<String>::new());
    assert!(matcher.is_empty());
    assert!(matcher.find_matches("Use SAVE10 today").is_empty());
}

#[test]
fn find_matches_escapes_regex_metacharacters() {
    let matcher = CouponMatcher::new(["A.B"]);
    assert!(matcher.find_matches("try AXB now").is_empty());
    assert_eq!(matcher.find_matches("try A.B now").len(), 1);
}

#[test]
fn context_near_edges_has_no_ellipsis() {
    let matcher = CouponMatcher::new(["SAVE10"]);
    let matches = matcher.find_matches("SAVE10 works");
    assert_eq!(matches[0].context, "SAVE10 works");
}

#[test]
fn context_far_from_edges_has_both_ellipses() {
    let matcher = CouponMatcher::with_context_chars(["SAVE10"], 10);
    let text = "Start of a long sentence. Use SAVE10 for a discount on your next order.";
    let matches = matcher.find_matches(text);

    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].start, 30);
    assert_eq!(matches[0].end, 36);
    assert_eq!(matches[0].context, "...ence. Use SAVE10 for a dis...");
}

#[test]
fn context_collapses_internal_whitespace() {
    let matcher = CouponMatcher::new(["SAVE10"]);
    let matches = matcher.find_matches("Use   SAVE10\n\n\ttoday");
    assert_eq!(matches[0].context, "Use SAVE10 today");
}

#[test]
fn offsets_and_context_count_characters_not_bytes() {
    let matcher = CouponMatcher::with_context_chars(["SAVE10"], 3);
    let matches = matcher.find_matches("Prix réduit: SAVE10 — économisez");

    assert_eq!(matches[0].start, 13);
    assert_eq!(matches[0].end, 19);
    assert_eq!(matches[0].context, "...t: SAVE10 —...");
}

#[test]
fn zero_context_window_keeps_only_the_code() {
    let matcher = CouponMatcher::with_context_chars(["SAVE10"], 0);
    let matches = matcher.find_matches("Use SAVE10 today");
    assert_eq!(matches[0].context, "...SAVE10...");
}

#[test]
fn is_valid_coupon_is_case_insensitive() {
    let matcher = CouponMatcher::new(["SAVE10"]);
    assert!(matcher.is_valid_coupon("save10"));
    assert!(matcher.is_valid_coupon("Save10"));
    assert!(!matcher.is_valid_coupon("SAVE20"));
}

#[test]
fn tracked_set_is_fixed_at_construction() {
    let mut codes = vec!["SAVE10".to_string()];
    let matcher = CouponMatcher::new(codes.clone());
    codes.push("NEW20".to_string());

    assert!(!matcher.is_valid_coupon("NEW20"));
    assert!(matcher.find_matches("NEW20").is_empty());
}

#[test]
fn find_any_coupon_pattern_finds_untracked_codes() {
    let matcher = CouponMatcher::new(Vec::<String>::new());
    let found = matcher.find_any_coupon_pattern("Try code: abc123 and NORDVPNDEAL");

    assert!(found.contains("ABC123"));
    assert!(found.contains("CODE: ABC123"));
    assert!(found.contains("NORDVPNDEAL"));
}

#[test]
fn find_any_coupon_pattern_recognizes_promo_keywords() {
    let matcher = CouponMatcher::new(Vec::<String>::new());
    let found = matcher.find_any_coupon_pattern("Promo SPRING and coupon:WINTER");

    assert!(found.contains("PROMO SPRING"));
    assert!(found.contains("COUPON:WINTER"));
}

#[test]
fn find_any_coupon_pattern_ignores_plain_prose() {
    let matcher = CouponMatcher::new(Vec::<String>::new());
    assert!(matcher
        .find_any_coupon_pattern("No coupons here, just words.")
        .is_empty());
    assert!(matcher.find_any_coupon_pattern("").is_empty());
}

#[test]
fn analyze_result_builds_coupon_matches() {
    let matcher = CouponMatcher::with_context_chars(["SAVE10"], 10);
    let p = prompt("nordvpn coupon", Some("US"));
    let r = result(&p, Some("Get 10% off with SAVE10 at checkout"));

    let matches = matcher.analyze_result(&p, &r, None);

    assert_eq!(matches.len(), 1);
    let m = &matches[0];
    assert_eq!(m.coupon_code, "SAVE10");
    assert_eq!(m.keyword, "nordvpn coupon");
    assert_eq!(m.location.as_deref(), Some("US"));
    assert_eq!(m.product, "nordvpn");
    assert_eq!(m.ai_overview_id, r.id);
    assert_eq!(m.scraped_date, r.scraped_date);
    assert!(m.source_urls_with_mentions.is_empty());
    assert!(m.source_mention_unavailable);
}

#[test]
fn analyze_result_returns_empty_for_missing_text() {
    let matcher = CouponMatcher::new(["SAVE10"]);
    let p = prompt("nordvpn coupon", None);
    let r = result(&p, None);
    assert!(matcher.analyze_result(&p, &r, None).is_empty());
}

#[test]
fn analyze_result_cross_references_sources() {
    let matcher = CouponMatcher::new(["SAVE10"]);
    let p = prompt("nordvpn coupon", Some("US"));
    let r = result(&p, Some("Use SAVE10 today"));
    let sources = vec![
        page("https://a.example/deal", Some("<p>code save10 works</p>")),
        page("https://b.example/other", Some("<p>nothing here</p>")),
        page("https://c.example/none", None),
    ];

    let matches = matcher.analyze_result(&p, &r, Some(&sources));

    assert_eq!(matches.len(), 1);
    assert_eq!(
        matches[0].source_urls_with_mentions,
        vec!["https://a.example/deal".to_string()]
    );
    assert!(!matches[0].source_mention_unavailable);
}

#[test]
fn analyze_result_empty_sources_counts_as_unavailable() {
    let matcher = CouponMatcher::new(["SAVE10"]);
    let p = prompt("nordvpn coupon", Some("US"));
    let r = result(&p, Some("Use SAVE10 today"));

    let matches = matcher.analyze_result(&p, &r, Some(&[]));

    assert!(matches[0].source_mention_unavailable);
}

#[test]
fn analyze_result_checked_but_unconfirmed_is_not_unavailable() {
    let matcher = CouponMatcher::new(["SAVE10"]);
    let p = prompt("nordvpn coupon", Some("US"));
    let r = result(&p, Some("Use SAVE10 today"));
    let sources = vec![page("https://b.example/other", Some("<p>SAVE100</p>"))];

    let matches = matcher.analyze_result(&p, &r, Some(&sources));

    assert!(matches[0].source_urls_with_mentions.is_empty());
    assert!(!matches[0].source_mention_unavailable);
}
