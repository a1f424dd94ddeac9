//! Tracked-coupon detection in AI Overview text.
//!
//! [`CouponMatcher`] compiles the allow-list once into whole-word,
//! case-insensitive patterns. Exact matches come from [`CouponMatcher::find_matches`];
//! [`CouponMatcher::find_any_coupon_pattern`] is a separate, deliberately loose
//! detector for code-shaped strings that are not on the list.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::LazyLock;

use cmt_core::{CouponMatch, OverviewResult, Prompt, SourcePage};
use regex::Regex;

use crate::cross_ref::find_in_sources;

/// Characters of context kept on each side of a match.
pub const DEFAULT_CONTEXT_CHARS: usize = 100;

const ELLIPSIS: &str = "...";

/// Loose patterns for code-shaped strings:
/// letters followed by digits, letters followed by a promo suffix, and
/// `coupon`/`code`/`promo` followed by a token.
static HEURISTIC_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\b[A-Z]{2,}[0-9]{2,}\b",
        r"(?i)\b[A-Z]{3,}(?:OFF|SAVE|DEAL|VPN|PASS)\b",
        r"(?i)\bcoupon[\s:]+[A-Z0-9]+\b",
        r"(?i)\bcode[\s:]+[A-Z0-9]+\b",
        r"(?i)\bpromo[\s:]+[A-Z0-9]+\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid heuristic coupon regex"))
    .collect()
});

/// One occurrence of a tracked code in a text.
///
/// `start` and `end` are character offsets, not byte offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    pub coupon_code: String,
    pub start: usize,
    pub end: usize,
    pub context: String,
}

#[derive(Debug, Clone)]
pub struct CouponMatcher {
    coupons: Vec<String>,
    tracked: HashSet<String>,
    patterns: BTreeMap<String, Regex>,
    context_chars: usize,
}

impl CouponMatcher {
    /// Build a matcher with the default context window.
    pub fn new<I, S>(coupons: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::with_context_chars(coupons, DEFAULT_CONTEXT_CHARS)
    }

    /// Build a matcher keeping `context_chars` characters on each side of a
    /// match.
    ///
    /// Codes are trimmed and upper-cased; blank entries are dropped and
    /// duplicates collapse to one.
    pub fn with_context_chars<I, S>(coupons: I, context_chars: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized = Vec::new();
        let mut tracked = HashSet::new();
        for raw in coupons {
            let code = raw.as_ref().trim().to_uppercase();
            if code.is_empty() || !tracked.insert(code.clone()) {
                continue;
            }
            normalized.push(code);
        }

        let mut patterns = BTreeMap::new();
        for code in &normalized {
            let pattern = format!(r"(?i)\b{}\b", regex::escape(code));
            match Regex::new(&pattern) {
                Ok(re) => {
                    patterns.insert(code.clone(), re);
                }
                Err(e) => {
                    tracing::warn!(coupon = %code, error = %e, "coupon pattern failed to compile, exact matching disabled for it");
                }
            }
        }

        Self {
            coupons: normalized,
            tracked,
            patterns,
            context_chars,
        }
    }

    /// Normalized tracked codes in first-seen order.
    #[must_use]
    pub fn tracked_coupons(&self) -> &[String] {
        &self.coupons
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.coupons.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.coupons.is_empty()
    }

    /// Case-insensitive membership in the tracked list.
    #[must_use]
    pub fn is_valid_coupon(&self, code: &str) -> bool {
        self.tracked.contains(&code.to_uppercase())
    }

    pub(crate) fn pattern_for(&self, code: &str) -> Option<&Regex> {
        self.patterns.get(&code.to_uppercase())
    }

    /// Every whole-word occurrence of every tracked code.
    ///
    /// Codes are visited in sorted order and each code's occurrences run left
    /// to right. Callers that need another order must sort.
    #[must_use]
    pub fn find_matches(&self, text: &str) -> Vec<MatchResult> {
        if text.is_empty() {
            return Vec::new();
        }

        let mut matches = Vec::new();
        for (code, pattern) in &self.patterns {
            for m in pattern.find_iter(text) {
                let start = text[..m.start()].chars().count();
                let end = start + m.as_str().chars().count();
                matches.push(MatchResult {
                    coupon_code: code.clone(),
                    start,
                    end,
                    context: extract_context(text, m.start(), m.end(), self.context_chars),
                });
            }
        }
        matches
    }

    /// Code-shaped strings anywhere in `text`, upper-cased.
    ///
    /// This is over-broad on purpose and knows nothing about the tracked list.
    #[must_use]
    pub fn find_any_coupon_pattern(&self, text: &str) -> BTreeSet<String> {
        let mut found = BTreeSet::new();
        if text.is_empty() {
            return found;
        }
        for pattern in HEURISTIC_PATTERNS.iter() {
            found.extend(pattern.find_iter(text).map(|m| m.as_str().to_uppercase()));
        }
        found
    }

    /// Turn the tracked-code matches in one result into [`CouponMatch`]es.
    ///
    /// With a non-empty `sources` slice each match lists the cited pages whose
    /// HTML also contains the code; otherwise the match is flagged as
    /// unconfirmable.
    #[must_use]
    pub fn analyze_result(
        &self,
        prompt: &Prompt,
        result: &OverviewResult,
        sources: Option<&[SourcePage]>,
    ) -> Vec<CouponMatch> {
        let Some(text) = result.response_text.as_deref() else {
            return Vec::new();
        };

        let sources = sources.filter(|s| !s.is_empty());

        self.find_matches(text)
            .into_iter()
            .map(|m| {
                let source_urls_with_mentions = sources
                    .map(|s| find_in_sources(self, &m.coupon_code, s))
                    .unwrap_or_default();
                CouponMatch {
                    keyword: prompt.prompt_text.clone(),
                    location: prompt.location.clone(),
                    product: prompt.primary_product.clone(),
                    scraped_date: result.scraped_date,
                    coupon_code: m.coupon_code,
                    match_context: m.context,
                    ai_overview_id: result.id,
                    source_urls_with_mentions,
                    source_mention_unavailable: sources.is_none(),
                }
            })
            .collect()
    }
}

/// Snippet around the byte range `start..end`, widened by `window` characters
/// on each side. Ellipses mark a side that was cut short of the text edge.
fn extract_context(text: &str, start: usize, end: usize, window: usize) -> String {
    let context_start = if window == 0 {
        start
    } else {
        text[..start]
            .char_indices()
            .rev()
            .nth(window - 1)
            .map_or(0, |(i, _)| i)
    };
    let context_end = text[end..]
        .char_indices()
        .nth(window)
        .map_or(text.len(), |(i, _)| end + i);

    let snippet = text[context_start..context_end]
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    let prefix = if context_start > 0 { ELLIPSIS } else { "" };
    let suffix = if context_end < text.len() { ELLIPSIS } else { "" };
    format!("{prefix}{snippet}{suffix}")
}

#[cfg(test)]
#[path = "matcher_test.rs"]
mod tests;
