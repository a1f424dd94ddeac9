use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Context string attached to heuristic detections, which have no snippet.
pub const UNTRACKED_PATTERN_CONTEXT: &str = "[Untracked coupon pattern]";

/// A tracked search keyword monitored for AI Overview content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    pub id: Uuid,
    pub prompt_text: String,
    /// Product category the keyword belongs to, e.g. `"nordvpn"`.
    pub primary_product: String,
    /// Country code the search is run from; `None` means global.
    pub location: Option<String>,
    pub status: Option<String>,
    pub tags: Option<Vec<String>>,
    pub created_at: Option<DateTime<Utc>>,
}

/// One entry of a result's cited-sources list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitedSource {
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub domain: Option<String>,
}

/// One scrape of an AI Overview for a prompt on a given date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverviewResult {
    pub id: Uuid,
    pub prompt_id: Uuid,
    pub provider: String,
    pub scraped_date: NaiveDate,
    pub scraped_at: Option<DateTime<Utc>>,
    /// Overview text. Results without text never produce matches.
    pub response_text: Option<String>,
    pub sources: Option<Vec<CitedSource>>,
    pub ahrefs_volume: Option<i32>,
    pub sentiment_label: Option<String>,
}

/// A cited page fetched separately, carrying its raw HTML when the scrape
/// succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcePage {
    pub url: String,
    pub domain: String,
    pub html: Option<String>,
    pub page_title: Option<String>,
    pub scraped_at: Option<DateTime<Utc>>,
    pub scrape_status: Option<String>,
}

/// A tracked coupon code detected in an AI Overview, tied to its keyword.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouponMatch {
    pub keyword: String,
    pub location: Option<String>,
    pub product: String,
    pub scraped_date: NaiveDate,
    /// Upper-cased coupon code.
    pub coupon_code: String,
    pub match_context: String,
    pub ai_overview_id: Uuid,
    /// Cited pages whose HTML also contains the code.
    #[serde(default)]
    pub source_urls_with_mentions: Vec<String>,
    /// `true` when no source HTML was available to check against.
    #[serde(default)]
    pub source_mention_unavailable: bool,
}

/// One (keyword, location, coupon) line of the weekly report.
///
/// When `coupon_detected` is `None` the keyword was surveyed but no tracked
/// coupon was seen: `is_valid_coupon`, `first_seen` and `last_seen` are
/// `None` and `mention_count` is zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyReportRow {
    pub keyword: String,
    pub location: Option<String>,
    pub product: String,
    pub has_ai_overview: bool,
    pub coupon_detected: Option<String>,
    pub is_valid_coupon: Option<bool>,
    pub first_seen: Option<NaiveDate>,
    pub last_seen: Option<NaiveDate>,
    pub mention_count: u32,
}

impl WeeklyReportRow {
    /// Row for a keyword that had overviews in the window but no coupon.
    #[must_use]
    pub fn without_coupon(
        keyword: String,
        location: Option<String>,
        product: String,
        has_ai_overview: bool,
    ) -> Self {
        Self {
            keyword,
            location,
            product,
            has_ai_overview,
            coupon_detected: None,
            is_valid_coupon: None,
            first_seen: None,
            last_seen: None,
            mention_count: 0,
        }
    }

    /// Location label used in human-facing output.
    #[must_use]
    pub fn location_label(&self) -> &str {
        self.location.as_deref().unwrap_or("Global")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cited_source_ignores_unknown_keys() {
        let source: CitedSource = serde_json::from_value(serde_json::json!({
            "url": "https://example.com/deal",
            "position": 3,
            "snippet": "ignored"
        }))
        .expect("cited source should deserialize");

        assert_eq!(source.url, "https://example.com/deal");
        assert!(source.title.is_none());
        assert!(source.domain.is_none());
    }

    #[test]
    fn row_without_coupon_has_null_coupon_fields() {
        let row = WeeklyReportRow::without_coupon(
            "nordpass pricing".to_string(),
            None,
            "nordpass".to_string(),
            true,
        );
        assert!(row.coupon_detected.is_none());
        assert!(row.is_valid_coupon.is_none());
        assert!(row.first_seen.is_none());
        assert!(row.last_seen.is_none());
        assert_eq!(row.mention_count, 0);
        assert_eq!(row.location_label(), "Global");
    }

    #[test]
    fn coupon_match_defaults_source_fields() {
        let m: CouponMatch = serde_json::from_value(serde_json::json!({
            "keyword": "nordvpn coupon",
            "location": "US",
            "product": "nordvpn",
            "scraped_date": "2026-01-02",
            "coupon_code": "SAVE10",
            "match_context": "Use SAVE10 today",
            "ai_overview_id": "6f9619ff-8b86-d011-b42d-00cf4fc964ff"
        }))
        .expect("coupon match should deserialize");

        assert!(m.source_urls_with_mentions.is_empty());
        assert!(!m.source_mention_unavailable);
    }
}
