//! Presentation-neutral report and alert payloads.
//!
//! Notifiers render these; all grouping, ordering and truncation happens here
//! so every transport shows the same content.

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;
use cmt_core::{CouponMatch, WeeklyReportRow};
use serde::Serialize;

/// Matches shown in full in one alert.
pub const MAX_ALERT_ITEMS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    /// Distinct (keyword, location) pairs that had an AI Overview.
    pub keywords_analyzed: usize,
    /// Rows carrying a detected coupon.
    pub coupon_mentions: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CouponGroupEntry {
    pub keyword: String,
    pub location: Option<String>,
    /// `(d)`, `(d1 to d2)` or empty.
    pub date_range: String,
}

impl CouponGroupEntry {
    #[must_use]
    pub fn location_label(&self) -> &str {
        self.location.as_deref().unwrap_or("Global")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CouponGroup {
    pub coupon_code: String,
    pub entries: Vec<CouponGroupEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeeklyReportPayload {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub summary: ReportSummary,
    /// Groups for coupons seen in overviews but not on the allow-list.
    pub untracked: Vec<CouponGroup>,
    /// Groups for tracked coupons.
    pub valid: Vec<CouponGroup>,
}

impl WeeklyReportPayload {
    #[must_use]
    pub fn has_coupon_mentions(&self) -> bool {
        self.summary.coupon_mentions > 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CouponAlertPayload {
    pub total: usize,
    pub shown: Vec<CouponMatch>,
    pub hidden: usize,
}

impl CouponAlertPayload {
    /// `...and N more` when matches were cut.
    #[must_use]
    pub fn more_indicator(&self) -> Option<String> {
        (self.hidden > 0).then(|| format!("...and {} more", self.hidden))
    }
}

/// Display form of a coupon's first/last sighting.
#[must_use]
pub fn format_date_range(first_seen: Option<NaiveDate>, last_seen: Option<NaiveDate>) -> String {
    match (first_seen, last_seen) {
        (Some(first), Some(last)) if first != last => format!("({first} to {last})"),
        (Some(day), _) | (None, Some(day)) => format!("({day})"),
        (None, None) => String::new(),
    }
}

#[must_use]
pub fn build_weekly_report(
    rows: &[WeeklyReportRow],
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> WeeklyReportPayload {
    let keywords_analyzed = rows
        .iter()
        .filter(|r| r.has_ai_overview)
        .map(|r| (r.keyword.as_str(), r.location.as_deref()))
        .collect::<HashSet<_>>()
        .len();
    let coupon_mentions = rows.iter().filter(|r| r.coupon_detected.is_some()).count();

    WeeklyReportPayload {
        start_date,
        end_date,
        summary: ReportSummary {
            keywords_analyzed,
            coupon_mentions,
        },
        untracked: group_by_coupon(rows.iter().filter(|r| r.is_valid_coupon == Some(false))),
        valid: group_by_coupon(rows.iter().filter(|r| r.is_valid_coupon == Some(true))),
    }
}

/// `None` when there is nothing to alert on.
#[must_use]
pub fn build_coupon_alert(matches: &[CouponMatch]) -> Option<CouponAlertPayload> {
    if matches.is_empty() {
        return None;
    }
    let shown = matches.iter().take(MAX_ALERT_ITEMS).cloned().collect::<Vec<_>>();
    Some(CouponAlertPayload {
        total: matches.len(),
        hidden: matches.len() - shown.len(),
        shown,
    })
}

fn group_by_coupon<'a>(rows: impl Iterator<Item = &'a WeeklyReportRow>) -> Vec<CouponGroup> {
    let mut grouped: BTreeMap<(String, String), Vec<&WeeklyReportRow>> = BTreeMap::new();
    for row in rows {
        let Some(code) = row.coupon_detected.as_deref() else {
            continue;
        };
        grouped
            .entry((code.to_lowercase(), code.to_string()))
            .or_default()
            .push(row);
    }

    grouped
        .into_iter()
        .map(|((_, coupon_code), mut rows)| {
            rows.sort_by_cached_key(|r| {
                let location = r.location.as_deref().unwrap_or("");
                (
                    r.keyword.to_lowercase(),
                    location.to_lowercase(),
                    r.keyword.clone(),
                    location.to_string(),
                )
            });
            CouponGroup {
                coupon_code,
                entries: rows
                    .into_iter()
                    .map(|r| CouponGroupEntry {
                        keyword: r.keyword.clone(),
                        location: r.location.clone(),
                        date_range: format_date_range(r.first_seen, r.last_seen),
                    })
                    .collect(),
            }
        })
        .collect()
}
