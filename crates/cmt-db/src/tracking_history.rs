//! Writes to `looker.coupon_tracking_history`, one row per keyword, location
//! and scrape date.

use chrono::NaiveDate;
use cmt_core::{CouponMatch, WeeklyReportRow};
use sqlx::{Connection, PgConnection};
use uuid::Uuid;

use crate::DbError;

/// One dashboard row. Upserts replace everything except the key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackingRecord {
    pub keyword: String,
    pub location: Option<String>,
    pub primary_product: Option<String>,
    pub has_ai_overview: bool,
    pub ai_overview_result_id: Option<Uuid>,
    pub tracked_coupon_present: bool,
    pub detected_coupon_code: Option<String>,
    pub is_valid_coupon: Option<bool>,
    pub match_context: Option<String>,
    pub scraped_date: NaiveDate,
    pub source_mention_count: i32,
    pub source_urls_with_mentions: Vec<String>,
    pub source_mention_unavailable: bool,
}

impl TrackingRecord {
    #[must_use]
    pub fn from_match(m: &CouponMatch, is_valid_coupon: Option<bool>) -> Self {
        Self {
            keyword: m.keyword.clone(),
            location: m.location.clone(),
            primary_product: Some(m.product.clone()),
            has_ai_overview: true,
            ai_overview_result_id: Some(m.ai_overview_id),
            tracked_coupon_present: is_valid_coupon == Some(true),
            detected_coupon_code: Some(m.coupon_code.clone()),
            is_valid_coupon,
            match_context: Some(m.match_context.clone()),
            scraped_date: m.scraped_date,
            source_mention_count: i32::try_from(m.source_urls_with_mentions.len())
                .unwrap_or(i32::MAX),
            source_urls_with_mentions: m.source_urls_with_mentions.clone(),
            source_mention_unavailable: m.source_mention_unavailable,
        }
    }

    #[must_use]
    pub fn without_coupon(row: &WeeklyReportRow, scraped_date: NaiveDate) -> Self {
        Self {
            keyword: row.keyword.clone(),
            location: row.location.clone(),
            primary_product: Some(row.product.clone()),
            has_ai_overview: row.has_ai_overview,
            ai_overview_result_id: None,
            tracked_coupon_present: false,
            detected_coupon_code: None,
            is_valid_coupon: None,
            match_context: None,
            scraped_date,
            source_mention_count: 0,
            source_urls_with_mentions: Vec::new(),
            source_mention_unavailable: false,
        }
    }

    fn key(&self) -> (&str, Option<&str>, NaiveDate) {
        (&self.keyword, self.location.as_deref(), self.scraped_date)
    }
}

/// Records for one report run.
///
/// Each match becomes a record dated by its scrape, taking validity from the
/// report row for the same coupon. Keyword buckets without a coupon become a
/// record dated `report_date`. Only the first record per (keyword, location,
/// date) is kept.
#[must_use]
pub fn tracking_records(
    rows: &[WeeklyReportRow],
    matches: &[CouponMatch],
    report_date: NaiveDate,
) -> Vec<TrackingRecord> {
    let validity = |m: &CouponMatch| {
        rows.iter()
            .find(|r| {
                r.keyword == m.keyword
                    && r.location == m.location
                    && r.coupon_detected.as_deref() == Some(m.coupon_code.as_str())
            })
            .map_or(Some(true), |r| r.is_valid_coupon)
    };

    let candidates = matches
        .iter()
        .map(|m| TrackingRecord::from_match(m, validity(m)))
        .chain(
            rows.iter()
                .filter(|r| r.coupon_detected.is_none())
                .map(|r| TrackingRecord::without_coupon(r, report_date)),
        );

    let mut records: Vec<TrackingRecord> = Vec::new();
    for record in candidates {
        let duplicate = records.iter().any(|seen| seen.key() == record.key());
        if !duplicate {
            records.push(record);
        }
    }
    records
}

/// Insert or update one record keyed on (keyword, location, scraped date).
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the statement fails.
pub async fn upsert_tracking_record(
    conn: &mut PgConnection,
    record: &TrackingRecord,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO looker.coupon_tracking_history \
             (keyword, location, primary_product, has_ai_overview, ai_overview_result_id, \
              tracked_coupon_present, detected_coupon_code, is_valid_coupon, match_context, \
              scraped_date, source_mention_count, source_urls_with_mentions, \
              source_mention_unavailable) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
         ON CONFLICT (keyword, location, scraped_date) DO UPDATE SET \
             primary_product = EXCLUDED.primary_product, \
             has_ai_overview = EXCLUDED.has_ai_overview, \
             ai_overview_result_id = EXCLUDED.ai_overview_result_id, \
             tracked_coupon_present = EXCLUDED.tracked_coupon_present, \
             detected_coupon_code = EXCLUDED.detected_coupon_code, \
             is_valid_coupon = EXCLUDED.is_valid_coupon, \
             match_context = EXCLUDED.match_context, \
             source_mention_count = EXCLUDED.source_mention_count, \
             source_urls_with_mentions = EXCLUDED.source_urls_with_mentions, \
             source_mention_unavailable = EXCLUDED.source_mention_unavailable",
    )
    .bind(&record.keyword)
    .bind(record.location.as_deref())
    .bind(record.primary_product.as_deref())
    .bind(record.has_ai_overview)
    .bind(record.ai_overview_result_id)
    .bind(record.tracked_coupon_present)
    .bind(record.detected_coupon_code.as_deref())
    .bind(record.is_valid_coupon)
    .bind(record.match_context.as_deref())
    .bind(record.scraped_date)
    .bind(record.source_mention_count)
    .bind(&record.source_urls_with_mentions)
    .bind(record.source_mention_unavailable)
    .execute(conn)
    .await?;

    Ok(())
}

/// Upsert `records` in one transaction and return how many were written.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any statement fails; nothing is written then.
pub async fn save_tracking_batch(
    conn: &mut PgConnection,
    records: &[TrackingRecord],
) -> Result<usize, DbError> {
    if records.is_empty() {
        return Ok(0);
    }

    let mut tx = conn.begin().await?;
    for record in records {
        upsert_tracking_record(&mut tx, record).await?;
    }
    tx.commit().await?;

    tracing::info!(records = records.len(), "saved tracking history");
    Ok(records.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, day).unwrap()
    }

    fn coupon_match(keyword: &str, code: &str, day: u32, urls: &[&str]) -> CouponMatch {
        CouponMatch {
            keyword: keyword.to_string(),
            location: Some("US".to_string()),
            product: "nordvpn".to_string(),
            scraped_date: date(day),
            coupon_code: code.to_string(),
            match_context: format!("Use {code} today"),
            ai_overview_id: Uuid::new_v4(),
            source_urls_with_mentions: urls.iter().map(ToString::to_string).collect(),
            source_mention_unavailable: urls.is_empty(),
        }
    }

    fn row(keyword: &str, coupon: Option<&str>, valid: Option<bool>) -> WeeklyReportRow {
        WeeklyReportRow {
            keyword: keyword.to_string(),
            location: Some("US".to_string()),
            product: "nordvpn".to_string(),
            has_ai_overview: true,
            coupon_detected: coupon.map(str::to_string),
            is_valid_coupon: valid,
            first_seen: None,
            last_seen: None,
            mention_count: 0,
        }
    }

    #[test]
    fn match_record_carries_source_details() {
        let m = coupon_match("nordvpn coupon", "SAVE10", 2, &["https://a.example"]);
        let record = TrackingRecord::from_match(&m, Some(true));

        assert!(record.tracked_coupon_present);
        assert_eq!(record.detected_coupon_code.as_deref(), Some("SAVE10"));
        assert_eq!(record.source_mention_count, 1);
        assert_eq!(record.ai_overview_result_id, Some(m.ai_overview_id));
        assert!(!record.source_mention_unavailable);
    }

    #[test]
    fn records_cover_matches_and_coupon_free_keywords() {
        let rows = vec![
            row("nordvpn coupon", Some("SAVE10"), Some(true)),
            row("nordpass pricing", None, None),
        ];
        let matches = vec![coupon_match("nordvpn coupon", "SAVE10", 1, &[])];

        let records = tracking_records(&rows, &matches, date(8));

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].keyword, "nordvpn coupon");
        assert_eq!(records[0].scraped_date, date(1));
        assert_eq!(records[0].is_valid_coupon, Some(true));
        assert_eq!(records[1].keyword, "nordpass pricing");
        assert_eq!(records[1].scraped_date, date(8));
        assert!(records[1].detected_coupon_code.is_none());
        assert!(!records[1].tracked_coupon_present);
    }

    #[test]
    fn first_match_per_day_wins() {
        let rows = vec![
            row("nordvpn coupon", Some("NEW20"), Some(true)),
            row("nordvpn coupon", Some("SAVE10"), Some(true)),
        ];
        let matches = vec![
            coupon_match("nordvpn coupon", "SAVE10", 1, &[]),
            coupon_match("nordvpn coupon", "NEW20", 1, &[]),
            coupon_match("nordvpn coupon", "NEW20", 2, &[]),
        ];

        let records = tracking_records(&rows, &matches, date(8));

        let codes: Vec<_> = records
            .iter()
            .map(|r| (r.detected_coupon_code.as_deref(), r.scraped_date))
            .collect();
        assert_eq!(codes, [(Some("SAVE10"), date(1)), (Some("NEW20"), date(2))]);
    }

    #[test]
    fn validity_comes_from_report_row() {
        let rows = vec![row("nordvpn coupon", Some("OLD5"), Some(false))];
        let matches = vec![coupon_match("nordvpn coupon", "OLD5", 1, &[])];

        let records = tracking_records(&rows, &matches, date(8));
        assert_eq!(records[0].is_valid_coupon, Some(false));
        assert!(!records[0].tracked_coupon_present);
    }
}
