//! Weekly aggregation of coupon mentions per keyword and location.

use std::collections::{BTreeMap, HashMap};

use chrono::{Days, NaiveDate, Utc};
use cmt_core::{
    CouponMatch, Notifier, OverviewResult, Prompt, ResultsSource, SourceFetcher, SourcePage,
    WeeklyReportRow, UNTRACKED_PATTERN_CONTEXT,
};
use uuid::Uuid;

use crate::error::ReportError;
use crate::matcher::CouponMatcher;

pub const DEFAULT_PROVIDER: &str = "google_ai_overview";

/// Inclusive date range `[end - days, end]` a report covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportWindow {
    pub days: u32,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl ReportWindow {
    #[must_use]
    pub fn last_n_days(days: u32, today: NaiveDate) -> Self {
        let start = today
            .checked_sub_days(Days::new(u64::from(days)))
            .unwrap_or(NaiveDate::MIN);
        Self {
            days,
            start,
            end: today,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct CouponStats {
    count: u32,
    first_seen: NaiveDate,
    last_seen: NaiveDate,
}

impl CouponStats {
    fn new(date: NaiveDate) -> Self {
        Self {
            count: 0,
            first_seen: date,
            last_seen: date,
        }
    }

    fn record(&mut self, date: NaiveDate) {
        self.count += 1;
        self.first_seen = self.first_seen.min(date);
        self.last_seen = self.last_seen.max(date);
    }
}

#[derive(Debug)]
struct Bucket {
    product: String,
    has_ai_overview: bool,
    coupons: BTreeMap<String, CouponStats>,
}

/// Fold (prompt, result) pairs into report rows.
///
/// Returns the rows and every individual match in input order. When
/// `sources_by_result` is `Some`, each result is cross-referenced against its
/// entry; results missing from the map are treated as having no sources.
///
/// Rows come out ordered by keyword, then location with `None` first, then
/// coupon code, with a bucket's null-coupon row (emitted only when it has no
/// matches) last. Both maps below are ordered, so the output order follows
/// from the keys alone.
#[must_use]
pub fn aggregate(
    matcher: &CouponMatcher,
    pairs: &[(Prompt, OverviewResult)],
    sources_by_result: Option<&HashMap<Uuid, Vec<SourcePage>>>,
) -> (Vec<WeeklyReportRow>, Vec<CouponMatch>) {
    let mut buckets: BTreeMap<(String, Option<String>), Bucket> = BTreeMap::new();
    let mut all_matches = Vec::new();

    for (prompt, result) in pairs {
        let bucket = buckets
            .entry((prompt.prompt_text.clone(), prompt.location.clone()))
            .or_insert_with(|| Bucket {
                product: prompt.primary_product.clone(),
                has_ai_overview: false,
                coupons: BTreeMap::new(),
            });
        bucket.has_ai_overview = true;

        let sources = sources_by_result
            .and_then(|by_id| by_id.get(&result.id))
            .map(Vec::as_slice);

        for m in matcher.analyze_result(prompt, result, sources) {
            bucket
                .coupons
                .entry(m.coupon_code.clone())
                .or_insert_with(|| CouponStats::new(m.scraped_date))
                .record(m.scraped_date);
            all_matches.push(m);
        }
    }

    let mut rows = Vec::new();
    for ((keyword, location), bucket) in buckets {
        if bucket.coupons.is_empty() {
            rows.push(WeeklyReportRow::without_coupon(
                keyword,
                location,
                bucket.product,
                bucket.has_ai_overview,
            ));
            continue;
        }

        for (code, stats) in bucket.coupons {
            rows.push(WeeklyReportRow {
                keyword: keyword.clone(),
                location: location.clone(),
                product: bucket.product.clone(),
                has_ai_overview: bucket.has_ai_overview,
                is_valid_coupon: Some(matcher.is_valid_coupon(&code)),
                coupon_detected: Some(code),
                first_seen: Some(stats.first_seen),
                last_seen: Some(stats.last_seen),
                mention_count: stats.count,
            });
        }
    }

    (rows, all_matches)
}

/// Run the loose code detector over every result with text and keep the hits
/// that are not tracked.
#[must_use]
pub fn detect_untracked(
    matcher: &CouponMatcher,
    pairs: &[(Prompt, OverviewResult)],
) -> Vec<CouponMatch> {
    let mut alerts = Vec::new();
    for (prompt, result) in pairs {
        let Some(text) = result.response_text.as_deref().filter(|t| !t.is_empty()) else {
            continue;
        };

        for code in matcher.find_any_coupon_pattern(text) {
            if matcher.is_valid_coupon(&code) {
                continue;
            }
            alerts.push(CouponMatch {
                keyword: prompt.prompt_text.clone(),
                location: prompt.location.clone(),
                product: prompt.primary_product.clone(),
                scraped_date: result.scraped_date,
                coupon_code: code,
                match_context: UNTRACKED_PATTERN_CONTEXT.to_string(),
                ai_overview_id: result.id,
                source_urls_with_mentions: Vec::new(),
                source_mention_unavailable: true,
            });
        }
    }
    alerts
}

/// Builds weekly reports from a results source, optionally confirming
/// mentions against cited pages.
pub struct WeeklyReportGenerator<'a> {
    matcher: &'a CouponMatcher,
    results: &'a dyn ResultsSource,
    sources: Option<&'a dyn SourceFetcher>,
    provider: String,
    today: Option<NaiveDate>,
}

impl<'a> WeeklyReportGenerator<'a> {
    #[must_use]
    pub fn new(matcher: &'a CouponMatcher, results: &'a dyn ResultsSource) -> Self {
        Self {
            matcher,
            results,
            sources: None,
            provider: DEFAULT_PROVIDER.to_string(),
            today: None,
        }
    }

    /// Cross-reference matches against cited pages fetched from `sources`.
    #[must_use]
    pub fn with_source_fetcher(mut self, sources: &'a dyn SourceFetcher) -> Self {
        self.sources = Some(sources);
        self
    }

    #[must_use]
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = provider.into();
        self
    }

    /// Pin the report date used for both the fetch and the notifier window.
    /// Defaults to the current UTC date, read once per run.
    #[must_use]
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    /// Window a report over `days` covers, ending today.
    #[must_use]
    pub fn window(&self, days: u32) -> ReportWindow {
        let today = self.today.unwrap_or_else(|| Utc::now().date_naive());
        ReportWindow::last_n_days(days, today)
    }

    async fn fetch_results(
        &self,
        window: ReportWindow,
        tags: &[String],
    ) -> Result<Vec<(Prompt, OverviewResult)>, ReportError> {
        self.results
            .get_results_last_n_days(window.days, window.end, &self.provider, tags)
            .await
            .map_err(ReportError::Results)
    }

    /// Rows for the last `days` days plus every individual match.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError`] if fetching results or sources fails. No partial
    /// report is produced.
    pub async fn generate_report(
        &self,
        days: u32,
        tags: &[String],
    ) -> Result<(Vec<WeeklyReportRow>, Vec<CouponMatch>), ReportError> {
        self.generate_report_for(self.window(days), tags).await
    }

    /// Rows and matches for an already computed `window`. Callers that label
    /// the output with the window use this so both come from one date.
    ///
    /// # Errors
    ///
    /// See [`WeeklyReportGenerator::generate_report`].
    #[tracing::instrument(
        skip(self, tags),
        fields(provider = %self.provider, start = %window.start, end = %window.end)
    )]
    pub async fn generate_report_for(
        &self,
        window: ReportWindow,
        tags: &[String],
    ) -> Result<(Vec<WeeklyReportRow>, Vec<CouponMatch>), ReportError> {
        let days = window.days;
        let pairs = self.fetch_results(window, tags).await?;
        tracing::debug!(results = pairs.len(), "fetched overview results");

        let sources_by_result = match self.sources {
            Some(fetcher) if !pairs.is_empty() => {
                let ids: Vec<Uuid> = pairs.iter().map(|(_, r)| r.id).collect();
                let by_id = fetcher
                    .get_sources_with_html(&ids)
                    .await
                    .map_err(ReportError::Sources)?;
                tracing::debug!(results_with_sources = by_id.len(), "fetched source pages");
                Some(by_id)
            }
            _ => None,
        };

        let (rows, matches) = aggregate(self.matcher, &pairs, sources_by_result.as_ref());
        tracing::info!(
            days,
            rows = rows.len(),
            matches = matches.len(),
            "report generated"
        );
        Ok((rows, matches))
    }

    /// Untracked code-shaped strings seen in the last `days` days.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Results`] if fetching results fails.
    #[tracing::instrument(skip(self, tags), fields(provider = %self.provider))]
    pub async fn get_invalid_coupon_alerts(
        &self,
        days: u32,
        tags: &[String],
    ) -> Result<Vec<CouponMatch>, ReportError> {
        let pairs = self.fetch_results(self.window(days), tags).await?;
        let alerts = detect_untracked(self.matcher, &pairs);
        tracing::info!(days, alerts = alerts.len(), "untracked coupon scan finished");
        Ok(alerts)
    }

    /// Generate the report and hand it to `notifier`.
    ///
    /// Returns the notifier's delivery result.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError`] if the report cannot be generated.
    pub async fn run_and_send(
        &self,
        days: u32,
        tags: &[String],
        notifier: &dyn Notifier,
    ) -> Result<bool, ReportError> {
        let window = self.window(days);
        let (rows, _) = self.generate_report_for(window, tags).await?;
        Ok(notifier
            .send_weekly_report(&rows, window.start, window.end)
            .await)
    }
}

#[cfg(test)]
#[path = "aggregator_test.rs"]
mod tests;
