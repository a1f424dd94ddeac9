//! Collaborator ports. The report core calls out through these; the database,
//! spreadsheet and chat crates implement them.

use std::collections::HashMap;

use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{CouponMatch, OverviewResult, Prompt, SourcePage, WeeklyReportRow};

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failure reported by a collaborator. The core never retries these.
#[derive(Debug, Error)]
#[error("{context}: {source}")]
pub struct PortError {
    pub context: String,
    #[source]
    pub source: BoxError,
}

impl PortError {
    pub fn new(context: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self {
            context: context.into(),
            source: source.into(),
        }
    }
}

/// Windowed read access to scraped AI Overview results.
#[async_trait::async_trait]
pub trait ResultsSource: Send + Sync {
    /// All results scraped within `[today - days, today]` for `provider`.
    ///
    /// `today` is supplied by the caller so the fetched range and any label
    /// derived from it agree. When `tags` is non-empty only prompts carrying
    /// every tag are returned. Ordering is unspecified.
    async fn get_results_last_n_days(
        &self,
        days: u32,
        today: NaiveDate,
        provider: &str,
        tags: &[String],
    ) -> Result<Vec<(Prompt, OverviewResult)>, PortError>;
}

/// Batched lookup of cited pages with their HTML.
#[async_trait::async_trait]
pub trait SourceFetcher: Send + Sync {
    /// Pages keyed by result id. Ids with no usable pages are absent.
    async fn get_sources_with_html(
        &self,
        result_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<SourcePage>>, PortError>;
}

/// Supplies the current list of tracked coupon codes.
#[async_trait::async_trait]
pub trait AllowListProvider: Send + Sync {
    async fn tracked_coupons(&self) -> Result<Vec<String>, PortError>;
}

/// Delivers report output. Transport failures collapse into `false`.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn send_weekly_report(
        &self,
        rows: &[WeeklyReportRow],
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> bool;

    async fn send_coupon_alert(&self, matches: &[CouponMatch]) -> bool;
}
