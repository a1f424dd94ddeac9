//! Repositories over an injected [`ConnectionSource`].

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Days, NaiveDate};
use cmt_core::{
    OverviewResult, PortError, Prompt, ResultsSource, SourceFetcher, SourcePage,
};
use uuid::Uuid;

use crate::ai_overviews::{self, PromptFilter};
use crate::connection::ConnectionSource;
use crate::tracking_history::{self, TrackingRecord};
use crate::DbError;

/// Read access to scraped AI Overviews.
#[derive(Clone)]
pub struct AiOverviewRepository {
    source: Arc<dyn ConnectionSource>,
}

impl AiOverviewRepository {
    #[must_use]
    pub fn new(source: Arc<dyn ConnectionSource>) -> Self {
        Self { source }
    }

    /// # Errors
    ///
    /// Returns [`DbError`] if no connection is available or the query fails.
    pub async fn prompts(&self, filter: &PromptFilter) -> Result<Vec<Prompt>, DbError> {
        let mut conn = self.source.acquire().await?;
        ai_overviews::get_prompts(&mut conn, filter).await
    }

    /// # Errors
    ///
    /// Returns [`DbError`] if no connection is available or the query fails.
    pub async fn results_for_period(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        provider: &str,
        tags: &[String],
    ) -> Result<Vec<(Prompt, OverviewResult)>, DbError> {
        let mut conn = self.source.acquire().await?;
        ai_overviews::get_results_for_period(&mut conn, start, end, provider, tags).await
    }

    /// # Errors
    ///
    /// Returns [`DbError`] if no connection is available or the query fails.
    pub async fn sources_with_html(
        &self,
        result_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<SourcePage>>, DbError> {
        let mut conn = self.source.acquire().await?;
        ai_overviews::get_sources_with_html(&mut conn, result_ids).await
    }

    pub async fn close(&self) {
        self.source.close().await;
    }
}

#[async_trait::async_trait]
impl ResultsSource for AiOverviewRepository {
    async fn get_results_last_n_days(
        &self,
        days: u32,
        today: NaiveDate,
        provider: &str,
        tags: &[String],
    ) -> Result<Vec<(Prompt, OverviewResult)>, PortError> {
        let start = today
            .checked_sub_days(Days::new(u64::from(days)))
            .unwrap_or(NaiveDate::MIN);
        tracing::debug!(%start, end = %today, provider, "querying overview results");

        self.results_for_period(start, today, provider, tags)
            .await
            .map_err(|e| PortError::new("ai overview results", e))
    }
}

#[async_trait::async_trait]
impl SourceFetcher for AiOverviewRepository {
    async fn get_sources_with_html(
        &self,
        result_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<SourcePage>>, PortError> {
        self.sources_with_html(result_ids)
            .await
            .map_err(|e| PortError::new("ai overview sources", e))
    }
}

/// Writes to the dashboard tracking table.
#[derive(Clone)]
pub struct TrackingHistoryRepository {
    source: Arc<dyn ConnectionSource>,
}

impl TrackingHistoryRepository {
    #[must_use]
    pub fn new(source: Arc<dyn ConnectionSource>) -> Self {
        Self { source }
    }

    /// # Errors
    ///
    /// Returns [`DbError`] if no connection is available or the upsert fails.
    pub async fn save(&self, record: &TrackingRecord) -> Result<(), DbError> {
        let mut conn = self.source.acquire().await?;
        tracking_history::upsert_tracking_record(&mut conn, record).await
    }

    /// # Errors
    ///
    /// Returns [`DbError`] if no connection is available or the batch fails.
    pub async fn save_batch(&self, records: &[TrackingRecord]) -> Result<usize, DbError> {
        let mut conn = self.source.acquire().await?;
        tracking_history::save_tracking_batch(&mut conn, records).await
    }
}
