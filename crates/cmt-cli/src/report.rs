use std::sync::Arc;

use cmt_core::{AppConfig, Notifier};
use cmt_db::{tracking_records, AiOverviewRepository, TrackingHistoryRepository};
use cmt_report::WeeklyReportGenerator;

use crate::services;

#[derive(Debug, Clone)]
pub(crate) struct ReportOptions {
    pub days: Option<u32>,
    pub tags: Vec<String>,
    pub send_to_slack: bool,
    pub persist: bool,
    pub with_sources: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            days: None,
            tags: Vec::new(),
            send_to_slack: true,
            persist: false,
            with_sources: false,
        }
    }
}

/// Generate the weekly report, then persist and deliver it as requested.
///
/// Fails when the report cannot be generated, persisted or delivered.
pub(crate) async fn run_report(config: &AppConfig, options: &ReportOptions) -> anyhow::Result<()> {
    let days = options.days.unwrap_or(config.report_lookback_days);
    let tags = services::effective_tags(&options.tags, config);
    tracing::info!(days, tags = ?tags, "generating coupon mention report");

    let matcher = services::load_matcher(config).await?;
    let source = cmt_db::connect_source(config).await?;
    let repository = AiOverviewRepository::new(Arc::clone(&source));

    let mut generator =
        WeeklyReportGenerator::new(&matcher, &repository).with_provider(&config.report_provider);
    if options.with_sources {
        generator = generator.with_source_fetcher(&repository);
    }

    let outcome = async {
        let window = generator.window(days);
        let (rows, matches) = generator.generate_report_for(window, tags).await?;

        let with_overview = rows.iter().filter(|r| r.has_ai_overview).count();
        tracing::info!(
            rows = rows.len(),
            with_ai_overview = with_overview,
            matches = matches.len(),
            "report generated"
        );

        let invalid: Vec<_> = rows
            .iter()
            .filter(|r| r.is_valid_coupon == Some(false))
            .collect();
        if !invalid.is_empty() {
            tracing::warn!(count = invalid.len(), "found untracked coupon codes");
            for row in &invalid {
                tracing::warn!(
                    coupon = row.coupon_detected.as_deref().unwrap_or_default(),
                    keyword = %row.keyword,
                    location = row.location_label(),
                    "untracked coupon in overview"
                );
            }
        }

        if options.persist {
            let records = tracking_records(&rows, &matches, window.end);
            let written = TrackingHistoryRepository::new(Arc::clone(&source))
                .save_batch(&records)
                .await?;
            tracing::info!(records = written, "tracking history updated");
        }

        if options.send_to_slack {
            let notifier = services::notifier(config)?;
            if !notifier
                .send_weekly_report(&rows, window.start, window.end)
                .await
            {
                anyhow::bail!("failed to deliver weekly report to Slack");
            }
        } else {
            tracing::info!("Slack delivery skipped");
        }

        anyhow::Ok(())
    }
    .await;

    repository.close().await;
    outcome
}
