use cmt_core::{AppConfig, Notifier};
use cmt_db::AiOverviewRepository;
use cmt_report::WeeklyReportGenerator;

use crate::services;

#[derive(Debug, Clone)]
pub(crate) struct AlertOptions {
    pub days: Option<u32>,
    pub tags: Vec<String>,
    pub send_to_slack: bool,
}

/// Scan the window for code-shaped strings missing from the allow-list and
/// alert on them.
pub(crate) async fn run_alerts(config: &AppConfig, options: &AlertOptions) -> anyhow::Result<()> {
    let days = options.days.unwrap_or(config.report_lookback_days);
    let tags = services::effective_tags(&options.tags, config);
    tracing::info!(days, tags = ?tags, "scanning for untracked coupon codes");

    let matcher = services::load_matcher(config).await?;
    let repository = AiOverviewRepository::new(cmt_db::connect_source(config).await?);
    let generator =
        WeeklyReportGenerator::new(&matcher, &repository).with_provider(&config.report_provider);

    let outcome = async {
        let alerts = generator.get_invalid_coupon_alerts(days, tags).await?;
        for alert in &alerts {
            tracing::warn!(
                coupon = %alert.coupon_code,
                keyword = %alert.keyword,
                date = %alert.scraped_date,
                "untracked coupon pattern"
            );
        }

        if options.send_to_slack {
            if !services::notifier(config)?.send_coupon_alert(&alerts).await {
                anyhow::bail!("failed to deliver coupon alert to Slack");
            }
        } else {
            tracing::info!(alerts = alerts.len(), "Slack delivery skipped");
        }
        anyhow::Ok(())
    }
    .await;

    repository.close().await;
    outcome
}
