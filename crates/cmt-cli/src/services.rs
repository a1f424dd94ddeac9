//! Collaborators shared by the subcommands, built from [`AppConfig`].

use cmt_core::{AllowListProvider, AppConfig, FileAllowList};
use cmt_report::CouponMatcher;
use cmt_sheets::SheetsAllowList;
use cmt_slack::SlackNotifier;

/// Spreadsheet allow-list when one is configured, the YAML file otherwise.
pub(crate) fn allow_list(config: &AppConfig) -> anyhow::Result<Box<dyn AllowListProvider>> {
    match &config.sheets {
        Some(sheets) => {
            tracing::debug!(
                spreadsheet_id = %sheets.spreadsheet_id,
                gid = sheets.coupon_gid,
                "using Google Sheets allow-list"
            );
            Ok(Box::new(SheetsAllowList::from_config(
                sheets,
                config.http_timeout_secs,
                config.http_max_retries,
                config.http_retry_backoff_base_ms,
            )?))
        }
        None => {
            tracing::debug!(path = %config.coupons_path.display(), "using file allow-list");
            Ok(Box::new(FileAllowList::new(&config.coupons_path)))
        }
    }
}

/// Matcher over the current allow-list.
pub(crate) async fn load_matcher(config: &AppConfig) -> anyhow::Result<CouponMatcher> {
    let coupons = allow_list(config)?.tracked_coupons().await?;
    if coupons.is_empty() {
        tracing::warn!("allow-list is empty; every detected code will be reported as untracked");
    }
    let matcher = CouponMatcher::with_context_chars(&coupons, config.match_context_chars);
    tracing::info!(coupons = matcher.len(), "loaded tracked coupons");
    Ok(matcher)
}

pub(crate) fn notifier(config: &AppConfig) -> anyhow::Result<SlackNotifier> {
    let webhook_url = config
        .slack_webhook_url
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("SLACK_WEBHOOK_URL is required to send to Slack"))?;
    Ok(SlackNotifier::new(
        webhook_url,
        Some(config.slack_channel.as_str()),
        config.http_timeout_secs,
    )?)
}

/// Tags from the command line, or the configured defaults.
pub(crate) fn effective_tags<'a>(cli_tags: &'a [String], config: &'a AppConfig) -> &'a [String] {
    if cli_tags.is_empty() {
        &config.report_tags
    } else {
        cli_tags
    }
}
