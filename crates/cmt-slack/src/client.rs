//! Incoming-webhook delivery.

use std::time::Duration;

use chrono::NaiveDate;
use cmt_core::{CouponMatch, Notifier, WeeklyReportRow};
use cmt_report::{build_coupon_alert, build_weekly_report};
use reqwest::{Client, StatusCode};

use crate::blocks::{Block, WebhookMessage};
use crate::error::SlackError;
use crate::render::{coupon_alert_message, weekly_report_message};

/// Posts Block Kit messages to one Slack incoming webhook.
pub struct SlackNotifier {
    client: Client,
    webhook_url: String,
    channel: Option<String>,
}

impl SlackNotifier {
    /// # Errors
    ///
    /// Returns [`SlackError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        webhook_url: &str,
        channel: Option<&str>,
        timeout_secs: u64,
    ) -> Result<Self, SlackError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("coupon-mention-tracker/0.1")
            .build()?;

        Ok(Self {
            client,
            webhook_url: webhook_url.to_owned(),
            channel: channel.filter(|c| !c.is_empty()).map(str::to_owned),
        })
    }

    /// Post one message.
    ///
    /// # Errors
    ///
    /// Returns [`SlackError::Http`] on transport failure and
    /// [`SlackError::Rejected`] unless Slack answers `200 ok`.
    pub async fn send_message(&self, text: &str, blocks: Vec<Block>) -> Result<(), SlackError> {
        let message = WebhookMessage {
            text: text.to_owned(),
            blocks,
            channel: self.channel.clone(),
        };

        let response = self
            .client
            .post(&self.webhook_url)
            .json(&message)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;

        if status != StatusCode::OK || body.trim() != "ok" {
            return Err(SlackError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl Notifier for SlackNotifier {
    async fn send_weekly_report(
        &self,
        rows: &[WeeklyReportRow],
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> bool {
        let payload = build_weekly_report(rows, start_date, end_date);
        let (text, blocks) = weekly_report_message(&payload);

        match self.send_message(&text, blocks).await {
            Ok(()) => {
                tracing::info!(
                    rows = rows.len(),
                    %start_date,
                    %end_date,
                    "weekly report sent to Slack"
                );
                true
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to send weekly report to Slack");
                false
            }
        }
    }

    async fn send_coupon_alert(&self, matches: &[CouponMatch]) -> bool {
        let Some(payload) = build_coupon_alert(matches) else {
            tracing::debug!("no coupon matches, skipping alert");
            return true;
        };
        let (text, blocks) = coupon_alert_message(&payload);

        match self.send_message(&text, blocks).await {
            Ok(()) => {
                tracing::info!(matches = payload.total, "coupon alert sent to Slack");
                true
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to send coupon alert to Slack");
                false
            }
        }
    }
}
