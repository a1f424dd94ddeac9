//! Slack incoming-webhook notifier for coupon reports and alerts.

pub mod blocks;
pub mod client;
pub mod error;
pub mod render;

pub use blocks::{Block, Text, WebhookMessage};
pub use client::SlackNotifier;
pub use error::SlackError;
pub use render::{coupon_alert_message, weekly_report_message};
