//! Block Kit rendering of the assembled report and alert payloads.

use cmt_core::CouponMatch;
use cmt_report::{CouponAlertPayload, CouponGroup, WeeklyReportPayload};

use crate::blocks::Block;

/// Fallback text and blocks for the weekly report.
#[must_use]
pub fn weekly_report_message(payload: &WeeklyReportPayload) -> (String, Vec<Block>) {
    let mut blocks = vec![
        Block::header("Weekly coupon mention report"),
        Block::context(format!(
            "Period: {} to {}",
            payload.start_date, payload.end_date
        )),
        Block::Divider,
        Block::section(format!(
            "*Summary*\n• Keywords analyzed: {}\n• Coupon mentions found: {}",
            payload.summary.keywords_analyzed, payload.summary.coupon_mentions
        )),
        Block::Divider,
    ];

    if !payload.untracked.is_empty() {
        blocks.push(Block::section("*Untracked coupons detected*"));
        blocks.extend(payload.untracked.iter().map(group_block));
    }

    if payload.has_coupon_mentions() {
        if !payload.untracked.is_empty() {
            blocks.push(Block::Divider);
        }
        blocks.push(Block::section("*Valid coupon mentions*"));
        blocks.extend(payload.valid.iter().map(group_block));
    }

    let text = format!(
        "Weekly coupon report: {} to {}",
        payload.start_date, payload.end_date
    );
    (text, blocks)
}

/// Fallback text and blocks for an untracked-coupon alert.
#[must_use]
pub fn coupon_alert_message(payload: &CouponAlertPayload) -> (String, Vec<Block>) {
    let mut blocks = vec![
        Block::header("Coupon mentions detected in AI Overviews"),
        Block::context(format!("Found {} coupon mention(s)", payload.total)),
        Block::Divider,
    ];

    for m in &payload.shown {
        blocks.push(Block::section(match_text(m)));
        blocks.push(Block::Divider);
    }

    if let Some(more) = payload.more_indicator() {
        blocks.push(Block::context(format!("_{more}_")));
    }

    let text = format!("Found {} coupon mentions in AI Overviews", payload.total);
    (text, blocks)
}

fn group_block(group: &CouponGroup) -> Block {
    let mut text = format!("*`{}`*", group.coupon_code);
    for entry in &group.entries {
        let line = format!(
            "\n• _{}_ ({}) {}",
            entry.keyword,
            entry.location_label(),
            entry.date_range
        );
        text.push_str(line.trim_end());
    }
    Block::section(text)
}

fn match_text(m: &CouponMatch) -> String {
    format!(
        "*Keyword:* `{}`\n*Location:* {}\n*Product:* {}\n*Coupon:* `{}`\n*Date:* {}\n*Context:* _{}_",
        m.keyword,
        m.location.as_deref().unwrap_or("Global"),
        m.product,
        m.coupon_code,
        m.scraped_date,
        m.match_context
    )
}
