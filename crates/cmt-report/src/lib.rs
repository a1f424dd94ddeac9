//! Coupon detection, weekly aggregation and report assembly.
//!
//! Everything here is pure except [`WeeklyReportGenerator`], which awaits the
//! collaborator ports from `cmt-core` and never retries them.

pub mod aggregator;
pub mod assembler;
pub mod cross_ref;
pub mod error;
pub mod matcher;

pub use aggregator::{
    aggregate, detect_untracked, ReportWindow, WeeklyReportGenerator, DEFAULT_PROVIDER,
};
pub use assembler::{
    build_coupon_alert, build_weekly_report, format_date_range, CouponAlertPayload, CouponGroup,
    CouponGroupEntry, ReportSummary, WeeklyReportPayload, MAX_ALERT_ITEMS,
};
pub use cross_ref::find_in_sources;
pub use error::ReportError;
pub use matcher::{CouponMatcher, MatchResult, DEFAULT_CONTEXT_CHARS};
