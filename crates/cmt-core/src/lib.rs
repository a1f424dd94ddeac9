//! Shared domain types, collaborator ports, and configuration for the coupon
//! mention tracker.

pub mod app_config;
pub mod config;
pub mod coupons;
pub mod models;
pub mod ports;

use thiserror::Error;

pub use app_config::{AppConfig, DatabaseTarget, Environment, SheetsConfig};
pub use config::{load_app_config, load_app_config_from_env};
pub use coupons::{load_coupons, CouponsFile, FileAllowList};
pub use models::{
    CitedSource, CouponMatch, OverviewResult, Prompt, SourcePage, WeeklyReportRow,
    UNTRACKED_PATTERN_CONTEXT,
};
pub use ports::{AllowListProvider, Notifier, PortError, ResultsSource, SourceFetcher};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read coupons file {path}: {source}")]
    CouponsFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse coupons file: {0}")]
    CouponsFileParse(#[from] serde_yaml::Error),

    #[error("config validation failed: {0}")]
    Validation(String),
}
