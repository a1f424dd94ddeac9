use std::time::Duration;

use cmt_core::AppConfig;
use sqlx::{postgres::PgPoolOptions, PgPool};
use thiserror::Error;

const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_MIN_CONNECTIONS: u32 = 1;
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            min_connections: DEFAULT_MIN_CONNECTIONS,
            acquire_timeout_secs: DEFAULT_ACQUIRE_TIMEOUT_SECS,
        }
    }
}

impl PoolConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            max_connections: config.db_max_connections,
            min_connections: config.db_min_connections,
            acquire_timeout_secs: config.db_acquire_timeout_secs,
        }
    }
}

#[derive(Debug, Error)]
pub enum DbError {
    #[error("database connection is closed")]
    NotConnected,
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Connect to a Postgres pool using explicit URL and config.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the connection cannot be established.
pub async fn connect_pool(database_url: &str, config: PoolConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect(database_url)
        .await
}


pub mod ai_overviews;
pub mod connection;
pub mod repository;
pub mod tracking_history;

pub use ai_overviews::{
    get_prompts, get_results_for_period, get_sources_with_html, parse_cited_sources,
    OverviewResultRow, PromptFilter, PromptRow, SourcePageRow,
};
pub use connection::{
    cloud_sql_options, connect_source, ConnectionSource, PooledSource, ScopedConnection,
    SingleConnectionSource,
};
pub use repository::{AiOverviewRepository, TrackingHistoryRepository};
pub use tracking_history::{
    save_tracking_batch, tracking_records, upsert_tracking_record, TrackingRecord,
};
