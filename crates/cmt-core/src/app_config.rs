use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Where the AI Overview database lives.
///
/// `Url` goes through a regular connection pool. `CloudSql` connects over the
/// Cloud SQL Auth Proxy Unix socket with a single serialized connection,
/// which is all a one-shot report job needs.
#[derive(Clone, PartialEq, Eq)]
pub enum DatabaseTarget {
    Url(String),
    CloudSql {
        instance: String,
        socket_dir: PathBuf,
        user: String,
        password: Option<String>,
        database: String,
    },
}

impl DatabaseTarget {
    /// Path of the Unix socket directory for a Cloud SQL target.
    #[must_use]
    pub fn socket_path(&self) -> Option<PathBuf> {
        match self {
            DatabaseTarget::Url(_) => None,
            DatabaseTarget::CloudSql {
                instance,
                socket_dir,
                ..
            } => Some(socket_dir.join(instance)),
        }
    }
}

impl std::fmt::Debug for DatabaseTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatabaseTarget::Url(_) => f.debug_tuple("Url").field(&"[redacted]").finish(),
            DatabaseTarget::CloudSql {
                instance,
                socket_dir,
                user,
                password,
                database,
            } => f
                .debug_struct("CloudSql")
                .field("instance", instance)
                .field("socket_dir", socket_dir)
                .field("user", user)
                .field("password", &password.as_ref().map(|_| "[redacted]"))
                .field("database", database)
                .finish(),
        }
    }
}

/// Google Sheets location of the coupon allow-list.
#[derive(Clone, PartialEq, Eq)]
pub struct SheetsConfig {
    pub spreadsheet_id: String,
    pub api_key: String,
    pub coupon_gid: i64,
    pub coupon_column: String,
}

impl std::fmt::Debug for SheetsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SheetsConfig")
            .field("spreadsheet_id", &self.spreadsheet_id)
            .field("api_key", &"[redacted]")
            .field("coupon_gid", &self.coupon_gid)
            .field("coupon_column", &self.coupon_column)
            .finish()
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub log_level: String,
    pub database: DatabaseTarget,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    /// Only needed when a command delivers to Slack.
    pub slack_webhook_url: Option<String>,
    pub slack_channel: String,
    pub sheets: Option<SheetsConfig>,
    pub coupons_path: PathBuf,
    pub report_lookback_days: u32,
    pub report_provider: String,
    pub report_tags: Vec<String>,
    pub report_schedule: String,
    pub match_context_chars: usize,
    pub http_timeout_secs: u64,
    pub http_max_retries: u32,
    pub http_retry_backoff_base_ms: u64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("database", &self.database)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field(
                "slack_webhook_url",
                &self.slack_webhook_url.as_ref().map(|_| "[redacted]"),
            )
            .field("slack_channel", &self.slack_channel)
            .field("sheets", &self.sheets)
            .field("coupons_path", &self.coupons_path)
            .field("report_lookback_days", &self.report_lookback_days)
            .field("report_provider", &self.report_provider)
            .field("report_tags", &self.report_tags)
            .field("report_schedule", &self.report_schedule)
            .field("match_context_chars", &self.match_context_chars)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("http_max_retries", &self.http_max_retries)
            .field(
                "http_retry_backoff_base_ms",
                &self.http_retry_backoff_base_ms,
            )
            .finish()
    }
}
