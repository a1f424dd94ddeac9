use crate::app_config::{AppConfig, DatabaseTarget, Environment, SheetsConfig};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so tests can drive it with a `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var).ok().filter(|v| !v.trim().is_empty())
    };

    let or_default = |var: &str, default: &str| -> String {
        optional(var).unwrap_or_else(|| default.to_string())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<usize>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let env = parse_environment(&or_default("CMT_ENV", "development"))?;
    let log_level = or_default("CMT_LOG_LEVEL", "info");

    let database = match optional("CMT_CLOUD_SQL_INSTANCE") {
        Some(instance) => DatabaseTarget::CloudSql {
            instance,
            socket_dir: PathBuf::from(or_default("CMT_CLOUD_SQL_SOCKET_DIR", "/cloudsql")),
            user: require("CMT_DB_USER")?,
            password: optional("CMT_DB_PASSWORD"),
            database: or_default("CMT_DB_NAME", "postgres"),
        },
        None => DatabaseTarget::Url(require("DATABASE_URL")?),
    };

    let db_max_connections = parse_u32("CMT_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("CMT_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("CMT_DB_ACQUIRE_TIMEOUT_SECS", "10")?;
    if db_min_connections > db_max_connections {
        return Err(ConfigError::Validation(format!(
            "CMT_DB_MIN_CONNECTIONS ({db_min_connections}) exceeds CMT_DB_MAX_CONNECTIONS ({db_max_connections})"
        )));
    }

    let slack_webhook_url = optional("SLACK_WEBHOOK_URL");
    let slack_channel = or_default("SLACK_CHANNEL", "#coupon-alerts");

    let sheets = match optional("GOOGLE_SHEETS_SPREADSHEET_ID") {
        Some(spreadsheet_id) => {
            let raw_gid = or_default("GOOGLE_SHEETS_COUPON_GID", "0");
            let coupon_gid = raw_gid
                .parse::<i64>()
                .map_err(|e| ConfigError::InvalidEnvVar {
                    var: "GOOGLE_SHEETS_COUPON_GID".to_string(),
                    reason: e.to_string(),
                })?;
            Some(SheetsConfig {
                spreadsheet_id,
                api_key: require("GOOGLE_SHEETS_API_KEY")?,
                coupon_gid,
                coupon_column: or_default("GOOGLE_SHEETS_COUPON_COLUMN", "Coupon"),
            })
        }
        None => None,
    };

    let coupons_path = PathBuf::from(or_default("CMT_COUPONS_PATH", "./config/coupons.yaml"));

    let report_lookback_days = parse_u32("CMT_REPORT_LOOKBACK_DAYS", "7")?;
    let report_provider = or_default("CMT_REPORT_PROVIDER", "google_ai_overview");
    let report_tags = parse_tags(&or_default("CMT_REPORT_TAGS", ""));
    let report_schedule = or_default("CMT_REPORT_SCHEDULE", "0 0 9 * * Mon");
    let match_context_chars = parse_usize("CMT_MATCH_CONTEXT_CHARS", "100")?;

    let http_timeout_secs = parse_u64("CMT_HTTP_TIMEOUT_SECS", "30")?;
    let http_max_retries = parse_u32("CMT_HTTP_MAX_RETRIES", "3")?;
    let http_retry_backoff_base_ms = parse_u64("CMT_HTTP_RETRY_BACKOFF_BASE_MS", "1000")?;

    Ok(AppConfig {
        env,
        log_level,
        database,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        slack_webhook_url,
        slack_channel,
        sheets,
        coupons_path,
        report_lookback_days,
        report_provider,
        report_tags,
        report_schedule,
        match_context_chars,
        http_timeout_secs,
        http_max_retries,
        http_retry_backoff_base_ms,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "CMT_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

/// Split a comma-separated tag list, dropping blanks.
fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
