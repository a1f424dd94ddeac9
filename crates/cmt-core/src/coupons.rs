use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::ports::{AllowListProvider, PortError};
use crate::ConfigError;

#[derive(Debug, Deserialize)]
pub struct CouponsFile {
    pub coupons: Vec<String>,
}

/// Load the tracked coupon list from a YAML file.
///
/// Entries are trimmed and blanks dropped; case is left alone since the
/// matcher normalizes it.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read or parsed.
pub fn load_coupons(path: &Path) -> Result<Vec<String>, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::CouponsFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_coupons(&content)
}

fn parse_coupons(content: &str) -> Result<Vec<String>, ConfigError> {
    let file: CouponsFile = serde_yaml::from_str(content)?;
    Ok(file
        .coupons
        .into_iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect())
}

/// Allow-list backed by a local YAML file, re-read on every call.
#[derive(Debug, Clone)]
pub struct FileAllowList {
    path: PathBuf,
}

impl FileAllowList {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait::async_trait]
impl AllowListProvider for FileAllowList {
    async fn tracked_coupons(&self) -> Result<Vec<String>, PortError> {
        load_coupons(&self.path).map_err(|e| PortError::new("coupons file", e))
    }
}
