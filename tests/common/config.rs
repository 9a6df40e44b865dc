//! Test configuration helpers for building archivers against a mock platform

use tempfile::TempDir;
use wechat_dl::{Archiver, Config, Credentials};

/// Error type for test configuration
#[derive(Debug)]
pub struct ConfigError(pub String);

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Config error: {}", self.0)
    }
}

impl std::error::Error for ConfigError {}

/// Configuration pointing at `base_url`, with every delay removed and all
/// files placed under `temp_dir`
pub fn test_config(base_url: &str, temp_dir: &TempDir) -> Config {
    let mut config = Config::default().without_delays();
    config.platform.base_url = base_url.to_string();
    config.output_dir = temp_dir.path().join("output");
    config.persistence.database_path = temp_dir.path().join("data").join("archive.db");
    config
}

/// Create an Archiver talking to the mock platform at `base_url`
///
/// Returns the archiver and temp directory (keep temp_dir alive for test duration)
pub async fn create_test_archiver(
    base_url: &str,
) -> Result<(Archiver, TempDir), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    let archiver = Archiver::new(test_config(base_url, &temp_dir)).await?;
    Ok((archiver, temp_dir))
}

/// Same as [`create_test_archiver`], with a caller-adjusted configuration
pub async fn create_test_archiver_with<F>(
    base_url: &str,
    adjust: F,
) -> Result<(Archiver, TempDir), Box<dyn std::error::Error>>
where
    F: FnOnce(&mut Config),
{
    let temp_dir = TempDir::new()?;
    let mut config = test_config(base_url, &temp_dir);
    adjust(&mut config);
    let archiver = Archiver::new(config).await?;
    Ok((archiver, temp_dir))
}

/// Credentials accepted by the mock platform
pub fn test_credentials() -> Credentials {
    Credentials::new("mock-token", [("slave_sid", "mock-sid"), ("slave_user", "gh_mock")])
}

/// Credentials for live tests, read from `WECHAT_DL_COOKIES` (a cookie
/// file written by a previous login)
pub async fn load_live_credentials() -> Result<Credentials, ConfigError> {
    let path = std::env::var("WECHAT_DL_COOKIES")
        .map_err(|_| ConfigError("WECHAT_DL_COOKIES not set in environment".to_string()))?;

    wechat_dl::CookieFileProvider::new(path)
        .load()
        .await
        .map_err(|e| ConfigError(e.to_string()))?
        .filter(Credentials::is_usable)
        .ok_or_else(|| ConfigError("cookie file holds no usable credentials".to_string()))
}

/// Check if live credentials are configured
pub fn has_live_credentials() -> bool {
    std::env::var("WECHAT_DL_COOKIES").is_ok()
}
