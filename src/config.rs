//! Configuration types for wechat-dl

use crate::error::{Error, Result};
use crate::logging::LoggingConfig;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::{path::Path, path::PathBuf, time::Duration};

/// Platform API settings (endpoints, paging, request timeouts)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlatformConfig {
    /// Base URL of the platform (default: "https://mp.weixin.qq.com")
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Articles requested per list page (default: 5)
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Page limit used when a caller does not pass one (default: 10)
    #[serde(default = "default_max_pages")]
    pub default_max_pages: u32,

    /// Timeout for account search requests (default: 10 seconds)
    #[serde(default = "default_search_timeout", with = "duration_serde")]
    pub search_timeout: Duration,

    /// Timeout for article list requests (default: 15 seconds)
    #[serde(default = "default_list_timeout", with = "duration_serde")]
    pub list_timeout: Duration,

    /// Timeout for article page requests (default: 30 seconds)
    #[serde(default = "default_article_timeout", with = "duration_serde")]
    pub article_timeout: Duration,

    /// Timeout for image requests (default: 10 seconds)
    #[serde(default = "default_image_timeout", with = "duration_serde")]
    pub image_timeout: Duration,

    /// User-Agent strings rotated across platform requests
    #[serde(default = "default_user_agents")]
    pub user_agents: Vec<String>,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            page_size: default_page_size(),
            default_max_pages: default_max_pages(),
            search_timeout: default_search_timeout(),
            list_timeout: default_list_timeout(),
            article_timeout: default_article_timeout(),
            image_timeout: default_image_timeout(),
            user_agents: default_user_agents(),
        }
    }
}

/// Deliberate sleeps that keep the crawler below the platform's rate limits
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PolitenessConfig {
    /// Delay between successful list pages (default: 2-5 seconds)
    #[serde(default = "default_page_delay")]
    pub page_delay: DelayRange,

    /// Delay each worker sleeps before fetching an article (default: 1-3 seconds)
    #[serde(default = "default_worker_jitter")]
    pub worker_jitter: DelayRange,

    /// Delay between accounts in batch mode (default: 30-60 seconds)
    #[serde(default = "default_batch_cooldown")]
    pub batch_cooldown: DelayRange,

    /// How long a recorded rate-limit event blocks the crawler (default: 30 minutes)
    #[serde(default = "default_rate_limit_window", with = "duration_serde")]
    pub rate_limit_window: Duration,
}

impl Default for PolitenessConfig {
    fn default() -> Self {
        Self {
            page_delay: default_page_delay(),
            worker_jitter: default_worker_jitter(),
            batch_cooldown: default_batch_cooldown(),
            rate_limit_window: default_rate_limit_window(),
        }
    }
}

/// Article download behavior
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Concurrent article downloads per account (default: 2)
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Text length under which an image-less article is logged as suspicious (default: 50)
    #[serde(default = "default_min_content_chars")]
    pub min_content_chars: usize,

    /// Retry policy for whole-article failures (default: 3 retries, fixed 3 seconds)
    #[serde(default = "default_article_retry")]
    pub article_retry: RetryConfig,

    /// Retry policy for single images (default: 3 attempts, fixed 2 seconds)
    #[serde(default = "default_image_retry")]
    pub image_retry: RetryConfig,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            min_content_chars: default_min_content_chars(),
            article_retry: default_article_retry(),
            image_retry: default_image_retry(),
        }
    }
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Database path (default: "data/wechat_scraper.db")
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

/// Main configuration for [`Archiver`](crate::Archiver)
///
/// Every field has a default, so an empty JSON object is a valid configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Root directory for rendered articles (default: "output")
    ///
    /// Articles land in `{output_dir}/{account}/` and images in
    /// `{output_dir}/{account}/images/`.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Platform API settings
    #[serde(default)]
    pub platform: PlatformConfig,

    /// Politeness delays and rate-limit window
    #[serde(default)]
    pub politeness: PolitenessConfig,

    /// Article download behavior
    #[serde(default)]
    pub download: DownloadConfig,

    /// Data storage
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// Log output (see [`logging::build_dispatch`](crate::logging::build_dispatch))
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            platform: PlatformConfig::default(),
            politeness: PolitenessConfig::default(),
            download: DownloadConfig::default(),
            persistence: PersistenceConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Load a configuration from a JSON file and validate it
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.platform.page_size == 0 {
            return Err(Error::Config {
                message: "page size must be at least 1".to_string(),
                key: Some("platform.page_size".to_string()),
            });
        }
        if self.download.concurrency == 0 {
            return Err(Error::Config {
                message: "concurrency must be at least 1".to_string(),
                key: Some("download.concurrency".to_string()),
            });
        }
        if self.platform.user_agents.is_empty() {
            return Err(Error::Config {
                message: "at least one user agent is required".to_string(),
                key: Some("platform.user_agents".to_string()),
            });
        }
        for (key, range) in [
            ("politeness.page_delay", &self.politeness.page_delay),
            ("politeness.worker_jitter", &self.politeness.worker_jitter),
            ("politeness.batch_cooldown", &self.politeness.batch_cooldown),
        ] {
            if range.min > range.max {
                return Err(Error::Config {
                    message: format!(
                        "delay minimum {:?} exceeds maximum {:?}",
                        range.min, range.max
                    ),
                    key: Some(key.to_string()),
                });
            }
        }
        Ok(())
    }

    /// A configuration with every politeness delay and retry backoff set to zero
    ///
    /// Useful for tests and for replaying against a local mock of the platform.
    pub fn without_delays(mut self) -> Self {
        self.politeness.page_delay = DelayRange::ZERO;
        self.politeness.worker_jitter = DelayRange::ZERO;
        self.politeness.batch_cooldown = DelayRange::ZERO;
        self.download.article_retry.initial_delay = Duration::ZERO;
        self.download.image_retry.initial_delay = Duration::ZERO;
        self
    }
}

/// Retry configuration for transient failures
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Retries after the first attempt (the operation runs at most `max_retries + 1` times)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial delay before first retry
    #[serde(default = "default_initial_delay", with = "duration_millis_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries
    #[serde(default = "default_max_delay", with = "duration_millis_serde")]
    pub max_delay: Duration,

    /// Multiplier applied to the delay after each retry (1.0 = fixed delay)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays
    #[serde(default)]
    pub jitter: bool,
}

impl RetryConfig {
    /// A fixed-delay policy: `retries` extra attempts, `delay` between each
    pub fn fixed(retries: u32, delay: Duration) -> Self {
        Self {
            max_retries: retries,
            initial_delay: delay,
            max_delay: delay,
            backoff_multiplier: 1.0,
            jitter: false,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::fixed(default_max_retries(), default_initial_delay())
    }
}

/// Inclusive range of durations a politeness delay is drawn from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayRange {
    /// Shortest delay
    #[serde(with = "duration_millis_serde")]
    pub min: Duration,
    /// Longest delay
    #[serde(with = "duration_millis_serde")]
    pub max: Duration,
}

impl DelayRange {
    /// No delay at all
    pub const ZERO: DelayRange = DelayRange {
        min: Duration::ZERO,
        max: Duration::ZERO,
    };

    /// Range between two whole-second bounds
    pub const fn secs(min: u64, max: u64) -> Self {
        Self {
            min: Duration::from_secs(min),
            max: Duration::from_secs(max),
        }
    }

    /// Draw a delay uniformly from the range
    pub fn sample(&self) -> Duration {
        if self.max <= self.min {
            return self.min;
        }
        let mut rng = rand::thread_rng();
        let secs = rng.gen_range(self.min.as_secs_f64()..=self.max.as_secs_f64());
        Duration::from_secs_f64(secs)
    }

    /// Sleep for a sampled delay, returning how long was slept
    pub async fn sleep(&self) -> Duration {
        let delay = self.sample();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        delay
    }
}

// Default value functions
fn default_base_url() -> String {
    "https://mp.weixin.qq.com".to_string()
}

fn default_page_size() -> u32 {
    5
}

fn default_max_pages() -> u32 {
    10
}

fn default_search_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_list_timeout() -> Duration {
    Duration::from_secs(15)
}

fn default_article_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_image_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_user_agents() -> Vec<String> {
    vec![
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36".to_string(),
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15".to_string(),
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:120.0) Gecko/20100101 Firefox/120.0".to_string(),
    ]
}

fn default_page_delay() -> DelayRange {
    DelayRange::secs(2, 5)
}

fn default_worker_jitter() -> DelayRange {
    DelayRange::secs(1, 3)
}

fn default_batch_cooldown() -> DelayRange {
    DelayRange::secs(30, 60)
}

fn default_rate_limit_window() -> Duration {
    Duration::from_secs(30 * 60)
}

fn default_concurrency() -> usize {
    2
}

fn default_min_content_chars() -> usize {
    50
}

fn default_article_retry() -> RetryConfig {
    RetryConfig::fixed(3, Duration::from_secs(3))
}

fn default_image_retry() -> RetryConfig {
    // 3 attempts in total
    RetryConfig::fixed(2, Duration::from_secs(2))
}

fn default_database_path() -> PathBuf {
    PathBuf::from("data/wechat_scraper.db")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_max_retries() -> u32 {
    3
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(3)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(60)
}

fn default_backoff_multiplier() -> f64 {
    1.0
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Duration serialization helper (milliseconds, for sub-second delays)
mod duration_millis_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_yields_defaults() {
        let config: Config = serde_json::from_str("{}").expect("deserialize failed");

        assert_eq!(config.output_dir, PathBuf::from("output"));
        assert_eq!(config.platform.page_size, 5);
        assert_eq!(config.platform.default_max_pages, 10);
        assert_eq!(config.download.concurrency, 2);
        assert_eq!(config.download.min_content_chars, 50);
        assert_eq!(config.politeness.page_delay, DelayRange::secs(2, 5));
        assert_eq!(config.politeness.worker_jitter, DelayRange::secs(1, 3));
        assert_eq!(config.politeness.batch_cooldown, DelayRange::secs(30, 60));
        assert_eq!(
            config.politeness.rate_limit_window,
            Duration::from_secs(1800)
        );
        assert_eq!(config.download.article_retry.max_retries, 3);
        assert_eq!(
            config.download.article_retry.initial_delay,
            Duration::from_secs(3)
        );
        assert_eq!(config.download.image_retry.max_retries, 2);
        assert_eq!(
            config.download.image_retry.initial_delay,
            Duration::from_secs(2)
        );
        config.validate().unwrap();
    }

    #[test]
    fn partial_json_overrides_only_named_fields() {
        let json = r#"{
            "output_dir": "/srv/archive",
            "platform": { "page_size": 10 },
            "politeness": { "page_delay": { "min": 100, "max": 200 } }
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();

        assert_eq!(config.output_dir, PathBuf::from("/srv/archive"));
        assert_eq!(config.platform.page_size, 10);
        assert_eq!(config.platform.base_url, "https://mp.weixin.qq.com");
        assert_eq!(
            config.politeness.page_delay,
            DelayRange {
                min: Duration::from_millis(100),
                max: Duration::from_millis(200),
            }
        );
        assert_eq!(config.politeness.worker_jitter, DelayRange::secs(1, 3));
    }

    #[test]
    fn validate_rejects_zero_concurrency() {
        let mut config = Config::default();
        config.download.concurrency = 0;
        match config.validate() {
            Err(Error::Config { key, .. }) => {
                assert_eq!(key.as_deref(), Some("download.concurrency"))
            }
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn validate_rejects_inverted_delay_range() {
        let mut config = Config::default();
        config.politeness.batch_cooldown = DelayRange::secs(60, 30);
        match config.validate() {
            Err(Error::Config { key, .. }) => {
                assert_eq!(key.as_deref(), Some("politeness.batch_cooldown"))
            }
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn delay_range_samples_within_bounds() {
        let range = DelayRange {
            min: Duration::from_millis(20),
            max: Duration::from_millis(40),
        };
        for i in 0..200 {
            let d = range.sample();
            assert!(
                d >= range.min && d <= range.max,
                "iteration {i}: {d:?} outside {range:?}"
            );
        }
    }

    #[test]
    fn zero_range_samples_zero() {
        assert_eq!(DelayRange::ZERO.sample(), Duration::ZERO);
    }

    #[test]
    fn without_delays_zeroes_every_wait() {
        let config = Config::default().without_delays();
        assert_eq!(config.politeness.page_delay, DelayRange::ZERO);
        assert_eq!(config.politeness.worker_jitter, DelayRange::ZERO);
        assert_eq!(config.politeness.batch_cooldown, DelayRange::ZERO);
        assert_eq!(config.download.article_retry.initial_delay, Duration::ZERO);
        assert_eq!(config.download.image_retry.initial_delay, Duration::ZERO);
        // Retry budgets are untouched
        assert_eq!(config.download.article_retry.max_retries, 3);
        assert_eq!(config.download.image_retry.max_retries, 2);
    }

    #[test]
    fn from_json_file_reads_and_validates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "download": { "concurrency": 4 } }"#).unwrap();
        let config = Config::from_json_file(&path).unwrap();
        assert_eq!(config.download.concurrency, 4);

        std::fs::write(&path, r#"{ "platform": { "page_size": 0 } }"#).unwrap();
        assert!(Config::from_json_file(&path).is_err());
    }
}
