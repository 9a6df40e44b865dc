//! Bounded retry with configurable backoff
//!
//! Every retry in the crate goes through [`download_with_retry`]: an explicit
//! loop with an attempt counter and a sleep between attempts. Article and image
//! downloads both use fixed delays (`backoff_multiplier = 1.0`), but the loop
//! supports exponential backoff and jitter as well.
//!
//! # Example
//!
//! ```no_run
//! use wechat_dl::retry::{IsRetryable, download_with_retry};
//! use wechat_dl::config::RetryConfig;
//! use std::time::Duration;
//!
//! #[derive(Debug)]
//! enum MyError {
//!     Transient,
//!     Permanent,
//! }
//!
//! impl std::fmt::Display for MyError {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         write!(f, "{:?}", self)
//!     }
//! }
//!
//! impl IsRetryable for MyError {
//!     fn is_retryable(&self) -> bool {
//!         matches!(self, MyError::Transient)
//!     }
//! }
//!
//! # async fn example() -> Result<(), MyError> {
//! let config = RetryConfig::fixed(3, Duration::from_secs(3));
//! let result = download_with_retry(&config, || async {
//!     Ok::<_, MyError>(())
//! }).await?;
//! # Ok(())
//! # }
//! ```

use crate::config::RetryConfig;
use crate::error::Error;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Trait for errors that can be classified as retryable or not
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for Error {
    fn is_retryable(&self) -> bool {
        match self {
            // Same page, same result
            Error::ContentParse(_) => false,
            // Session and platform-level answers are not transient
            Error::NotLoggedIn => false,
            Error::RateLimited { .. } => false,
            Error::AccountNotFound(_) => false,
            Error::Config { .. } => false,
            // Store failures abort the operation and propagate
            Error::Database(_) | Error::Sqlx(_) => false,
            // Transport, HTTP status, unexpected platform answers, local I/O and
            // anything unclassified are retried within the article budget
            Error::Network(_)
            | Error::HttpStatus { .. }
            | Error::Platform { .. }
            | Error::Io(_)
            | Error::Serialization(_)
            | Error::Other(_) => true,
        }
    }
}

/// Execute an async operation, retrying retryable failures per `config`
///
/// `config.max_retries` counts retries, so the operation runs at most
/// `max_retries + 1` times. Non-retryable errors are returned immediately.
pub async fn download_with_retry<F, Fut, T, E>(
    config: &RetryConfig,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
{
    let mut attempt = 0;
    let mut delay = config.initial_delay;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    tracing::info!(attempts = attempt + 1, "Operation succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) if e.is_retryable() && attempt < config.max_retries => {
                attempt += 1;

                tracing::warn!(
                    error = %e,
                    attempt = attempt,
                    max_retries = config.max_retries,
                    delay_ms = delay.as_millis(),
                    "Operation failed, retrying"
                );

                let jittered_delay = if config.jitter {
                    add_jitter(delay)
                } else {
                    delay
                };

                if !jittered_delay.is_zero() {
                    tokio::time::sleep(jittered_delay).await;
                }

                let next_delay =
                    Duration::from_secs_f64(delay.as_secs_f64() * config.backoff_multiplier);
                delay = next_delay.min(config.max_delay);
            }
            Err(e) => {
                if e.is_retryable() {
                    tracing::error!(
                        error = %e,
                        attempts = attempt + 1,
                        "Operation failed after all retry attempts exhausted"
                    );
                } else {
                    tracing::debug!(error = %e, "Operation failed with non-retryable error");
                }
                return Err(e);
            }
        }
    }
}

/// Add random jitter to a delay
///
/// The result lies between `delay` and `2 * delay`.
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    let jittered_secs = delay.as_secs_f64() * (1.0 + jitter_factor);
    Duration::from_secs_f64(jittered_secs)
}
