//! # wechat-dl
//!
//! Archive WeChat official-account articles into a local, searchable store.
//!
//! ## Pipeline
//!
//! For every requested account the crate:
//! - resolves the account through the platform's search endpoint,
//! - pages through its article list (stopping early on the rate-limit signal),
//! - downloads each article with a small worker pool, saves its images and
//!   renders a self-contained HTML file,
//! - records accounts, articles, tasks and rate-limit events in SQLite.
//!
//! Progress is reported as a stream of human-readable lines.
//!
//! ## Quick Start
//!
//! ```no_run
//! use futures::StreamExt;
//! use wechat_dl::{Archiver, Config, ScrapeRequest};
//! use wechat_dl::credentials::{CookieFileProvider, CredentialProvider};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let dispatch = wechat_dl::logging::build_dispatch(&config.logging)?;
//!     tracing::dispatcher::set_global_default(dispatch)?;
//!
//!     let archiver = Archiver::new(config).await?;
//!     let credentials = CookieFileProvider::default().credentials().await?;
//!
//!     let mut progress = archiver.scrape(
//!         credentials,
//!         ScrapeRequest::Single { name: "rustlang".to_string(), pages: 3 },
//!     );
//!     while let Some(line) = progress.next().await {
//!         print!("{}", line);
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Article download, extraction and rendering
pub mod archive;
/// Orchestration of accounts and batches
pub mod archiver;
/// Configuration types
pub mod config;
/// Platform credentials and their sources
pub mod credentials;
/// Database persistence layer
pub mod db;
/// Error types
pub mod error;
/// Log pipeline construction
pub mod logging;
/// Platform API access
pub mod platform;
/// Retry logic with configurable backoff
pub mod retry;
/// Core types
pub mod types;

// Re-export commonly used types
pub use archive::ArticleDownloader;
pub use archiver::{Archiver, ProgressStream, ScrapeRequest};
pub use config::{Config, DelayRange, RetryConfig};
pub use credentials::{CookieFileProvider, CredentialProvider, Credentials, StaticCredentials};
pub use db::{Database, RateLimitStatus};
pub use error::{ContentParseError, DatabaseError, Error, Result};
pub use platform::{ArticleListing, ArticleSummary, Fetcher, PlatformClient, Session};
pub use types::{
    AccountId, ArticleId, ArticleStatus, DownloadOutcome, TaskId, TaskKind, TaskStatus,
};

/// Helper function to run an archiver with graceful signal handling.
///
/// Waits for a termination signal and then cancels the archiver: no new
/// article is submitted, in-flight downloads finish and are recorded.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use wechat_dl::{Archiver, Config, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let archiver = Archiver::new(Config::default()).await?;
///
///     tokio::spawn(run_with_shutdown(archiver.clone()));
///     // ... drive scrapes with `archiver` ...
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(archiver: Archiver) -> Result<()> {
    let token = archiver.cancellation_token();
    tokio::select! {
        _ = wait_for_signal() => archiver.cancel(),
        _ = token.cancelled() => {}
    }
    Ok(())
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Signal registration may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
