//! Orchestration: search, list and download for one account or a batch
//!
//! The [`Archiver`] is organized by concern:
//! - [`account`] - the per-account pipeline and its worker pool
//! - [`batch`] - sequential batches and the `scrape` entry point
//! - [`progress`] - the lazy line stream handed back to hosts

mod account;
mod batch;
mod progress;


pub use batch::ScrapeRequest;
pub use progress::ProgressStream;

use crate::config::Config;
use crate::credentials::{CredentialProvider, Credentials};
use crate::db::{Database, RateLimitStatus};
use crate::error::{Error, Result};
use crate::platform::Session;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Drives scrapes and owns the shared store (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct Archiver {
    /// Store shared by every worker
    /// Public so hosts can browse and curate the archive
    pub db: Arc<Database>,
    pub(crate) config: Arc<Config>,
    pub(crate) cancel: CancellationToken,
}

impl Archiver {
    /// Open the store named in `config` and prepare the output directory
    pub async fn new(config: Config) -> Result<Self> {
        config.validate()?;

        tokio::fs::create_dir_all(&config.output_dir)
            .await
            .map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create output directory '{}': {}",
                        config.output_dir.display(),
                        e
                    ),
                ))
            })?;

        let db = Database::new(&config.persistence.database_path).await?;
        Self::with_database(config, Arc::new(db))
    }

    /// Use an already opened store
    pub fn with_database(config: Config, db: Arc<Database>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            db,
            config: Arc::new(config),
            cancel: CancellationToken::new(),
        })
    }

    /// The active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Build a session for `credentials`
    ///
    /// # Errors
    /// [`Error::NotLoggedIn`] when the credentials carry no token.
    pub fn open_session(&self, credentials: Credentials) -> Result<Session> {
        if !credentials.is_usable() {
            return Err(Error::NotLoggedIn);
        }
        Session::new(credentials, &self.config)
    }

    /// Build a session from whatever `provider` currently holds
    pub async fn open_session_from(&self, provider: &dyn CredentialProvider) -> Result<Session> {
        match provider.credentials().await? {
            Some(credentials) => self.open_session(credentials),
            None => Err(Error::NotLoggedIn),
        }
    }

    /// Stop submitting new work
    ///
    /// Running article downloads finish and are recorded; a batch stops
    /// before its next account. Cancellation is permanent for this archiver
    /// and every clone of it.
    pub fn cancel(&self) {
        if !self.cancel.is_cancelled() {
            tracing::info!("Cancellation requested, draining in-flight downloads");
        }
        self.cancel.cancel();
    }

    /// Whether [`cancel`](Self::cancel) was called
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// The token behind [`cancel`](Self::cancel)
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Whether the most recent rate-limit cooldown is still running
    pub async fn is_rate_limited(&self) -> Result<bool> {
        self.db.is_rate_limited().await
    }

    /// Reset time and remaining seconds of the latest rate-limit cooldown
    pub async fn rate_limit_status(&self) -> Result<Option<RateLimitStatus>> {
        self.db.rate_limit_status().await
    }
}
