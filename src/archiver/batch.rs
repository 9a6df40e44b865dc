//! Sequential batches and the combined `scrape` entry point.

use crate::credentials::{CredentialProvider, Credentials};
use crate::platform::Session;
use crate::types::TaskKind;
use serde::{Deserialize, Serialize};

use super::Archiver;
use super::progress::{Progress, ProgressStream};

const NOT_LOGGED_IN: &str = "Error: not logged in or cookies expired";
const ALL_FINISHED: &str = "\nAll tasks finished.";

/// What a host asks the archiver to scrape
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ScrapeRequest {
    /// One account
    Single {
        /// Account name to search for
        name: String,
        /// Page limit for the article list
        pages: u32,
    },
    /// Several accounts, one after another
    Batch {
        /// Account names to search for, in order
        accounts: Vec<String>,
        /// Page limit for each account's article list
        pages: u32,
    },
}

impl Archiver {
    /// Scrape `accounts` one after another, with a cooldown in between
    ///
    /// Each account's pool drains before the next account starts. After
    /// cancellation, or once the session turns out to be logged out, no
    /// further account is started.
    pub fn process_batch(&self, session: &Session, accounts: &[String], max_pages: u32) -> ProgressStream {
        let archiver = self.clone();
        let session = session.clone();
        let accounts = accounts.to_vec();

        ProgressStream::spawn(self.cancel.child_token(), move |progress| async move {
            archiver
                .drive_batch(&session, &accounts, max_pages, &progress)
                .await;
            progress.line(ALL_FINISHED).await;
        })
    }

    /// Run `request` with `credentials`
    ///
    /// Without usable credentials the stream holds a single "not logged in"
    /// line and nothing touches the network or the store.
    pub fn scrape(&self, credentials: Option<Credentials>, request: ScrapeRequest) -> ProgressStream {
        let Some(credentials) = credentials.filter(Credentials::is_usable) else {
            tracing::warn!("Scrape requested without credentials");
            return ProgressStream::message(NOT_LOGGED_IN);
        };

        let session = match self.open_session(credentials) {
            Ok(session) => session,
            Err(e) => {
                tracing::error!(error = %e, "Failed to open session");
                return ProgressStream::message(format!("Error: {}", e));
            }
        };

        let archiver = self.clone();
        ProgressStream::spawn(self.cancel.child_token(), move |progress| async move {
            match request {
                ScrapeRequest::Single { name, pages } => {
                    // Already reported on the stream
                    let _ = archiver
                        .drive_account(&session, &name, pages, TaskKind::Single, &progress)
                        .await;
                }
                ScrapeRequest::Batch { accounts, pages } => {
                    archiver
                        .drive_batch(&session, &accounts, pages, &progress)
                        .await;
                }
            }
            progress.line(ALL_FINISHED).await;
        })
    }

    /// Run `request` with whatever `provider` currently holds
    pub async fn scrape_from(
        &self,
        provider: &dyn CredentialProvider,
        request: ScrapeRequest,
    ) -> ProgressStream {
        match provider.credentials().await {
            Ok(credentials) => self.scrape(credentials, request),
            Err(e) => {
                tracing::error!(error = %e, "Failed to load credentials");
                ProgressStream::message(format!("Error: {}", e))
            }
        }
    }

    async fn drive_batch(
        &self,
        session: &Session,
        accounts: &[String],
        max_pages: u32,
        progress: &Progress,
    ) {
        let count = accounts.len();

        for (i, name) in accounts.iter().enumerate() {
            if progress.is_cancelled() {
                tracing::info!(remaining = count - i, "Batch cancelled");
                progress
                    .line(format!("\nCancelled, skipping {} remaining accounts", count - i))
                    .await;
                return;
            }

            progress
                .line(format!("\n=== [{}/{}] account: {} ===", i + 1, count, name))
                .await;
            if let Err(e) = self
                .drive_account(session, name, max_pages, TaskKind::Batch, progress)
                .await
            {
                let remaining = count - i - 1;
                tracing::error!(error = %e, remaining, "Batch stopped");
                progress
                    .line(format!(
                        "\nStopping batch ({}), skipping {} remaining accounts",
                        e, remaining
                    ))
                    .await;
                return;
            }

            if i + 1 < count {
                let delay = self.config.politeness.batch_cooldown.sample();
                progress
                    .line(format!(
                        "\nWaiting {} seconds before the next account...",
                        delay.as_secs()
                    ))
                    .await;
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = progress.cancelled() => {}
                }
            }
        }
    }
}
