//! Search → list → download for one account.

use crate::archive::ArticleDownloader;
use crate::error::{Error, Result};
use crate::platform::{ArticleSummary, Session};
use crate::types::{AccountId, TaskId, TaskKind, TaskStatus};
use futures::{StreamExt, future, stream};
use std::sync::Arc;

use super::Archiver;
use super::progress::{Progress, ProgressStream};

/// Counters of one account's worker pool
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct PoolTally {
    pub(crate) downloaded: i64,
    pub(crate) failed: i64,
}

impl Archiver {
    /// Scrape one account, reporting progress line by line
    ///
    /// Nothing happens until the returned stream is polled. A task row
    /// records the run; its counters are updated after every article.
    pub fn process_account(&self, session: &Session, name: &str, max_pages: u32) -> ProgressStream {
        let archiver = self.clone();
        let session = session.clone();
        let name = name.to_string();

        ProgressStream::spawn(self.cancel.child_token(), move |progress| async move {
            // Already reported on the stream
            let _ = archiver
                .drive_account(&session, &name, max_pages, TaskKind::Single, &progress)
                .await;
        })
    }

    /// Run one account to a terminal task status
    ///
    /// Every failure is recorded on the task and reported as an "Error:"
    /// line. Only errors that make further accounts pointless (see
    /// [`Error::is_fatal_to_run`]) are returned.
    pub(crate) async fn drive_account(
        &self,
        session: &Session,
        name: &str,
        max_pages: u32,
        kind: TaskKind,
        progress: &Progress,
    ) -> Result<()> {
        let task_id = match self.db.create_task(name, kind, max_pages).await {
            Ok(id) => id,
            Err(e) => {
                tracing::error!(account = name, error = %e, "Failed to create task");
                progress.line(format!("Error: {}", e)).await;
                return Ok(());
            }
        };

        match self
            .run_account(session, name, max_pages, task_id, progress)
            .await
        {
            Ok(()) => Ok(()),
            Err(e) => {
                tracing::error!(account = name, task_id = task_id.get(), error = %e, "Account failed");
                if let Err(db_err) = self
                    .db
                    .complete_task(task_id, TaskStatus::Failed, Some(&e.to_string()))
                    .await
                {
                    tracing::error!(task_id = task_id.get(), error = %db_err, "Failed to finalize task");
                }
                progress.line(format!("Error: {}", e)).await;
                if e.is_fatal_to_run() { Err(e) } else { Ok(()) }
            }
        }
    }

    async fn run_account(
        &self,
        session: &Session,
        name: &str,
        max_pages: u32,
        task_id: TaskId,
        progress: &Progress,
    ) -> Result<()> {
        progress.line(format!("Searching for {}...", name)).await;

        let account = match session.fetcher().resolve_account(name).await {
            Ok(account) => account,
            Err(e @ Error::RateLimited { .. }) => {
                return self.stop_rate_limited(name, task_id, &e, progress).await;
            }
            Err(e @ Error::AccountNotFound(_)) => {
                tracing::warn!(account = name, "Account not found");
                self.db
                    .complete_task(task_id, TaskStatus::Failed, Some(&e.to_string()))
                    .await?;
                progress.line(format!("Error: {}", e)).await;
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let alias = Some(account.alias.as_str()).filter(|a| !a.is_empty());
        let account_id = self
            .db
            .upsert_account(name, Some(&account.fakeid), Some(&account.nickname), alias)
            .await?;

        progress
            .line(format!("Fetching article list (up to {} pages)...", max_pages))
            .await;

        let listing = session.fetcher().list_articles(&account.fakeid, max_pages).await;

        if listing.rate_limited {
            if listing.articles.is_empty() {
                let e = Error::RateLimited {
                    context: format!("listing articles of {}", name),
                };
                return self.stop_rate_limited(name, task_id, &e, progress).await;
            }
            self.db
                .record_rate_limit(Some(name), self.config.politeness.rate_limit_window)
                .await?;
            progress
                .line(format!(
                    "⚠️ Rate limited while listing, continuing with the {} articles found so far",
                    listing.articles.len()
                ))
                .await;
        }

        let articles = listing.articles;
        let total = articles.len() as i64;
        progress.line(format!("Found {} articles", total)).await;

        if articles.is_empty() {
            self.db
                .complete_task(task_id, TaskStatus::Completed, None)
                .await?;
            return Ok(());
        }

        self.db.update_account_stats(account_id, total).await?;

        progress.line("Downloading articles...").await;
        let tally = self
            .run_pool(session, account_id, name, articles, task_id, progress)
            .await;
        self.db
            .update_task_progress(task_id, total, tally.downloaded, tally.failed)
            .await?;

        if tally.downloaded + tally.failed < total {
            let message = format!(
                "cancelled after {} of {} articles",
                tally.downloaded + tally.failed,
                total
            );
            self.db
                .complete_task(task_id, TaskStatus::Failed, Some(&message))
                .await?;
            progress.line(format!("Cancelled: {}", message)).await;
        } else {
            self.db
                .complete_task(task_id, TaskStatus::Completed, None)
                .await?;
        }

        tracing::info!(
            account = name,
            downloaded = tally.downloaded,
            failed = tally.failed,
            "Account finished"
        );
        progress.line(format!("\nAccount {} finished", name)).await;
        progress
            .line(format!(
                "Succeeded: {}, failed: {}",
                tally.downloaded, tally.failed
            ))
            .await;
        progress.line("-".repeat(30)).await;

        Ok(())
    }

    /// Download `articles` with a bounded pool, in completion order
    ///
    /// Articles are submitted in list order while the run is not cancelled.
    async fn run_pool(
        &self,
        session: &Session,
        account_id: AccountId,
        name: &str,
        articles: Vec<ArticleSummary>,
        task_id: TaskId,
        progress: &Progress,
    ) -> PoolTally {
        let total = articles.len();
        let downloader = Arc::new(ArticleDownloader::new(
            session.client().clone(),
            self.db.clone(),
            account_id,
            name,
            &self.config.output_dir,
            self.config.download.clone(),
        ));
        let jitter = self.config.politeness.worker_jitter;
        let token = progress.token().clone();

        let mut completions = stream::iter(articles.into_iter().enumerate())
            .take_while(move |_| future::ready(!token.is_cancelled()))
            .map(move |(index, article)| {
                let downloader = downloader.clone();
                async move {
                    jitter.sleep().await;
                    let date = article.publish_date();
                    let outcome = downloader
                        .download_article(&article.link, &article.title, &date)
                        .await;
                    (index + 1, article.title, outcome)
                }
            })
            .buffer_unordered(self.config.download.concurrency.max(1));

        let mut tally = PoolTally::default();
        while let Some((index, title, outcome)) = completions.next().await {
            let line = match outcome {
                Ok(outcome) if outcome.success => {
                    tally.downloaded += 1;
                    format!("[{}/{}] ✓ Done: {}", index, total, title)
                }
                Ok(outcome) => {
                    tally.failed += 1;
                    format!(
                        "[{}/{}] ✗ Failed: {} ({})",
                        index,
                        total,
                        title,
                        outcome.error.unwrap_or_default()
                    )
                }
                Err(e) => {
                    tally.failed += 1;
                    tracing::error!(account = name, title = %title, error = %e, "Download task error");
                    format!("[{}/{}] ✗ Failed: {} ({})", index, total, title, e)
                }
            };
            progress.line(line).await;

            // Keep draining: in-flight articles still record their own outcome
            if let Err(e) = self
                .db
                .update_task_progress(task_id, total as i64, tally.downloaded, tally.failed)
                .await
            {
                tracing::error!(task_id = task_id.get(), error = %e, "Failed to record task progress");
            }
        }

        tally
    }

    async fn stop_rate_limited(
        &self,
        name: &str,
        task_id: TaskId,
        error: &Error,
        progress: &Progress,
    ) -> Result<()> {
        let window = self.config.politeness.rate_limit_window;
        tracing::warn!(account = name, error = %error, "Rate limited by platform");

        self.db.record_rate_limit(Some(name), window).await?;
        self.db
            .complete_task(task_id, TaskStatus::Failed, Some(&error.to_string()))
            .await?;

        progress
            .line(format!(
                "⚠️ Rate limit triggered! Wait {} minutes before trying again.",
                window.as_secs().div_ceil(60)
            ))
            .await;
        Ok(())
    }
}
