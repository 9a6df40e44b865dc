//! Article downloads
//!
//! [`ArticleDownloader`] turns one article link into a rendered artifact under
//! `{output_root}/{account}/`, with images saved to `{account}/images/`, and
//! records the outcome in the store. Whole-article failures are retried per
//! `download.article_retry`; a single image that keeps failing is left out of
//! the artifact without failing the article.

use crate::config::DownloadConfig;
use crate::db::Database;
use crate::error::{ArtifactError, Error, Result};
use crate::platform::PlatformClient;
use crate::retry::download_with_retry;
use crate::types::{AccountId, ArticleId, DownloadOutcome};
use std::path::{Path, PathBuf};
use std::sync::Arc;

mod extract;
mod filename;
mod render;

pub use filename::{article_file_name, image_file_name, sanitize_filename};

use extract::extract_article;
use render::{ImageFate, render_content, render_document};

/// Directory under the account directory that holds images
pub const IMAGES_DIR: &str = "images";

// A near-empty container on a page with this much body text points at a
// layout the selectors do not know
const BODY_TEXT_HINT_CHARS: usize = 200;

/// Downloads articles of one account
pub struct ArticleDownloader {
    client: Arc<PlatformClient>,
    db: Arc<Database>,
    account_id: AccountId,
    account_name: String,
    account_dir: PathBuf,
    config: DownloadConfig,
}

impl ArticleDownloader {
    /// Create a downloader writing below `output_root/{account_name}`
    pub fn new(
        client: Arc<PlatformClient>,
        db: Arc<Database>,
        account_id: AccountId,
        account_name: &str,
        output_root: &Path,
        config: DownloadConfig,
    ) -> Self {
        Self {
            client,
            db,
            account_id,
            account_name: account_name.to_string(),
            account_dir: output_root.join(sanitize_filename(account_name)),
            config,
        }
    }

    /// Directory rendered articles are written to
    pub fn account_dir(&self) -> &Path {
        &self.account_dir
    }

    /// Directory images are written to
    pub fn images_dir(&self) -> PathBuf {
        self.account_dir.join(IMAGES_DIR)
    }

    /// Download one article
    ///
    /// An article already marked downloaded is skipped without any network
    /// request. Otherwise the article is registered, fetched, rendered and
    /// marked downloaded; on failure it is marked failed once, after the retry
    /// budget is spent. Structural failures (verification page, restricted
    /// access, unknown layout) are not retried.
    ///
    /// # Errors
    /// Only store failures are returned as `Err`; download failures are
    /// reported through [`DownloadOutcome::error`].
    pub async fn download_article(
        &self,
        url: &str,
        title: &str,
        publish_date: &str,
    ) -> Result<DownloadOutcome> {
        if self.db.is_downloaded(url).await? {
            tracing::info!(title, "Already downloaded, skipping");
            return Ok(DownloadOutcome::skipped());
        }

        let article_id = self
            .db
            .record_article_seen(self.account_id, title, url, Some(publish_date))
            .await?;

        tracing::info!(article_id = article_id.get(), title, "Downloading article");

        let result = download_with_retry(&self.config.article_retry, || {
            self.attempt(article_id, url, title, publish_date)
        })
        .await;

        match result {
            Ok((image_count, path)) => {
                tracing::info!(
                    article_id = article_id.get(),
                    images = image_count,
                    path = %path.display(),
                    "Article saved"
                );
                Ok(DownloadOutcome::downloaded(article_id, image_count, path))
            }
            Err(e @ (Error::Database(_) | Error::Sqlx(_))) => Err(e),
            Err(e) => {
                let message = failure_message(&e);
                tracing::error!(
                    article_id = article_id.get(),
                    title,
                    error = %message,
                    "Article download failed"
                );
                self.db.mark_article_failed(article_id, &message).await?;
                Ok(DownloadOutcome::failed(article_id, message))
            }
        }
    }

    async fn attempt(
        &self,
        article_id: ArticleId,
        url: &str,
        title: &str,
        publish_date: &str,
    ) -> Result<(usize, PathBuf)> {
        let html = self.client.fetch_article_page(url).await?;
        let content = extract_article(&html, title)?;

        if !content.text.is_empty() {
            self.db.set_article_content(article_id, &content.text).await?;
        }

        let text_chars = content.text.chars().count();
        if text_chars < self.config.min_content_chars && content.image_count() == 0 {
            if content.body_text_chars > BODY_TEXT_HINT_CHARS {
                tracing::warn!(
                    title,
                    text_chars,
                    body_chars = content.body_text_chars,
                    "Content container is nearly empty but the page body has text"
                );
            } else {
                tracing::warn!(title, text_chars, "Article looks empty");
            }
        }

        let images_dir = self.images_dir();
        tokio::fs::create_dir_all(&images_dir)
            .await
            .map_err(|e| ArtifactError::CreateDir {
                path: images_dir.clone(),
                reason: e.to_string(),
            })?;

        let mut fates = Vec::with_capacity(content.image_count());
        for (ordinal, image) in content.images.iter().enumerate() {
            let Some(source) = image.source.as_deref() else {
                fates.push(ImageFate::Untouched);
                continue;
            };

            let file_name = image_file_name(title, ordinal, image.format.as_deref());
            let image_url = resolve_image_url(url, source);
            let target = images_dir.join(&file_name);

            match self.save_image(&image_url, &target).await {
                Ok(()) => fates.push(ImageFate::Localized(format!("{}/{}", IMAGES_DIR, file_name))),
                Err(e) => {
                    tracing::warn!(
                        article_id = article_id.get(),
                        url = %image_url,
                        error = %e,
                        "Image failed, leaving it out"
                    );
                    fates.push(ImageFate::Dropped);
                }
            }
        }

        let body = render_content(&content, &fates);
        let document = render_document(title, &self.account_name, publish_date, &body);

        let path = self.account_dir.join(article_file_name(publish_date, title));
        tokio::fs::write(&path, document)
            .await
            .map_err(|e| ArtifactError::Write {
                path: path.clone(),
                reason: e.to_string(),
            })?;

        let image_count = content.image_count();
        self.db
            .mark_article_downloaded(article_id, &path.to_string_lossy(), image_count as i64)
            .await?;

        Ok((image_count, path))
    }

    async fn save_image(&self, url: &str, target: &Path) -> Result<()> {
        download_with_retry(&self.config.image_retry, || async move {
            let bytes = self.client.fetch_image(url).await?;
            tokio::fs::write(target, bytes)
                .await
                .map_err(|e| ArtifactError::Write {
                    path: target.to_path_buf(),
                    reason: e.to_string(),
                })?;
            Ok::<(), Error>(())
        })
        .await
    }
}

/// Resolve protocol-relative and relative image sources against the page URL
fn resolve_image_url(page_url: &str, source: &str) -> String {
    url::Url::parse(page_url)
        .and_then(|base| base.join(source))
        .map(String::from)
        .unwrap_or_else(|_| source.to_string())
}

fn failure_message(error: &Error) -> String {
    match error {
        Error::ContentParse(e) => e.to_string(),
        other => format!("download error: {}", other),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
