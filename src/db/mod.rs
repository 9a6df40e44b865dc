//! Database layer for wechat-dl
//!
//! Handles SQLite persistence for accounts, articles, scrape tasks and
//! rate-limit events.
//!
//! ## Submodules
//!
//! Methods on [`Database`] are organized by domain:
//! - [`migrations`] - Database lifecycle, schema migrations
//! - [`accounts`] - Account upsert and statistics
//! - [`articles`] - Article registration, download state, search and curation
//! - [`tasks`] - Scrape task lifecycle
//! - [`rate_limits`] - Rate-limit events and the derived cooldown state

use crate::types::{AccountId, ArticleId, ArticleStatus, TaskId, TaskKind, TaskStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, sqlite::SqlitePool};

mod accounts;
mod articles;
mod migrations;
mod rate_limits;
mod tasks;

/// Account record from database
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Account {
    /// Unique database ID
    pub id: AccountId,
    /// Name the account was requested under (natural key)
    pub name: String,
    /// Platform-internal account id
    pub fakeid: Option<String>,
    /// Display name reported by the platform
    pub nickname: Option<String>,
    /// Alias (the account's WeChat id), if any
    pub alias: Option<String>,
    /// Unix timestamp of the first scrape
    pub first_scraped_at: i64,
    /// Unix timestamp of the most recent scrape
    pub last_scraped_at: Option<i64>,
    /// Article count seen on the most recent scrape
    pub total_articles: i64,
    /// Account status (`active`)
    pub status: String,
}

/// Article record from database
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Article {
    /// Unique database ID
    pub id: ArticleId,
    /// Owning account
    pub account_id: AccountId,
    /// Article title
    pub title: String,
    /// Canonical article link (unique)
    pub link: String,
    /// Cover image URL
    pub cover_url: Option<String>,
    /// Publish date (YYYY-MM-DD)
    pub publish_date: Option<String>,
    /// Unix timestamp when the article was first seen
    pub create_time: i64,
    /// Whether the artifact has been written
    pub downloaded: bool,
    /// Path of the rendered artifact
    pub local_path: Option<String>,
    /// Number of images in the content region
    pub image_count: i64,
    /// Platform-reported read count
    pub read_count: i64,
    /// Lifecycle status column (see [`Article::status`])
    #[sqlx(rename = "status")]
    #[serde(rename = "status")]
    pub status_text: String,
    /// Last failure message
    pub error_message: Option<String>,
    /// Number of recorded failures
    pub retry_count: i64,
    /// Extracted plain text, for search
    pub content: Option<String>,
    /// Favorite flag
    pub is_favorite: bool,
    /// Read flag
    pub is_read: bool,
    /// Comma-separated tags
    pub tags: Option<String>,
}

impl Article {
    /// Parsed lifecycle status
    pub fn status(&self) -> ArticleStatus {
        ArticleStatus::from_db(&self.status_text)
    }

    /// Tags split on commas, blanks removed
    pub fn tag_list(&self) -> Vec<String> {
        self.tags
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from)
            .collect()
    }
}

/// One row of an article search, joined with its account
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ArticleHit {
    /// Article id
    pub id: ArticleId,
    /// Article title
    pub title: String,
    /// Article link
    pub link: String,
    /// Publish date (YYYY-MM-DD)
    pub publish_date: Option<String>,
    /// Whether the artifact has been written
    pub downloaded: bool,
    /// Path of the rendered artifact
    pub local_path: Option<String>,
    /// Name of the owning account
    pub account_name: String,
    /// Favorite flag
    pub is_favorite: bool,
    /// Read flag
    pub is_read: bool,
    /// Comma-separated tags
    pub tags: Option<String>,
}

/// One row of the export listing
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ExportRow {
    /// Article id
    pub id: ArticleId,
    /// Name of the owning account
    pub account_name: String,
    /// Article title
    pub title: String,
    /// Publish date (YYYY-MM-DD)
    pub publish_date: Option<String>,
    /// Lifecycle status column
    pub status: String,
    /// Article link
    pub link: String,
    /// Path of the rendered artifact
    pub local_path: Option<String>,
    /// Extracted plain text
    pub content: Option<String>,
}

/// Sort direction for article searches (by publish date)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Oldest first
    Asc,
    /// Newest first
    #[default]
    Desc,
}

/// Filters for [`Database::search_articles`]
///
/// Every `None` filter is ignored; the default query returns every article,
/// newest first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArticleQuery {
    /// Substring matched against title and extracted content
    pub text: Option<String>,
    /// Restrict to one account
    pub account_id: Option<AccountId>,
    /// Earliest publish date (inclusive, YYYY-MM-DD)
    pub date_from: Option<String>,
    /// Latest publish date (inclusive, YYYY-MM-DD)
    pub date_to: Option<String>,
    /// Favorite flag filter
    pub favorite: Option<bool>,
    /// Read flag filter
    pub read: Option<bool>,
    /// Sort direction
    #[serde(default)]
    pub order: SortOrder,
    /// Page size
    pub limit: Option<i64>,
    /// Rows to skip (only applied together with `limit`)
    #[serde(default)]
    pub offset: i64,
}

/// Scrape task record from database
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Task {
    /// Unique database ID
    pub id: TaskId,
    /// Account the task processes
    pub account_name: String,
    /// Task kind column (see [`Task::kind`])
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub kind_text: String,
    /// Requested page count
    pub pages: i64,
    /// Task status column (see [`Task::status`])
    #[sqlx(rename = "status")]
    #[serde(rename = "status")]
    pub status_text: String,
    /// Articles found
    pub total_articles: i64,
    /// Articles archived
    pub downloaded_count: i64,
    /// Articles failed
    pub failed_count: i64,
    /// Unix timestamp when the task started
    pub create_time: i64,
    /// Unix timestamp when the task was finalized
    pub end_time: Option<i64>,
    /// Failure message for failed tasks
    pub error_message: Option<String>,
}

impl Task {
    /// Parsed task status
    pub fn status(&self) -> TaskStatus {
        TaskStatus::from_db(&self.status_text)
    }

    /// Parsed task kind
    pub fn kind(&self) -> TaskKind {
        TaskKind::from_db(&self.kind_text)
    }
}

/// Rate-limit event record from database
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RateLimitEvent {
    /// Unique database ID
    pub id: i64,
    /// Account being processed when the limit hit
    pub account_name: Option<String>,
    /// Unix timestamp of the trigger
    pub triggered_at: i64,
    /// Unix timestamp after which the limit is assumed lifted
    pub reset_time: i64,
}

/// Current cooldown derived from the latest rate-limit event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RateLimitStatus {
    /// When the cooldown ends
    pub reset_time: DateTime<Utc>,
    /// Seconds left until `reset_time`, never negative
    pub remaining_seconds: i64,
}

/// Database handle for wechat-dl
pub struct Database {
    pool: SqlitePool,
}
