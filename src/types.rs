//! Core types for wechat-dl

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

macro_rules! row_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// Get the inner i64 value
            pub fn get(&self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl sqlx::Type<sqlx::Sqlite> for $name {
            fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
                <i64 as sqlx::Type<sqlx::Sqlite>>::type_info()
            }

            fn compatible(ty: &sqlx::sqlite::SqliteTypeInfo) -> bool {
                <i64 as sqlx::Type<sqlx::Sqlite>>::compatible(ty)
            }
        }

        impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
            ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
                sqlx::Encode::<sqlx::Sqlite>::encode_by_ref(&self.0, buf)
            }
        }

        impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for $name {
            fn decode(
                value: sqlx::sqlite::SqliteValueRef<'r>,
            ) -> Result<Self, sqlx::error::BoxDynError> {
                let id = <i64 as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
                Ok(Self(id))
            }
        }
    };
}

row_id!(
    /// Database id of an account
    AccountId
);
row_id!(
    /// Database id of an article
    ArticleId
);
row_id!(
    /// Database id of a scrape task
    TaskId
);

/// Article lifecycle status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArticleStatus {
    /// Seen in a listing, not yet downloaded
    Pending,
    /// Artifact written
    Completed,
    /// Download failed permanently or after all retries
    Failed,
}

impl ArticleStatus {
    /// Text stored in the `articles.status` column
    pub fn as_str(&self) -> &'static str {
        match self {
            ArticleStatus::Pending => "pending",
            ArticleStatus::Completed => "completed",
            ArticleStatus::Failed => "failed",
        }
    }

    /// Parse the stored column value
    ///
    /// Older archives wrote `success` for completed rows.
    pub fn from_db(value: &str) -> Self {
        match value {
            "completed" | "success" => ArticleStatus::Completed,
            "failed" => ArticleStatus::Failed,
            _ => ArticleStatus::Pending,
        }
    }
}

/// Scrape task status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Account is being processed
    Running,
    /// Processing finished (individual articles may still have failed)
    Completed,
    /// Processing aborted (rate limit, unknown account, store failure...)
    Failed,
}

impl TaskStatus {
    /// Text stored in the `tasks.status` column
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }

    /// Parse the stored column value
    pub fn from_db(value: &str) -> Self {
        match value {
            "running" => TaskStatus::Running,
            "completed" => TaskStatus::Completed,
            _ => TaskStatus::Failed,
        }
    }

    /// Whether the task has been finalized
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TaskStatus::Running)
    }
}

/// How an account scrape was requested
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    /// A single account on its own
    Single,
    /// One member of a batch
    Batch,
}

impl TaskKind {
    /// Text stored in the `tasks.type` column
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Single => "single",
            TaskKind::Batch => "batch",
        }
    }

    /// Parse the stored column value
    pub fn from_db(value: &str) -> Self {
        match value {
            "batch" => TaskKind::Batch,
            _ => TaskKind::Single,
        }
    }
}

/// Result of one `download_article` call
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DownloadOutcome {
    /// Whether the article is archived (newly or previously)
    pub success: bool,
    /// Article row id; `None` when the article was skipped as already downloaded
    pub article_id: Option<ArticleId>,
    /// Number of images found in the content region
    pub image_count: usize,
    /// Path of the rendered artifact when one was written by this call
    pub path: Option<PathBuf>,
    /// Error message for failed downloads
    pub error: Option<String>,
    /// True when the article was already downloaded and nothing was fetched
    pub skipped: bool,
}

impl DownloadOutcome {
    /// An already-archived article
    pub fn skipped() -> Self {
        Self {
            success: true,
            article_id: None,
            image_count: 0,
            path: None,
            error: None,
            skipped: true,
        }
    }

    /// A freshly archived article
    pub fn downloaded(article_id: ArticleId, image_count: usize, path: PathBuf) -> Self {
        Self {
            success: true,
            article_id: Some(article_id),
            image_count,
            path: Some(path),
            error: None,
            skipped: false,
        }
    }

    /// A failed article
    pub fn failed(article_id: ArticleId, error: String) -> Self {
        Self {
            success: false,
            article_id: Some(article_id),
            image_count: 0,
            path: None,
            error: Some(error),
            skipped: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn article_status_accepts_legacy_success() {
        assert_eq!(ArticleStatus::from_db("success"), ArticleStatus::Completed);
        assert_eq!(
            ArticleStatus::from_db("completed"),
            ArticleStatus::Completed
        );
        assert_eq!(ArticleStatus::from_db("failed"), ArticleStatus::Failed);
        assert_eq!(ArticleStatus::from_db("pending"), ArticleStatus::Pending);
        assert_eq!(ArticleStatus::from_db("garbage"), ArticleStatus::Pending);
    }

    #[test]
    fn task_status_terminality() {
        assert!(!TaskStatus::Running.is_terminal());
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        for status in [TaskStatus::Running, TaskStatus::Completed, TaskStatus::Failed] {
            assert_eq!(TaskStatus::from_db(status.as_str()), status);
        }
    }

    #[test]
    fn task_kind_column_values() {
        assert_eq!(TaskKind::Single.as_str(), "single");
        assert_eq!(TaskKind::Batch.as_str(), "batch");
        assert_eq!(TaskKind::from_db("batch"), TaskKind::Batch);
        assert_eq!(TaskKind::from_db("single"), TaskKind::Single);
    }

    #[test]
    fn ids_display_as_integers() {
        assert_eq!(ArticleId(12).to_string(), "12");
        assert_eq!(i64::from(TaskId(3)), 3);
        assert_eq!(AccountId::from(9).get(), 9);
    }
}
