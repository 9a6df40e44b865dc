//! Article registration, download state, search and curation.
//!
//! The write path used while crawling is `record_article_seen` →
//! `set_article_content` → `mark_article_downloaded` / `mark_article_failed`.
//! Everything else serves hosts that browse the archive.

use crate::error::DatabaseError;
use crate::types::{AccountId, ArticleId};
use crate::{Error, Result};
use sqlx::{QueryBuilder, Sqlite};

use super::{Article, ArticleHit, ArticleQuery, Database, ExportRow, SortOrder};

impl Database {
    /// Register an article the first time it is observed
    ///
    /// Keyed by link. When the link is already known the existing id is
    /// returned and the stored row (title, date, state) is left untouched.
    pub async fn record_article_seen(
        &self,
        account_id: AccountId,
        title: &str,
        link: &str,
        publish_date: Option<&str>,
    ) -> Result<ArticleId> {
        let now = chrono::Utc::now().timestamp();
        sqlx::query(
            r#"
            INSERT INTO articles (account_id, title, link, publish_date, create_time)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(link) DO NOTHING
            "#,
        )
        .bind(account_id)
        .bind(title)
        .bind(link)
        .bind(publish_date)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to insert article: {}",
                e
            )))
        })?;

        let id: ArticleId = sqlx::query_scalar("SELECT id FROM articles WHERE link = ?")
            .bind(link)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to look up article id: {}",
                    e
                )))
            })?;

        Ok(id)
    }

    /// Store the extracted plain text of an article
    pub async fn set_article_content(&self, id: ArticleId, content: &str) -> Result<()> {
        sqlx::query("UPDATE articles SET content = ? WHERE id = ?")
            .bind(content)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to update article content: {}",
                    e
                )))
            })?;

        Ok(())
    }

    /// Mark an article as archived at `local_path`
    pub async fn mark_article_downloaded(
        &self,
        id: ArticleId,
        local_path: &str,
        image_count: i64,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE articles
            SET downloaded = 1, local_path = ?, image_count = ?, status = 'completed',
                error_message = NULL
            WHERE id = ?
            "#,
        )
        .bind(local_path)
        .bind(image_count)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to mark article downloaded: {}",
                e
            )))
        })?;

        Ok(())
    }

    /// Mark an article as failed and bump its retry count
    pub async fn mark_article_failed(&self, id: ArticleId, error_message: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE articles
            SET status = 'failed', error_message = ?, retry_count = retry_count + 1
            WHERE id = ?
            "#,
        )
        .bind(error_message)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to mark article failed: {}",
                e
            )))
        })?;

        Ok(())
    }

    /// Whether the article behind `link` has already been archived
    ///
    /// Unknown links are not downloaded.
    pub async fn is_downloaded(&self, link: &str) -> Result<bool> {
        let downloaded: Option<bool> =
            sqlx::query_scalar("SELECT downloaded FROM articles WHERE link = ?")
                .bind(link)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    Error::Database(DatabaseError::QueryFailed(format!(
                        "Failed to check download state: {}",
                        e
                    )))
                })?;

        Ok(downloaded.unwrap_or(false))
    }

    /// Get an article by id
    pub async fn get_article(&self, id: ArticleId) -> Result<Option<Article>> {
        let article = sqlx::query_as::<_, Article>("SELECT * FROM articles WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to get article: {}",
                    e
                )))
            })?;

        Ok(article)
    }

    /// Get an article by link
    pub async fn get_article_by_link(&self, link: &str) -> Result<Option<Article>> {
        let article = sqlx::query_as::<_, Article>("SELECT * FROM articles WHERE link = ?")
            .bind(link)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to get article by link: {}",
                    e
                )))
            })?;

        Ok(article)
    }

    /// All articles of one account, newest first
    pub async fn list_articles_by_account(&self, account_id: AccountId) -> Result<Vec<Article>> {
        let articles = sqlx::query_as::<_, Article>(
            "SELECT * FROM articles WHERE account_id = ? ORDER BY publish_date DESC, id DESC",
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to list articles: {}",
                e
            )))
        })?;

        Ok(articles)
    }

    /// Search articles with optional filters, sorted by publish date
    pub async fn search_articles(&self, query: &ArticleQuery) -> Result<Vec<ArticleHit>> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            r#"
            SELECT a.id, a.title, a.link, a.publish_date, a.downloaded, a.local_path,
                   acc.name AS account_name, a.is_favorite, a.is_read, a.tags
            FROM articles a
            JOIN accounts acc ON a.account_id = acc.id
            WHERE 1=1
            "#,
        );

        if let Some(text) = query.text.as_deref().filter(|t| !t.is_empty()) {
            let pattern = format!("%{}%", text);
            builder
                .push(" AND (a.title LIKE ")
                .push_bind(pattern.clone())
                .push(" OR a.content LIKE ")
                .push_bind(pattern)
                .push(")");
        }
        if let Some(account_id) = query.account_id {
            builder.push(" AND a.account_id = ").push_bind(account_id);
        }
        if let Some(from) = &query.date_from {
            builder.push(" AND a.publish_date >= ").push_bind(from.clone());
        }
        if let Some(to) = &query.date_to {
            builder.push(" AND a.publish_date <= ").push_bind(to.clone());
        }
        if let Some(favorite) = query.favorite {
            builder.push(" AND a.is_favorite = ").push_bind(favorite);
        }
        if let Some(read) = query.read {
            builder.push(" AND a.is_read = ").push_bind(read);
        }

        builder.push(match query.order {
            SortOrder::Asc => " ORDER BY a.publish_date ASC, a.id ASC",
            SortOrder::Desc => " ORDER BY a.publish_date DESC, a.id DESC",
        });

        if let Some(limit) = query.limit {
            builder
                .push(" LIMIT ")
                .push_bind(limit)
                .push(" OFFSET ")
                .push_bind(query.offset);
        }

        let hits = builder
            .build_query_as::<ArticleHit>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to search articles: {}",
                    e
                )))
            })?;

        Ok(hits)
    }

    /// Flip the favorite flag, returning the new value
    pub async fn toggle_favorite(&self, id: ArticleId) -> Result<bool> {
        self.toggle_flag(id, "is_favorite").await
    }

    /// Flip the read flag, returning the new value
    pub async fn toggle_read(&self, id: ArticleId) -> Result<bool> {
        self.toggle_flag(id, "is_read").await
    }

    async fn toggle_flag(&self, id: ArticleId, column: &'static str) -> Result<bool> {
        let sql = format!(
            "UPDATE articles SET {column} = NOT {column} WHERE id = ? RETURNING {column}"
        );
        let value: Option<bool> = sqlx::query_scalar(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to toggle {}: {}",
                    column, e
                )))
            })?;

        value.ok_or_else(|| Error::Database(DatabaseError::NotFound(format!("article {}", id))))
    }

    /// Replace an article's tags
    pub async fn set_tags<S: AsRef<str>>(&self, id: ArticleId, tags: &[S]) -> Result<()> {
        let joined = tags
            .iter()
            .map(|t| t.as_ref().trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(",");

        sqlx::query("UPDATE articles SET tags = ? WHERE id = ?")
            .bind(joined)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to update tags: {}",
                    e
                )))
            })?;

        Ok(())
    }

    /// Delete several articles, returning how many rows went away
    pub async fn delete_articles(&self, ids: &[ArticleId]) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("DELETE FROM articles WHERE id IN (");
        let mut separated = builder.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");

        let result = builder.build().execute(&self.pool).await.map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to delete articles: {}",
                e
            )))
        })?;

        Ok(result.rows_affected())
    }

    /// Set the read flag on several articles at once
    pub async fn mark_articles_read(&self, ids: &[ArticleId], is_read: bool) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE articles SET is_read = ");
        builder.push_bind(is_read).push(" WHERE id IN (");
        let mut separated = builder.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");

        let result = builder.build().execute(&self.pool).await.map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to mark articles read: {}",
                e
            )))
        })?;

        Ok(result.rows_affected())
    }

    /// Every article with its account name, newest first
    pub async fn list_articles_for_export(&self) -> Result<Vec<ExportRow>> {
        let rows = sqlx::query_as::<_, ExportRow>(
            r#"
            SELECT a.id, acc.name AS account_name, a.title, a.publish_date, a.status,
                   a.link, a.local_path, a.content
            FROM articles a
            JOIN accounts acc ON a.account_id = acc.id
            ORDER BY a.publish_date DESC, a.id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to list articles for export: {}",
                e
            )))
        })?;

        Ok(rows)
    }
}
