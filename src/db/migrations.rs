//! Opening the archive database and creating its schema

use crate::error::DatabaseError;
use crate::{Error, Result};
use sqlx::SqliteConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool};
use std::path::Path;
use std::str::FromStr;

use super::Database;

/// Latest schema version this build knows how to create
pub(crate) const SCHEMA_VERSION: i64 = 1;

fn connect_error(context: &str, e: impl std::fmt::Display) -> Error {
    Error::Database(DatabaseError::ConnectionFailed(format!(
        "Failed to {}: {}",
        context, e
    )))
}

/// SQLite options: create on demand, foreign keys on, WAL journal
fn connect_options(path: &Path) -> Result<SqliteConnectOptions> {
    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))
        .map_err(|e| connect_error("parse database path", e))?;
    Ok(options
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal))
}

impl Database {
    /// Open (or create) the archive database at `path` and bring its schema
    /// up to date
    ///
    /// A missing parent directory is created first.
    pub async fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| connect_error("create database directory", e))?;
        }

        let pool = SqlitePool::connect_with(connect_options(path)?)
            .await
            .map_err(|e| connect_error("connect to database", e))?;

        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    async fn run_migrations(&self) -> Result<()> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| connect_error("acquire connection", e))?;

        let applied = Self::applied_version(&mut conn).await?;
        tracing::debug!(applied, latest = SCHEMA_VERSION, "Checked archive schema");

        if applied < 1 {
            Self::migrate_v1(&mut conn).await?;
        }

        Ok(())
    }

    /// Highest migration recorded in `schema_version`, 0 for a fresh file
    async fn applied_version(conn: &mut SqliteConnection) -> Result<i64> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY,
                applied_at INTEGER NOT NULL
            )",
        )
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::MigrationFailed(format!(
                "Failed to create schema_version table: {}",
                e
            )))
        })?;

        let version: Option<i64> = sqlx::query_scalar("SELECT MAX(version) FROM schema_version")
            .fetch_one(&mut *conn)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to query schema version: {}",
                    e
                )))
            })?;

        Ok(version.unwrap_or(0))
    }

    /// Migration v1: accounts, articles, tasks and rate-limit events
    async fn migrate_v1(conn: &mut SqliteConnection) -> Result<()> {
        tracing::info!("Applying database migration v1");

        sqlx::query("BEGIN")
            .execute(&mut *conn)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::MigrationFailed(format!(
                    "Failed to begin transaction: {}",
                    e
                )))
            })?;

        let result = async {
            Self::create_accounts_schema(conn).await?;
            Self::create_articles_schema(conn).await?;
            Self::create_tasks_table(conn).await?;
            Self::create_rate_limits_table(conn).await?;
            Self::record_migration(conn, 1).await?;
            Ok::<(), Error>(())
        }
        .await;

        match result {
            Ok(()) => {
                sqlx::query("COMMIT")
                    .execute(&mut *conn)
                    .await
                    .map_err(|e| {
                        Error::Database(DatabaseError::MigrationFailed(format!(
                            "Failed to commit migration v1: {}",
                            e
                        )))
                    })?;
            }
            Err(e) => {
                let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
                return Err(e);
            }
        }

        tracing::info!("Database migration v1 complete");
        Ok(())
    }

    /// Create accounts table and its index
    async fn create_accounts_schema(conn: &mut SqliteConnection) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE accounts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT UNIQUE NOT NULL,
                fakeid TEXT,
                nickname TEXT,
                alias TEXT,
                first_scraped_at INTEGER NOT NULL,
                last_scraped_at INTEGER,
                total_articles INTEGER NOT NULL DEFAULT 0,
                status TEXT NOT NULL DEFAULT 'active'
            )
            "#,
        )
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::MigrationFailed(format!(
                "Failed to create accounts table: {}",
                e
            )))
        })?;

        sqlx::query("CREATE INDEX idx_accounts_last_scraped ON accounts(last_scraped_at)")
            .execute(&mut *conn)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::MigrationFailed(format!(
                    "Failed to create accounts index: {}",
                    e
                )))
            })?;

        Ok(())
    }

    /// Create articles table and its indexes
    async fn create_articles_schema(conn: &mut SqliteConnection) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE articles (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                account_id INTEGER NOT NULL,
                title TEXT NOT NULL,
                link TEXT UNIQUE NOT NULL,
                cover_url TEXT,
                publish_date TEXT,
                create_time INTEGER NOT NULL,
                downloaded INTEGER NOT NULL DEFAULT 0,
                local_path TEXT,
                image_count INTEGER NOT NULL DEFAULT 0,
                read_count INTEGER NOT NULL DEFAULT 0,
                status TEXT NOT NULL DEFAULT 'pending',
                error_message TEXT,
                retry_count INTEGER NOT NULL DEFAULT 0,
                content TEXT,
                is_favorite INTEGER NOT NULL DEFAULT 0,
                is_read INTEGER NOT NULL DEFAULT 0,
                tags TEXT,
                FOREIGN KEY (account_id) REFERENCES accounts(id) ON DELETE CASCADE
            )
            "#,
        )
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::MigrationFailed(format!(
                "Failed to create articles table: {}",
                e
            )))
        })?;

        for (name, column) in [
            ("idx_articles_account_id", "account_id"),
            ("idx_articles_publish_date", "publish_date"),
            ("idx_articles_downloaded", "downloaded"),
            ("idx_articles_is_favorite", "is_favorite"),
            ("idx_articles_is_read", "is_read"),
        ] {
            sqlx::query(&format!("CREATE INDEX {} ON articles({})", name, column))
                .execute(&mut *conn)
                .await
                .map_err(|e| {
                    Error::Database(DatabaseError::MigrationFailed(format!(
                        "Failed to create index {}: {}",
                        name, e
                    )))
                })?;
        }

        Ok(())
    }

    /// Create tasks table
    async fn create_tasks_table(conn: &mut SqliteConnection) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE tasks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                account_name TEXT NOT NULL,
                type TEXT NOT NULL,
                pages INTEGER NOT NULL,
                status TEXT NOT NULL,
                total_articles INTEGER NOT NULL DEFAULT 0,
                downloaded_count INTEGER NOT NULL DEFAULT 0,
                failed_count INTEGER NOT NULL DEFAULT 0,
                create_time INTEGER NOT NULL,
                end_time INTEGER,
                error_message TEXT
            )
            "#,
        )
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::MigrationFailed(format!(
                "Failed to create tasks table: {}",
                e
            )))
        })?;

        Ok(())
    }

    /// Create rate_limits table
    async fn create_rate_limits_table(conn: &mut SqliteConnection) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE rate_limits (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                account_name TEXT,
                triggered_at INTEGER NOT NULL,
                reset_time INTEGER NOT NULL
            )
            "#,
        )
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::MigrationFailed(format!(
                "Failed to create rate_limits table: {}",
                e
            )))
        })?;

        sqlx::query("CREATE INDEX idx_rate_limits_triggered_at ON rate_limits(triggered_at)")
            .execute(&mut *conn)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::MigrationFailed(format!(
                    "Failed to create rate_limits index: {}",
                    e
                )))
            })?;

        Ok(())
    }

    /// Record a migration version as applied
    async fn record_migration(conn: &mut SqliteConnection, version: i32) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        sqlx::query("INSERT INTO schema_version (version, applied_at) VALUES (?, ?)")
            .bind(version)
            .bind(now)
            .execute(&mut *conn)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::MigrationFailed(format!(
                    "Failed to record migration: {}",
                    e
                )))
            })?;

        Ok(())
    }

    /// Close the database connection
    pub async fn close(self) {
        self.pool.close().await;
    }

    /// Get the underlying connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
