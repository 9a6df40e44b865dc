//! Account upsert and statistics.

use crate::error::DatabaseError;
use crate::types::AccountId;
use crate::{Error, Result};

use super::{Account, Database};

impl Database {
    /// Insert an account or merge into the existing row with the same name
    ///
    /// Identity fields only fill gaps: a `None` argument never clears a value
    /// already stored. Returns the id of the (new or existing) row.
    pub async fn upsert_account(
        &self,
        name: &str,
        fakeid: Option<&str>,
        nickname: Option<&str>,
        alias: Option<&str>,
    ) -> Result<AccountId> {
        let now = chrono::Utc::now().timestamp();
        let id: AccountId = sqlx::query_scalar(
            r#"
            INSERT INTO accounts (name, fakeid, nickname, alias, first_scraped_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(name) DO UPDATE SET
                fakeid = COALESCE(excluded.fakeid, accounts.fakeid),
                nickname = COALESCE(excluded.nickname, accounts.nickname),
                alias = COALESCE(excluded.alias, accounts.alias)
            RETURNING id
            "#,
        )
        .bind(name)
        .bind(fakeid)
        .bind(nickname)
        .bind(alias)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to upsert account: {}",
                e
            )))
        })?;

        Ok(id)
    }

    /// Get an account by database id
    pub async fn get_account(&self, id: AccountId) -> Result<Option<Account>> {
        let account = sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to get account: {}",
                    e
                )))
            })?;

        Ok(account)
    }

    /// Get an account by the name it was requested under
    pub async fn get_account_by_name(&self, name: &str) -> Result<Option<Account>> {
        let account = sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to get account by name: {}",
                    e
                )))
            })?;

        Ok(account)
    }

    /// List all accounts, most recently scraped first
    pub async fn list_accounts(&self) -> Result<Vec<Account>> {
        let accounts = sqlx::query_as::<_, Account>(
            "SELECT * FROM accounts ORDER BY last_scraped_at IS NULL, last_scraped_at DESC, id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to list accounts: {}",
                e
            )))
        })?;

        Ok(accounts)
    }

    /// Record a finished listing: article count and scrape time
    pub async fn update_account_stats(&self, id: AccountId, total_articles: i64) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        sqlx::query("UPDATE accounts SET last_scraped_at = ?, total_articles = ? WHERE id = ?")
            .bind(now)
            .bind(total_articles)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to update account stats: {}",
                    e
                )))
            })?;

        Ok(())
    }
}
