//! Rate-limit events and the derived cooldown state.
//!
//! Events are append-only. Only the most recent one decides whether the
//! crawler is currently limited; older rows stay for history. The `*_at`
//! variants take the clock as an argument.

use crate::error::DatabaseError;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use std::time::Duration;

use super::{Database, RateLimitEvent, RateLimitStatus};

impl Database {
    /// Append a rate-limit event triggered now
    pub async fn record_rate_limit(
        &self,
        account_name: Option<&str>,
        window: Duration,
    ) -> Result<i64> {
        self.record_rate_limit_at(account_name, Utc::now().timestamp(), window)
            .await
    }

    /// Append a rate-limit event triggered at `triggered_at` (unix seconds)
    pub async fn record_rate_limit_at(
        &self,
        account_name: Option<&str>,
        triggered_at: i64,
        window: Duration,
    ) -> Result<i64> {
        let reset_time = triggered_at.saturating_add(window.as_secs() as i64);
        let result = sqlx::query(
            "INSERT INTO rate_limits (account_name, triggered_at, reset_time) VALUES (?, ?, ?)",
        )
        .bind(account_name)
        .bind(triggered_at)
        .bind(reset_time)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to record rate limit: {}",
                e
            )))
        })?;

        Ok(result.last_insert_rowid())
    }

    /// The most recent rate-limit event, if any
    pub async fn latest_rate_limit(&self) -> Result<Option<RateLimitEvent>> {
        let event = sqlx::query_as::<_, RateLimitEvent>(
            "SELECT * FROM rate_limits ORDER BY triggered_at DESC, id DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to get latest rate limit: {}",
                e
            )))
        })?;

        Ok(event)
    }

    /// Whether the latest event's cooldown is still running
    pub async fn is_rate_limited(&self) -> Result<bool> {
        self.is_rate_limited_at(Utc::now().timestamp()).await
    }

    /// Whether the latest event's cooldown is running at `now` (unix seconds)
    pub async fn is_rate_limited_at(&self, now: i64) -> Result<bool> {
        Ok(self
            .latest_rate_limit()
            .await?
            .is_some_and(|event| now < event.reset_time))
    }

    /// Reset time and remaining seconds of the latest event
    pub async fn rate_limit_status(&self) -> Result<Option<RateLimitStatus>> {
        self.rate_limit_status_at(Utc::now().timestamp()).await
    }

    /// Reset time and remaining seconds of the latest event, seen at `now`
    ///
    /// Remaining seconds are clamped at zero once the cooldown has passed.
    pub async fn rate_limit_status_at(&self, now: i64) -> Result<Option<RateLimitStatus>> {
        let Some(event) = self.latest_rate_limit().await? else {
            return Ok(None);
        };

        let reset_time = DateTime::<Utc>::from_timestamp(event.reset_time, 0).ok_or_else(|| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Invalid reset time stored: {}",
                event.reset_time
            )))
        })?;

        Ok(Some(RateLimitStatus {
            reset_time,
            remaining_seconds: (event.reset_time - now).max(0),
        }))
    }
}
