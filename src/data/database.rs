//! SQLite store
//!
//! Durable backend for the follow graph, tweet and timeline stores.
//! Uses SQLx with embedded migrations.
//!
//! User IDs are stored as `INTEGER` by reinterpreting the `u64` bits as
//! `i64`, so every ID round-trips unchanged.

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use super::models::{Tweet, TweetId, UserId};
use super::store::{
    FollowGraphStore, MAX_TWEETS_IN_TIMELINE, TimelineStore, TweetStore, tweet_expires_at,
};
use crate::clock::Clock;
use crate::error::StoreError;
use crate::metrics::{STORE_OPERATION_DURATION_SECONDS, STORE_OPERATIONS_TOTAL};

const BACKEND: &str = "sqlite";

/// How long a writer waits for the database lock before failing
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

fn to_db_id(id: UserId) -> i64 {
    id as i64
}

fn from_db_id(id: i64) -> UserId {
    id as UserId
}

/// Starts a duration timer and bumps the operation counter
fn observe(operation: &str) -> prometheus::HistogramTimer {
    STORE_OPERATIONS_TOTAL
        .with_label_values(&[BACKEND, operation])
        .inc();
    STORE_OPERATION_DURATION_SECONDS
        .with_label_values(&[BACKEND, operation])
        .start_timer()
}

/// SQLite implementation of all three stores
pub struct SqliteStore {
    pool: Pool<Sqlite>,
    clock: Arc<dyn Clock>,
    /// SQLite admits one writer at a time; fan-out queues here instead of
    /// spinning on the busy handler.
    timeline_writes: Mutex<()>,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `path` and run migrations
    ///
    /// # Errors
    /// Returns error if the file cannot be created or migrations fail
    pub async fn connect(path: &Path, clock: Arc<dyn Clock>) -> Result<Self, StoreError> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(sqlx::Error::Io)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| {
                tracing::error!("Migration failed: {}", e);
                StoreError::Database(sqlx::Error::Migrate(Box::new(e)))
            })?;

        tracing::info!(path = %path.display(), "Database connected and migrated successfully");

        Ok(Self {
            pool,
            clock,
            timeline_writes: Mutex::new(()),
        })
    }

    /// Store a raw payload under `id`, bypassing serialization
    ///
    /// Used by tests to plant malformed rows.
    #[cfg(test)]
    pub(crate) async fn insert_raw_tweet(
        &self,
        id: TweetId,
        payload: &str,
    ) -> Result<(), StoreError> {
        let expires_at = tweet_expires_at(self.clock.now()).timestamp_millis();
        sqlx::query("INSERT INTO tweets (id, payload, expires_at) VALUES (?, ?, ?)")
            .bind(id.to_string())
            .bind(payload)
            .bind(expires_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl FollowGraphStore for SqliteStore {
    async fn add_follower(
        &self,
        user_id: UserId,
        new_follower_id: UserId,
    ) -> Result<(), StoreError> {
        let _timer = observe("add_follower");
        sqlx::query(
            "INSERT OR IGNORE INTO followers (user_id, follower_id, created_at) VALUES (?, ?, ?)",
        )
        .bind(to_db_id(user_id))
        .bind(to_db_id(new_follower_id))
        .bind(self.clock.now().timestamp_millis())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_followers(&self, user_id: UserId) -> Result<Vec<UserId>, StoreError> {
        let _timer = observe("get_followers");
        let ids =
            sqlx::query_scalar::<_, i64>("SELECT follower_id FROM followers WHERE user_id = ?")
                .bind(to_db_id(user_id))
                .fetch_all(&self.pool)
                .await?;

        Ok(ids.into_iter().map(from_db_id).collect())
    }
}

#[async_trait]
impl TweetStore for SqliteStore {
    async fn create_tweet(&self, tweet: &Tweet) -> Result<TweetId, StoreError> {
        let _timer = observe("create_tweet");
        let tweet_id = TweetId::new();
        let payload = serde_json::to_string(tweet)?;
        let expires_at = tweet_expires_at(self.clock.now()).timestamp_millis();

        sqlx::query("INSERT INTO tweets (id, payload, expires_at) VALUES (?, ?, ?)")
            .bind(tweet_id.to_string())
            .bind(payload)
            .bind(expires_at)
            .execute(&self.pool)
            .await?;

        Ok(tweet_id)
    }

    async fn get_tweets(&self, ids: &[TweetId]) -> Result<Vec<Tweet>, StoreError> {
        let _timer = observe("get_tweets");
        let now = self.clock.now().timestamp_millis();
        let mut tweets = Vec::with_capacity(ids.len());

        for id in ids {
            let payload = sqlx::query_scalar::<_, String>(
                "SELECT payload FROM tweets WHERE id = ? AND expires_at > ?",
            )
            .bind(id.to_string())
            .bind(now)
            .fetch_optional(&self.pool)
            .await?;

            let Some(payload) = payload else {
                // ttl reached
                break;
            };

            tweets.push(serde_json::from_str::<Tweet>(&payload)?);
        }

        Ok(tweets)
    }

    async fn purge_expired(&self) -> Result<u64, StoreError> {
        let _timer = observe("purge_expired");
        let result = sqlx::query("DELETE FROM tweets WHERE expires_at <= ?")
            .bind(self.clock.now().timestamp_millis())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl TimelineStore for SqliteStore {
    async fn add_tweet_to_timeline(
        &self,
        tweet_id: TweetId,
        user_id: UserId,
    ) -> Result<(), StoreError> {
        let _timer = observe("add_tweet_to_timeline");
        let user_id = to_db_id(user_id);
        let _guard = self.timeline_writes.lock().await;
        let mut tx = self.pool.begin().await?;

        // Write before reading so the transaction takes the write lock up
        // front and concurrent fan-out waits on the busy timeout.
        sqlx::query(
            "INSERT INTO timeline_entries (user_id, position, tweet_id)
             SELECT ?, COALESCE(MAX(position), 0) + 1, ?
             FROM timeline_entries WHERE user_id = ?",
        )
        .bind(user_id)
        .bind(tweet_id.to_string())
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "DELETE FROM timeline_entries WHERE user_id = ? AND position NOT IN (
                SELECT position FROM timeline_entries
                WHERE user_id = ?
                ORDER BY position DESC
                LIMIT ?
            )",
        )
        .bind(user_id)
        .bind(user_id)
        .bind(MAX_TWEETS_IN_TIMELINE as i64)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn get_timeline(&self, user_id: UserId) -> Result<Vec<TweetId>, StoreError> {
        let _timer = observe("get_timeline");
        let ids = sqlx::query_scalar::<_, String>(
            "SELECT tweet_id FROM timeline_entries WHERE user_id = ? ORDER BY position DESC",
        )
        .bind(to_db_id(user_id))
        .fetch_all(&self.pool)
        .await?;

        ids.iter().map(|id| id.parse::<TweetId>()).collect()
    }
}
