//! Store contracts
//!
//! The three keyed stores the timeline service is built on. Each store is
//! the only writer of its own keys; none of them offers multi-key
//! transactions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;

use super::models::{Tweet, TweetId, UserId};
use crate::error::StoreError;

/// How long a tweet stays resolvable after creation
pub const TWEET_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Capacity of a per-user timeline list
pub const MAX_TWEETS_IN_TIMELINE: usize = 10;

/// Instant at which a tweet stored at `stored_at` stops resolving
pub fn tweet_expires_at(stored_at: DateTime<Utc>) -> DateTime<Utc> {
    stored_at + chrono::Duration::seconds(TWEET_TTL.as_secs() as i64)
}

/// Follower sets, one per followed user
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FollowGraphStore: Send + Sync {
    /// Ensure `new_follower_id` is in `user_id`'s follower set
    ///
    /// Re-adding an existing member is not an error.
    async fn add_follower(&self, user_id: UserId, new_follower_id: UserId)
    -> Result<(), StoreError>;

    /// Followers of `user_id`, in no particular order
    async fn get_followers(&self, user_id: UserId) -> Result<Vec<UserId>, StoreError>;
}

/// Tweet bodies keyed by generated identifier, expiring after [`TWEET_TTL`]
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TweetStore: Send + Sync {
    /// Persist `tweet` under a fresh identifier and return it
    async fn create_tweet(&self, tweet: &Tweet) -> Result<TweetId, StoreError>;

    /// Resolve `ids` in order
    ///
    /// Stops at the first identifier that is missing or expired and returns
    /// what was resolved up to that point. Identifiers after the gap are
    /// not looked at. Any other failure aborts the whole call.
    async fn get_tweets(&self, ids: &[TweetId]) -> Result<Vec<Tweet>, StoreError>;

    /// Drop tweets past their expiry horizon, returning how many went
    async fn purge_expired(&self) -> Result<u64, StoreError>;
}

/// Bounded newest-first lists of tweet identifiers, one per user
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TimelineStore: Send + Sync {
    /// Push `tweet_id` to the head of `user_id`'s timeline
    ///
    /// Evicts the tail first when the list already holds
    /// [`MAX_TWEETS_IN_TIMELINE`] entries. Duplicates are not filtered.
    async fn add_tweet_to_timeline(
        &self,
        tweet_id: TweetId,
        user_id: UserId,
    ) -> Result<(), StoreError>;

    /// Stored identifiers for `user_id`, newest first
    async fn get_timeline(&self, user_id: UserId) -> Result<Vec<TweetId>, StoreError>;
}
