//! In-memory store
//!
//! Volatile backend, cleared on restart. Tweets live in a Moka cache
//! whose wall-clock TTL reclaims memory; visibility is still decided by
//! `expires_at` against the injected clock so reads are deterministic.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use moka::future::Cache;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;

use super::models::{Tweet, TweetId, UserId};
use super::store::{
    FollowGraphStore, MAX_TWEETS_IN_TIMELINE, TWEET_TTL, TimelineStore, TweetStore,
    tweet_expires_at,
};
use crate::clock::Clock;
use crate::error::StoreError;
use crate::metrics::{CACHE_SIZE, STORE_OPERATIONS_TOTAL};

const BACKEND: &str = "memory";

#[derive(Debug, Clone)]
struct StoredTweet {
    tweet: Tweet,
    expires_at: DateTime<Utc>,
}

/// In-process implementation of the follow graph, tweet and timeline stores
pub struct MemoryStore {
    clock: Arc<dyn Clock>,
    followers: RwLock<HashMap<UserId, HashSet<UserId>>>,
    tweets: Cache<TweetId, Arc<StoredTweet>>,
    timelines: RwLock<HashMap<UserId, VecDeque<TweetId>>>,
}

impl MemoryStore {
    /// Create an empty store that reads time from `clock`
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            followers: RwLock::new(HashMap::new()),
            tweets: Cache::builder().time_to_live(TWEET_TTL).build(),
            timelines: RwLock::new(HashMap::new()),
        }
    }
}

fn record(operation: &str) {
    STORE_OPERATIONS_TOTAL
        .with_label_values(&[BACKEND, operation])
        .inc();
}

#[async_trait]
impl FollowGraphStore for MemoryStore {
    async fn add_follower(
        &self,
        user_id: UserId,
        new_follower_id: UserId,
    ) -> Result<(), StoreError> {
        record("add_follower");
        self.followers
            .write()
            .await
            .entry(user_id)
            .or_default()
            .insert(new_follower_id);
        Ok(())
    }

    async fn get_followers(&self, user_id: UserId) -> Result<Vec<UserId>, StoreError> {
        record("get_followers");
        Ok(self
            .followers
            .read()
            .await
            .get(&user_id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default())
    }
}

#[async_trait]
impl TweetStore for MemoryStore {
    async fn create_tweet(&self, tweet: &Tweet) -> Result<TweetId, StoreError> {
        record("create_tweet");
        let tweet_id = TweetId::new();
        let stored = StoredTweet {
            tweet: tweet.clone(),
            expires_at: tweet_expires_at(self.clock.now()),
        };

        self.tweets.insert(tweet_id, Arc::new(stored)).await;
        CACHE_SIZE
            .with_label_values(&["tweets"])
            .set(self.tweets.entry_count() as i64);

        Ok(tweet_id)
    }

    async fn get_tweets(&self, ids: &[TweetId]) -> Result<Vec<Tweet>, StoreError> {
        record("get_tweets");
        let now = self.clock.now();

        let mut resolved = Vec::with_capacity(ids.len());
        for id in ids {
            match self.tweets.get(id).await {
                Some(stored) if stored.expires_at > now => resolved.push(stored.tweet.clone()),
                // expired or never stored
                _ => break,
            }
        }

        Ok(resolved)
    }

    async fn purge_expired(&self) -> Result<u64, StoreError> {
        record("purge_expired");
        let now = self.clock.now();

        let expired: Vec<Arc<TweetId>> = self
            .tweets
            .iter()
            .filter(|(_, stored)| stored.expires_at <= now)
            .map(|(id, _)| id)
            .collect();
        for id in &expired {
            self.tweets.invalidate(id.as_ref()).await;
        }

        self.tweets.run_pending_tasks().await;
        CACHE_SIZE
            .with_label_values(&["tweets"])
            .set(self.tweets.entry_count() as i64);

        Ok(expired.len() as u64)
    }
}

#[async_trait]
impl TimelineStore for MemoryStore {
    async fn add_tweet_to_timeline(
        &self,
        tweet_id: TweetId,
        user_id: UserId,
    ) -> Result<(), StoreError> {
        record("add_tweet_to_timeline");
        let mut timelines = self.timelines.write().await;
        let timeline = timelines.entry(user_id).or_default();

        while timeline.len() >= MAX_TWEETS_IN_TIMELINE {
            timeline.pop_back();
        }
        timeline.push_front(tweet_id);

        Ok(())
    }

    async fn get_timeline(&self, user_id: UserId) -> Result<Vec<TweetId>, StoreError> {
        record("get_timeline");
        Ok(self
            .timelines
            .read()
            .await
            .get(&user_id)
            .map(|timeline| timeline.iter().copied().collect())
            .unwrap_or_default())
    }
}
