//! Timeline service
//!
//! Sequences the follow graph, tweet and timeline stores for the three
//! user-facing operations. Holds no state of its own between calls.

use futures::stream::{self, TryStreamExt};
use std::sync::Arc;

use crate::clock::Clock;
use crate::data::{FollowGraphStore, TimelineStore, Tweet, TweetId, TweetStore, UserId};
use crate::error::ServiceError;
use crate::metrics::{
    FANOUT_WRITES_TOTAL, FOLLOWS_TOTAL, TIMELINE_RESOLUTION_GAPS_TOTAL, TWEETS_CREATED_TOTAL,
};

/// Maximum number of tweets returned by a timeline read
///
/// Kept separate from `MAX_TWEETS_IN_TIMELINE`, the storage bound.
pub const TIMELINE_DISPLAY_LIMIT: usize = 10;

/// Default number of follower timeline writes in flight per tweet
pub const DEFAULT_FANOUT_CONCURRENCY: usize = 8;

/// Timeline service
#[derive(Clone)]
pub struct TimelineService {
    followers: Arc<dyn FollowGraphStore>,
    tweets: Arc<dyn TweetStore>,
    timelines: Arc<dyn TimelineStore>,
    clock: Arc<dyn Clock>,
    fanout_concurrency: usize,
}

impl TimelineService {
    /// Create new timeline service
    pub fn new(
        followers: Arc<dyn FollowGraphStore>,
        tweets: Arc<dyn TweetStore>,
        timelines: Arc<dyn TimelineStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            followers,
            tweets,
            timelines,
            clock,
            fanout_concurrency: DEFAULT_FANOUT_CONCURRENCY,
        }
    }

    /// Limit concurrent timeline writes during fan-out (minimum 1)
    pub fn with_fanout_concurrency(mut self, fanout_concurrency: usize) -> Self {
        self.fanout_concurrency = fanout_concurrency.max(1);
        self
    }

    /// Make `follower_id` follow `user_id`
    ///
    /// The duplicate check and the write are separate store calls, so two
    /// racing follows of the same edge may both succeed. The set stays
    /// correct; only the `FollowingAlready` signal is lost.
    ///
    /// # Errors
    /// - `EqualsIds` if both IDs are the same (no store access)
    /// - `FollowLookup` if the follower set cannot be read
    /// - `FollowingAlready` if the edge already exists
    /// - `Following` if the write fails
    pub async fn follow(&self, follower_id: UserId, user_id: UserId) -> Result<(), ServiceError> {
        if follower_id == user_id {
            return Err(ServiceError::EqualsIds);
        }

        let followers = self
            .followers
            .get_followers(user_id)
            .await
            .map_err(|error| {
                tracing::error!(%error, user_id, "Failed to read followers for follow check");
                ServiceError::FollowLookup { user_id }
            })?;

        if followers.contains(&follower_id) {
            return Err(ServiceError::FollowingAlready);
        }

        self.followers
            .add_follower(user_id, follower_id)
            .await
            .map_err(|error| {
                tracing::error!(%error, follower_id, user_id, "Failed to add follower");
                ServiceError::Following {
                    follower_id,
                    user_id,
                }
            })?;

        FOLLOWS_TOTAL.inc();
        tracing::info!(follower_id, user_id, "Follow created");

        Ok(())
    }

    /// Post a tweet for `user_id` and fan it out to every follower
    ///
    /// # Returns
    /// The new tweet's identifier
    ///
    /// # Errors
    /// - `MaxLengthExceeded` if `content` is over 150 bytes (no store access)
    /// - `CreatingTweet` / `GettingFollowers` on store failures
    /// - `AddingToTimeline` if any follower write fails; the tweet exists
    ///   and some followers may already have it
    pub async fn tweet(&self, user_id: UserId, content: String) -> Result<TweetId, ServiceError> {
        let tweet = Tweet::new(user_id, content, self.clock.as_ref())?;

        let tweet_id = self.tweets.create_tweet(&tweet).await.map_err(|error| {
            tracing::error!(%error, user_id, "Failed to create tweet");
            ServiceError::CreatingTweet { user_id }
        })?;
        TWEETS_CREATED_TOTAL.inc();

        let followers = self
            .followers
            .get_followers(user_id)
            .await
            .map_err(|error| {
                tracing::error!(%error, user_id, %tweet_id, "Failed to read followers for fan-out");
                ServiceError::GettingFollowers { user_id }
            })?;

        self.fan_out(tweet_id, &followers).await?;

        tracing::info!(
            user_id,
            %tweet_id,
            followers = followers.len(),
            "Tweet created"
        );

        Ok(tweet_id)
    }

    /// Push `tweet_id` onto each follower's timeline
    ///
    /// Stops issuing writes at the first failure. Writes that completed
    /// before it are kept.
    async fn fan_out(&self, tweet_id: TweetId, followers: &[UserId]) -> Result<(), ServiceError> {
        stream::iter(followers.iter().copied().map(Ok::<UserId, ServiceError>))
            .try_for_each_concurrent(self.fanout_concurrency, |follower_id| async move {
                match self
                    .timelines
                    .add_tweet_to_timeline(tweet_id, follower_id)
                    .await
                {
                    Ok(()) => {
                        FANOUT_WRITES_TOTAL.with_label_values(&["ok"]).inc();
                        Ok(())
                    }
                    Err(error) => {
                        FANOUT_WRITES_TOTAL.with_label_values(&["error"]).inc();
                        tracing::error!(
                            %error,
                            %tweet_id,
                            follower_id,
                            "Fan-out write failed, aborting remaining followers"
                        );
                        Err(ServiceError::AddingToTimeline)
                    }
                }
            })
            .await
    }

    /// Get the tweets on `user_id`'s timeline, newest first
    ///
    /// Resolution stops at the first expired tweet, so the result can be
    /// shorter than the stored list.
    ///
    /// # Errors
    /// - `GettingTimeline` if the identifier list cannot be read
    /// - `ResolvingTweets` if a stored tweet cannot be decoded
    pub async fn get_timeline(&self, user_id: UserId) -> Result<Vec<Tweet>, ServiceError> {
        let tweet_ids = self.timelines.get_timeline(user_id).await.map_err(|error| {
            tracing::error!(%error, user_id, "Failed to read timeline");
            ServiceError::GettingTimeline
        })?;

        let tweet_ids = if tweet_ids.len() <= TIMELINE_DISPLAY_LIMIT {
            &tweet_ids[..]
        } else {
            &tweet_ids[..TIMELINE_DISPLAY_LIMIT]
        };

        let tweets = self.tweets.get_tweets(tweet_ids).await.map_err(|error| {
            tracing::error!(%error, user_id, "Failed to resolve timeline tweets");
            ServiceError::ResolvingTweets { user_id }
        })?;

        if tweets.len() < tweet_ids.len() {
            TIMELINE_RESOLUTION_GAPS_TOTAL.inc();
            tracing::debug!(
                user_id,
                stored = tweet_ids.len(),
                resolved = tweets.len(),
                "Timeline truncated at expired tweet"
            );
        }

        Ok(tweets)
    }
}
