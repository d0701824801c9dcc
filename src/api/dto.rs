//! Request and response DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::data::{Tweet, UserId};

/// Body of `POST /user/:user_id/tweet`
#[derive(Debug, Clone, Deserialize)]
pub struct TweetRequest {
    pub content: String,
}

/// Tweet as rendered in a timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TweetResponse {
    pub user_id: UserId,
    pub timestamp: DateTime<Utc>,
    pub body: String,
}

impl From<Tweet> for TweetResponse {
    fn from(tweet: Tweet) -> Self {
        Self {
            user_id: tweet.user_id,
            timestamp: tweet.timestamp,
            body: tweet.body,
        }
    }
}
