//! Data models
//!
//! Users are bare numeric IDs; tweets are identified by ULIDs and
//! timestamped by the injected clock.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::clock::Clock;
use crate::error::{ServiceError, StoreError};

/// User identifier
pub type UserId = u64;

/// Maximum tweet body length, in encoded bytes
pub const MAX_TWEET_LENGTH: usize = 150;

// =============================================================================
// Tweet ID
// =============================================================================

/// Tweet identifier (ULID, 26 characters)
///
/// Example: "01ARZ3NDEKTSV4RRFFQ69G5FAV"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TweetId(pub ulid::Ulid);

impl TweetId {
    /// Generate a new identifier
    pub fn new() -> Self {
        Self(ulid::Ulid::new())
    }
}

impl Default for TweetId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TweetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for TweetId {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ulid::Ulid::from_string(s)
            .map(Self)
            .map_err(|e| StoreError::InvalidId(format!("{s}: {e}")))
    }
}

// =============================================================================
// Tweet
// =============================================================================

/// A short text post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tweet {
    pub user_id: UserId,
    pub timestamp: DateTime<Utc>,
    pub body: String,
}

impl Tweet {
    /// Build a tweet stamped with `clock`'s current time
    ///
    /// The body is checked against [`MAX_TWEET_LENGTH`] before the clock
    /// is read.
    ///
    /// # Errors
    /// `ServiceError::MaxLengthExceeded` if `content` is longer than 150 bytes
    pub fn new(user_id: UserId, content: String, clock: &dyn Clock) -> Result<Self, ServiceError> {
        validate_body(&content)?;

        Ok(Self {
            user_id,
            timestamp: clock.now(),
            body: content,
        })
    }
}

/// Checks the encoded length of a tweet body
pub fn validate_body(content: &str) -> Result<(), ServiceError> {
    if content.len() > MAX_TWEET_LENGTH {
        return Err(ServiceError::MaxLengthExceeded {
            length: content.len(),
        });
    }
    Ok(())
}
