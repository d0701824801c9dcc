//! Error types for Tweetline
//!
//! - `StoreError`: failures raised by a store backend
//! - `ServiceError`: the domain taxonomy returned by `TimelineService`
//! - `AppError`: process-level errors, implements `IntoResponse` for HTTP

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::data::{MAX_TWEET_LENGTH, UserId};

/// Failure of an underlying keyed store
#[derive(Debug, Error)]
pub enum StoreError {
    /// SQLite failure
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Stored payload could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Stored identifier could not be parsed
    #[error("Invalid stored identifier: {0}")]
    InvalidId(String),

    /// Backend unreachable or refused the operation
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Coarse classification of a [`ServiceError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rejected input, detected before any store access
    Validation,
    /// Business-rule conflict (benign no-op)
    Conflict,
    /// A store call failed
    Dependency,
    /// Tweet created but not delivered to every follower
    PartialFanOut,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Conflict => "conflict",
            Self::Dependency => "dependency",
            Self::PartialFanOut => "partial_fanout",
        }
    }
}

/// Errors returned by the timeline service operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("you can't follow yourself")]
    EqualsIds,

    #[error("error adding follow from user {user_id} for check existent follow")]
    FollowLookup { user_id: UserId },

    #[error("error adding follow from user {follower_id} to user {user_id}")]
    Following { follower_id: UserId, user_id: UserId },

    #[error("error making an already existent follow")]
    FollowingAlready,

    #[error("max length of {max} exceeded ({length} bytes)", max = MAX_TWEET_LENGTH)]
    MaxLengthExceeded { length: usize },

    #[error("error creating tweet from user {user_id}")]
    CreatingTweet { user_id: UserId },

    #[error("error getting followers list from user {user_id}")]
    GettingFollowers { user_id: UserId },

    #[error("error adding to followers timeline")]
    AddingToTimeline,

    #[error("error getting timeline of user")]
    GettingTimeline,

    #[error("error resolving timeline tweets of user {user_id}")]
    ResolvingTweets { user_id: UserId },
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EqualsIds | Self::MaxLengthExceeded { .. } => ErrorKind::Validation,
            Self::FollowingAlready => ErrorKind::Conflict,
            Self::AddingToTimeline => ErrorKind::PartialFanOut,
            Self::FollowLookup { .. }
            | Self::Following { .. }
            | Self::CreatingTweet { .. }
            | Self::GettingFollowers { .. }
            | Self::GettingTimeline
            | Self::ResolvingTweets { .. } => ErrorKind::Dependency,
        }
    }
}

/// Application-wide error type
#[derive(Debug, Error)]
pub enum AppError {
    /// Domain error from the timeline service
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// Malformed request (400)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Store initialization failure (500)
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration error (500)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal server error (500)
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Store(StoreError::Database(err))
    }
}

impl IntoResponse for AppError {
    /// Maps the error to a status code and a JSON `{"error": ...}` body.
    fn into_response(self) -> Response {
        use axum::Json;

        let (status, error_message, error_type) = match &self {
            AppError::Service(err) => {
                let kind = err.kind();
                let status = match kind {
                    ErrorKind::Validation => StatusCode::BAD_REQUEST,
                    ErrorKind::Conflict => StatusCode::CONFLICT,
                    ErrorKind::Dependency | ErrorKind::PartialFanOut => {
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                };
                (status, err.to_string(), kind.as_str())
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone(), "bad_request"),
            AppError::Store(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Store error".to_string(),
                "store",
            ),
            AppError::Config(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone(), "config"),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
                "internal",
            ),
        };

        use crate::metrics::ERRORS_TOTAL;
        ERRORS_TOTAL.with_label_values(&[error_type]).inc();

        let body = Json(serde_json::json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
