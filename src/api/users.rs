//! User endpoints: follow, tweet, timeline

use axum::{
    Router,
    extract::{
        Json, Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    routing::{get, post},
};

use super::dto::{TweetRequest, TweetResponse};
use crate::AppState;
use crate::data::UserId;
use crate::error::AppError;
use crate::metrics::{HTTP_REQUEST_DURATION_SECONDS, HTTP_REQUESTS_TOTAL};

/// Create user router
pub fn users_router() -> Router<AppState> {
    Router::new()
        .route("/user/:user_id/follower/:follower_id", post(follow))
        .route("/user/:user_id/tweet", post(tweet))
        .route("/user/:user_id/timeline", get(timeline))
}

fn bad_path(rejection: PathRejection) -> AppError {
    AppError::BadRequest(rejection.body_text())
}

/// POST /user/:user_id/follower/:follower_id
///
/// `follower_id` starts following `user_id`.
pub async fn follow(
    State(state): State<AppState>,
    path: Result<Path<(UserId, UserId)>, PathRejection>,
) -> Result<String, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["POST", "/user/:user_id/follower/:follower_id"])
        .start_timer();

    let Path((user_id, follower_id)) = path.map_err(bad_path)?;

    state.timeline.follow(follower_id, user_id).await?;

    HTTP_REQUESTS_TOTAL
        .with_label_values(&["POST", "/user/:user_id/follower/:follower_id", "200"])
        .inc();

    Ok(format!("{follower_id} has followed {user_id}"))
}

/// POST /user/:user_id/tweet
pub async fn tweet(
    State(state): State<AppState>,
    path: Result<Path<UserId>, PathRejection>,
    payload: Result<Json<TweetRequest>, JsonRejection>,
) -> Result<(StatusCode, String), AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["POST", "/user/:user_id/tweet"])
        .start_timer();

    let Path(user_id) = path.map_err(bad_path)?;

    let Json(request) = payload.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
    let tweet_id = state.timeline.tweet(user_id, request.content).await?;

    HTTP_REQUESTS_TOTAL
        .with_label_values(&["POST", "/user/:user_id/tweet", "201"])
        .inc();

    Ok((
        StatusCode::CREATED,
        format!("{user_id} tweet {tweet_id} created"),
    ))
}

/// GET /user/:user_id/timeline
pub async fn timeline(
    State(state): State<AppState>,
    path: Result<Path<UserId>, PathRejection>,
) -> Result<Json<Vec<TweetResponse>>, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["GET", "/user/:user_id/timeline"])
        .start_timer();

    let Path(user_id) = path.map_err(bad_path)?;

    let tweets = state.timeline.get_timeline(user_id).await?;
    let responses = tweets.into_iter().map(TweetResponse::from).collect();

    HTTP_REQUESTS_TOTAL
        .with_label_values(&["GET", "/user/:user_id/timeline", "200"])
        .inc();

    Ok(Json(responses))
}
