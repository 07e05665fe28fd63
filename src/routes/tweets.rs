//! Tweet CRUD and immediate publishing endpoints

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;

use crate::AppState;
use crate::constants::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, MAX_TWEET_LENGTH};
use crate::domain::models::TweetStatus;
use crate::domain::queries::{tweets, users};
use crate::routes::auth::AuthUser;
use crate::routes::dto::TweetResponse;
use crate::services::error::ApiError;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/tweets", post(create_tweet).get(list_tweets))
        .route("/tweets/{id}", get(get_tweet))
        .route("/tweets/{id}/post", post(post_tweet_now))
}

#[derive(Deserialize)]
struct CreateTweetRequest {
    text: String,
    #[serde(default)]
    media_links: Vec<String>,
    scheduled_at: Option<DateTime<Utc>>,
}

/// POST /tweets - Create a tweet. Scheduled when a future time is given,
/// draft otherwise.
async fn create_tweet(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Json(req): Json<CreateTweetRequest>,
) -> Result<(StatusCode, Json<TweetResponse>), ApiError> {
    if req.text.trim().is_empty() {
        return Err(ApiError::Validation("text is required".to_string()));
    }
    if req.text.chars().count() > MAX_TWEET_LENGTH {
        return Err(ApiError::Validation(format!(
            "text exceeds {} characters",
            MAX_TWEET_LENGTH
        )));
    }

    let status = TweetStatus::for_new_tweet(req.scheduled_at, Utc::now());
    let tweet = tweets::create_tweet(
        &state.db,
        tweets::NewTweet {
            user_id,
            // Campaign linkage only comes from the dispatcher's materializer
            campaign_id: None,
            text: &req.text,
            media_links: &req.media_links,
            status,
            scheduled_at: req.scheduled_at,
            generated_by_ai: false,
            viral_score: None,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(tweet.into())))
}

#[derive(Deserialize)]
struct ListTweetsQuery {
    status: Option<String>,
    limit: Option<i64>,
}

/// GET /tweets - List the caller's tweets, newest first
async fn list_tweets(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Query(query): Query<ListTweetsQuery>,
) -> Result<Json<Vec<TweetResponse>>, ApiError> {
    let status = match query.status.as_deref() {
        Some(s) => Some(
            TweetStatus::parse(s)
                .ok_or_else(|| ApiError::Validation(format!("unknown status \"{}\"", s)))?,
        ),
        None => None,
    };
    let limit = query
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);

    let tweets = tweets::list_tweets(&state.db, user_id, status, limit).await?;

    Ok(Json(tweets.into_iter().map(Into::into).collect()))
}

/// GET /tweets/{id} - Fetch one tweet (scoped to the caller)
async fn get_tweet(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(tweet_id): Path<i64>,
) -> Result<Json<TweetResponse>, ApiError> {
    let tweet = tweets::get_tweet(&state.db, tweet_id, user_id)
        .await?
        .ok_or(ApiError::NotFound("tweet"))?;

    Ok(Json(tweet.into()))
}

/// POST /tweets/{id}/post - Publish immediately, bypassing the schedule.
/// Failed tweets can be resubmitted; already-posted tweets cannot.
async fn post_tweet_now(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(tweet_id): Path<i64>,
) -> Result<Json<TweetResponse>, ApiError> {
    let tweet = tweets::get_tweet(&state.db, tweet_id, user_id)
        .await?
        .ok_or(ApiError::NotFound("tweet"))?;

    if tweet.status == TweetStatus::Posted {
        return Err(ApiError::InvalidState(
            "tweet has already been posted".to_string(),
        ));
    }

    let api_key = users::get_api_key(&state.db, user_id)
        .await?
        .ok_or(ApiError::MissingCredential)?;

    match state
        .publisher
        .post_tweet(&api_key, &tweet.text, &tweet.media_links.0)
        .await
    {
        Ok(posted) => {
            tweets::mark_tweet_posted(&state.db, tweet.id, &posted.id).await?;
        }
        Err(e) => {
            eprintln!("[tweets] Publish failed for tweet {}: {}", tweet.id, e);
            tweets::mark_tweet_failed(&state.db, tweet.id).await?;
            return Err(ApiError::Publish(e.to_string()));
        }
    }

    let tweet = tweets::get_tweet(&state.db, tweet_id, user_id)
        .await?
        .ok_or(ApiError::NotFound("tweet"))?;

    Ok(Json(tweet.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_request_ignores_campaign_field() {
        // Clients cannot attach a tweet to a campaign; the field is dropped
        let req: CreateTweetRequest =
            serde_json::from_str(r#"{"text": "hello", "campaign_id": 42}"#).unwrap();
        assert_eq!(req.text, "hello");
        assert!(req.media_links.is_empty());
        assert!(req.scheduled_at.is_none());
    }

    #[test]
    fn test_list_filter_rejects_unknown_status() {
        assert!(TweetStatus::parse("posted").is_some());
        assert!(TweetStatus::parse("everything").is_none());
    }
}
