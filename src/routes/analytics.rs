//! Read-only engagement analytics endpoints

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::AppState;
use crate::constants::{DEFAULT_ANALYTICS_DAYS, MAX_PAGE_SIZE};
use crate::domain::queries::{analytics, metrics, tweets};
use crate::routes::auth::AuthUser;
use crate::routes::dto::{MetricResponse, TweetResponse};
use crate::services::error::ApiError;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/analytics/summary", get(summary))
        .route("/analytics/tweets/{id}/metrics", get(tweet_metrics))
        .route("/analytics/engagement-trends", get(engagement_trends))
        .route("/analytics/top-tweets", get(top_tweets))
}

#[derive(Deserialize)]
struct WindowQuery {
    days: Option<i64>,
}

impl WindowQuery {
    /// Trailing window length. Zero is a legal window (it yields the
    /// all-zero summary); only a missing or negative value falls back to
    /// the default.
    fn days(&self) -> i64 {
        match self.days {
            Some(d) if d >= 0 => d,
            _ => DEFAULT_ANALYTICS_DAYS,
        }
    }

    fn since(&self) -> DateTime<Utc> {
        Utc::now() - Duration::days(self.days())
    }
}

#[derive(Serialize)]
struct TimeSlot {
    hour: i32,
    avg_engagement_rate: f64,
}

#[derive(Serialize)]
struct SummaryResponse {
    period_days: i64,
    total_tweets: i64,
    total_engagement: i64,
    avg_engagement_rate: f64,
    top_tweet: Option<TweetResponse>,
    best_time_slots: Vec<TimeSlot>,
}

/// GET /analytics/summary - Headline numbers for the caller's window.
/// An empty window yields zeros and an absent top tweet, never an error.
async fn summary(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Query(query): Query<WindowQuery>,
) -> Result<Json<SummaryResponse>, ApiError> {
    let since = query.since();

    let total_tweets = analytics::posted_tweet_count(&state.db, user_id, since).await?;
    let total_engagement = analytics::total_engagement(&state.db, user_id, since).await?;
    let avg_engagement_rate = analytics::avg_engagement_rate(&state.db, user_id, since).await?;
    let top_tweet = analytics::top_tweet(&state.db, user_id, since).await?;
    let slots = analytics::best_time_slots(&state.db, user_id, since, 5).await?;

    Ok(Json(SummaryResponse {
        period_days: query.days(),
        total_tweets,
        total_engagement,
        avg_engagement_rate,
        top_tweet: top_tweet.map(Into::into),
        best_time_slots: slots
            .into_iter()
            .map(|(hour, avg_engagement_rate)| TimeSlot {
                hour,
                avg_engagement_rate,
            })
            .collect(),
    }))
}

/// GET /analytics/tweets/{id}/metrics - Full snapshot history for one tweet
async fn tweet_metrics(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(tweet_id): Path<i64>,
) -> Result<Json<Vec<MetricResponse>>, ApiError> {
    // Ownership check first so other users' tweet ids read as missing
    tweets::get_tweet(&state.db, tweet_id, user_id)
        .await?
        .ok_or(ApiError::NotFound("tweet"))?;

    let history = metrics::metric_history(&state.db, tweet_id).await?;

    Ok(Json(history.into_iter().map(Into::into).collect()))
}

#[derive(Serialize)]
struct TrendPoint {
    day: NaiveDate,
    tweets: i64,
    likes: i64,
    retweets: i64,
    replies: i64,
    avg_engagement_rate: f64,
}

#[derive(Serialize)]
struct TrendsResponse {
    data: Vec<TrendPoint>,
}

/// GET /analytics/engagement-trends - Per-day aggregates over the window
async fn engagement_trends(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Query(query): Query<WindowQuery>,
) -> Result<Json<TrendsResponse>, ApiError> {
    let trends = analytics::daily_trends(&state.db, user_id, query.since()).await?;

    Ok(Json(TrendsResponse {
        data: trends
            .into_iter()
            .map(|t| TrendPoint {
                day: t.day,
                tweets: t.tweets,
                likes: t.likes,
                retweets: t.retweets,
                replies: t.replies,
                avg_engagement_rate: t.avg_engagement_rate,
            })
            .collect(),
    }))
}

#[derive(Deserialize)]
struct TopTweetsQuery {
    days: Option<i64>,
    limit: Option<i64>,
}

#[derive(Serialize)]
struct TopTweetsResponse {
    tweets: Vec<TopTweetEntry>,
}

#[derive(Serialize)]
struct TopTweetEntry {
    id: i64,
    text: String,
    posted_at: Option<DateTime<Utc>>,
    viral_score: Option<f64>,
    engagement: i32,
}

/// GET /analytics/top-tweets - Best tweets by peak engagement snapshot
async fn top_tweets(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Query(query): Query<TopTweetsQuery>,
) -> Result<Json<TopTweetsResponse>, ApiError> {
    let window = WindowQuery { days: query.days };
    let limit = query.limit.unwrap_or(10).clamp(1, MAX_PAGE_SIZE);

    let rows = analytics::top_tweets(&state.db, user_id, window.since(), limit).await?;

    Ok(Json(TopTweetsResponse {
        tweets: rows
            .into_iter()
            .map(|r| TopTweetEntry {
                id: r.id,
                text: r.text,
                posted_at: r.posted_at,
                viral_score: r.viral_score,
                engagement: r.engagement,
            })
            .collect(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_defaults() {
        assert_eq!(WindowQuery { days: None }.days(), DEFAULT_ANALYTICS_DAYS);
        assert_eq!(WindowQuery { days: Some(7) }.days(), 7);
        // Zero is a real (empty) window; only negatives fall back
        assert_eq!(WindowQuery { days: Some(0) }.days(), 0);
        assert_eq!(WindowQuery { days: Some(-3) }.days(), DEFAULT_ANALYTICS_DAYS);
    }

    #[test]
    fn test_zero_day_window_starts_now() {
        let since = WindowQuery { days: Some(0) }.since();
        let elapsed = Utc::now() - since;
        assert!(elapsed >= Duration::zero());
        assert!(elapsed < Duration::seconds(5));
    }
}
