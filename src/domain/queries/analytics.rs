//! Analytics domain - read-only aggregation over tweets and metrics
//!
//! Everything here is scoped to one user and a trailing time window, and all
//! numeric aggregates COALESCE to zero so an empty window produces an all-zero
//! summary rather than nulls.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Executor, Postgres};

use super::super::models::Tweet;

/// Per-day engagement aggregates
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DailyTrend {
    pub day: NaiveDate,
    pub tweets: i64,
    pub likes: i64,
    pub retweets: i64,
    pub replies: i64,
    pub avg_engagement_rate: f64,
}

/// One row of the top-tweets ranking
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TopTweet {
    pub id: i64,
    pub text: String,
    pub posted_at: Option<DateTime<Utc>>,
    pub viral_score: Option<f64>,
    pub engagement: i32,
}

/// Count of tweets posted within the window
pub async fn posted_tweet_count<'e, E>(
    executor: E,
    user_id: i64,
    since: DateTime<Utc>,
) -> Result<i64, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let (count,): (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*)
        FROM tweets
        WHERE user_id = $1 AND status = 'posted' AND posted_at >= $2
        "#,
    )
    .bind(user_id)
    .bind(since)
    .fetch_one(executor)
    .await?;

    Ok(count)
}

/// Sum of (likes + retweets + replies) over every metric row in the window
pub async fn total_engagement<'e, E>(
    executor: E,
    user_id: i64,
    since: DateTime<Utc>,
) -> Result<i64, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let (total,): (i64,) = sqlx::query_as(
        r#"
        SELECT COALESCE(SUM(m.likes + m.retweets + m.replies), 0)
        FROM metrics m
        JOIN tweets t ON t.id = m.tweet_id
        WHERE t.user_id = $1 AND t.posted_at >= $2
        "#,
    )
    .bind(user_id)
    .bind(since)
    .fetch_one(executor)
    .await?;

    Ok(total)
}

/// Mean engagement rate across metric rows in the window
pub async fn avg_engagement_rate<'e, E>(
    executor: E,
    user_id: i64,
    since: DateTime<Utc>,
) -> Result<f64, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let (avg,): (f64,) = sqlx::query_as(
        r#"
        SELECT COALESCE(AVG(m.engagement_rate), 0)
        FROM metrics m
        JOIN tweets t ON t.id = m.tweet_id
        WHERE t.user_id = $1 AND t.posted_at >= $2
        "#,
    )
    .bind(user_id)
    .bind(since)
    .fetch_one(executor)
    .await?;

    Ok(avg)
}

/// The single tweet with the highest (likes + retweets) snapshot in the window
pub async fn top_tweet<'e, E>(
    executor: E,
    user_id: i64,
    since: DateTime<Utc>,
) -> Result<Option<Tweet>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        SELECT t.id, t.user_id, t.campaign_id, t.text, t.media_links, t.status,
               t.twitter_id, t.scheduled_at, t.posted_at, t.generated_by_ai,
               t.viral_score, t.created_at
        FROM tweets t
        JOIN metrics m ON m.tweet_id = t.id
        WHERE t.user_id = $1 AND t.posted_at >= $2
        ORDER BY (m.likes + m.retweets) DESC
        LIMIT 1
        "#,
    )
    .bind(user_id)
    .bind(since)
    .fetch_optional(executor)
    .await
}

/// Hours of day ranked by average engagement rate, best first
pub async fn best_time_slots<'e, E>(
    executor: E,
    user_id: i64,
    since: DateTime<Utc>,
    limit: i64,
) -> Result<Vec<(i32, f64)>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        SELECT CAST(EXTRACT(HOUR FROM t.posted_at) AS INTEGER) AS hour,
               AVG(m.engagement_rate) AS avg_engagement
        FROM tweets t
        JOIN metrics m ON m.tweet_id = t.id
        WHERE t.user_id = $1 AND t.posted_at >= $2
        GROUP BY hour
        ORDER BY avg_engagement DESC
        LIMIT $3
        "#,
    )
    .bind(user_id)
    .bind(since)
    .bind(limit)
    .fetch_all(executor)
    .await
}

/// Per-day aggregated likes/retweets/replies/avg-engagement-rate
pub async fn daily_trends<'e, E>(
    executor: E,
    user_id: i64,
    since: DateTime<Utc>,
) -> Result<Vec<DailyTrend>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        SELECT CAST(t.posted_at AS DATE) AS day,
               COUNT(DISTINCT t.id) AS tweets,
               COALESCE(SUM(m.likes), 0) AS likes,
               COALESCE(SUM(m.retweets), 0) AS retweets,
               COALESCE(SUM(m.replies), 0) AS replies,
               COALESCE(AVG(m.engagement_rate), 0) AS avg_engagement_rate
        FROM tweets t
        JOIN metrics m ON m.tweet_id = t.id
        WHERE t.user_id = $1 AND t.posted_at >= $2
        GROUP BY day
        ORDER BY day ASC
        "#,
    )
    .bind(user_id)
    .bind(since)
    .fetch_all(executor)
    .await
}

/// Top-N tweets by their best (likes + retweets + replies) snapshot.
/// One row per tweet: the per-tweet MAX keeps repeated snapshots of the same
/// tweet from crowding the ranking.
pub async fn top_tweets<'e, E>(
    executor: E,
    user_id: i64,
    since: DateTime<Utc>,
    limit: i64,
) -> Result<Vec<TopTweet>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        SELECT t.id, t.text, t.posted_at, t.viral_score,
               MAX(m.likes + m.retweets + m.replies) AS engagement
        FROM tweets t
        JOIN metrics m ON m.tweet_id = t.id
        WHERE t.user_id = $1 AND t.posted_at >= $2
        GROUP BY t.id, t.text, t.posted_at, t.viral_score
        ORDER BY engagement DESC
        LIMIT $3
        "#,
    )
    .bind(user_id)
    .bind(since)
    .bind(limit)
    .fetch_all(executor)
    .await
}
