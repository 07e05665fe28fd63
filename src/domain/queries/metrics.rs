//! Metric domain - DB queries for engagement snapshots
//!
//! Metric rows are append-only; there is deliberately no UPDATE here.

use sqlx::{Executor, Postgres};

use super::super::models::Metric;

/// Append one engagement snapshot for a tweet
pub async fn insert_metric<'e, E>(
    executor: E,
    tweet_id: i64,
    likes: i32,
    retweets: i32,
    replies: i32,
    impressions: Option<i32>,
    engagement_rate: f64,
) -> Result<Metric, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        INSERT INTO metrics (tweet_id, likes, retweets, replies, impressions, engagement_rate)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, tweet_id, captured_at, likes, retweets, replies,
                  impressions, engagement_rate
        "#,
    )
    .bind(tweet_id)
    .bind(likes)
    .bind(retweets)
    .bind(replies)
    .bind(impressions)
    .bind(engagement_rate)
    .fetch_one(executor)
    .await
}

/// Full time-ordered metric history for one tweet
pub async fn metric_history<'e, E>(executor: E, tweet_id: i64) -> Result<Vec<Metric>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        SELECT id, tweet_id, captured_at, likes, retweets, replies,
               impressions, engagement_rate
        FROM metrics
        WHERE tweet_id = $1
        ORDER BY captured_at ASC
        "#,
    )
    .bind(tweet_id)
    .fetch_all(executor)
    .await
}
