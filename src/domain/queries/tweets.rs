//! Tweet domain - DB queries for tweets
//!
//! All functions use the generic Executor pattern, allowing them to work with
//! both `&PgPool` (for standalone queries) and `&mut PgConnection` (for transactions).
//!
//! Lifecycle transitions are guarded UPDATEs checked via `rows_affected`, so a
//! concurrent "post now" and dispatcher scan against the same tweet resolve to
//! whichever side commits first.

use chrono::{DateTime, Duration, Utc};
use sqlx::types::Json;
use sqlx::{Executor, Postgres};

use super::super::models::{DueTweet, PostedTweetRef, Tweet, TweetStatus};

const TWEET_COLUMNS: &str = "id, user_id, campaign_id, text, media_links, status, twitter_id, \
     scheduled_at, posted_at, generated_by_ai, viral_score, created_at";

pub struct NewTweet<'a> {
    pub user_id: i64,
    pub campaign_id: Option<i64>,
    pub text: &'a str,
    pub media_links: &'a [String],
    pub status: TweetStatus,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub generated_by_ai: bool,
    pub viral_score: Option<f64>,
}

pub async fn create_tweet<'e, E>(executor: E, new: NewTweet<'_>) -> Result<Tweet, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let query = format!(
        r#"
        INSERT INTO tweets (user_id, campaign_id, text, media_links, status,
                            scheduled_at, generated_by_ai, viral_score)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING {TWEET_COLUMNS}
        "#
    );

    sqlx::query_as(&query)
        .bind(new.user_id)
        .bind(new.campaign_id)
        .bind(new.text)
        .bind(Json(new.media_links.to_vec()))
        .bind(new.status)
        .bind(new.scheduled_at)
        .bind(new.generated_by_ai)
        .bind(new.viral_score)
        .fetch_one(executor)
        .await
}

pub async fn get_tweet<'e, E>(
    executor: E,
    tweet_id: i64,
    user_id: i64,
) -> Result<Option<Tweet>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let query = format!("SELECT {TWEET_COLUMNS} FROM tweets WHERE id = $1 AND user_id = $2");

    sqlx::query_as(&query)
        .bind(tweet_id)
        .bind(user_id)
        .fetch_optional(executor)
        .await
}

/// List a user's tweets, newest first, optionally filtered by status
pub async fn list_tweets<'e, E>(
    executor: E,
    user_id: i64,
    status: Option<TweetStatus>,
    limit: i64,
) -> Result<Vec<Tweet>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let filter = match status {
        Some(s) => format!("AND status = '{}'", s.as_str()),
        None => String::new(),
    };
    let query = format!(
        r#"SELECT {TWEET_COLUMNS}
           FROM tweets
           WHERE user_id = $1 {filter}
           ORDER BY created_at DESC
           LIMIT $2"#
    );

    sqlx::query_as(&query)
        .bind(user_id)
        .bind(limit)
        .fetch_all(executor)
        .await
}

/// Mark a tweet as posted (atomic - only succeeds if not already posted).
/// Returns true if the update was applied, false if something else won the race.
pub async fn mark_tweet_posted<'e, E>(
    executor: E,
    tweet_id: i64,
    twitter_id: &str,
) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query(
        r#"
        UPDATE tweets
        SET status = 'posted', twitter_id = $1, posted_at = NOW()
        WHERE id = $2 AND status != 'posted'
        "#,
    )
    .bind(twitter_id)
    .bind(tweet_id)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Mark a tweet as failed after an unsuccessful publish attempt.
/// Leaves `twitter_id` and `posted_at` untouched (null for a never-posted tweet).
pub async fn mark_tweet_failed<'e, E>(executor: E, tweet_id: i64) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query("UPDATE tweets SET status = 'failed' WHERE id = $1 AND status != 'posted'")
        .bind(tweet_id)
        .execute(executor)
        .await?;

    Ok(())
}

/// Scheduled tweets whose time has come. Failed tweets are never picked up
/// again here; resubmission is a manual "post now" call.
pub async fn due_scheduled_tweets<'e, E>(
    executor: E,
    now: DateTime<Utc>,
) -> Result<Vec<DueTweet>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        SELECT id, user_id, text, media_links
        FROM tweets
        WHERE status = 'scheduled' AND scheduled_at <= $1
        ORDER BY scheduled_at ASC
        "#,
    )
    .bind(now)
    .fetch_all(executor)
    .await
}

/// Recently posted tweets eligible for a metrics poll, bounded in count and
/// restricted to a trailing window
pub async fn recently_posted_tweets<'e, E>(
    executor: E,
    window_days: i64,
    limit: i64,
) -> Result<Vec<PostedTweetRef>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let since = Utc::now() - Duration::days(window_days);

    sqlx::query_as(
        r#"
        SELECT id, user_id, twitter_id
        FROM tweets
        WHERE status = 'posted' AND twitter_id IS NOT NULL AND posted_at >= $1
        ORDER BY posted_at DESC
        LIMIT $2
        "#,
    )
    .bind(since)
    .bind(limit)
    .fetch_all(executor)
    .await
}
