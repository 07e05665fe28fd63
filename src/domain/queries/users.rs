//! User domain - DB queries for users
//!
//! All functions use the generic Executor pattern, allowing them to work with
//! both `&PgPool` (for standalone queries) and `&mut PgConnection` (for transactions).

use sqlx::{Executor, Postgres};

use super::super::models::User;

/// Insert a new user. Fails with a unique-violation error when the
/// username is already taken.
pub async fn create_user<'e, E>(
    executor: E,
    username: &str,
    password_hash: &str,
    twitter_username: Option<&str>,
    api_key: Option<&str>,
) -> Result<User, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        INSERT INTO users (username, password_hash, twitter_username, api_key)
        VALUES ($1, $2, $3, $4)
        RETURNING id, username, password_hash, twitter_username, api_key,
                  settings, created_at, updated_at
        "#,
    )
    .bind(username)
    .bind(password_hash)
    .bind(twitter_username)
    .bind(api_key)
    .fetch_one(executor)
    .await
}

pub async fn get_user_by_id<'e, E>(executor: E, user_id: i64) -> Result<Option<User>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        SELECT id, username, password_hash, twitter_username, api_key,
               settings, created_at, updated_at
        FROM users
        WHERE id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(executor)
    .await
}

pub async fn get_user_by_username<'e, E>(
    executor: E,
    username: &str,
) -> Result<Option<User>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        SELECT id, username, password_hash, twitter_username, api_key,
               settings, created_at, updated_at
        FROM users
        WHERE username = $1
        "#,
    )
    .bind(username)
    .fetch_optional(executor)
    .await
}

/// Get a user's publisher API key, if one is configured
pub async fn get_api_key<'e, E>(executor: E, user_id: i64) -> Result<Option<String>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let row: Option<(Option<String>,)> =
        sqlx::query_as("SELECT api_key FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(executor)
            .await?;

    Ok(row.and_then(|(key,)| key))
}
