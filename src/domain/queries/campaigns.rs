//! Campaign domain - DB queries for campaigns
//!
//! All functions use the generic Executor pattern, allowing them to work with
//! both `&PgPool` (for standalone queries) and `&mut PgConnection` (for transactions).

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{Executor, Postgres};

use super::super::models::{Campaign, CampaignSlot};

const CAMPAIGN_COLUMNS: &str = "id, user_id, name, description, recurrence, slots, active, \
     last_materialized_at, created_at";

pub async fn create_campaign<'e, E>(
    executor: E,
    user_id: i64,
    name: &str,
    description: Option<&str>,
    recurrence: Option<&str>,
    slots: &[CampaignSlot],
) -> Result<Campaign, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let query = format!(
        r#"
        INSERT INTO campaigns (user_id, name, description, recurrence, slots)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {CAMPAIGN_COLUMNS}
        "#
    );

    sqlx::query_as(&query)
        .bind(user_id)
        .bind(name)
        .bind(description)
        .bind(recurrence)
        .bind(Json(slots.to_vec()))
        .fetch_one(executor)
        .await
}

pub async fn get_campaign<'e, E>(
    executor: E,
    campaign_id: i64,
    user_id: i64,
) -> Result<Option<Campaign>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let query =
        format!("SELECT {CAMPAIGN_COLUMNS} FROM campaigns WHERE id = $1 AND user_id = $2");

    sqlx::query_as(&query)
        .bind(campaign_id)
        .bind(user_id)
        .fetch_optional(executor)
        .await
}

pub async fn list_campaigns<'e, E>(executor: E, user_id: i64) -> Result<Vec<Campaign>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let query = format!(
        "SELECT {CAMPAIGN_COLUMNS} FROM campaigns WHERE user_id = $1 ORDER BY created_at DESC"
    );

    sqlx::query_as(&query).bind(user_id).fetch_all(executor).await
}

/// Update a campaign's editable fields. Returns None when the campaign does
/// not exist or is not owned by the caller.
pub async fn update_campaign<'e, E>(
    executor: E,
    campaign_id: i64,
    user_id: i64,
    name: &str,
    description: Option<&str>,
    recurrence: Option<&str>,
    slots: &[CampaignSlot],
) -> Result<Option<Campaign>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let query = format!(
        r#"
        UPDATE campaigns
        SET name = $3, description = $4, recurrence = $5, slots = $6
        WHERE id = $1 AND user_id = $2
        RETURNING {CAMPAIGN_COLUMNS}
        "#
    );

    sqlx::query_as(&query)
        .bind(campaign_id)
        .bind(user_id)
        .bind(name)
        .bind(description)
        .bind(recurrence)
        .bind(Json(slots.to_vec()))
        .fetch_optional(executor)
        .await
}

/// Delete a campaign. Its tweets survive with campaign_id nulled by the FK.
pub async fn delete_campaign<'e, E>(
    executor: E,
    campaign_id: i64,
    user_id: i64,
) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query("DELETE FROM campaigns WHERE id = $1 AND user_id = $2")
        .bind(campaign_id)
        .bind(user_id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Flip a campaign's active flag, returning the updated row
pub async fn toggle_campaign<'e, E>(
    executor: E,
    campaign_id: i64,
    user_id: i64,
) -> Result<Option<Campaign>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let query = format!(
        r#"
        UPDATE campaigns
        SET active = NOT active
        WHERE id = $1 AND user_id = $2
        RETURNING {CAMPAIGN_COLUMNS}
        "#
    );

    sqlx::query_as(&query)
        .bind(campaign_id)
        .bind(user_id)
        .fetch_optional(executor)
        .await
}

/// All campaigns the materialization job should look at
pub async fn active_campaigns<'e, E>(executor: E) -> Result<Vec<Campaign>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let query = format!(
        "SELECT {CAMPAIGN_COLUMNS} FROM campaigns WHERE active = TRUE ORDER BY id ASC"
    );

    sqlx::query_as(&query).fetch_all(executor).await
}

/// Advance the materialization watermark after a cycle produced tweets
pub async fn set_last_materialized<'e, E>(
    executor: E,
    campaign_id: i64,
    at: DateTime<Utc>,
) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query("UPDATE campaigns SET last_materialized_at = $2 WHERE id = $1")
        .bind(campaign_id)
        .bind(at)
        .execute(executor)
        .await?;

    Ok(())
}
