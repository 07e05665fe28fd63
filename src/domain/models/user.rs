//! User model definitions

use chrono::{DateTime, Utc};
use sqlx::types::Json;

/// A registered user
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub twitter_username: Option<String>,
    pub api_key: Option<String>,
    pub settings: Json<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}
