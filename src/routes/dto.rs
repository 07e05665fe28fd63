//! API response DTOs

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::models::{Campaign, CampaignSlot, Metric, Tweet, TweetStatus, User};

/// Tweet API response
#[derive(Debug, Clone, Serialize)]
pub struct TweetResponse {
    pub id: i64,
    pub campaign_id: Option<i64>,
    pub text: String,
    pub media_links: Vec<String>,
    pub status: TweetStatus,
    pub twitter_id: Option<String>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub posted_at: Option<DateTime<Utc>>,
    pub generated_by_ai: bool,
    pub viral_score: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl From<Tweet> for TweetResponse {
    fn from(t: Tweet) -> Self {
        Self {
            id: t.id,
            campaign_id: t.campaign_id,
            text: t.text,
            media_links: t.media_links.0,
            status: t.status,
            twitter_id: t.twitter_id,
            scheduled_at: t.scheduled_at,
            posted_at: t.posted_at,
            generated_by_ai: t.generated_by_ai,
            viral_score: t.viral_score,
            created_at: t.created_at,
        }
    }
}

/// Engagement snapshot API response
#[derive(Debug, Clone, Serialize)]
pub struct MetricResponse {
    pub id: i64,
    pub tweet_id: i64,
    pub captured_at: DateTime<Utc>,
    pub likes: i32,
    pub retweets: i32,
    pub replies: i32,
    pub impressions: Option<i32>,
    pub engagement_rate: f64,
}

impl From<Metric> for MetricResponse {
    fn from(m: Metric) -> Self {
        Self {
            id: m.id,
            tweet_id: m.tweet_id,
            captured_at: m.captured_at,
            likes: m.likes,
            retweets: m.retweets,
            replies: m.replies,
            impressions: m.impressions,
            engagement_rate: m.engagement_rate,
        }
    }
}

/// Campaign API response
#[derive(Debug, Clone, Serialize)]
pub struct CampaignResponse {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub recurrence: Option<String>,
    pub slots: Vec<CampaignSlot>,
    pub active: bool,
    pub last_materialized_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<Campaign> for CampaignResponse {
    fn from(c: Campaign) -> Self {
        Self {
            id: c.id,
            name: c.name,
            description: c.description,
            recurrence: c.recurrence,
            slots: c.slots.0,
            active: c.active,
            last_materialized_at: c.last_materialized_at,
            created_at: c.created_at,
        }
    }
}

/// User API response. Never exposes the password hash or the publisher
/// API key itself, only whether a key is configured.
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub twitter_username: Option<String>,
    pub has_api_key: bool,
    pub settings: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            username: u.username,
            twitter_username: u.twitter_username,
            has_api_key: u.api_key.is_some(),
            settings: u.settings.0,
            created_at: u.created_at,
        }
    }
}
