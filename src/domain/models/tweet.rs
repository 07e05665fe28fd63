//! Tweet model definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::encode::IsNull;
use sqlx::error::BoxDynError;
use sqlx::postgres::{PgArgumentBuffer, PgTypeInfo, PgValueRef};
use sqlx::types::Json;
use sqlx::{Decode, Encode, Postgres, Type};

/// Tweet lifecycle status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TweetStatus {
    Draft,
    Scheduled,
    Posted,
    Failed,
}

impl TweetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TweetStatus::Draft => "draft",
            TweetStatus::Scheduled => "scheduled",
            TweetStatus::Posted => "posted",
            TweetStatus::Failed => "failed",
        }
    }

    /// Strict parse for caller-supplied status strings
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(TweetStatus::Draft),
            "scheduled" => Some(TweetStatus::Scheduled),
            "posted" => Some(TweetStatus::Posted),
            "failed" => Some(TweetStatus::Failed),
            _ => None,
        }
    }

    /// Lenient parse for stored rows; unknown values read as draft
    pub fn from_str(s: &str) -> Self {
        Self::parse(s).unwrap_or(TweetStatus::Draft)
    }

    /// Status a new tweet gets at creation time. Scheduled only when the
    /// requested time is actually in the future; a missing or past time
    /// leaves the tweet a draft.
    pub fn for_new_tweet(scheduled_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Self {
        match scheduled_at {
            Some(at) if at > now => TweetStatus::Scheduled,
            _ => TweetStatus::Draft,
        }
    }
}

// sqlx Type/Decode/Encode for TweetStatus to enable FromRow on Tweet
impl Type<Postgres> for TweetStatus {
    fn type_info() -> PgTypeInfo {
        <String as Type<Postgres>>::type_info()
    }

    fn compatible(ty: &PgTypeInfo) -> bool {
        <String as Type<Postgres>>::compatible(ty)
    }
}

impl<'r> Decode<'r, Postgres> for TweetStatus {
    fn decode(value: PgValueRef<'r>) -> Result<Self, BoxDynError> {
        let s = <String as Decode<Postgres>>::decode(value)?;
        Ok(TweetStatus::from_str(&s))
    }
}

impl Encode<'_, Postgres> for TweetStatus {
    fn encode_by_ref(&self, buf: &mut PgArgumentBuffer) -> Result<IsNull, BoxDynError> {
        <String as Encode<Postgres>>::encode_by_ref(&self.as_str().to_owned(), buf)
    }
}

/// A tweet (draft, scheduled, posted or failed)
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Tweet {
    pub id: i64,
    pub user_id: i64,
    pub campaign_id: Option<i64>,
    pub text: String,
    pub media_links: Json<Vec<String>>,
    pub status: TweetStatus,
    pub twitter_id: Option<String>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub posted_at: Option<DateTime<Utc>>,
    pub generated_by_ai: bool,
    pub viral_score: Option<f64>,
    pub created_at: DateTime<Utc>,
}

/// The subset of tweet data the dispatcher needs to publish a due tweet
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DueTweet {
    pub id: i64,
    pub user_id: i64,
    pub text: String,
    pub media_links: Json<Vec<String>>,
}

/// The subset the metrics refresher needs for a posted tweet
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PostedTweetRef {
    pub id: i64,
    pub user_id: i64,
    pub twitter_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_status_round_trip() {
        for s in ["draft", "scheduled", "posted", "failed"] {
            assert_eq!(TweetStatus::from_str(s).as_str(), s);
        }
        // Unknown stored values fall back to draft
        assert_eq!(TweetStatus::from_str("bogus"), TweetStatus::Draft);
    }

    #[test]
    fn test_status_strict_parse_rejects_unknown() {
        assert_eq!(TweetStatus::parse("scheduled"), Some(TweetStatus::Scheduled));
        assert_eq!(TweetStatus::parse("bogus"), None);
        assert_eq!(TweetStatus::parse("Draft"), None);
        assert_eq!(TweetStatus::parse(""), None);
    }

    #[test]
    fn test_new_tweet_status_derivation() {
        let now = Utc::now();
        assert_eq!(TweetStatus::for_new_tweet(None, now), TweetStatus::Draft);
        assert_eq!(
            TweetStatus::for_new_tweet(Some(now + Duration::hours(1)), now),
            TweetStatus::Scheduled
        );
        // A past timestamp does not schedule anything
        assert_eq!(
            TweetStatus::for_new_tweet(Some(now - Duration::minutes(1)), now),
            TweetStatus::Draft
        );
    }
}
