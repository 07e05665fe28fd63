//! Campaign model definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;

/// A recurring content campaign: an ordered set of topic/tone slots that
/// the dispatcher materializes into scheduled tweets.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Campaign {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub recurrence: Option<String>,
    pub slots: Json<Vec<CampaignSlot>>,
    pub active: bool,
    pub last_materialized_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// One content slot within a campaign
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignSlot {
    pub topic: String,
    #[serde(default = "default_tone")]
    pub tone: String,
    pub scheduled_at: Option<DateTime<Utc>>,
}

fn default_tone() -> String {
    "professional".to_string()
}

impl CampaignSlot {
    /// Whether this slot is due for materialization. Slots are materialized
    /// at most once: a slot is skipped when its time is not set or when it
    /// falls at or before the campaign's materialization watermark.
    pub fn is_due(&self, watermark: Option<DateTime<Utc>>) -> bool {
        match (self.scheduled_at, watermark) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(at), Some(mark)) => at > mark,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn slot(at: Option<DateTime<Utc>>) -> CampaignSlot {
        CampaignSlot {
            topic: "rust".to_string(),
            tone: default_tone(),
            scheduled_at: at,
        }
    }

    #[test]
    fn test_slot_without_time_is_never_due() {
        assert!(!slot(None).is_due(None));
        assert!(!slot(None).is_due(Some(Utc::now())));
    }

    #[test]
    fn test_slot_due_against_watermark() {
        let now = Utc::now();
        let s = slot(Some(now + Duration::hours(2)));
        // Never materialized yet
        assert!(s.is_due(None));
        // Watermark before the slot time: still due
        assert!(s.is_due(Some(now)));
        // Watermark past the slot time: already materialized
        assert!(!s.is_due(Some(now + Duration::hours(3))));
    }

    #[test]
    fn test_slot_tone_defaults_on_deserialize() {
        let s: CampaignSlot = serde_json::from_str(r#"{"topic": "ai"}"#).unwrap();
        assert_eq!(s.tone, "professional");
        assert!(s.scheduled_at.is_none());
    }
}
