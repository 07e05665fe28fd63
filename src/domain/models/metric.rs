//! Engagement metric model definitions

use chrono::{DateTime, Utc};

/// One timestamped engagement snapshot for a posted tweet.
/// Rows are append-only: the history of a tweet is the series of its
/// snapshots, never an in-place update.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Metric {
    pub id: i64,
    pub tweet_id: i64,
    pub captured_at: DateTime<Utc>,
    pub likes: i32,
    pub retweets: i32,
    pub replies: i32,
    pub impressions: Option<i32>,
    pub engagement_rate: f64,
}

/// Engagement rate: (likes + retweets + replies) / impressions.
/// Zero when impressions are absent or zero.
pub fn engagement_rate(likes: i32, retweets: i32, replies: i32, impressions: Option<i32>) -> f64 {
    match impressions {
        Some(imp) if imp > 0 => {
            let total = (likes + retweets + replies) as f64;
            total / imp as f64
        }
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engagement_rate() {
        assert_eq!(engagement_rate(10, 5, 5, Some(100)), 0.2);
        assert_eq!(engagement_rate(3, 0, 0, Some(3)), 1.0);
    }

    #[test]
    fn test_engagement_rate_no_impressions() {
        // No division error, just zero
        assert_eq!(engagement_rate(10, 5, 5, None), 0.0);
        assert_eq!(engagement_rate(10, 5, 5, Some(0)), 0.0);
        assert_eq!(engagement_rate(0, 0, 0, None), 0.0);
    }
}
