//! Outbound publishing client
//!
//! Thin REST client for the publishing API (twitterapi.io-compatible
//! surface). One client serves every user; the per-user API key travels
//! with each call rather than living in a cached per-key instance.

use reqwest::Client;
use serde::Deserialize;

use crate::constants::MAX_TWEET_LENGTH;

pub const DEFAULT_PUBLISHER_API_URL: &str = "https://api.twitterapi.io";

#[derive(Debug)]
pub enum PublisherError {
    Http(reqwest::Error),
    Api(String),
}

impl From<reqwest::Error> for PublisherError {
    fn from(e: reqwest::Error) -> Self {
        PublisherError::Http(e)
    }
}

impl std::fmt::Display for PublisherError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PublisherError::Http(e) => write!(f, "HTTP error: {}", e),
            PublisherError::Api(s) => write!(f, "Publisher API error: {}", s),
        }
    }
}

impl std::error::Error for PublisherError {}

/// A successfully published tweet, as reported by the platform
#[derive(Debug, Clone, Deserialize)]
pub struct PublishedTweet {
    #[serde(rename = "id_str")]
    pub id: String,
}

/// Engagement counts for one published tweet
#[derive(Debug, Clone, Deserialize)]
pub struct EngagementCounts {
    #[serde(rename = "like_count", default)]
    pub likes: i32,
    #[serde(rename = "retweet_count", default)]
    pub retweets: i32,
    #[serde(rename = "reply_count", default)]
    pub replies: i32,
    #[serde(rename = "impression_count")]
    pub impressions: Option<i32>,
}

#[derive(Clone)]
pub struct PublisherClient {
    base_url: String,
    http: Client,
}

/// Clip text to the platform length limit. Counted in characters; the clip
/// is silent by contract.
pub fn truncate_text(text: &str) -> &str {
    match text.char_indices().nth(MAX_TWEET_LENGTH) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

impl PublisherClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: Client::new(),
        }
    }

    /// Post a tweet, returning the platform-assigned id
    pub async fn post_tweet(
        &self,
        api_key: &str,
        text: &str,
        media_links: &[String],
    ) -> Result<PublishedTweet, PublisherError> {
        let url = format!("{}/twitter/tweet", self.base_url);

        let mut body = serde_json::json!({ "text": truncate_text(text) });
        if !media_links.is_empty() {
            body["media_ids"] = serde_json::json!(media_links);
        }

        let resp = self
            .http
            .post(url)
            .header("x-api-key", api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let text = resp.text().await?;
            return Err(PublisherError::Api(text));
        }

        let tweet: PublishedTweet = resp.json().await?;
        Ok(tweet)
    }

    /// Fetch current engagement counts for a published tweet
    pub async fn get_tweet_metrics(
        &self,
        api_key: &str,
        tweet_id: &str,
    ) -> Result<EngagementCounts, PublisherError> {
        let url = format!("{}/twitter/tweet/metrics", self.base_url);

        let resp = self
            .http
            .get(url)
            .header("x-api-key", api_key)
            .query(&[("tweetId", tweet_id)])
            .send()
            .await?;

        if !resp.status().is_success() {
            let text = resp.text().await?;
            return Err(PublisherError::Api(text));
        }

        let counts: EngagementCounts = resp.json().await?;
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_truncate_text() {
        let short = "hello";
        assert_eq!(truncate_text(short), "hello");

        let long = "x".repeat(300);
        assert_eq!(truncate_text(&long).chars().count(), MAX_TWEET_LENGTH);

        // Multibyte characters count as one unit each
        let emoji = "🦀".repeat(300);
        assert_eq!(truncate_text(&emoji).chars().count(), MAX_TWEET_LENGTH);
    }

    #[tokio::test]
    async fn test_post_tweet_success() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/twitter/tweet"))
            .and(header("x-api-key", "key-1"))
            .and(body_partial_json(serde_json::json!({ "text": "Hello" })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id_str": "987" })),
            )
            .mount(&server)
            .await;

        let client = PublisherClient::new(&server.uri());
        let posted = client.post_tweet("key-1", "Hello", &[]).await.unwrap();
        assert_eq!(posted.id, "987");
    }

    #[tokio::test]
    async fn test_post_tweet_truncates_before_submission() {
        let server = MockServer::start().await;
        let expected: String = "x".repeat(MAX_TWEET_LENGTH);

        Mock::given(method("POST"))
            .and(path("/twitter/tweet"))
            .and(body_partial_json(serde_json::json!({ "text": expected })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id_str": "1" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = PublisherClient::new(&server.uri());
        let long = "x".repeat(400);
        client.post_tweet("key", &long, &[]).await.unwrap();
    }

    #[tokio::test]
    async fn test_post_tweet_upstream_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/twitter/tweet"))
            .respond_with(ResponseTemplate::new(403).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let client = PublisherClient::new(&server.uri());
        let err = client.post_tweet("key", "Hello", &[]).await.unwrap_err();
        match err {
            PublisherError::Api(body) => assert!(body.contains("rate limited")),
            other => panic!("expected Api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_get_tweet_metrics() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/twitter/tweet/metrics"))
            .and(query_param("tweetId", "987"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "like_count": 12,
                "retweet_count": 3,
                "reply_count": 1,
                "impression_count": 400
            })))
            .mount(&server)
            .await;

        let client = PublisherClient::new(&server.uri());
        let counts = client.get_tweet_metrics("key", "987").await.unwrap();
        assert_eq!(counts.likes, 12);
        assert_eq!(counts.retweets, 3);
        assert_eq!(counts.replies, 1);
        assert_eq!(counts.impressions, Some(400));
    }

    #[tokio::test]
    async fn test_get_tweet_metrics_missing_impressions() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/twitter/tweet/metrics"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "like_count": 5,
                "retweet_count": 0,
                "reply_count": 0
            })))
            .mount(&server)
            .await;

        let client = PublisherClient::new(&server.uri());
        let counts = client.get_tweet_metrics("key", "1").await.unwrap();
        assert_eq!(counts.impressions, None);
    }
}
