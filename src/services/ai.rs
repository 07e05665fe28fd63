//! Copy generation via the Gemini REST API
//!
//! The generator is optional at the application level: when no API key is
//! configured the routes that need it return a service-unavailable error
//! instead of failing at startup.

use rand::Rng;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::{MAX_TWEET_LENGTH, MAX_VARIANT_COUNT};

pub const DEFAULT_GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";

#[derive(Debug)]
pub enum AiError {
    Http(reqwest::Error),
    Api(String),
    EmptyResponse,
}

impl From<reqwest::Error> for AiError {
    fn from(e: reqwest::Error) -> Self {
        AiError::Http(e)
    }
}

impl std::fmt::Display for AiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AiError::Http(e) => write!(f, "HTTP error: {}", e),
            AiError::Api(s) => write!(f, "Gemini API error: {}", s),
            AiError::EmptyResponse => write!(f, "Gemini returned no candidates"),
        }
    }
}

impl std::error::Error for AiError {}

/// One generated tweet candidate with the model's virality estimate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TweetVariant {
    pub text: String,
    pub viral_score: f64,
}

/// Inputs for a generation request
#[derive(Debug, Clone, Deserialize)]
pub struct GenerationRequest {
    pub topic: String,
    #[serde(default = "default_tone")]
    pub tone: String,
    #[serde(default = "default_count", alias = "variant_count")]
    pub count: usize,
    #[serde(default)]
    pub include_hashtags: bool,
    #[serde(default)]
    pub include_call_to_action: bool,
}

fn default_tone() -> String {
    "professional".to_string()
}

fn default_count() -> usize {
    crate::constants::DEFAULT_VARIANT_COUNT
}

#[derive(Clone)]
pub struct AiGenerator {
    api_key: String,
    model: String,
    base_url: String,
    http: Client,
}

fn build_prompt(req: &GenerationRequest) -> String {
    let count = req.count.clamp(1, MAX_VARIANT_COUNT);
    let mut prompt = format!(
        "Write {} distinct tweets about \"{}\" in a {} tone. \
         Each tweet must be under {} characters.",
        count, req.topic, req.tone, MAX_TWEET_LENGTH
    );
    if req.include_hashtags {
        prompt.push_str(" Include one or two relevant hashtags in each tweet.");
    }
    if req.include_call_to_action {
        prompt.push_str(" End each tweet with a short call to action.");
    }
    prompt.push_str(
        " Respond with a JSON array only, each element an object with \
         \"text\" and \"viral_score\" (a number between 0 and 1).",
    );
    prompt
}

/// Parse the model's reply into variants.
///
/// Preferred shape is a JSON array embedded somewhere in the text. Models
/// that ignore the format instruction get a line-by-line fallback with a
/// synthetic viral score.
fn parse_variants(raw: &str, count: usize) -> Vec<TweetVariant> {
    if let (Some(start), Some(end)) = (raw.find('['), raw.rfind(']')) {
        if start < end {
            if let Ok(Value::Array(items)) = serde_json::from_str(&raw[start..=end]) {
                let variants: Vec<TweetVariant> = items
                    .into_iter()
                    .filter_map(|item| {
                        let text = item.get("text")?.as_str()?.to_string();
                        let score = item
                            .get("viral_score")
                            .and_then(Value::as_f64)
                            .unwrap_or(0.5)
                            .clamp(0.0, 1.0);
                        Some(TweetVariant {
                            text,
                            viral_score: score,
                        })
                    })
                    .take(count)
                    .collect();
                if !variants.is_empty() {
                    return variants;
                }
            }
        }
    }

    // Fallback: treat each non-empty line as a candidate
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| TweetVariant {
            text: line.trim_start_matches(['-', '*', ' ']).to_string(),
            viral_score: synthetic_viral_score(),
        })
        .take(count)
        .collect()
}

fn synthetic_viral_score() -> f64 {
    let score: f64 = rand::rng().random_range(0.6..=0.9);
    (score * 100.0).round() / 100.0
}

fn neutral_sentiment() -> Value {
    serde_json::json!({
        "sentiment": "neutral",
        "engagement_score": 0.5,
        "suggestions": []
    })
}

impl AiGenerator {
    pub fn new(api_key: &str, model: &str, base_url: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            http: Client::new(),
        }
    }

    async fn generate_content(&self, prompt: &str) -> Result<String, AiError> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url, self.model
        );

        let body = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        let resp = self
            .http
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let text = resp.text().await?;
            return Err(AiError::Api(text));
        }

        let payload: Value = resp.json().await?;
        let text = payload
            .get("candidates")
            .and_then(|c| c.get(0))
            .and_then(|c| c.pointer("/content/parts/0/text"))
            .and_then(Value::as_str)
            .ok_or(AiError::EmptyResponse)?;

        Ok(text.to_string())
    }

    /// Generate tweet variants for a topic
    pub async fn generate_variants(
        &self,
        req: &GenerationRequest,
    ) -> Result<Vec<TweetVariant>, AiError> {
        let prompt = build_prompt(req);
        let raw = self.generate_content(&prompt).await?;
        let count = req.count.clamp(1, MAX_VARIANT_COUNT);
        let variants = parse_variants(&raw, count);
        if variants.is_empty() {
            return Err(AiError::EmptyResponse);
        }
        Ok(variants)
    }

    /// Sentiment and engagement read on a piece of text. Falls back to a
    /// neutral verdict when the model reply is not parseable JSON.
    pub async fn analyze_sentiment(&self, text: &str) -> Result<Value, AiError> {
        let prompt = format!(
            "Analyze this tweet and respond with a JSON object only, with keys \
             \"sentiment\" (positive, neutral, or negative), \"engagement_score\" \
             (a number between 0 and 1), and \"suggestions\" (an array of short \
             strings): {}",
            text
        );
        let raw = self.generate_content(&prompt).await?;

        let parsed = match (raw.find('{'), raw.rfind('}')) {
            (Some(start), Some(end)) if start < end => {
                serde_json::from_str(&raw[start..=end]).unwrap_or_else(|_| neutral_sentiment())
            }
            _ => neutral_sentiment(),
        };
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request(count: usize) -> GenerationRequest {
        GenerationRequest {
            topic: "rust testing".to_string(),
            tone: "casual".to_string(),
            count,
            include_hashtags: false,
            include_call_to_action: false,
        }
    }

    #[test]
    fn test_build_prompt_options() {
        let mut req = request(2);
        req.include_hashtags = true;
        req.include_call_to_action = true;
        let prompt = build_prompt(&req);
        assert!(prompt.contains("2 distinct tweets"));
        assert!(prompt.contains("casual tone"));
        assert!(prompt.contains("hashtags"));
        assert!(prompt.contains("call to action"));
    }

    #[test]
    fn test_parse_variants_json_array() {
        let raw = r#"Here you go:
        [{"text": "First tweet", "viral_score": 0.8},
         {"text": "Second tweet", "viral_score": 1.7}]"#;
        let variants = parse_variants(raw, 3);
        assert_eq!(variants.len(), 2);
        assert_eq!(variants[0].text, "First tweet");
        assert_eq!(variants[0].viral_score, 0.8);
        // Scores outside [0, 1] are clamped
        assert_eq!(variants[1].viral_score, 1.0);
    }

    #[test]
    fn test_parse_variants_respects_count() {
        let raw = r#"[{"text": "a", "viral_score": 0.5},
                      {"text": "b", "viral_score": 0.5},
                      {"text": "c", "viral_score": 0.5}]"#;
        assert_eq!(parse_variants(raw, 2).len(), 2);
    }

    #[test]
    fn test_parse_variants_line_fallback() {
        let raw = "- First idea\n- Second idea\n\n- Third idea";
        let variants = parse_variants(raw, 5);
        assert_eq!(variants.len(), 3);
        assert_eq!(variants[0].text, "First idea");
        for v in &variants {
            assert!(v.viral_score >= 0.6 && v.viral_score <= 0.9);
        }
    }

    #[tokio::test]
    async fn test_generate_variants_round_trip() {
        let server = MockServer::start().await;

        let reply = serde_json::json!({
            "candidates": [{
                "content": {
                    "parts": [{
                        "text": "[{\"text\": \"Ship it\", \"viral_score\": 0.7}]"
                    }]
                }
            }]
        });

        Mock::given(method("POST"))
            .and(path("/models/gemini-2.0-flash:generateContent"))
            .and(query_param("key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply))
            .mount(&server)
            .await;

        let generator = AiGenerator::new("test-key", DEFAULT_GEMINI_MODEL, &server.uri());
        let variants = generator.generate_variants(&request(1)).await.unwrap();
        assert_eq!(variants.len(), 1);
        assert_eq!(variants[0].text, "Ship it");
    }

    #[tokio::test]
    async fn test_generate_variants_upstream_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("quota exceeded"))
            .mount(&server)
            .await;

        let generator = AiGenerator::new("test-key", DEFAULT_GEMINI_MODEL, &server.uri());
        let err = generator.generate_variants(&request(1)).await.unwrap_err();
        match err {
            AiError::Api(body) => assert!(body.contains("quota exceeded")),
            other => panic!("expected Api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_analyze_sentiment_falls_back_to_neutral() {
        let server = MockServer::start().await;

        let reply = serde_json::json!({
            "candidates": [{
                "content": { "parts": [{ "text": "I cannot answer that." }] }
            }]
        });

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply))
            .mount(&server)
            .await;

        let generator = AiGenerator::new("test-key", DEFAULT_GEMINI_MODEL, &server.uri());
        let verdict = generator.analyze_sentiment("hello").await.unwrap();
        assert_eq!(verdict["sentiment"], "neutral");
        assert_eq!(verdict["engagement_score"], 0.5);
    }
}
