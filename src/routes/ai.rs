//! AI copy generation and analysis endpoints

use axum::{Json, Router, extract::State, routing::post};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::AppState;
use crate::domain::models::TweetStatus;
use crate::domain::queries::tweets;
use crate::routes::auth::AuthUser;
use crate::routes::dto::TweetResponse;
use crate::services::ai::{AiError, AiGenerator, GenerationRequest};
use crate::services::error::ApiError;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ai/generate", post(generate))
        .route("/ai/analyze", post(analyze))
}

fn generator(state: &AppState) -> Result<&AiGenerator, ApiError> {
    state.ai.as_ref().ok_or(ApiError::AiUnavailable)
}

// Every generation failure is an upstream provider problem as far as the
// caller is concerned, transport errors included
fn map_ai_error(e: AiError) -> ApiError {
    ApiError::Provider(e.to_string())
}

#[derive(Serialize)]
struct GenerateResponse {
    variants: Vec<TweetResponse>,
    metadata: GenerateMetadata,
}

#[derive(Serialize)]
struct GenerateMetadata {
    topic: String,
    tone: String,
}

/// POST /ai/generate - Generate tweet variants for a topic and save each
/// one as an AI-authored draft
async fn generate(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Json(req): Json<GenerationRequest>,
) -> Result<Json<GenerateResponse>, ApiError> {
    if req.topic.trim().is_empty() {
        return Err(ApiError::Validation("topic is required".to_string()));
    }

    let generator = generator(&state)?;
    let variants = generator
        .generate_variants(&req)
        .await
        .map_err(map_ai_error)?;

    let mut saved = Vec::with_capacity(variants.len());
    for variant in &variants {
        let tweet = tweets::create_tweet(
            &state.db,
            tweets::NewTweet {
                user_id,
                campaign_id: None,
                text: &variant.text,
                media_links: &[],
                status: TweetStatus::Draft,
                scheduled_at: None,
                generated_by_ai: true,
                viral_score: Some(variant.viral_score),
            },
        )
        .await?;
        saved.push(tweet.into());
    }

    Ok(Json(GenerateResponse {
        variants: saved,
        metadata: GenerateMetadata {
            topic: req.topic,
            tone: req.tone,
        },
    }))
}

#[derive(Deserialize)]
struct AnalyzeRequest {
    text: String,
}

/// POST /ai/analyze - Sentiment and engagement read on a piece of text
async fn analyze(
    State(state): State<Arc<AppState>>,
    AuthUser(_user_id): AuthUser,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if req.text.trim().is_empty() {
        return Err(ApiError::Validation("text is required".to_string()));
    }

    let generator = generator(&state)?;
    let verdict = generator
        .analyze_sentiment(&req.text)
        .await
        .map_err(map_ai_error)?;

    Ok(Json(verdict))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ai_errors_surface_as_provider_failures() {
        for err in [
            AiError::Api("quota exceeded".to_string()),
            AiError::EmptyResponse,
        ] {
            match map_ai_error(err) {
                ApiError::Provider(_) => {}
                other => panic!("expected Provider, got {:?}", other),
            }
        }
    }
}
