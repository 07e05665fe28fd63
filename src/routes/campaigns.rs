//! Campaign CRUD endpoints

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{post, put},
};
use serde::Deserialize;
use std::sync::Arc;

use crate::AppState;
use crate::domain::models::CampaignSlot;
use crate::domain::queries::campaigns;
use crate::routes::auth::AuthUser;
use crate::routes::dto::CampaignResponse;
use crate::services::error::ApiError;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/campaigns", post(create_campaign).get(list_campaigns))
        .route(
            "/campaigns/{id}",
            put(update_campaign).get(get_campaign).delete(delete_campaign),
        )
        .route("/campaigns/{id}/toggle", post(toggle_campaign))
}

#[derive(Deserialize)]
struct CampaignRequest {
    name: String,
    description: Option<String>,
    recurrence: Option<String>,
    #[serde(default)]
    slots: Vec<CampaignSlot>,
}

impl CampaignRequest {
    fn validate(&self) -> Result<(), ApiError> {
        if self.name.trim().is_empty() {
            return Err(ApiError::Validation("name is required".to_string()));
        }
        for slot in &self.slots {
            if slot.topic.trim().is_empty() {
                return Err(ApiError::Validation(
                    "every slot needs a topic".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// POST /campaigns - Create a campaign
async fn create_campaign(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Json(req): Json<CampaignRequest>,
) -> Result<(StatusCode, Json<CampaignResponse>), ApiError> {
    req.validate()?;

    let campaign = campaigns::create_campaign(
        &state.db,
        user_id,
        req.name.trim(),
        req.description.as_deref(),
        req.recurrence.as_deref(),
        &req.slots,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(campaign.into())))
}

/// GET /campaigns - List the caller's campaigns
async fn list_campaigns(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<CampaignResponse>>, ApiError> {
    let campaigns = campaigns::list_campaigns(&state.db, user_id).await?;

    Ok(Json(campaigns.into_iter().map(Into::into).collect()))
}

/// GET /campaigns/{id} - Fetch one campaign
async fn get_campaign(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(campaign_id): Path<i64>,
) -> Result<Json<CampaignResponse>, ApiError> {
    let campaign = campaigns::get_campaign(&state.db, campaign_id, user_id)
        .await?
        .ok_or(ApiError::NotFound("campaign"))?;

    Ok(Json(campaign.into()))
}

/// PUT /campaigns/{id} - Replace a campaign's editable fields
async fn update_campaign(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(campaign_id): Path<i64>,
    Json(req): Json<CampaignRequest>,
) -> Result<Json<CampaignResponse>, ApiError> {
    req.validate()?;

    let campaign = campaigns::update_campaign(
        &state.db,
        campaign_id,
        user_id,
        req.name.trim(),
        req.description.as_deref(),
        req.recurrence.as_deref(),
        &req.slots,
    )
    .await?
    .ok_or(ApiError::NotFound("campaign"))?;

    Ok(Json(campaign.into()))
}

/// DELETE /campaigns/{id} - Remove a campaign. Already-materialized tweets
/// stay behind with their campaign link cleared.
async fn delete_campaign(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(campaign_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let deleted = campaigns::delete_campaign(&state.db, campaign_id, user_id).await?;
    if !deleted {
        return Err(ApiError::NotFound("campaign"));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// POST /campaigns/{id}/toggle - Flip the active flag
async fn toggle_campaign(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(campaign_id): Path<i64>,
) -> Result<Json<CampaignResponse>, ApiError> {
    let campaign = campaigns::toggle_campaign(&state.db, campaign_id, user_id)
        .await?
        .ok_or(ApiError::NotFound("campaign"))?;

    Ok(Json(campaign.into()))
}
