//! Authentication and session management endpoints

use axum::{
    Json, Router,
    extract::{FromRequestParts, State},
    http::{StatusCode, request::Parts},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_governor::{
    GovernorLayer, governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor,
};

use crate::AppState;
use crate::domain::queries::users;
use crate::routes::dto::UserResponse;
use crate::services::error::ApiError;
use crate::services::{password, session};

pub fn routes() -> Router<Arc<AppState>> {
    // Rate limit auth endpoints to slow down brute force attempts
    let rate_limit_config = GovernorConfigBuilder::default()
        .per_second(6)
        .burst_size(10)
        .key_extractor(SmartIpKeyExtractor)
        .finish()
        .expect("Failed to build rate limit config");

    let rate_limit_layer = GovernorLayer {
        config: rate_limit_config.into(),
    };

    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh_session))
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(get_me))
        .layer(rate_limit_layer)
}

// ============================================================================
// Auth Extractor - validates the bearer token and extracts user_id
// ============================================================================

/// Extractor that validates the Authorization bearer token and returns the
/// user_id it was issued for
pub struct AuthUser(pub i64);

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(ApiError::Unauthenticated)?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or(ApiError::Unauthenticated)?;

        let user_id = session::validate_access_token(token, &state.jwt_secret)
            .map_err(|_| ApiError::Unauthenticated)?;

        Ok(AuthUser(user_id))
    }
}

// ============================================================================
// Account endpoints
// ============================================================================

#[derive(Deserialize)]
struct RegisterRequest {
    username: String,
    password: String,
    twitter_username: Option<String>,
    api_key: Option<String>,
}

/// POST /auth/register - Create an account and log it in
async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<TokenResponse>), ApiError> {
    let username = req.username.trim();
    if username.is_empty() {
        return Err(ApiError::Validation("username is required".to_string()));
    }

    password::validate_password_strength(&req.password)
        .map_err(|e| ApiError::Validation(e.to_string()))?;
    let password_hash = password::hash_password(&req.password)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    let user = users::create_user(
        &state.db,
        username,
        &password_hash,
        req.twitter_username.as_deref(),
        req.api_key.as_deref(),
    )
    .await
    .map_err(|e| match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            ApiError::Validation("username already taken".to_string())
        }
        _ => ApiError::from(e),
    })?;

    let access_token = session::create_access_token(user.id, &state.jwt_secret)
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    let refresh_token = session::create_refresh_token(user.id, &state.db)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok((
        StatusCode::CREATED,
        Json(TokenResponse {
            access_token,
            refresh_token,
            token_type: "bearer",
            user: user.into(),
        }),
    ))
}

#[derive(Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Serialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    token_type: &'static str,
    user: UserResponse,
}

/// POST /auth/login - Exchange credentials for a token pair
async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let user = users::get_user_by_username(&state.db, &req.username)
        .await?
        .ok_or(ApiError::Unauthenticated)?;

    let valid = password::verify_password(&req.password, &user.password_hash)
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    if !valid {
        return Err(ApiError::Unauthenticated);
    }

    let access_token = session::create_access_token(user.id, &state.jwt_secret)
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    let refresh_token = session::create_refresh_token(user.id, &state.db)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(TokenResponse {
        access_token,
        refresh_token,
        token_type: "bearer",
        user: user.into(),
    }))
}

#[derive(Deserialize)]
struct RefreshRequest {
    refresh_token: String,
}

#[derive(Serialize)]
struct RefreshResponse {
    access_token: String,
    refresh_token: String,
    token_type: &'static str,
}

/// POST /auth/refresh - Rotate the refresh token and mint a new access token.
/// The old refresh token is invalidated; if two requests race on the same
/// token, only one succeeds.
async fn refresh_session(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RefreshRequest>,
) -> Result<Json<RefreshResponse>, ApiError> {
    // Invalid/expired tokens are expected for stale sessions, so no logging
    let (user_id, new_refresh_token) =
        session::rotate_refresh_token(&req.refresh_token, &state.db)
            .await
            .map_err(|_| ApiError::Unauthenticated)?;

    let access_token = session::create_access_token(user_id, &state.jwt_secret)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(RefreshResponse {
        access_token,
        refresh_token: new_refresh_token,
        token_type: "bearer",
    }))
}

/// POST /auth/logout - Revoke the refresh token
async fn logout(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RefreshRequest>,
) -> StatusCode {
    if let Err(e) = session::revoke_refresh_token(&req.refresh_token, &state.db).await {
        // Log but don't fail logout - the client discards its tokens anyway
        eprintln!("[auth] Failed to revoke refresh token during logout: {}", e);
    }

    StatusCode::NO_CONTENT
}

/// GET /auth/me - Current user info (validates the session)
async fn get_me(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<UserResponse>, ApiError> {
    let user = users::get_user_by_id(&state.db, user_id).await?;

    // A valid JWT for a deleted user is still unauthorized
    let user = user.ok_or(ApiError::Unauthenticated)?;

    Ok(Json(user.into()))
}
