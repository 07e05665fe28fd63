//! Handler-level error taxonomy
//!
//! Routes and the auth extractor return `ApiError` instead of bare status
//! codes, so callers branch on error kind rather than exception identity.
//! Responses carry the `{"detail": ...}` body shape throughout the API.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

#[derive(Debug)]
pub enum ApiError {
    /// Entity absent or not owned by the caller
    NotFound(&'static str),
    /// Illegal lifecycle transition (e.g. double-publish)
    InvalidState(String),
    /// The user has no publisher API key configured
    MissingCredential,
    /// Request failed validation (length, bounds, duplicates)
    Validation(String),
    /// Missing or invalid bearer token
    Unauthenticated,
    /// AI provider failure
    Provider(String),
    /// Publishing client failure while posting
    Publish(String),
    /// The AI provider is not configured on this deployment
    AiUnavailable,
    Internal(String),
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::NotFound(what) => write!(f, "{} not found", what),
            ApiError::InvalidState(msg) => write!(f, "{}", msg),
            ApiError::MissingCredential => write!(f, "Publisher API key not configured"),
            ApiError::Validation(msg) => write!(f, "{}", msg),
            ApiError::Unauthenticated => write!(f, "Could not validate credentials"),
            ApiError::Provider(msg) => write!(f, "AI generation failed: {}", msg),
            ApiError::Publish(msg) => write!(f, "Failed to post: {}", msg),
            ApiError::AiUnavailable => write!(f, "AI provider not configured"),
            ApiError::Internal(msg) => write!(f, "{}", msg),
        }
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidState(_)
            | ApiError::MissingCredential
            | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::Provider(_) | ApiError::Publish(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::AiUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            eprintln!("[api] internal error: {}", self);
        }
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        ApiError::Internal(format!("Database error: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::NotFound("Tweet").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::InvalidState("Tweet already posted".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::MissingCredential.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::Unauthenticated.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::Publish("boom".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::AiUnavailable.status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_upstream_message_embedded() {
        let e = ApiError::Publish("upstream said no".into());
        assert!(e.to_string().contains("upstream said no"));
    }
}
