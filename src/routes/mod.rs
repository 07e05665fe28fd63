pub mod ai;
pub mod analytics;
pub mod auth;
pub mod campaigns;
pub mod dto;
pub mod tweets;

use axum::Router;
use std::sync::Arc;

use crate::AppState;

/// Build all routes for the API
pub fn build_routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(ai::routes())
        .merge(analytics::routes())
        .merge(auth::routes())
        .merge(campaigns::routes())
        .merge(tweets::routes())
}
