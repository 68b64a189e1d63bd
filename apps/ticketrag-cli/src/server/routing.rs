//! Route table. Every endpoint answers both under `/api` and at the root.

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use super::handlers;
use crate::runtime::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new().nest("/api", api_routes()).merge(api_routes()).with_state(state)
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/search", post(handlers::search))
        .route("/stats", get(handlers::stats))
        .route("/health", get(handlers::health))
        .route("/categories", get(handlers::categories))
}
