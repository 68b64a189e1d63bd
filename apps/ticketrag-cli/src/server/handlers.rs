use axum::{extract::State, Json};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info};

use ticketrag_core::categories::{count_categories, CategoryCount};

use super::types::{ApiError, HealthResponse, SearchRequest, SearchResponse, StatsResponse};
use crate::runtime::AppState;

/// POST /api/search - retrieve similar tickets and answer the question
pub async fn search(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
    let query = request.query.trim().to_string();
    if query.is_empty() {
        return Err(ApiError::bad_request("Query is required"));
    }
    let retrieval = &state.settings.retrieval;
    let top_k = request.top_k.unwrap_or(state.settings.server.top_k);
    if top_k == 0 {
        return Err(ApiError::bad_request("top_k must be a positive integer"));
    }
    let top_k = top_k.min(retrieval.max_top_k);

    let (tickets, prompt) = state.engine.question_prompt(&query, top_k).await.map_err(|e| {
        error!(error = %e, "search failed");
        ApiError::from(e)
    })?;

    let generator = state.engine.generator().clone();
    let max_length = state.settings.models.answer_max_length;
    let answer = tokio::task::spawn_blocking(move || generator.generate(&prompt, max_length))
        .await
        .map_err(|e| ApiError::internal(format!("generation task failed: {e}")))?
        .map_err(|e| {
            error!(error = %e, "generation failed");
            ApiError::internal(e.to_string())
        })?;

    info!(query = %query, count = tickets.len(), "answered search");
    Ok(Json(SearchResponse { query, answer, count: tickets.len(), tickets }))
}

/// GET /api/stats - ticket counts
pub async fn stats(State(state): State<Arc<AppState>>) -> Result<Json<StatsResponse>, ApiError> {
    let retriever = state.retriever();
    let indexed_tickets = retriever.indexed_count().await?;
    Ok(Json(StatsResponse {
        total_tickets: retriever.reference().len(),
        indexed_tickets,
        by_status: retriever.reference().table().status_counts(),
    }))
}

/// GET /api/health - liveness. State exists only once its models are loaded.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok".to_string(), models_loaded: true })
}

/// GET /api/categories - keyword category counts
pub async fn categories(State(state): State<Arc<AppState>>) -> Json<BTreeMap<String, CategoryCount>> {
    Json(count_categories(state.retriever().reference()))
}
