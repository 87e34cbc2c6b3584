//! Cache maintenance API handlers.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use sourcerer_core::cache::PurgeStats;
use tracing::info;

use super::handlers::ErrorResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub message: String,
}

/// DELETE /api/v1/cache
///
/// Empty both the result cache and the availability cache.
pub async fn clear_cache(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SuccessResponse>, (StatusCode, Json<ErrorResponse>)> {
    state
        .aggregator()
        .caches()
        .clear()
        .map_err(|e| ErrorResponse::with_status(StatusCode::INTERNAL_SERVER_ERROR, e))?;

    info!("Caches cleared");
    Ok(Json(SuccessResponse {
        message: "Caches cleared".to_string(),
    }))
}

/// POST /api/v1/cache/purge
///
/// Delete expired rows from both caches.
pub async fn purge_cache(
    State(state): State<Arc<AppState>>,
) -> Result<Json<PurgeStats>, (StatusCode, Json<ErrorResponse>)> {
    let stats = state
        .aggregator()
        .caches()
        .purge_expired()
        .map_err(|e| ErrorResponse::with_status(StatusCode::INTERNAL_SERVER_ERROR, e))?;

    info!(
        result_rows = stats.result_rows,
        availability_rows = stats.availability_rows,
        "Expired cache rows purged"
    );
    Ok(Json(stats))
}
