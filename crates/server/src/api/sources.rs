//! Source aggregation API handlers.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use sourcerer_core::{
    ranking::RankStats, AggregateError, AggregationResult, AvailabilityReport, Query, RankedResult,
    RawResult, UserFilters,
};

use super::handlers::ErrorResponse;
use crate::state::AppState;

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SourcesRequest {
    pub query: Query,
    /// Falls back to the configured `[filters]` when absent.
    #[serde(default)]
    pub filters: Option<UserFilters>,
}

/// A frozen raw set to filter and rank again.
#[derive(Debug, Deserialize)]
pub struct RankRequest {
    pub query: Query,
    pub raw_results: Vec<RawResult>,
    #[serde(default)]
    pub availability: AvailabilityReport,
    #[serde(default)]
    pub filters: Option<UserFilters>,
}

#[derive(Debug, Serialize)]
pub struct RankResponse {
    pub results: Vec<RankedResult>,
    pub total: usize,
    pub stats: RankStats,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn map_error(err: AggregateError) -> ApiError {
    let status = match &err {
        AggregateError::InvalidQuery(_) => StatusCode::BAD_REQUEST,
        AggregateError::NoProviders => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    ErrorResponse::with_status(status, err)
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/v1/sources
///
/// Scrape every enabled provider and return the ranked list.
pub async fn aggregate(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SourcesRequest>,
) -> Result<Json<AggregationResult>, ApiError> {
    let aggregator = state.aggregator();
    let filters = request
        .filters
        .as_ref()
        .unwrap_or_else(|| aggregator.default_filters());

    aggregator
        .aggregate(&request.query, filters)
        .await
        .map(Json)
        .map_err(map_error)
}

/// POST /api/v1/sources/rank
///
/// Re-filter and re-rank a raw set without contacting providers.
pub async fn rank(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RankRequest>,
) -> Result<Json<RankResponse>, ApiError> {
    let aggregator = state.aggregator();
    let filters = request
        .filters
        .as_ref()
        .unwrap_or_else(|| aggregator.default_filters());

    let ranking = aggregator
        .rank_frozen(&request.query, &request.raw_results, &request.availability, filters)
        .map_err(map_error)?;

    Ok(Json(RankResponse {
        total: ranking.results.len(),
        results: ranking.results,
        stats: ranking.stats,
    }))
}
