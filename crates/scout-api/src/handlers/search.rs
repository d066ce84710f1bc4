//! Search, suggestion, facet and tier-breakdown handlers.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use scout_core::{defaults, Facets, SearchRequest, SearchResponse};
use scout_search::{SuggestionReply, TierBreakdown};

use crate::error::ApiError;
use crate::state::AppState;

/// Largest facet list a caller may ask for.
const FACET_LIMIT_MAX: usize = 100;

pub async fn search(
    State(state): State<AppState>,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<SearchResponse>, ApiError> {
    let Json(request) = payload?;
    let response = state.engine.search(&request).await?;
    Ok(Json(response))
}

/// Primary lexical hits for `query`, grouped by title tier.
pub async fn tier_breakdown(
    State(state): State<AppState>,
    Path(query): Path<String>,
) -> Result<Json<TierBreakdown>, ApiError> {
    if query.trim().is_empty() {
        return Err(ApiError::BadRequest("query must not be empty".to_string()));
    }
    Ok(Json(state.engine.lexical_tiers(&query).await?))
}

#[derive(Debug, Deserialize)]
pub struct SuggestionParams {
    #[serde(default)]
    pub query: String,
    pub limit: Option<usize>,
    /// Caller-chosen id; a newer call in the same session supersedes older ones.
    pub session: Option<String>,
}

pub async fn suggestions(
    State(state): State<AppState>,
    params: Result<Query<SuggestionParams>, QueryRejection>,
) -> Result<Json<SuggestionReply>, ApiError> {
    let Query(params) = params?;
    let reply = state
        .suggestions
        .suggest(params.session.as_deref(), &params.query, params.limit)
        .await?;
    Ok(Json(reply))
}

#[derive(Debug, Deserialize)]
pub struct FacetParams {
    pub limit: Option<usize>,
}

pub async fn facets(
    State(state): State<AppState>,
    params: Result<Query<FacetParams>, QueryRejection>,
) -> Result<Json<Facets>, ApiError> {
    let Query(params) = params?;
    let limit = params
        .limit
        .unwrap_or(defaults::FACET_LIMIT)
        .clamp(1, FACET_LIMIT_MAX);
    Ok(Json(state.engine.facets(limit).await?))
}
