//! Liveness and cache statistics.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use scout_search::CacheStats;

use crate::state::AppState;

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[derive(Debug, Serialize)]
pub struct CacheStatsResponse {
    pub caches: Vec<CacheStats>,
}

pub async fn cache_stats(State(state): State<AppState>) -> Json<CacheStatsResponse> {
    let mut caches = state.engine.cache_stats();
    caches.push(state.suggestions.cache_stats());
    Json(CacheStatsResponse { caches })
}
