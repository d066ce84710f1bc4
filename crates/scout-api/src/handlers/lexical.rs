//! Primary lexical backend health and reindexing.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use scout_core::HealthState;
use scout_search::ReindexReport;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct LexicalHealthResponse {
    /// Backend the status refers to.
    pub backend: &'static str,
    pub fallback: &'static str,
    pub status: HealthState,
    pub last_checked: Option<DateTime<Utc>>,
    pub consecutive_failures: u32,
    /// Documents in the primary index, when it answers.
    pub index_count: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct HealthParams {
    /// Probe now instead of reporting the cached state.
    #[serde(default)]
    pub refresh: bool,
}

pub async fn health(
    State(state): State<AppState>,
    params: Result<Query<HealthParams>, QueryRejection>,
) -> Result<Json<LexicalHealthResponse>, ApiError> {
    let Query(params) = params?;
    let lexical = state.engine.lexical();
    let fallback = lexical.fallback_backend().name();

    let Some(monitor) = lexical.health() else {
        // No primary configured: the fallback is the only backend.
        return Ok(Json(LexicalHealthResponse {
            backend: fallback,
            fallback,
            status: HealthState::Unavailable,
            last_checked: None,
            consecutive_failures: 0,
            index_count: None,
        }));
    };

    let status = if params.refresh {
        monitor.check_now().await
    } else {
        monitor.status()
    };

    let index_count = match &state.reindex {
        Some(target) if status.status != HealthState::Unavailable => {
            match target.index.document_count().await {
                Ok(count) => Some(count),
                Err(e) => {
                    warn!(subsystem = "api", error = %e, "Index count unavailable");
                    None
                }
            }
        }
        _ => None,
    };

    Ok(Json(LexicalHealthResponse {
        backend: monitor.backend_name(),
        fallback,
        status: status.status,
        last_checked: Some(status.last_checked),
        consecutive_failures: status.consecutive_failures,
        index_count,
    }))
}

/// Rebuild the primary index from the relational store.
pub async fn reindex(State(state): State<AppState>) -> Result<Json<ReindexReport>, ApiError> {
    let target = state
        .reindex
        .as_ref()
        .ok_or_else(|| ApiError::NotFound("no primary lexical index configured".to_string()))?;
    let _running = target
        .running
        .try_lock()
        .map_err(|_| ApiError::Conflict("reindex already running".to_string()))?;

    info!(subsystem = "api", batch_size = target.batch_size, "Reindex triggered");
    let report =
        scout_search::reindex(target.source.as_ref(), target.index.as_ref(), target.batch_size)
            .await?;

    if let Some(monitor) = state.engine.lexical().health() {
        monitor.check_now().await;
    }
    Ok(Json(report))
}
