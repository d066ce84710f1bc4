//! # scout-api
//!
//! HTTP surface for scout candidate search.
//!
//! | Route | Purpose |
//! |-------|---------|
//! | `POST /search` | Hybrid candidate search |
//! | `GET /suggestions` | Position-title prefix suggestions |
//! | `GET /facets` | Top position titles and companies |
//! | `GET /search/test/:query` | Primary lexical hits grouped by tier |
//! | `GET /lexical/health` | Primary lexical backend status |
//! | `POST /lexical/reindex` | Rebuild the primary index |
//! | `GET /cache/stats` | Per-cache counters |
//! | `GET /health` | Liveness |

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod state;

use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

pub use config::ApiConfig;
pub use error::ApiError;
pub use state::{AppState, GlobalRateLimiter, ReindexTarget};

use handlers::{lexical, search, system};
use middleware::MakeRequestUuidV7;

/// Search requests are small JSON documents.
const BODY_LIMIT_BYTES: usize = 256 * 1024;

/// All routes with request ids, tracing, panic capture and rate limiting.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(system::health))
        .route("/search", post(search::search))
        .route("/search/test/:query", get(search::tier_breakdown))
        .route("/suggestions", get(search::suggestions))
        .route("/facets", get(search::facets))
        .route("/lexical/health", get(lexical::health))
        .route("/lexical/reindex", post(lexical::reindex))
        .route("/cache/stats", get(system::cache_stats))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::rate_limit,
        ))
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT_BYTES))
        .with_state(state)
}

/// CORS restricted to the configured origins. Unparseable origins are skipped.
pub fn cors_layer(config: &ApiConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .max_age(std::time::Duration::from_secs(3600))
}
