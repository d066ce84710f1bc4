//! scout-api - HTTP API server for scout candidate search

use std::sync::Arc;

use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scout_api::{router, state, ApiConfig, AppState, ReindexTarget};
use scout_core::{defaults, EmbeddingBackend, LexicalBackend};
use scout_db::{Database, PoolConfig};
use scout_inference::{Embedder, OpenAIBackend, Projection, QueryTranslator, RetryPolicy};
use scout_search::{
    ElasticsearchBackend, HealthMonitor, LexicalRetriever, SearchEngine, SuggestionService,
    VectorRetriever,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let _file_guard = init_tracing();

    let config = ApiConfig::from_env();

    info!("Connecting to database...");
    let db = Database::connect_with_config(&config.database_url, PoolConfig::from_env()).await?;
    db.migrate().await?;
    info!("Database connected and migrated");

    // Inference
    let openai = Arc::new(OpenAIBackend::from_env()?);
    let retry = RetryPolicy::from_env();
    let projection = Arc::new(load_projection(&config, openai.dimension())?);
    verify_projection(&db, &projection).await?;
    let translator = Arc::new(QueryTranslator::new(openai.clone(), retry));
    let embedder = Arc::new(Embedder::new(openai, projection, retry));

    // Lexical channel: Elasticsearch primary with the relational fallback
    let fallback: Arc<dyn LexicalBackend> = Arc::new(db.lexical.clone());
    let lexical_timeout = LexicalRetriever::timeout_from_env();
    let mut reindex_target = None;
    let lexical = if config.es_enabled {
        let es = Arc::new(ElasticsearchBackend::from_env()?);
        let health = Arc::new(HealthMonitor::from_env(es.clone()));
        health.check_now().await;
        health.clone().spawn_refresh();
        reindex_target = Some(ReindexTarget::new(
            es,
            Arc::new(db.experiences.clone()),
            defaults::REINDEX_BATCH_SIZE,
        ));
        LexicalRetriever::with_primary(health, fallback, lexical_timeout)
    } else {
        warn!("Elasticsearch disabled, lexical channel uses the relational fallback only");
        LexicalRetriever::fallback_only(fallback, lexical_timeout)
    };
    let lexical = Arc::new(lexical);

    let vector = Arc::new(VectorRetriever::new(
        Arc::new(db.vectors.clone()),
        VectorRetriever::timeout_from_env(),
    ));

    let engine = Arc::new(SearchEngine::new(
        translator,
        embedder,
        lexical.clone(),
        vector,
        Arc::new(db.candidates.clone()),
    ));
    let suggestions = Arc::new(SuggestionService::from_env(lexical));

    engine.spawn_cache_reclaim(config.cache_reclaim_interval);
    suggestions
        .cache()
        .clone()
        .spawn_reclaim(config.cache_reclaim_interval);
    spawn_pool_metrics(db.clone(), config.cache_reclaim_interval);

    let mut app_state = AppState::new(engine, suggestions);
    if let Some(target) = reindex_target {
        app_state = app_state.with_reindex(target);
    }
    if let Some(limiter) = state::rate_limiter(&config)? {
        app_state = app_state.with_rate_limiter(limiter);
    }
    info!(
        enabled = config.rate_limit_enabled,
        requests = config.rate_limit_requests,
        period_secs = config.rate_limit_period.as_secs(),
        "Rate limiting configured"
    );

    let app = router(app_state).layer(scout_api::cors_layer(&config));

    let addr = config.bind_addr()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Install the tracing subscriber.
///
/// Environment variables:
///   LOG_FORMAT  - "json" or "text" (default: "text")
///   LOG_FILE    - path to log file (optional, enables daily rolling file logging)
///   LOG_ANSI    - "true"/"false" override ANSI colors (auto-detected by default)
///   RUST_LOG    - standard env filter
fn init_tracing() -> Option<WorkerGuard> {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "scout_api=debug,scout_search=debug,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(env_filter);

    let guard = if let Some(ref path) = log_file {
        let path = std::path::Path::new(path);
        let dir = path.parent().unwrap_or(std::path::Path::new("."));
        let file_name = path
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("scout-api.log");
        let (writer, guard) =
            tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, file_name));

        if log_format == "json" {
            registry
                .with(tracing_subscriber::fmt::layer().json().with_writer(writer))
                .init();
        } else {
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(log_ansi.unwrap_or(false));
            registry.with(layer).init();
        }
        Some(guard)
    } else {
        if log_format == "json" {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer();
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            }
            registry.with(layer).init();
        }
        None
    };

    info!(
        log_format = %log_format,
        log_file = log_file.as_deref().unwrap_or("(stdout)"),
        "Logging initialized"
    );
    guard
}

fn load_projection(config: &ApiConfig, model_dimension: usize) -> anyhow::Result<Projection> {
    match &config.projection_path {
        Some(path) => {
            let projection = Projection::load(path)?;
            info!(
                path = %path.display(),
                version = projection.version(),
                input_dim = projection.input_dim(),
                output_dim = projection.output_dim(),
                "Projection loaded"
            );
            Ok(projection)
        }
        None => {
            warn!(
                dimension = model_dimension,
                "PROJECTION_PATH not set, query embeddings are not reduced"
            );
            Ok(Projection::identity(model_dimension, "identity"))
        }
    }
}

/// Log connection pool usage on the cache reclaim cadence.
fn spawn_pool_metrics(db: Database, every: std::time::Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            scout_db::log_pool_metrics(db.pool());
        }
    });
}

/// Refuse to start when the stored vectors were built with another projection.
async fn verify_projection(db: &Database, projection: &Projection) -> anyhow::Result<()> {
    match db.projection.current().await? {
        Some(meta) => {
            projection.ensure_compatible(&meta.version)?;
            info!(version = %meta.version, "Projection matches index");
        }
        None => warn!(
            version = projection.version(),
            "Index has no projection version recorded, skipping check"
        ),
    }
    Ok(())
}
