//! Application state shared across handlers.

use std::sync::Arc;

use governor::{Quota, RateLimiter};
use tokio::sync::Mutex;

use scout_core::{ExperienceSource, LexicalIndex};
use scout_search::{SearchEngine, SuggestionService};

use crate::config::ApiConfig;

/// Global rate limiter type (direct quota, not keyed per client).
pub type GlobalRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Where `POST /lexical/reindex` reads from and writes to.
#[derive(Clone)]
pub struct ReindexTarget {
    pub index: Arc<dyn LexicalIndex>,
    pub source: Arc<dyn ExperienceSource>,
    pub batch_size: usize,
    /// Held for the duration of a run; a second trigger is refused.
    pub running: Arc<Mutex<()>>,
}

impl ReindexTarget {
    pub fn new(
        index: Arc<dyn LexicalIndex>,
        source: Arc<dyn ExperienceSource>,
        batch_size: usize,
    ) -> Self {
        Self {
            index,
            source,
            batch_size,
            running: Arc::new(Mutex::new(())),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<SearchEngine>,
    pub suggestions: Arc<SuggestionService>,
    /// `None` when no primary index is configured.
    pub reindex: Option<ReindexTarget>,
    /// `None` if rate limiting is disabled.
    pub rate_limiter: Option<Arc<GlobalRateLimiter>>,
}

impl AppState {
    pub fn new(engine: Arc<SearchEngine>, suggestions: Arc<SuggestionService>) -> Self {
        Self {
            engine,
            suggestions,
            reindex: None,
            rate_limiter: None,
        }
    }

    pub fn with_reindex(mut self, target: ReindexTarget) -> Self {
        self.reindex = Some(target);
        self
    }

    pub fn with_rate_limiter(mut self, limiter: Arc<GlobalRateLimiter>) -> Self {
        self.rate_limiter = Some(limiter);
        self
    }
}

/// Build the limiter described by `config`, or `None` when disabled.
pub fn rate_limiter(config: &ApiConfig) -> anyhow::Result<Option<Arc<GlobalRateLimiter>>> {
    if !config.rate_limit_enabled {
        return Ok(None);
    }
    let burst = u32::try_from(config.rate_limit_requests)
        .ok()
        .and_then(std::num::NonZeroU32::new)
        .ok_or_else(|| anyhow::anyhow!("RATE_LIMIT_REQUESTS must be between 1 and u32::MAX"))?;
    let quota = Quota::with_period(config.rate_limit_period)
        .ok_or_else(|| anyhow::anyhow!("RATE_LIMIT_PERIOD_SECS must be non-zero"))?
        .allow_burst(burst);
    Ok(Some(Arc::new(RateLimiter::direct(quota))))
}
