//! Position-title suggestions with latest-request-wins sessions.
//!
//! Each session carries a generation counter on a watch channel. Starting a
//! call bumps the generation; an older call still in flight sees the change,
//! drops its work, and reports itself superseded. Calls without a session
//! are never superseded.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use serde::Serialize;
use tokio::sync::watch;
use tracing::debug;

use scout_core::{defaults, Outcome, Result};

use crate::cache::{cache_key, CacheConfig, CacheStats, SingleFlightCache};
use crate::lexical::LexicalRetriever;

/// Sessions idle this long are forgotten.
const SESSION_IDLE: Duration = Duration::from_secs(600);

/// Result of one suggestion call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SuggestionReply {
    Fresh { suggestions: Vec<String> },
    Superseded { superseded: bool },
}

impl SuggestionReply {
    pub fn is_superseded(&self) -> bool {
        matches!(self, SuggestionReply::Superseded { .. })
    }
}

pub struct SuggestionService {
    lexical: Arc<LexicalRetriever>,
    cache: Arc<SingleFlightCache<Vec<String>>>,
    sessions: Cache<String, Arc<watch::Sender<u64>>>,
}

impl SuggestionService {
    pub fn new(lexical: Arc<LexicalRetriever>, config: CacheConfig) -> Self {
        Self {
            lexical,
            cache: Arc::new(SingleFlightCache::new("suggestions", config)),
            sessions: Cache::builder()
                .max_capacity(config.max_entries)
                .time_to_idle(SESSION_IDLE)
                .build(),
        }
    }

    pub fn from_env(lexical: Arc<LexicalRetriever>) -> Self {
        Self::new(lexical, CacheConfig::suggestions_from_env())
    }

    /// Suggest titles starting with `query`. Empty input yields no suggestions.
    pub async fn suggest(
        &self,
        session: Option<&str>,
        query: &str,
        limit: Option<usize>,
    ) -> Result<SuggestionReply> {
        let prefix = query.trim().to_lowercase();
        let limit = limit
            .unwrap_or(defaults::SUGGESTION_LIMIT)
            .clamp(1, defaults::SUGGESTION_LIMIT_MAX);

        let Some(session) = session.filter(|s| !s.is_empty()) else {
            let suggestions = self.lookup(&prefix, limit).await?;
            return Ok(SuggestionReply::Fresh { suggestions });
        };

        let sender = self
            .sessions
            .get_with(session.to_string(), async { Arc::new(watch::channel(0u64).0) })
            .await;
        let mut generation = 0;
        sender.send_modify(|g| {
            *g += 1;
            generation = *g;
        });
        let mut rx = sender.subscribe();

        tokio::select! {
            biased;
            _ = superseded(&mut rx, generation) => {
                debug!(
                    subsystem = "search",
                    component = "suggestions",
                    session,
                    generation,
                    "Suggestion call superseded"
                );
                Ok(SuggestionReply::Superseded { superseded: true })
            }
            result = self.lookup(&prefix, limit) => {
                if *sender.borrow() != generation {
                    return Ok(SuggestionReply::Superseded { superseded: true });
                }
                Ok(SuggestionReply::Fresh { suggestions: result? })
            }
        }
    }

    async fn lookup(&self, prefix: &str, limit: usize) -> Result<Vec<String>> {
        if prefix.is_empty() {
            return Ok(Vec::new());
        }
        let key = cache_key("suggest:", &[prefix.as_bytes(), &limit.to_le_bytes()]);
        let cached = self
            .cache
            .get_or_compute(&key, || async {
                self.lexical.suggest(prefix, limit).await.map(Outcome::clean)
            })
            .await?;
        Ok(cached.value.as_ref().clone())
    }

    pub fn cache(&self) -> &Arc<SingleFlightCache<Vec<String>>> {
        &self.cache
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

/// Resolves once the session generation moves past `generation`.
async fn superseded(rx: &mut watch::Receiver<u64>, generation: u64) {
    loop {
        if *rx.borrow_and_update() != generation {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
