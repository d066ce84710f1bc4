//! Lexical channel with health-driven fallback.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use scout_core::{
    defaults, Degradation, Error, ExperienceMatch, LexicalBackend, Outcome, Result,
    StructuredQuery,
};

use crate::health::HealthMonitor;

/// Routes lexical calls to the primary backend while it is healthy and to
/// the relational fallback otherwise. Every backend call is time-bounded.
pub struct LexicalRetriever {
    primary: Option<Arc<HealthMonitor>>,
    fallback: Arc<dyn LexicalBackend>,
    timeout: Duration,
}

impl LexicalRetriever {
    /// Fallback only. Used when no search index is configured.
    pub fn fallback_only(fallback: Arc<dyn LexicalBackend>, timeout: Duration) -> Self {
        Self {
            primary: None,
            fallback,
            timeout,
        }
    }

    /// The primary is the backend watched by `health`.
    pub fn with_primary(
        health: Arc<HealthMonitor>,
        fallback: Arc<dyn LexicalBackend>,
        timeout: Duration,
    ) -> Self {
        Self {
            primary: Some(health),
            fallback,
            timeout,
        }
    }

    /// Timeout from `LEXICAL_TIMEOUT_MS`.
    pub fn timeout_from_env() -> Duration {
        Duration::from_millis(
            std::env::var("LEXICAL_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults::LEXICAL_TIMEOUT_MS),
        )
    }

    pub fn health(&self) -> Option<&Arc<HealthMonitor>> {
        self.primary.as_ref()
    }

    pub fn primary_backend(&self) -> Option<&Arc<dyn LexicalBackend>> {
        self.primary.as_ref().map(|h| h.backend())
    }

    pub fn fallback_backend(&self) -> &Arc<dyn LexicalBackend> {
        &self.fallback
    }

    /// Retrieve matches. Never fails: a dead fallback yields an empty,
    /// degraded result.
    pub async fn search(
        &self,
        query: &StructuredQuery,
        limit_ceiling: usize,
    ) -> Outcome<Vec<ExperienceMatch>> {
        let start = Instant::now();
        let routed = self
            .route(|backend| {
                let query = query.clone();
                async move { backend.search(&query, limit_ceiling).await }
            })
            .await;

        match routed {
            Ok((matches, backend, fell_back)) => {
                debug!(
                    subsystem = "search",
                    component = "lexical",
                    op = "search",
                    backend,
                    lexical_hits = matches.len(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Lexical retrieval complete"
                );
                let degradation = Degradation {
                    lexical_fallback: fell_back,
                    ..Degradation::default()
                };
                Outcome {
                    value: matches,
                    degradation,
                }
            }
            Err(e) => {
                warn!(
                    subsystem = "search",
                    component = "lexical",
                    op = "search",
                    error = %e,
                    "All lexical backends failed, continuing without keyword channel"
                );
                Outcome::degraded(
                    Vec::new(),
                    Degradation {
                        lexical_fallback: self.primary.is_some(),
                        lexical_unavailable: true,
                        ..Degradation::default()
                    },
                )
            }
        }
    }

    /// Query the primary backend directly, bypassing health routing.
    /// Without a primary this is the fallback.
    pub async fn search_primary(
        &self,
        query: &StructuredQuery,
        limit_ceiling: usize,
    ) -> Result<(&'static str, Vec<ExperienceMatch>)> {
        let backend = self.primary_backend().unwrap_or(&self.fallback).clone();
        let matches = self
            .bounded(backend.name(), backend.search(query, limit_ceiling))
            .await?;
        Ok((backend.name(), matches))
    }

    /// Position-title prefix suggestions through the same routing.
    pub async fn suggest(&self, prefix: &str, limit: usize) -> Result<Vec<String>> {
        let prefix = prefix.to_string();
        self.route(|backend| {
            let prefix = prefix.clone();
            async move { backend.suggest(&prefix, limit).await }
        })
        .await
        .map(|(titles, _, _)| titles)
    }

    async fn route<T, F, Fut>(&self, call: F) -> Result<(T, &'static str, bool)>
    where
        F: Fn(Arc<dyn LexicalBackend>) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut fell_back = false;
        if let Some(health) = &self.primary {
            let primary = health.backend();
            if health.should_try_primary() {
                match self.bounded(primary.name(), call(primary.clone())).await {
                    Ok(value) => {
                        health.record_success();
                        return Ok((value, primary.name(), false));
                    }
                    Err(e) => {
                        warn!(
                            subsystem = "search",
                            component = "lexical",
                            backend = primary.name(),
                            fallback = self.fallback.name(),
                            error = %e,
                            "Primary lexical backend failed, using fallback"
                        );
                        health.record_failure(&e);
                    }
                }
            }
            fell_back = true;
        }
        let value = self
            .bounded(self.fallback.name(), call(self.fallback.clone()))
            .await?;
        Ok((value, self.fallback.name(), fell_back))
    }

    async fn bounded<T>(
        &self,
        backend: &'static str,
        fut: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(Error::LexicalBackendTimeout {
                backend: backend.to_string(),
                timeout_ms: self.timeout.as_millis() as u64,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use scout_core::HealthState;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct Fake {
        name: &'static str,
        fail: AtomicBool,
        hang: bool,
        calls: AtomicUsize,
    }

    impl Fake {
        fn new(name: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                fail: AtomicBool::new(false),
                hang: false,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LexicalBackend for Fake {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn search(&self, _: &StructuredQuery, _: usize) -> Result<Vec<ExperienceMatch>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.hang {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
            if self.fail.load(Ordering::SeqCst) {
                return Err(Error::LexicalBackendUnavailable(format!("{} down", self.name)));
            }
            let mut m = ExperienceMatch::new(1, 1);
            m.lexical_score = 0.9;
            m.position_title = self.name.to_string();
            Ok(vec![m])
        }

        async fn suggest(&self, prefix: &str, _: usize) -> Result<Vec<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(Error::LexicalBackendUnavailable("down".into()));
            }
            Ok(vec![format!("{} via {}", prefix, self.name)])
        }

        async fn ping(&self) -> Result<()> {
            Ok(())
        }
    }

    fn retriever(primary: Arc<Fake>, fallback: Arc<Fake>) -> LexicalRetriever {
        let health = Arc::new(HealthMonitor::new(
            primary,
            Duration::from_secs(30),
            Duration::from_millis(100),
        ));
        LexicalRetriever::with_primary(health, fallback, Duration::from_millis(500))
    }

    fn query() -> StructuredQuery {
        StructuredQuery {
            position: "Data Engineer".into(),
            description: String::new(),
            skills: vec![],
            experience: None,
            industry: None,
            education: None,
            key_terms: vec![],
            search_text: "data engineer".into(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_healthy_primary_serves() {
        let (primary, fallback) = (Fake::new("es"), Fake::new("pg"));
        let r = retriever(primary.clone(), fallback.clone());
        let out = r.search(&query(), 100).await;
        assert!(!out.is_degraded());
        assert_eq!(out.value[0].position_title, "es");
        assert_eq!(fallback.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_primary_failure_falls_back_and_holds_for_interval() {
        let (primary, fallback) = (Fake::new("es"), Fake::new("pg"));
        primary.fail.store(true, Ordering::SeqCst);
        let r = retriever(primary.clone(), fallback.clone());

        let out = r.search(&query(), 100).await;
        assert!(out.degradation.lexical_fallback);
        assert!(!out.degradation.lexical_unavailable);
        assert_eq!(out.value[0].position_title, "pg");
        assert_eq!(
            r.health().unwrap().status().status,
            HealthState::Unavailable
        );

        // Primary is not retried inside the interval.
        r.search(&query(), 100).await;
        assert_eq!(primary.calls(), 1);
        assert_eq!(fallback.calls(), 2);

        primary.fail.store(false, Ordering::SeqCst);
        tokio::time::advance(Duration::from_secs(31)).await;
        let out = r.search(&query(), 100).await;
        assert!(!out.is_degraded());
        assert_eq!(primary.calls(), 2);
        assert_eq!(r.health().unwrap().status().status, HealthState::Available);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_counts_as_failure() {
        let primary = Arc::new(Fake {
            name: "es",
            fail: AtomicBool::new(false),
            hang: true,
            calls: AtomicUsize::new(0),
        });
        let fallback = Fake::new("pg");
        let r = retriever(primary, fallback);
        let out = r.search(&query(), 100).await;
        assert!(out.degradation.lexical_fallback);
        assert_eq!(r.health().unwrap().status().status, HealthState::Degraded);
    }

    #[tokio::test(start_paused = true)]
    async fn test_both_down_is_empty_and_flagged() {
        let (primary, fallback) = (Fake::new("es"), Fake::new("pg"));
        primary.fail.store(true, Ordering::SeqCst);
        fallback.fail.store(true, Ordering::SeqCst);
        let r = retriever(primary, fallback);
        let out = r.search(&query(), 100).await;
        assert!(out.value.is_empty());
        assert!(out.degradation.lexical_unavailable);
    }

    #[tokio::test]
    async fn test_fallback_only_is_not_degraded() {
        let r = LexicalRetriever::fallback_only(Fake::new("pg"), Duration::from_secs(1));
        let out = r.search(&query(), 100).await;
        assert!(!out.is_degraded());
        assert_eq!(r.suggest("data", 5).await.unwrap(), vec!["data via pg"]);
    }
}
