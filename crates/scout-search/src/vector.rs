//! Vector channel. No fallback: failures zero the semantic contribution.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use scout_core::{
    defaults, Degradation, Error, ExperienceMatch, Outcome, QueryEmbedding, VectorBackend,
};

pub struct VectorRetriever {
    backend: Arc<dyn VectorBackend>,
    timeout: Duration,
}

impl VectorRetriever {
    pub fn new(backend: Arc<dyn VectorBackend>, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    /// Timeout from `VECTOR_TIMEOUT_MS`.
    pub fn timeout_from_env() -> Duration {
        Duration::from_millis(
            std::env::var("VECTOR_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults::VECTOR_TIMEOUT_MS),
        )
    }

    /// Nearest experiences, or an empty set when there is no embedding.
    pub async fn search(
        &self,
        embedding: Option<&QueryEmbedding>,
        limit_ceiling: usize,
    ) -> Outcome<Vec<ExperienceMatch>> {
        let Some(embedding) = embedding else {
            return Outcome::clean(Vec::new());
        };
        let start = Instant::now();
        let result = match tokio::time::timeout(
            self.timeout,
            self.backend.search(embedding, limit_ceiling),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(Error::VectorBackendUnavailable(format!(
                "vector search timed out after {}ms",
                self.timeout.as_millis()
            ))),
        };

        match result {
            Ok(mut matches) => {
                matches.retain(|m| m.cosine_similarity.is_some());
                debug!(
                    subsystem = "search",
                    component = "vector",
                    op = "search",
                    vector_hits = matches.len(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Vector retrieval complete"
                );
                Outcome::clean(matches)
            }
            Err(e) => {
                warn!(
                    subsystem = "search",
                    component = "vector",
                    op = "search",
                    error = %e,
                    "Vector retrieval failed, semantic contribution set to zero"
                );
                Outcome::degraded(
                    Vec::new(),
                    Degradation {
                        vector_unavailable: true,
                        ..Degradation::default()
                    },
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use scout_core::Result;

    struct Fixed(Option<Vec<f32>>);

    #[async_trait]
    impl VectorBackend for Fixed {
        async fn search(&self, _: &QueryEmbedding, _: usize) -> Result<Vec<ExperienceMatch>> {
            match &self.0 {
                Some(sims) => Ok(sims
                    .iter()
                    .enumerate()
                    .map(|(i, s)| {
                        let mut m = ExperienceMatch::new(i as i64, i as i64);
                        m.cosine_similarity = Some(*s);
                        m
                    })
                    .collect()),
                None => Err(Error::VectorBackendUnavailable("index offline".into())),
            }
        }
    }

    fn embedding() -> QueryEmbedding {
        QueryEmbedding::new(vec![0.6, 0.8], "v1").unwrap()
    }

    #[tokio::test]
    async fn test_absent_embedding_is_empty_and_clean() {
        let r = VectorRetriever::new(Arc::new(Fixed(Some(vec![0.9]))), Duration::from_secs(1));
        let out = r.search(None, 10).await;
        assert!(out.value.is_empty());
        assert!(!out.is_degraded());
    }

    #[tokio::test]
    async fn test_returns_matches() {
        let r = VectorRetriever::new(Arc::new(Fixed(Some(vec![0.9, 0.7]))), Duration::from_secs(1));
        let out = r.search(Some(&embedding()), 10).await;
        assert_eq!(out.value.len(), 2);
        assert!(!out.is_degraded());
    }

    #[tokio::test]
    async fn test_backend_error_degrades() {
        let r = VectorRetriever::new(Arc::new(Fixed(None)), Duration::from_secs(1));
        let out = r.search(Some(&embedding()), 10).await;
        assert!(out.value.is_empty());
        assert!(out.degradation.vector_unavailable);
    }
}
