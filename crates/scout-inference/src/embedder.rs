//! Query embedding with dimensionality reduction.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, warn};

use scout_core::{
    defaults, Degradation, EmbeddingBackend, Error, Outcome, QueryEmbedding, Result,
    StructuredQuery,
};

use crate::projection::Projection;
use crate::retry::RetryPolicy;

/// Produces projected query embeddings.
///
/// Any failure after retries yields `None` with `embedding_failed` set, so
/// the caller can rank lexically instead of failing the request.
pub struct Embedder {
    backend: Arc<dyn EmbeddingBackend>,
    projection: Arc<Projection>,
    retry: RetryPolicy,
}

impl Embedder {
    pub fn new(
        backend: Arc<dyn EmbeddingBackend>,
        projection: Arc<Projection>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            backend,
            projection,
            retry,
        }
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    /// Embed the structured query text.
    pub async fn embed_query(&self, query: &StructuredQuery) -> Outcome<Option<QueryEmbedding>> {
        let text = query.embedding_text();
        if text.trim().chars().count() < defaults::EMBED_MIN_CHARS {
            return Outcome::clean(None);
        }

        let start = Instant::now();
        match self.embed_text(text).await {
            Ok(Some(embedding)) => {
                debug!(
                    subsystem = "inference",
                    component = "embedder",
                    op = "embed_query",
                    model = self.backend.model_name(),
                    dimension = embedding.dimension(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Query embedded"
                );
                Outcome::clean(Some(embedding))
            }
            Ok(None) => {
                warn!(
                    subsystem = "inference",
                    component = "embedder",
                    op = "embed_query",
                    "Projected embedding is a zero vector, skipping vector channel"
                );
                Outcome::degraded(None, embedding_failed())
            }
            Err(e) => {
                warn!(
                    subsystem = "inference",
                    component = "embedder",
                    op = "embed_query",
                    error = %e,
                    "Embedding failed, continuing lexical-only"
                );
                Outcome::degraded(None, embedding_failed())
            }
        }
    }

    async fn embed_text(&self, text: String) -> Result<Option<QueryEmbedding>> {
        let backend = self.backend.clone();
        let input = vec![text];
        let vectors = self
            .retry
            .run("embed_query", || {
                let backend = backend.clone();
                let input = input.clone();
                async move { backend.embed_texts(&input).await }
            })
            .await?;

        let raw = vectors
            .into_iter()
            .next()
            .ok_or_else(|| Error::EmbeddingFailure("backend returned no vectors".to_string()))?;
        let projected = self.projection.project(raw.as_slice())?;
        Ok(QueryEmbedding::new(projected, self.projection.version()))
    }
}

fn embedding_failed() -> Degradation {
    Degradation {
        embedding_failed: true,
        ..Degradation::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockInferenceBackend;
    use std::time::Duration;

    fn query(position: &str) -> StructuredQuery {
        StructuredQuery {
            position: position.to_string(),
            description: "Build pipelines".to_string(),
            skills: vec![],
            experience: None,
            industry: None,
            education: None,
            key_terms: vec![],
            search_text: position.to_lowercase(),
        }
    }

    fn embedder(backend: MockInferenceBackend, projection: Projection) -> Embedder {
        Embedder::new(
            Arc::new(backend),
            Arc::new(projection),
            RetryPolicy {
                max_retries: 1,
                base_backoff: Duration::from_millis(10),
                attempt_timeout: Duration::from_secs(1),
            },
        )
    }

    #[tokio::test]
    async fn test_embeds_and_projects() {
        let backend = MockInferenceBackend::new().with_dimension(4);
        let projection = Projection::linear(
            "v1",
            vec![0.0; 4],
            vec![vec![1.0, 0.0, 0.0, 0.0], vec![0.0, 1.0, 1.0, 1.0]],
        )
        .unwrap();
        let e = embedder(backend.clone(), projection);
        let out = e.embed_query(&query("Data Engineer")).await;
        assert!(!out.is_degraded());
        let embedding = out.value.unwrap();
        assert_eq!(embedding.dimension(), 2);
        assert_eq!(embedding.projection_version(), "v1");
        assert_eq!(backend.embed_call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_degrades_to_none() {
        let backend = MockInferenceBackend::new()
            .with_dimension(4)
            .with_failures(usize::MAX);
        let e = embedder(backend.clone(), Projection::identity(4, "none"));
        let out = e.embed_query(&query("Data Engineer")).await;
        assert!(out.value.is_none());
        assert!(out.degradation.embedding_failed);
        assert_eq!(backend.embed_call_count(), 2);
    }

    #[tokio::test]
    async fn test_dimension_mismatch_degrades() {
        let backend = MockInferenceBackend::new().with_dimension(8);
        let e = embedder(backend, Projection::identity(4, "none"));
        let out = e.embed_query(&query("Data Engineer")).await;
        assert!(out.value.is_none());
        assert!(out.degradation.embedding_failed);
    }

    #[tokio::test]
    async fn test_zero_vector_short_circuits() {
        let backend = MockInferenceBackend::new()
            .with_dimension(4)
            .with_zero_embeddings();
        let e = embedder(backend, Projection::identity(4, "none"));
        let out = e.embed_query(&query("Data Engineer")).await;
        assert!(out.value.is_none());
        assert!(out.degradation.embedding_failed);
    }
}
