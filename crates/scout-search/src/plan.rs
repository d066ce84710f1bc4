//! Immutable per-request search plan.

use scout_core::{defaults, ChannelWeights, Degradation, Result, SearchMethod, SearchRequest};

/// What one request asks of the pipeline, fixed after validation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchPlan {
    pub method: SearchMethod,
    /// Weights as requested, before method or degradation adjustments.
    pub weights: ChannelWeights,
    pub threshold: f32,
    pub limit: usize,
    /// Per-channel retrieval cap.
    pub limit_ceiling: usize,
    pub fetch_education: bool,
}

impl SearchPlan {
    pub fn from_request(request: &SearchRequest) -> Result<Self> {
        request.validate()?;
        let limit = request.bounded_limit();
        Ok(Self {
            method: request.search_method,
            weights: request.weights(),
            threshold: request.score_threshold,
            limit,
            limit_ceiling: defaults::CHANNEL_LIMIT_CEILING.max(limit),
            fetch_education: request.fetch_education,
        })
    }

    pub fn uses_lexical(&self) -> bool {
        self.method.uses_lexical()
    }

    pub fn uses_vector(&self) -> bool {
        self.method.uses_vector()
    }

    /// Weights after applying the method and any lost channel.
    ///
    /// A channel that is switched off by the method, or that failed for this
    /// request, gets weight zero so it cannot dilute the other channel.
    pub fn effective_weights(&self, degradation: &Degradation) -> ChannelWeights {
        let mut weights = match self.method {
            SearchMethod::Bm25 => self.weights.lexical_only(),
            SearchMethod::Semantic => self.weights.semantic_only(),
            SearchMethod::Elasticsearch | SearchMethod::Hybrid => self.weights,
        };
        if degradation.embedding_failed || degradation.vector_unavailable {
            weights = weights.lexical_only();
        }
        if degradation.lexical_unavailable {
            weights = weights.semantic_only();
        }
        weights
    }
}
