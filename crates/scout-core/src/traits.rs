//! Core traits for scout backends.
//!
//! These traits define the seams between the search engine and the services
//! it depends on: inference, lexical and vector indexes, and the candidate
//! directory. Implementations live in `scout-inference`, `scout-db`, and
//! `scout-search`.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{
    CandidateProfile, Education, ExperienceMatch, ExperienceRecord, Facets, QueryEmbedding,
    StructuredQuery,
};

// =============================================================================
// INFERENCE TRAITS
// =============================================================================

/// Backend for generating text embeddings.
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    /// Generate embeddings for the given texts.
    ///
    /// Returns a vector of embedding vectors, one per input text.
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<crate::Vector>>;

    /// Get the expected dimension of embedding vectors.
    fn dimension(&self) -> usize;

    /// Get the model name being used.
    fn model_name(&self) -> &str;
}

/// Backend for text generation (LLM).
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Generate text with system context.
    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String>;

    /// Get the model name being used.
    fn model_name(&self) -> &str;
}

// =============================================================================
// RETRIEVAL TRAITS
// =============================================================================

/// Full-text retrieval over candidate experiences.
///
/// Scores on returned matches must already be normalized to [0, 1] with
/// exact title matches ranked above phrase matches above partial matches.
#[async_trait]
pub trait LexicalBackend: Send + Sync {
    /// Short backend name for logs and health reporting.
    fn name(&self) -> &'static str;

    /// Retrieve up to `limit_ceiling` matches for the query.
    async fn search(
        &self,
        query: &StructuredQuery,
        limit_ceiling: usize,
    ) -> Result<Vec<ExperienceMatch>>;

    /// Position titles starting with `prefix`.
    async fn suggest(&self, prefix: &str, limit: usize) -> Result<Vec<String>>;

    /// Cheap liveness probe.
    async fn ping(&self) -> Result<()>;
}

/// Nearest-neighbour retrieval over candidate-experience embeddings.
#[async_trait]
pub trait VectorBackend: Send + Sync {
    /// Retrieve up to `limit_ceiling` matches ordered by cosine similarity.
    async fn search(
        &self,
        embedding: &QueryEmbedding,
        limit_ceiling: usize,
    ) -> Result<Vec<ExperienceMatch>>;
}

/// A lexical index that can be rebuilt from the relational store.
#[async_trait]
pub trait LexicalIndex: Send + Sync {
    /// Create the index if it does not exist.
    async fn ensure_index(&self) -> Result<()>;

    /// Index a batch of records, returning how many were accepted.
    async fn bulk_index(&self, records: &[ExperienceRecord]) -> Result<usize>;

    /// Number of indexed documents.
    async fn document_count(&self) -> Result<u64>;
}

// =============================================================================
// DIRECTORY TRAITS
// =============================================================================

/// Read access to candidate records outside the ranking core.
#[async_trait]
pub trait CandidateDirectory: Send + Sync {
    /// Profiles keyed by candidate id. Unknown ids are omitted.
    async fn profiles(&self, candidate_ids: &[i64]) -> Result<HashMap<i64, CandidateProfile>>;

    /// Education records keyed by candidate id, most recent first.
    async fn education(&self, candidate_ids: &[i64]) -> Result<HashMap<i64, Vec<Education>>>;

    /// Most frequent positions and companies.
    async fn facets(&self, limit: usize) -> Result<Facets>;
}

/// Paged read of experience records for reindexing.
#[async_trait]
pub trait ExperienceSource: Send + Sync {
    /// Records with `id > after_id`, ascending by id.
    async fn experiences_after(&self, after_id: i64, batch: usize) -> Result<Vec<ExperienceRecord>>;
}
