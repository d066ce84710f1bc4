//! # scout-search
//!
//! Hybrid candidate search engine for scout.
//!
//! This crate provides:
//! - Query structuring from labelled free text and explicit filters
//! - Elasticsearch primary lexical backend with tiered title queries
//! - Health-driven lexical routing with a relational fallback
//! - Vector retrieval over projected experience embeddings
//! - Weighted score fusion with title and recency boosts
//! - Best-evidence per-candidate aggregation
//! - Single-flight TTL caches for results, suggestions, and translations
//!
//! ## Example
//!
//! ```ignore
//! use scout_search::{LexicalRetriever, SearchEngine, VectorRetriever};
//! use scout_core::SearchRequest;
//!
//! let engine = SearchEngine::new(translator, embedder, lexical, vector, directory);
//! let response = engine
//!     .search(&SearchRequest::new("Data Engineer").with_limit(5).with_threshold(0.4))
//!     .await?;
//! for candidate in &response.candidates {
//!     println!("{} {:.3}", candidate.candidate_id, candidate.final_score);
//! }
//! ```

pub mod aggregate;
pub mod cache;
pub mod elasticsearch;
pub mod engine;
pub mod fusion;
pub mod health;
pub mod lexical;
pub mod plan;
pub mod reindex;
pub mod structurer;
pub mod suggest;
pub mod vector;

// Re-export core types
pub use scout_core::*;

pub use aggregate::aggregate;
pub use cache::{cache_key, CacheConfig, CacheSource, CacheStats, Cached, SingleFlightCache};
pub use elasticsearch::{ElasticsearchBackend, ElasticsearchConfig};
pub use engine::{SearchEngine, TierBreakdown, TierGroup, TierHit};
pub use fusion::{base_score, fuse, FusedExperience};
pub use health::HealthMonitor;
pub use lexical::LexicalRetriever;
pub use plan::SearchPlan;
pub use reindex::{reindex, ReindexReport};
pub use structurer::QueryStructurer;
pub use suggest::{SuggestionReply, SuggestionService};
pub use vector::VectorRetriever;
