//! Elasticsearch primary lexical backend.
//!
//! Runs three tiers in sequence (exact title, relevant title, similar
//! content). Each later tier excludes ids already returned, and the
//! combined result never exceeds the caller's ceiling.
//!
//! # Example
//!
//! ```rust,ignore
//! use scout_search::elasticsearch::{ElasticsearchBackend, ElasticsearchConfig};
//!
//! let es = ElasticsearchBackend::new(ElasticsearchConfig::from_env())?;
//! es.ensure_index().await?;
//! let hits = es.search(&structured_query, 100).await?;
//! ```

mod backend;
pub mod query;
mod types;

pub use backend::{ElasticsearchBackend, ElasticsearchConfig};
