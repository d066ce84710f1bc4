//! Centralized default constants for scout.
//!
//! **This module is the single source of truth** for shared default values.
//! Environment-driven configuration in each crate falls back to these.

// =============================================================================
// SEARCH REQUEST
// =============================================================================

/// Default number of candidates returned.
pub const SEARCH_LIMIT: i64 = 100;

/// Upper bound on candidates returned by a single request.
pub const SEARCH_LIMIT_MAX: i64 = 100;

/// Default score threshold applied after fusion.
pub const SCORE_THRESHOLD: f32 = 0.1;

/// Default lexical channel weight.
pub const KEYWORD_WEIGHT: f32 = 0.7;

/// Default semantic channel weight.
pub const SEMANTIC_WEIGHT: f32 = 0.3;

/// Experience matches requested from each channel per search.
pub const CHANNEL_LIMIT_CEILING: usize = 100;

/// Contributing experiences kept per candidate in a response.
pub const EXPERIENCES_PER_CANDIDATE: usize = 5;

// =============================================================================
// SCORING
// =============================================================================

/// Title boost for an exact position-title match.
pub const TITLE_BOOST_EXACT: f32 = 1.5;

/// Title boost for a phrase or synonym match.
pub const TITLE_BOOST_SYNONYM: f32 = 1.3;

/// Title boost for a partial token match.
pub const TITLE_BOOST_PARTIAL: f32 = 1.15;

/// Title boost when the title does not match.
pub const TITLE_BOOST_NONE: f32 = 1.0;

/// Recency multiplier steps as (max years inclusive, multiplier).
pub const RECENCY_STEPS: [(f32, f32); 5] = [(1.0, 1.0), (2.0, 1.1), (3.0, 1.2), (4.0, 1.3), (5.0, 1.4)];

/// Recency multiplier beyond the last step.
pub const RECENCY_MAX: f32 = 1.5;

/// Days per year used when deriving experience length from dates.
pub const DAYS_PER_YEAR: f64 = 365.25;

// =============================================================================
// LEXICAL BACKENDS
// =============================================================================

/// Search index base URL.
pub const ES_URL: &str = "http://localhost:9200";

/// Search index holding candidate experiences.
pub const ES_INDEX: &str = "candidate_experiences";

/// Deadline for one lexical backend call.
pub const LEXICAL_TIMEOUT_MS: u64 = 2000;

/// Deadline for one vector backend call.
pub const VECTOR_TIMEOUT_MS: u64 = 3000;

/// How long a failed primary stays bypassed before it is retried.
pub const HEALTH_CHECK_INTERVAL_SECS: u64 = 30;

/// Results requested from the exact-title tier.
pub const EXACT_TIER_SIZE: usize = 50;

/// Results kept from the exact-title tier.
pub const EXACT_TIER_KEEP: usize = 20;

/// Documents per bulk request during reindex.
pub const REINDEX_BATCH_SIZE: usize = 100;

// =============================================================================
// INFERENCE
// =============================================================================

/// OpenAI-compatible API base URL.
pub const OPENAI_URL: &str = "https://api.openai.com/v1";

/// Embedding model.
pub const EMBED_MODEL: &str = "text-embedding-3-large";

/// Native dimension of the embedding model.
pub const EMBED_DIMENSION: usize = 3072;

/// Width of vectors stored in the index after projection.
pub const PROJECTED_DIMENSION: usize = 1000;

/// Chat model used for translation.
pub const CHAT_MODEL: &str = "gpt-4o-mini";

/// Deadline for one inference HTTP call.
pub const INFERENCE_TIMEOUT_SECS: u64 = 10;

/// Retries after the first failed inference attempt.
pub const INFERENCE_MAX_RETRIES: u32 = 2;

/// Base backoff between inference retries. Doubles each attempt.
pub const INFERENCE_BACKOFF_MS: u64 = 200;

/// Texts shorter than this are not embedded.
pub const EMBED_MIN_CHARS: usize = 10;

/// Longest input forwarded to the translator.
pub const TRANSLATION_MAX_CHARS: usize = 4000;

/// Share of Latin-script letters above which text is treated as canonical.
pub const CANONICAL_SCRIPT_RATIO: f32 = 0.8;

// =============================================================================
// CACHES
// =============================================================================

/// Result cache lifetime.
pub const RESULT_CACHE_TTL_SECS: u64 = 300;

/// Suggestion and facet cache lifetime.
pub const SUGGESTION_CACHE_TTL_SECS: u64 = 1800;

/// Translation cache lifetime (7 days).
pub const TRANSLATION_CACHE_TTL_SECS: u64 = 7 * 24 * 3600;

/// Maximum entries per cache.
pub const CACHE_MAX_ENTRIES: u64 = 10_000;

/// How long a follower waits on an in-flight computation before going alone.
pub const SINGLE_FLIGHT_WAIT_MS: u64 = 5000;

/// Interval for eager reclamation of expired entries.
pub const CACHE_RECLAIM_INTERVAL_SECS: u64 = 60;

// =============================================================================
// SUGGESTIONS AND FACETS
// =============================================================================

/// Default suggestion count.
pub const SUGGESTION_LIMIT: usize = 10;

/// Maximum suggestion count.
pub const SUGGESTION_LIMIT_MAX: usize = 50;

/// Values listed per facet.
pub const FACET_LIMIT: usize = 20;

// =============================================================================
// SERVER
// =============================================================================

/// Default HTTP server port.
pub const SERVER_PORT: u16 = 3000;

/// Default requests per rate-limit period.
pub const RATE_LIMIT_REQUESTS: u64 = 20;

/// Default rate-limit period in seconds.
pub const RATE_LIMIT_PERIOD_SECS: u64 = 60;

/// Database pool size.
pub const DB_MAX_CONNECTIONS: u32 = 10;
