//! Structured logging schema and field name constants for scout.
//!
//! All crates use these names for structured logging fields so that log
//! aggregation can query every subsystem the same way.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Hard request failure, startup failure |
//! | WARN  | Channel degraded, fallback backend used, translation passthrough |
//! | INFO  | Lifecycle events, health state transitions, reindex progress |
//! | DEBUG | Per-stage timings, cache hits and misses, plan decisions |
//! | TRACE | Per-hit data |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Correlation ID propagated from the HTTP layer. UUIDv7.
pub const REQUEST_ID: &str = "request_id";

/// Search identifier returned to the caller.
pub const SEARCH_ID: &str = "search_id";

/// Subsystem originating the log event.
/// Values: "api", "search", "db", "inference"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "engine", "lexical_retriever", "health_monitor", "translator"
pub const COMPONENT: &str = "component";

/// Logical operation name.
pub const OPERATION: &str = "op";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of results returned by a stage.
pub const RESULT_COUNT: &str = "result_count";

/// Number of input texts sent to an embedding model.
pub const INPUT_COUNT: &str = "input_count";

// ─── Search-specific fields ────────────────────────────────────────────────

/// Number of lexical channel matches before fusion.
pub const LEXICAL_HITS: &str = "lexical_hits";

/// Number of vector channel matches before fusion.
pub const VECTOR_HITS: &str = "vector_hits";

/// Lexical backend that served the request.
pub const BACKEND: &str = "backend";

/// Search method requested.
pub const SEARCH_METHOD: &str = "search_method";

/// Whether the response carried any degradation flag.
pub const DEGRADED: &str = "degraded";

// ─── Cache fields ──────────────────────────────────────────────────────────

/// Cache kind ("result", "suggestion", "translation", "facet").
pub const CACHE: &str = "cache";

/// Whether the lookup was served from cache.
pub const CACHE_HIT: &str = "cache_hit";

// ─── Inference fields ──────────────────────────────────────────────────────

/// Model name used for inference.
pub const MODEL: &str = "model";

/// Retry attempt number (1-based).
pub const ATTEMPT: &str = "attempt";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";
