//! Degradation flags carried alongside recovered results.
//!
//! A channel failure never becomes a request failure on its own. Instead the
//! stage returns an [`Outcome`] whose [`Degradation`] records what was lost.

use serde::{Deserialize, Serialize};

/// Which parts of the pipeline ran in a reduced mode for one request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Degradation {
    /// Translation failed; the original text was used.
    pub translation_failed: bool,
    /// Embedding failed or was absent; ranking is lexical only.
    pub embedding_failed: bool,
    /// The secondary lexical backend served the request.
    pub lexical_fallback: bool,
    /// Neither lexical backend answered.
    pub lexical_unavailable: bool,
    /// The vector index could not be queried.
    pub vector_unavailable: bool,
    /// Candidate profile or education enrichment failed.
    pub enrichment_failed: bool,
}

impl Degradation {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_degraded(&self) -> bool {
        self.translation_failed
            || self.embedding_failed
            || self.lexical_fallback
            || self.lexical_unavailable
            || self.vector_unavailable
            || self.enrichment_failed
    }

    /// Whether a result carrying these flags may be stored in a cache.
    ///
    /// Serving from the secondary lexical backend keeps ranking intact, so it
    /// alone does not block storage. Any lost channel, translation or
    /// enrichment does.
    pub fn is_cacheable(&self) -> bool {
        !(self.translation_failed
            || self.embedding_failed
            || self.lexical_unavailable
            || self.vector_unavailable
            || self.enrichment_failed)
    }

    /// Union of two flag sets.
    pub fn merge(self, other: Degradation) -> Self {
        Self {
            translation_failed: self.translation_failed || other.translation_failed,
            embedding_failed: self.embedding_failed || other.embedding_failed,
            lexical_fallback: self.lexical_fallback || other.lexical_fallback,
            lexical_unavailable: self.lexical_unavailable || other.lexical_unavailable,
            vector_unavailable: self.vector_unavailable || other.vector_unavailable,
            enrichment_failed: self.enrichment_failed || other.enrichment_failed,
        }
    }
}

/// A value produced by a stage that may have recovered from a failure.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome<T> {
    pub value: T,
    pub degradation: Degradation,
}

impl<T> Outcome<T> {
    pub fn clean(value: T) -> Self {
        Self {
            value,
            degradation: Degradation::none(),
        }
    }

    pub fn degraded(value: T, degradation: Degradation) -> Self {
        Self { value, degradation }
    }

    pub fn is_degraded(&self) -> bool {
        self.degradation.is_degraded()
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        Outcome {
            value: f(self.value),
            degradation: self.degradation,
        }
    }

    pub fn into_parts(self) -> (T, Degradation) {
        (self.value, self.degradation)
    }
}
