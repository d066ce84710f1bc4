//! # scout-inference
//!
//! Inference backends for scout candidate search.
//!
//! This crate provides:
//! - OpenAI-compatible embedding and chat backend
//! - Query translation with canonical-language passthrough
//! - Versioned PCA projection from model width to index width
//! - Query embedder that degrades instead of failing
//! - Bounded retry with exponential backoff
//! - Mock backend for tests (feature `mock`)

pub mod embedder;
pub mod openai;
pub mod projection;
pub mod retry;
pub mod translator;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use embedder::Embedder;
pub use openai::{OpenAIBackend, OpenAIConfig};
pub use projection::Projection;
pub use retry::RetryPolicy;
pub use translator::{is_canonical, QueryTranslator};
