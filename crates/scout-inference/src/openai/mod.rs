//! OpenAI-compatible inference backend.
//!
//! Works with any endpoint that speaks the OpenAI `/embeddings` and
//! `/chat/completions` protocol (OpenAI, Azure OpenAI, vLLM, Ollama in
//! compatibility mode).
//!
//! # Example
//!
//! ```rust,no_run
//! use scout_inference::openai::{OpenAIBackend, OpenAIConfig};
//! use scout_core::EmbeddingBackend;
//!
//! #[tokio::main]
//! async fn main() {
//!     let backend = OpenAIBackend::new(OpenAIConfig {
//!         base_url: "http://localhost:11434/v1".to_string(),
//!         ..OpenAIConfig::default()
//!     })
//!     .unwrap();
//!
//!     let texts = vec!["Position: Data Engineer".to_string()];
//!     let vectors = backend.embed_texts(&texts).await.unwrap();
//! }
//! ```

mod backend;
mod error;
mod types;

pub use backend::{OpenAIBackend, OpenAIConfig};
pub use error::{to_scout_error, Endpoint, OpenAIErrorCode};
pub use types::*;
