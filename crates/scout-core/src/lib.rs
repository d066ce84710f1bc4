//! # scout-core
//!
//! Core types, traits, and scoring primitives for scout candidate search.
//!
//! This crate provides the data structures and trait definitions that the
//! database, inference, search, and API crates depend on.

pub mod defaults;
pub mod degradation;
pub mod error;
pub mod logging;
pub mod models;
pub mod scoring;
pub mod traits;

// Re-export commonly used types at crate root
pub use degradation::{Degradation, Outcome};
pub use error::{Error, Result};
pub use models::*;
pub use scoring::{
    experience_years, normalize_cosine_distance, normalize_tiered, passes_threshold,
    RecencyTable, ScoringConfig, TitleBoosts,
};
pub use traits::*;
