//! Route handlers.

pub mod lexical;
pub mod search;
pub mod system;
