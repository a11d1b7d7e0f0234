//! rag-core - Core types and traits for the RAG table system
//!
//! This crate provides the foundational types, traits, and error handling
//! shared by the store, vectorizers, ranking and the table manager.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::*;
pub use error::{RagError, Result};
pub use traits::*;
pub use types::*;
