//! rag-table - RAG table manager
//!
//! Binds one table definition to a [`rag_core::StoreClient`] and layers RAG
//! semantics on top of it:
//!
//! - record CRUD keyed by the identifier column
//! - named vectorizers that populate the vector column on write
//! - client-side cosine similarity search
//! - JSON / JSON Lines backup and restore
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use rag_table::RagTableManager;
//!
//! let store = Arc::new(SqliteStore::open_memory()?);
//! let mut manager = RagTableManager::new(store, table).await?;
//! manager.add_vectorizer("hashing", Arc::new(HashingVectorizer::new(256)?));
//! manager.add_data(record, Some("hashing")).await?;
//! let results = manager.similarity_search_text("query", "hashing", 5, &[]).await?;
//! ```

mod backup;
mod manager;
mod registry;

pub use backup::{read_backup, write_backup, BackupFormat};
pub use manager::{RagTableManager, SimilarityHit, SimilarityResults};
pub use registry::VectorizerRegistry;
