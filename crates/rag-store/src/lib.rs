//! rag-store - SQLite store client
//!
//! This crate provides a [`rag_core::StoreClient`] backed by SQLite. Typed
//! statements are rendered into SQLite SQL; vectors are stored as
//! little-endian `f32` blobs.

mod sql;
mod sqlite;

pub use sqlite::SqliteStore;
