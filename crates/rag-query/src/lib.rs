//! rag-query - Similarity scoring and ranking
//!
//! Brute-force nearest-neighbor ranking over stored vectors. Scores are
//! cosine similarities; ranking is total and deterministic:
//!
//! - descending by score
//! - ties broken by a caller-supplied key, ascending
//! - rows whose vector length differs from the query are skipped and counted
//!
//! # Example
//!
//! ```rust
//! use rag_query::rank_by_similarity;
//!
//! let candidates = vec![("a", vec![1.0, 0.0]), ("b", vec![0.0, 1.0]), ("c", vec![1.0, 1.0])];
//! let ranking = rank_by_similarity(&[1.0, 0.0], candidates, 2, |x, y| x.cmp(y)).unwrap();
//! assert_eq!(ranking.hits[0].item, "a");
//! assert_eq!(ranking.hits[1].item, "c");
//! ```

mod ranking;
mod similarity;

pub use ranking::{rank_by_similarity, Ranking, ScoredItem};
pub use similarity::cosine_similarity;
