//! Top-k ranking of candidates by cosine similarity.

use std::cmp::Ordering;

use tracing::{debug, warn};

use rag_core::{RagError, Result};

use crate::similarity::cosine_similarity;

/// A candidate with its similarity to the query.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredItem<T> {
    pub item: T,
    pub score: f32,
}

/// Outcome of a ranking pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Ranking<T> {
    /// Best candidates, highest score first.
    pub hits: Vec<ScoredItem<T>>,

    /// Candidates scored.
    pub scanned: usize,

    /// Candidates skipped for a dimension mismatch.
    pub skipped: usize,
}

/// Rank `candidates` against `query`, keeping the best `top_k`.
///
/// Equal scores are ordered by `tie_break` ascending. A candidate whose
/// vector length differs from the query is logged and counted in
/// [`Ranking::skipped`] rather than failing the pass.
pub fn rank_by_similarity<T, I, F>(
    query: &[f32],
    candidates: I,
    top_k: usize,
    tie_break: F,
) -> Result<Ranking<T>>
where
    I: IntoIterator<Item = (T, Vec<f32>)>,
    F: Fn(&T, &T) -> Ordering,
{
    if query.is_empty() {
        return Err(RagError::invalid_argument("query vector must not be empty"));
    }

    let mut scored = Vec::new();
    let mut skipped = 0;

    for (item, vector) in candidates {
        if vector.len() != query.len() {
            let err = RagError::DimensionMismatch {
                expected: query.len(),
                actual: vector.len(),
            };
            warn!("Skipping candidate: {}", err);
            skipped += 1;
            continue;
        }

        let score = cosine_similarity(query, &vector);
        scored.push(ScoredItem { item, score });
    }

    let scanned = scored.len();

    scored.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| tie_break(&a.item, &b.item))
    });
    scored.truncate(top_k);

    debug!(
        "Ranked {} candidates ({} skipped), returning {}",
        scanned,
        skipped,
        scored.len()
    );

    Ok(Ranking {
        hits: scored,
        scanned,
        skipped,
    })
}
