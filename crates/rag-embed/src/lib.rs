//! rag-embed - Vectorizers for the RAG table system
//!
//! Implementations of [`rag_core::Vectorizer`]:
//!
//! - [`HashingVectorizer`]: deterministic feature hashing over text tokens,
//!   needs no model files
//! - [`IdentityVectorizer`]: passes precomputed vectors through
//! - `OnnxVectorizer` (feature `onnx`): sentence embeddings from an ONNX model

mod hashing;
mod identity;
#[cfg(feature = "onnx")]
mod onnx;

pub use hashing::HashingVectorizer;
pub use identity::IdentityVectorizer;
#[cfg(feature = "onnx")]
pub use onnx::OnnxVectorizer;

pub use rag_core::Vectorizer;

/// Scale a vector to unit length. Zero vectors are returned unchanged.
pub(crate) fn l2_normalize(mut v: Vec<f32>) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in &mut v {
            *x /= norm;
        }
    }
    v
}
