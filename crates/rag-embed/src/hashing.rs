//! Feature-hashing vectorizer.

use async_trait::async_trait;
use tracing::debug;

use rag_core::{text_input, RagError, Result, Value, Vectorizer};

use crate::l2_normalize;

/// Hashes lowercase alphanumeric tokens into signed buckets.
///
/// Output is L2-normalized, so cosine similarity reflects shared vocabulary.
/// Text without tokens maps to the zero vector.
#[derive(Debug, Clone)]
pub struct HashingVectorizer {
    dimension: usize,
}

impl HashingVectorizer {
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(RagError::invalid_argument(
                "hashing dimension must be positive",
            ));
        }
        Ok(Self { dimension })
    }

    fn embed(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        let mut tokens = 0usize;

        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let token = token.to_lowercase();
            let hash = blake3::hash(token.as_bytes());
            let bytes = hash.as_bytes();

            let mut bucket = [0u8; 8];
            bucket.copy_from_slice(&bytes[..8]);
            let index = (u64::from_le_bytes(bucket) % self.dimension as u64) as usize;
            let sign = if bytes[8] & 1 == 0 { 1.0 } else { -1.0 };

            vector[index] += sign;
            tokens += 1;
        }

        debug!("Hashed {} tokens into {} buckets", tokens, self.dimension);
        l2_normalize(vector)
    }
}

#[async_trait]
impl Vectorizer for HashingVectorizer {
    async fn vectorize(&self, input: &Value) -> Result<Vec<f32>> {
        Ok(self.embed(text_input(input)?))
    }

    async fn bulk_vectorize(&self, inputs: &[&Value]) -> Result<Vec<Vec<f32>>> {
        inputs
            .iter()
            .map(|input| text_input(input).map(|text| self.embed(text)))
            .collect()
    }

    fn dimension(&self) -> Option<usize> {
        Some(self.dimension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[tokio::test]
    async fn test_unit_length_and_dimension() {
        let vectorizer = HashingVectorizer::new(64).unwrap();
        let v = vectorizer.vectorize(&Value::from("Hello world")).await.unwrap();

        assert_eq!(v.len(), 64);
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_deterministic_and_case_insensitive() {
        let vectorizer = HashingVectorizer::new(128).unwrap();
        let a = vectorizer.vectorize(&Value::from("Rust tables")).await.unwrap();
        let b = vectorizer.vectorize(&Value::from("rust TABLES!")).await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_shared_vocabulary_scores_higher() {
        let vectorizer = HashingVectorizer::new(256).unwrap();
        let query = vectorizer.vectorize(&Value::from("vector search")).await.unwrap();
        let near = vectorizer
            .vectorize(&Value::from("fast vector search engine"))
            .await
            .unwrap();
        let far = vectorizer
            .vectorize(&Value::from("banana bread recipe"))
            .await
            .unwrap();
        assert!(cosine(&query, &near) > cosine(&query, &far));
    }

    #[tokio::test]
    async fn test_empty_text_is_zero_vector() {
        let vectorizer = HashingVectorizer::new(8).unwrap();
        let v = vectorizer.vectorize(&Value::from("  ,. ")).await.unwrap();
        assert_eq!(v, vec![0.0; 8]);
    }

    #[tokio::test]
    async fn test_bulk_rejects_non_text() {
        let vectorizer = HashingVectorizer::new(8).unwrap();
        let text = Value::from("ok");
        let number = Value::Integer(3);
        let err = vectorizer
            .bulk_vectorize(&[&text, &number])
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::UnsupportedInput { .. }));
    }

    #[test]
    fn test_zero_dimension_rejected() {
        assert!(HashingVectorizer::new(0).is_err());
    }
}
