//! Pass-through vectorizer for precomputed embeddings.

use async_trait::async_trait;

use rag_core::{RagError, Result, Value, Vectorizer};

/// Accepts a vector value, or text holding a JSON array of numbers.
#[derive(Debug, Clone, Default)]
pub struct IdentityVectorizer {
    dimension: Option<usize>,
}

impl IdentityVectorizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require every vector to have exactly `dimension` components.
    pub fn with_dimension(dimension: usize) -> Self {
        Self {
            dimension: Some(dimension),
        }
    }

    fn check(&self, vector: Vec<f32>) -> Result<Vec<f32>> {
        match self.dimension {
            Some(expected) if vector.len() != expected => Err(RagError::vectorization(format!(
                "expected {} components, got {}",
                expected,
                vector.len()
            ))),
            _ => Ok(vector),
        }
    }
}

#[async_trait]
impl Vectorizer for IdentityVectorizer {
    async fn vectorize(&self, input: &Value) -> Result<Vec<f32>> {
        let vector = match input {
            Value::Vector(v) => v.clone(),
            Value::Text(text) => serde_json::from_str::<Vec<f32>>(text).map_err(|e| {
                RagError::unsupported_input(format!("text is not a JSON number array: {}", e))
            })?,
            other => {
                return Err(RagError::unsupported_input(format!(
                    "expected vector input, got {}",
                    other.type_name()
                )))
            }
        };
        self.check(vector)
    }

    fn dimension(&self) -> Option<usize> {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_passes_vectors_through() {
        let v = IdentityVectorizer::new()
            .vectorize(&Value::Vector(vec![1.0, 2.0]))
            .await
            .unwrap();
        assert_eq!(v, vec![1.0, 2.0]);
    }

    #[tokio::test]
    async fn test_parses_json_text() {
        let v = IdentityVectorizer::new()
            .vectorize(&Value::from("[0.5, -1]"))
            .await
            .unwrap();
        assert_eq!(v, vec![0.5, -1.0]);

        let err = IdentityVectorizer::new()
            .vectorize(&Value::from("not json"))
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::UnsupportedInput { .. }));
    }

    #[tokio::test]
    async fn test_dimension_enforced() {
        let err = IdentityVectorizer::with_dimension(3)
            .vectorize(&Value::Vector(vec![1.0]))
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::Vectorization { .. }));
        assert!(err.to_string().contains("expected 3 components, got 1"));
    }

    #[tokio::test]
    async fn test_rejects_other_inputs() {
        let err = IdentityVectorizer::new()
            .vectorize(&Value::Bool(true))
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::UnsupportedInput { .. }));
    }
}
