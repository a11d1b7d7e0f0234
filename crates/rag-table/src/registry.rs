//! Name-keyed vectorizer registry.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use rag_core::{RagError, Result, Vectorizer};

/// Registered vectorizers, keyed by name. Registering a name again replaces
/// the previous binding.
#[derive(Clone, Default)]
pub struct VectorizerRegistry {
    vectorizers: HashMap<String, Arc<dyn Vectorizer>>,
}

impl VectorizerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a vectorizer, returning the one it replaced.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        vectorizer: Arc<dyn Vectorizer>,
    ) -> Option<Arc<dyn Vectorizer>> {
        let name = name.into();
        let previous = self.vectorizers.insert(name.clone(), vectorizer);
        if previous.is_some() {
            warn!("Vectorizer '{}' replaced", name);
        } else {
            debug!("Vectorizer '{}' registered", name);
        }
        previous
    }

    /// Look up a vectorizer by name.
    pub fn get(&self, name: &str) -> Result<Arc<dyn Vectorizer>> {
        self.vectorizers
            .get(name)
            .cloned()
            .ok_or_else(|| RagError::VectorizerNotFound {
                name: name.to_string(),
            })
    }

    pub fn remove(&mut self, name: &str) -> Option<Arc<dyn Vectorizer>> {
        self.vectorizers.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vectorizers.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.vectorizers.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.vectorizers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectorizers.is_empty()
    }
}

impl fmt::Debug for VectorizerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VectorizerRegistry")
            .field("names", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rag_core::Value;

    struct Constant(f32);

    #[async_trait]
    impl Vectorizer for Constant {
        async fn vectorize(&self, _input: &Value) -> Result<Vec<f32>> {
            Ok(vec![self.0])
        }
    }

    #[tokio::test]
    async fn test_register_replaces() {
        let mut registry = VectorizerRegistry::new();
        assert!(registry.register("v", Arc::new(Constant(1.0))).is_none());

        let previous = registry.register("v", Arc::new(Constant(2.0))).unwrap();
        assert_eq!(previous.vectorize(&Value::Null).await.unwrap(), vec![1.0]);

        let current = registry.get("v").unwrap();
        assert_eq!(current.vectorize(&Value::Null).await.unwrap(), vec![2.0]);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_missing_name() {
        let registry = VectorizerRegistry::new();
        assert!(matches!(
            registry.get("nope"),
            Err(RagError::VectorizerNotFound { name }) if name == "nope"
        ));
    }

    #[test]
    fn test_names_sorted_and_remove() {
        let mut registry = VectorizerRegistry::new();
        registry.register("b", Arc::new(Constant(0.0)));
        registry.register("a", Arc::new(Constant(0.0)));
        assert_eq!(registry.names(), vec!["a".to_string(), "b".to_string()]);

        assert!(registry.remove("a").is_some());
        assert!(!registry.contains("a"));
        assert!(registry.remove("a").is_none());
    }
}
