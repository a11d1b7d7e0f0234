//! Core traits defining the interfaces between components.

use async_trait::async_trait;

use crate::error::{RagError, Result};
use crate::types::{QueryResult, Record, TableDef, Value};

/// A typed, parameterized statement.
///
/// Stores render statements into their own dialect; values always travel as
/// bound parameters except in [`Statement::Raw`], which is executed verbatim.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// Create a table from its definition.
    CreateTable { table: TableDef },

    /// Drop a table.
    DropTable { table: String },

    /// Probe for a table. Returns a single boolean cell.
    TableExists { table: String },

    /// Remove every row, keeping the table.
    Truncate { table: String },

    /// Insert rows. Columns absent from a record take the store default.
    Insert { table: String, records: Vec<Record> },

    /// Assign columns on rows whose key column equals `key`.
    Update {
        table: String,
        assignments: Vec<(String, Value)>,
        key_column: String,
        key: Value,
    },

    /// Delete rows whose key column equals `key`.
    Delete {
        table: String,
        key_column: String,
        key: Value,
    },

    /// Read rows, optionally projected, filtered by equality and ordered.
    Select {
        table: String,
        columns: Option<Vec<String>>,
        filter: Option<(String, Value)>,
        order_by: Option<String>,
        limit: Option<usize>,
    },

    /// Caller-supplied query text, run as-is.
    Raw { sql: String, params: Vec<Value> },
}

impl Statement {
    /// Short operation name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CreateTable { .. } => "create table",
            Self::DropTable { .. } => "drop table",
            Self::TableExists { .. } => "table exists",
            Self::Truncate { .. } => "truncate",
            Self::Insert { .. } => "insert",
            Self::Update { .. } => "update",
            Self::Delete { .. } => "delete",
            Self::Select { .. } => "select",
            Self::Raw { .. } => "raw query",
        }
    }
}

/// Store client capability consumed by the table manager.
#[async_trait]
pub trait StoreClient: Send + Sync {
    /// Acquire the underlying connection. Idempotent.
    async fn connect(&self) -> Result<()>;

    /// Release the underlying connection.
    async fn close(&self) -> Result<()>;

    /// Execute a statement and return its tabular result.
    async fn execute(&self, statement: &Statement) -> Result<QueryResult>;
}

/// Embedding function converting a value into a vector.
#[async_trait]
pub trait Vectorizer: Send + Sync {
    /// Vectorize a single value.
    ///
    /// Implementations reject input they cannot consume with
    /// [`RagError::UnsupportedInput`].
    async fn vectorize(&self, input: &Value) -> Result<Vec<f32>>;

    /// Vectorize a batch. Output is length-preserving and in input order.
    async fn bulk_vectorize(&self, inputs: &[&Value]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(inputs.len());
        for input in inputs {
            vectors.push(self.vectorize(input).await?);
        }
        Ok(vectors)
    }

    /// Output dimension, when fixed.
    fn dimension(&self) -> Option<usize> {
        None
    }
}

/// Extract text input for text-only vectorizers.
pub fn text_input(input: &Value) -> Result<&str> {
    input.as_str().ok_or_else(|| {
        RagError::unsupported_input(format!("expected text input, got {}", input.type_name()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct LengthVectorizer;

    #[async_trait]
    impl Vectorizer for LengthVectorizer {
        async fn vectorize(&self, input: &Value) -> Result<Vec<f32>> {
            let text = text_input(input)?;
            Ok(vec![text.len() as f32])
        }
    }

    #[tokio::test]
    async fn test_default_bulk_vectorize_preserves_order() {
        let a = Value::from("a");
        let abc = Value::from("abc");
        let vectors = LengthVectorizer.bulk_vectorize(&[&abc, &a]).await.unwrap();
        assert_eq!(vectors, vec![vec![3.0], vec![1.0]]);
    }

    #[tokio::test]
    async fn test_text_input_rejects_non_text() {
        let err = LengthVectorizer
            .vectorize(&Value::Integer(1))
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::UnsupportedInput { .. }));
    }

    #[test]
    fn test_statement_kind() {
        let stmt = Statement::Truncate {
            table: "docs".to_string(),
        };
        assert_eq!(stmt.kind(), "truncate");
    }
}
