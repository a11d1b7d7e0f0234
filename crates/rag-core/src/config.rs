//! Configuration types for the RAG table system.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{RagError, Result};
use crate::types::{Column, ColumnType, Schema, TableDef, DEFAULT_ENGINE, DEFAULT_ORDER_BY};

const DEFAULT_VECTORIZE_FROM: &str = "title";

/// Main configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RagConfig {
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Table definition.
    #[serde(default)]
    pub table: TableConfig,

    /// Similarity search configuration.
    #[serde(default)]
    pub search: SearchConfig,

    /// Backup and restore configuration.
    #[serde(default)]
    pub backup: BackupConfig,

    /// Vectorizer configuration.
    #[serde(default)]
    pub vectorizer: VectorizerConfig,
}

/// Database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file.
    #[serde(default = "default_database_path")]
    pub path: PathBuf,

    /// Enable WAL mode (recommended).
    #[serde(default = "default_true")]
    pub wal_mode: bool,

    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_ms: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            wal_mode: true,
            busy_timeout_ms: 30000,
        }
    }
}

/// Table definition as written in the config file.
///
/// ```toml
/// [table]
/// name = "documents"
/// order_by = "id"
/// vectorize_from = "title"
///
/// [[table.columns]]
/// name = "id"
/// type = "String"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableConfig {
    /// Table name.
    #[serde(default = "default_table_name")]
    pub name: String,

    /// Store engine.
    #[serde(default = "default_engine")]
    pub engine: String,

    /// Ordering key; its first schema column is the identifier.
    #[serde(default = "default_order_by")]
    pub order_by: String,

    /// Ordered column list.
    #[serde(default = "default_columns")]
    pub columns: Vec<Column>,

    /// Explicit vector column (inferred when only one exists).
    #[serde(default)]
    pub vector_column: Option<String>,

    /// Column whose value is passed to vectorizers. Defaults to `title`,
    /// which is ignored when the column list has no such column.
    #[serde(default = "default_vectorize_from")]
    pub vectorize_from: Option<String>,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            name: default_table_name(),
            engine: default_engine(),
            order_by: default_order_by(),
            columns: default_columns(),
            vector_column: None,
            vectorize_from: default_vectorize_from(),
        }
    }
}

impl TableConfig {
    /// Build and validate the table definition.
    pub fn to_table_def(&self) -> Result<TableDef> {
        let mut schema = Schema::new(self.columns.clone())?;
        if let Some(vector_column) = &self.vector_column {
            schema = schema.with_vector_column(vector_column)?;
        }
        match &self.vectorize_from {
            Some(name) if name == DEFAULT_VECTORIZE_FROM && !schema.contains(name) => {}
            Some(name) => schema = schema.with_vectorize_from(name)?,
            None => {}
        }

        let table = TableDef::new(&self.name, schema)
            .with_engine(&self.engine)
            .with_order_by(&self.order_by);
        table.validate()?;
        Ok(table)
    }
}

/// Similarity search configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Default number of results.
    #[serde(default = "default_top_k")]
    pub default_top_k: usize,

    /// Maximum number of results.
    #[serde(default = "default_max_top_k")]
    pub max_top_k: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_top_k: 10,
            max_top_k: 100,
        }
    }
}

/// Backup and restore configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupConfig {
    /// Records per insert statement during restore.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self { batch_size: 1000 }
    }
}

/// Vectorizer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorizerConfig {
    /// Hashing vectorizer dimension when the schema has no fixed one.
    #[serde(default = "default_hashing_dimension")]
    pub hashing_dimension: usize,

    /// Path to an ONNX sentence-embedding model.
    #[serde(default)]
    pub model_path: Option<PathBuf>,

    /// Path to the model's tokenizer.json.
    #[serde(default)]
    pub tokenizer_path: Option<PathBuf>,
}

impl Default for VectorizerConfig {
    fn default() -> Self {
        Self {
            hashing_dimension: 256,
            model_path: None,
            tokenizer_path: None,
        }
    }
}

// Default value functions

fn default_true() -> bool {
    true
}

fn default_busy_timeout() -> u32 {
    30000
}

fn default_table_name() -> String {
    "documents".to_string()
}

fn default_engine() -> String {
    DEFAULT_ENGINE.to_string()
}

fn default_order_by() -> String {
    DEFAULT_ORDER_BY.to_string()
}

fn default_vectorize_from() -> Option<String> {
    Some(DEFAULT_VECTORIZE_FROM.to_string())
}

fn default_columns() -> Vec<Column> {
    vec![
        Column::new("id", ColumnType::Text),
        Column::new(DEFAULT_VECTORIZE_FROM, ColumnType::Text),
        Column::new("vector", ColumnType::Vector { dimension: None }),
    ]
}

fn default_top_k() -> usize {
    10
}

fn default_max_top_k() -> usize {
    100
}

fn default_batch_size() -> usize {
    1000
}

fn default_hashing_dimension() -> usize {
    256
}

fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("rag-table")
        .join("rag.db")
}

impl RagConfig {
    /// Load configuration from file.
    pub fn load(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| RagError::config(format!("Failed to parse config: {}", e)))
    }

    /// Load configuration from default paths.
    pub fn load_default() -> Result<Self> {
        // Try user config first
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("rag-table").join("config.toml");
            if user_config.exists() {
                return Self::load(&user_config);
            }
        }

        // Try local config
        let local_config = PathBuf::from("rag-table.toml");
        if local_config.exists() {
            return Self::load(&local_config);
        }

        Ok(Self::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RagConfig::default();
        assert_eq!(config.search.default_top_k, 10);
        assert_eq!(config.backup.batch_size, 1000);
        assert_eq!(config.table.engine, "MergeTree");
        assert!(config.database.wal_mode);
    }

    #[test]
    fn test_default_table_def() {
        let table = RagConfig::default().table.to_table_def().unwrap();
        assert_eq!(table.name, "documents");
        assert_eq!(table.identifier().unwrap().name, "id");
        assert_eq!(table.schema.vectorize_from().unwrap().name, "title");
        assert_eq!(table.schema.vector_column().unwrap().unwrap().name, "vector");
    }

    #[test]
    fn test_parse_table_section() {
        let config = RagConfig::parse(
            r#"
            [table]
            name = "articles"
            order_by = "(article_id, published)"
            vectorize_from = "body"

            [[table.columns]]
            name = "article_id"
            type = "UInt64"

            [[table.columns]]
            name = "body"
            type = "String"

            [[table.columns]]
            name = "embedding"
            type = "Vector(4)"

            [search]
            max_top_k = 25
            "#,
        )
        .unwrap();

        assert_eq!(config.search.max_top_k, 25);
        assert_eq!(config.search.default_top_k, 10);

        let table = config.table.to_table_def().unwrap();
        assert_eq!(table.identifier().unwrap().name, "article_id");
        assert_eq!(
            table.schema.vector_column().unwrap().unwrap().column_type,
            ColumnType::Vector { dimension: Some(4) }
        );
    }

    #[test]
    fn test_partial_table_section_keeps_vectorize_from() {
        let config = RagConfig::parse("[table]\nname = \"docs\"\n").unwrap();
        assert_eq!(config.table.vectorize_from.as_deref(), Some("title"));

        let table = config.table.to_table_def().unwrap();
        assert_eq!(table.name, "docs");
        assert_eq!(table.schema.vectorize_from().unwrap().name, "title");
    }

    #[test]
    fn test_default_vectorize_from_needs_title_column() {
        let config = RagConfig::parse(
            r#"
            [[table.columns]]
            name = "id"
            type = "String"

            [[table.columns]]
            name = "embedding"
            type = "Array(Float32)"
            "#,
        )
        .unwrap();

        let table = config.table.to_table_def().unwrap();
        assert!(table.schema.vectorize_from().is_none());

        let mut table_config = config.table.clone();
        table_config.vectorize_from = Some("body".to_string());
        assert!(table_config.to_table_def().is_err());
    }

    #[test]
    fn test_parse_rejects_bad_column_type() {
        let err = RagConfig::parse(
            r#"
            [[table.columns]]
            name = "id"
            type = "Decimal(10, 2)"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, RagError::Config { .. }));
    }
}
