//! Error types for the RAG table system.

use thiserror::Error;

/// Result type alias using RagError.
pub type Result<T> = std::result::Result<T, RagError>;

/// Errors that can occur in the RAG table system.
#[derive(Error, Debug)]
pub enum RagError {
    /// Transport or query failure reported by the store.
    #[error("Store error: {message}")]
    Store { message: String },

    /// Invalid schema or table definition.
    #[error("Schema error: {message}")]
    Schema { message: String },

    /// Record shape does not fit the bound schema.
    #[error("Schema mismatch: {message}")]
    SchemaMismatch { message: String },

    /// A vectorizer name was referenced that is not registered.
    #[error("Vectorizer not found: {name}")]
    VectorizerNotFound { name: String },

    /// Vectorizer output has the wrong shape or count.
    #[error("Vectorization error: {message}")]
    Vectorization { message: String },

    /// Stored vector and query vector differ in length.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Backup artifact is malformed or has an unsupported format.
    #[error("Backup format error: {message}")]
    BackupFormat { message: String },

    /// A vectorizer was handed input it cannot consume.
    #[error("Unsupported input: {message}")]
    UnsupportedInput { message: String },

    /// Invalid argument provided.
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Internal error (unexpected).
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl RagError {
    /// Create a store error.
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    /// Create a schema error.
    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema {
            message: message.into(),
        }
    }

    /// Create a schema mismatch error.
    pub fn schema_mismatch(message: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            message: message.into(),
        }
    }

    /// Create a vectorization error.
    pub fn vectorization(message: impl Into<String>) -> Self {
        Self::Vectorization {
            message: message.into(),
        }
    }

    /// Create a backup format error.
    pub fn backup_format(message: impl Into<String>) -> Self {
        Self::BackupFormat {
            message: message.into(),
        }
    }

    /// Create an unsupported input error.
    pub fn unsupported_input(message: impl Into<String>) -> Self {
        Self::UnsupportedInput {
            message: message.into(),
        }
    }

    /// Create an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get a stable error code, used by the CLI when reporting failures.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Store { .. } => "STORE_ERROR",
            Self::Schema { .. } => "SCHEMA_ERROR",
            Self::SchemaMismatch { .. } => "SCHEMA_MISMATCH",
            Self::VectorizerNotFound { .. } => "VECTORIZER_NOT_FOUND",
            Self::Vectorization { .. } => "VECTORIZATION_ERROR",
            Self::DimensionMismatch { .. } => "DIMENSION_MISMATCH",
            Self::BackupFormat { .. } => "BACKUP_FORMAT_ERROR",
            Self::UnsupportedInput { .. } => "UNSUPPORTED_INPUT",
            Self::InvalidArgument { .. } => "INVALID_ARGUMENT",
            Self::Io(_) => "IO_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Config { .. } => "CONFIG_ERROR",
            Self::Internal { .. } => "INTERNAL_ERROR",
        }
    }
}
