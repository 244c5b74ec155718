//! Error types for the copy engine.

use thiserror::Error;

/// Main error type for copy operations.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Configuration error (bad arguments, unsupported URI scheme, unknown encoding)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Destination connection could not be opened or verified
    #[error("Connection error: {message}\n  Context: {context}")]
    Connection { message: String, context: String },

    /// CREATE TABLE failed for a specific table
    #[error("Schema error for table {table}: {message}")]
    Schema { table: String, message: String },

    /// Insert or decode failure while copying rows of a table
    #[error("Row error in table {table}: {message}")]
    Row { table: String, message: String },

    /// The source collaborator failed to list tables or produce rows
    #[error("Source error in {file}: {message}")]
    Source { file: String, message: String },

    /// Transaction scoping invariant was violated
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Raw destination database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Copy was cancelled (SIGINT, SIGTERM)
    #[error("Copy cancelled")]
    Cancelled,
}

impl MigrateError {
    /// Create a Connection error with context about where it occurred
    pub fn connection(message: impl ToString, context: impl Into<String>) -> Self {
        MigrateError::Connection {
            message: message.to_string(),
            context: context.into(),
        }
    }

    /// Create a Source error
    pub fn source(file: impl Into<String>, message: impl Into<String>) -> Self {
        MigrateError::Source {
            file: file.into(),
            message: message.into(),
        }
    }

    /// Reclassify a database failure as a schema failure of `table`.
    ///
    /// Cancellation and already-classified errors pass through unchanged.
    pub fn schema_in(self, table: &str) -> Self {
        match self {
            MigrateError::Database(e) => MigrateError::Schema {
                table: table.to_string(),
                message: e.to_string(),
            },
            other => other,
        }
    }

    /// Reclassify a database failure as a row failure of `table` at row `row` (1-based).
    pub fn row_in(self, table: &str, row: u64) -> Self {
        match self {
            MigrateError::Database(e) => MigrateError::Row {
                table: table.to_string(),
                message: format!("row {}: {}", row, e),
            },
            other => other,
        }
    }

    /// Whether this error is the orderly result of an interrupt.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, MigrateError::Cancelled)
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            MigrateError::Cancelled => 0,
            _ => 1,
        }
    }
}

/// Result type alias for copy operations.
pub type Result<T> = std::result::Result<T, MigrateError>;
