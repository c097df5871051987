use thiserror::Error;

#[derive(Error, Debug)]
pub enum IntakeError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Row {row} has {found} cells but the table has {expected} columns")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("Row {row} has no cell for column index {column}")]
    MissingCell { row: usize, column: usize },

    #[error("Invalid journal entry {entry_id}: {details}")]
    InvalidEntry { entry_id: String, details: String },

    #[error("{target} update failed: {details}")]
    TargetFailure { target: String, details: String },

    #[error("Integration setup failed: {0}")]
    OrchestrationFailure(String),

    #[error("Health check could not be evaluated: {0}")]
    HealthCheckFailure(String),

    #[error("Invalid pattern: {0}")]
    PatternError(#[from] regex::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, IntakeError>;
