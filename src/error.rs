//! Error types for workout-flux

use thiserror::Error;

/// Errors that can occur while normalizing an export or deriving statistics
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Failed to parse workout export: {0}")]
    ParseError(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("No workout data points to analyze")]
    EmptyInput,

    #[error("No record has a parseable date or timestamp: {0}")]
    UnparseableTimestamp(String),

    #[error(
        "Timestamps are out of order: last instant (row {last_row}) precedes first instant (row {first_row})"
    )]
    OutOfOrderTimestamps { first_row: usize, last_row: usize },

    #[error("Invalid biometrics: {0}")]
    InvalidBiometrics(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Recommendation error: {0}")]
    RecommendationError(String),
}
