//! Error types for Synheart Fatigue

use thiserror::Error;

/// Errors that can occur while inferring fatigue or driving interventions
#[derive(Debug, Error)]
pub enum FatigueError {
    #[error("Classifier model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Severity score must be between 1 and 5, got {0}")]
    InvalidSeverity(u8),

    #[error("Failed to parse record: {0}")]
    ParseError(String),

    #[error("Event source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Notifier channel is closed")]
    NotifierClosed,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}
