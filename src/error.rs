//! Error types for fitintent

use thiserror::Error;

/// Errors that can occur while running the intent pipeline
#[derive(Debug, Error)]
pub enum IntentError {
    #[error("Failed to parse event payload: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Store operation failed: {0}")]
    StoreError(String),

    #[error("Session lock poisoned for session: {0}")]
    SessionLockPoisoned(String),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),
}
