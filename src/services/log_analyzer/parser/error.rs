//! Parser error types for log and metric parsing

use thiserror::Error;

/// Errors that can occur while parsing individual values
#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("Failed to parse timestamp: {0}")]
    ParseTimestampError(String),

    #[error("Failed to parse number: {0}")]
    ParseNumberError(String),

    #[error("Failed to parse duration: {0}")]
    ParseDurationError(String),

    #[error("Failed to parse size: {0}")]
    ParseSizeError(String),
}

/// Result type alias for parser operations
pub type ParseResult<T> = Result<T, ParseError>;
