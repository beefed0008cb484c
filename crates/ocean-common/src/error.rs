//! Error types for query parameter handling.

use thiserror::Error;

use crate::time::TimeParseError;

/// Result type alias using QueryError.
pub type QueryResult<T> = Result<T, QueryError>;

/// Errors raised while parsing query parameters from the outer API layer.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error("Invalid parameter value for '{param}': {message}")]
    InvalidParameter { param: String, message: String },

    #[error("Invalid point '{0}': expected 'lat,lon'")]
    InvalidPoint(String),

    #[error("Latitude out of range: {0}")]
    LatitudeOutOfRange(f64),

    #[error("Invalid depth selector: {0}")]
    InvalidDepth(String),

    #[error(transparent)]
    InvalidTime(#[from] TimeParseError),
}

impl QueryError {
    /// Create an InvalidParameter error.
    pub fn invalid_parameter(param: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            param: param.into(),
            message: message.into(),
        }
    }
}
