//! Error types for the EDR provider.

use edr_protocol::{CoordinateParseError, EdrError};
use thiserror::Error;

/// Result type alias using ProviderError.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Errors raised while building or answering an EDR query.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The field mapping or backend selection is unusable.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The request carried malformed input. Raised before any SQL is run.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The database rejected or failed the statement.
    #[error("Query execution error: {0}")]
    QueryExecution(String),
}

impl ProviderError {
    pub fn is_configuration(&self) -> bool {
        matches!(self, ProviderError::Configuration(_))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, ProviderError::Validation(_))
    }

    pub fn is_query_execution(&self) -> bool {
        matches!(self, ProviderError::QueryExecution(_))
    }
}

impl From<CoordinateParseError> for ProviderError {
    fn from(err: CoordinateParseError) -> Self {
        ProviderError::Validation(err.to_string())
    }
}

impl From<ProviderError> for EdrError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Configuration(msg) => EdrError::InternalError(msg),
            ProviderError::Validation(msg) => EdrError::InvalidParameter(msg),
            ProviderError::QueryExecution(msg) => EdrError::DataAccessError(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_is_validation() {
        let err: ProviderError =
            CoordinateParseError::InvalidDatetime("yesterday".to_string()).into();
        assert!(err.is_validation());
        assert!(err.to_string().contains("yesterday"));
    }

    #[test]
    fn test_edr_error_status_mapping() {
        let cases = [
            (ProviderError::Configuration("x".to_string()), 500),
            (ProviderError::Validation("x".to_string()), 400),
            (ProviderError::QueryExecution("x".to_string()), 500),
        ];
        for (err, status) in cases {
            assert_eq!(EdrError::from(err).status_code(), status);
        }
    }
}
