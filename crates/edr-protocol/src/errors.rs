//! EDR error types and the OGC exception document they render to.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::queries::CoordinateParseError;

/// Errors that can occur while answering an EDR query.
#[derive(Debug, Error)]
pub enum EdrError {
    /// Collection not found.
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    /// Named location not found.
    #[error("Location not found: {0}")]
    LocationNotFound(String),

    /// Parameter not found.
    #[error("Parameter not found: {0}")]
    ParameterNotFound(String),

    /// Invalid query parameter.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Coordinate parsing error.
    #[error("Coordinate error: {0}")]
    CoordinateError(#[from] CoordinateParseError),

    /// No data available for the query.
    #[error("No data available: {0}")]
    NoDataAvailable(String),

    /// Unsupported query type.
    #[error("Unsupported query type: {0}")]
    UnsupportedQuery(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    InternalError(String),

    /// Data access error.
    #[error("Data access error: {0}")]
    DataAccessError(String),
}

impl EdrError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            EdrError::CollectionNotFound(_)
            | EdrError::LocationNotFound(_)
            | EdrError::ParameterNotFound(_)
            | EdrError::NoDataAvailable(_) => 404,
            EdrError::InvalidParameter(_)
            | EdrError::CoordinateError(_)
            | EdrError::UnsupportedQuery(_) => 400,
            EdrError::InternalError(_) | EdrError::DataAccessError(_) => 500,
        }
    }

    /// Convert to an ExceptionResponse.
    pub fn to_exception(&self) -> ExceptionResponse {
        match self {
            EdrError::CollectionNotFound(msg)
            | EdrError::LocationNotFound(msg)
            | EdrError::ParameterNotFound(msg)
            | EdrError::NoDataAvailable(msg) => ExceptionResponse::not_found(msg),
            EdrError::InvalidParameter(msg) | EdrError::UnsupportedQuery(msg) => {
                ExceptionResponse::bad_request(msg)
            }
            EdrError::CoordinateError(e) => ExceptionResponse::bad_request(e.to_string()),
            EdrError::InternalError(msg) | EdrError::DataAccessError(msg) => {
                ExceptionResponse::internal_error(msg)
            }
        }
    }
}

/// Exception document returned for failed requests.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExceptionResponse {
    /// Exception type identifier.
    #[serde(rename = "type")]
    pub type_: String,

    /// Human-readable title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// HTTP status code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,

    /// Detailed error message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ExceptionResponse {
    fn new(type_: &str, status: u16, title: &str, detail: impl Into<String>) -> Self {
        Self {
            type_: type_.to_string(),
            title: Some(title.to_string()),
            status: Some(status),
            detail: Some(detail.into()),
        }
    }

    /// Create a 404 Not Found exception.
    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::new(
            "http://www.opengis.net/def/exceptions/ogcapi-edr-1/1.0/not-found",
            404,
            "Not Found",
            detail,
        )
    }

    /// Create a 400 Bad Request exception.
    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(
            "http://www.opengis.net/def/exceptions/ogcapi-edr-1/1.0/invalid-parameter-value",
            400,
            "Bad Request",
            detail,
        )
    }

    /// Create a 500 Internal Server Error exception.
    pub fn internal_error(detail: impl Into<String>) -> Self {
        Self::new(
            "http://www.opengis.net/def/exceptions/ogcapi-edr-1/1.0/server-error",
            500,
            "Internal Server Error",
            detail,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(EdrError::LocationNotFound("DCA".to_string()).status_code(), 404);
        assert_eq!(EdrError::InvalidParameter("test".to_string()).status_code(), 400);
        assert_eq!(EdrError::UnsupportedQuery("test".to_string()).status_code(), 400);
        assert_eq!(EdrError::DataAccessError("test".to_string()).status_code(), 500);
    }

    #[test]
    fn test_error_to_exception() {
        let exc = EdrError::LocationNotFound("JFK".to_string()).to_exception();

        assert_eq!(exc.status, Some(404));
        assert_eq!(exc.title.as_deref(), Some("Not Found"));
        assert!(exc.detail.unwrap().contains("JFK"));
    }

    #[test]
    fn test_coordinate_error_conversion() {
        let err: EdrError =
            CoordinateParseError::OutOfRange("Longitude out of range".to_string()).into();

        assert_eq!(err.status_code(), 400);
        assert!(err.to_exception().type_.ends_with("invalid-parameter-value"));
    }

    #[test]
    fn test_exception_serialization() {
        let json = serde_json::to_value(ExceptionResponse::internal_error("boom")).unwrap();
        assert_eq!(json["status"], 500);
        assert_eq!(json["detail"], "boom");
    }
}
