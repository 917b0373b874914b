//! Core error types for the HNLD dashboard.
//!
//! These errors are backend-agnostic. Whatever talks to the hosted backend
//! converts its transport or query failures into [`BackendError`] before they
//! reach the sync layer.

use chrono::ParseError as ChronoParseError;
use thiserror::Error;

use crate::fx::FxError;
use crate::realtime::RealtimeError;

/// Type alias for Result using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Root error type for the dashboard core.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Backend call failed: {0}")]
    Backend(#[from] BackendError),

    #[error("Realtime feed error: {0}")]
    Realtime(#[from] RealtimeError),

    #[error("Input validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Fx error: {0}")]
    Fx(#[from] FxError),

    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },

    #[error("Invalid status transition for {entity} '{id}': {from} -> {to}")]
    InvalidTransition {
        entity: &'static str,
        id: String,
        from: String,
        to: String,
    },

    #[error("Insufficient HNLD balance: requested {requested}, available {available}")]
    InsufficientBalance { requested: String, available: String },

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl Error {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Error::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Whether the caller should send the user back to a list page.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::NotFound { .. } | Error::Backend(BackendError::NotFound(_))
        )
    }
}

/// Failures reported by the hosted backend (queries, RPC functions).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The service could not be reached.
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// A remote function rejected the call.
    #[error("Remote function '{function}' failed: {message}")]
    Rpc { function: String, message: String },

    /// Row level security or auth denied the call.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The requested row does not exist.
    #[error("Record not found: {0}")]
    NotFound(String),

    /// A unique constraint was violated (e.g. duplicate request code).
    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),
}

/// Validation errors for user input, checked before any backend round-trip.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Required field '{0}' is missing")]
    MissingField(String),

    #[error("Amount must be greater than zero")]
    NonPositiveAmount,

    #[error("Failed to parse decimal number: {0}")]
    DecimalParse(String),

    #[error("Failed to parse date/time: {0}")]
    DateTimeParse(String),
}

impl From<rust_decimal::Error> for Error {
    fn from(err: rust_decimal::Error) -> Self {
        Error::Validation(ValidationError::DecimalParse(err.to_string()))
    }
}

impl From<ChronoParseError> for Error {
    fn from(err: ChronoParseError) -> Self {
        Error::Validation(ValidationError::DateTimeParse(err.to_string()))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Validation(ValidationError::InvalidInput(err.to_string()))
    }
}

impl From<Error> for String {
    fn from(err: Error) -> Self {
        err.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_detection() {
        assert!(Error::not_found("market", "m1").is_not_found());
        assert!(Error::Backend(BackendError::NotFound("m1".into())).is_not_found());
        assert!(!Error::Unexpected("boom".into()).is_not_found());
    }

    #[test]
    fn test_error_messages() {
        let err = Error::InvalidTransition {
            entity: "trade_request",
            id: "r1".to_string(),
            from: "cancelled".to_string(),
            to: "active".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid status transition for trade_request 'r1': cancelled -> active"
        );
    }
}
