//! Core error types for the ledgerflow engine.
//!
//! The engine performs no I/O itself. Failures of the data-fetching
//! collaborators are carried in string form so this type stays independent of
//! whatever storage the caller uses.

use thiserror::Error;

use crate::fx::RateError;

/// Type alias for Result using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Root error type for valuation and aggregation requests.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Rate resolution failed: {0}")]
    Rate(#[from] RateError),

    #[error("Input validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Repository error: {0}")]
    Repository(String),

    #[error("Invalid configuration value: {0}")]
    InvalidConfigValue(String),
}

impl Error {
    /// True when the caller sent a malformed request, i.e. the error should
    /// surface as a 4xx-equivalent rather than a server fault.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::Validation(
                ValidationError::InvalidRange { .. }
                    | ValidationError::DivisionsOutOfBounds { .. }
                    | ValidationError::InvalidDivision(_)
                    | ValidationError::InvalidInput(_)
            )
        )
    }
}

/// Validation errors for request input and snapshot data.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid range: start {start}, end {end}, divisions {divisions}")]
    InvalidRange { start: i64, end: i64, divisions: i64 },

    #[error("Divisions {divisions} outside of {min}..={max}")]
    DivisionsOutOfBounds { divisions: i64, min: i64, max: i64 },

    #[error("Division must be an integer, got '{0}'")]
    InvalidDivision(String),

    #[error("Invalid fragment in transaction {transaction_id}: {reason}")]
    InvalidFragment {
        transaction_id: String,
        reason: String,
    },

    #[error("Invalid currency {currency_id}: {reason}")]
    InvalidCurrency { currency_id: String, reason: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Failed to parse decimal number: {0}")]
    DecimalParse(#[from] rust_decimal::Error),
}

// === From implementations for common error types ===

impl From<rust_decimal::Error> for Error {
    fn from(err: rust_decimal::Error) -> Self {
        Error::Validation(ValidationError::DecimalParse(err))
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
