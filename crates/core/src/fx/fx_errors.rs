use chrono::{DateTime, Utc};
use thiserror::Error;

/// Failures while resolving a currency's rate against the base currency.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RateError {
    /// The fallback/datum graph loops back onto a currency already being
    /// resolved. Any partial rate is meaningless, so this aborts the request.
    #[error("Cycle detected in currency rate graph at {0}")]
    CycleDetected(String),

    /// A non-base currency with no datum and no fallback chain reaching base.
    #[error("No rate datum or fallback chain resolves currency {currency_id} at {timestamp}")]
    UnresolvableRate {
        currency_id: String,
        timestamp: DateTime<Utc>,
    },

    #[error("Currency {0} is not defined")]
    UnknownCurrency(String),

    #[error("Repeated interpolation key {0}")]
    DuplicateKey(String),

    #[error("Decimal arithmetic failed: {0}")]
    Arithmetic(String),
}

impl RateError {
    /// Errors that invalidate the whole computation rather than a single
    /// currency or container.
    pub fn is_structural(&self) -> bool {
        matches!(self, RateError::CycleDetected(_))
    }
}
