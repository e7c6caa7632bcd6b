use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::currencies::RateDatum;

/// One sample of a currency's resolved rate to base.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RateSample {
    pub date: DateTime<Utc>,
    pub rate_to_base: Decimal,
}

/// Sampled rate curve of one currency between its earliest and latest datum.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct RateHistory {
    pub samples: Vec<RateSample>,
    pub earliest_datum: Option<RateDatum>,
    pub latest_datum: Option<RateDatum>,
}

impl RateHistory {
    /// History of a currency with fewer than two datums.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
