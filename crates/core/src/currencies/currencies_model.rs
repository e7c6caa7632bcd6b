use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A user-defined currency.
///
/// Exactly one currency per user is the base. Every other currency declares a
/// fallback: one unit of it is worth `fallback_rate_amount` units of
/// `fallback_rate_currency_id` whenever no rate datum is available.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Currency {
    pub id: String,
    pub name: String,
    pub ticker: String,
    pub is_base: bool,
    pub fallback_rate_amount: Option<Decimal>,
    pub fallback_rate_currency_id: Option<String>,
}

impl Currency {
    /// Creates the base currency.
    pub fn base(id: &str, ticker: &str) -> Self {
        Currency {
            id: id.to_string(),
            name: ticker.to_string(),
            ticker: ticker.to_string(),
            is_base: true,
            fallback_rate_amount: None,
            fallback_rate_currency_id: None,
        }
    }

    /// Creates a non-base currency worth `amount` units of `fallback_currency_id`.
    pub fn with_fallback(id: &str, ticker: &str, amount: Decimal, fallback_currency_id: &str) -> Self {
        Currency {
            id: id.to_string(),
            name: ticker.to_string(),
            ticker: ticker.to_string(),
            is_base: false,
            fallback_rate_amount: Some(amount),
            fallback_rate_currency_id: Some(fallback_currency_id.to_string()),
        }
    }

    /// The declared fallback edge, when both halves are present.
    pub fn fallback(&self) -> Option<(Decimal, &str)> {
        match (&self.fallback_rate_amount, &self.fallback_rate_currency_id) {
            (Some(amount), Some(currency_id)) => Some((*amount, currency_id.as_str())),
            _ => None,
        }
    }
}

/// A timestamped observation: one unit of `ref_currency_id` was worth `amount`
/// units of `ref_amount_currency_id` at `date`.
///
/// `ref_amount_currency_id` need not be the base currency.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RateDatum {
    pub ref_currency_id: String,
    pub ref_amount_currency_id: String,
    pub amount: Decimal,
    pub date: DateTime<Utc>,
}

impl RateDatum {
    pub fn new(
        ref_currency_id: &str,
        ref_amount_currency_id: &str,
        amount: Decimal,
        date: DateTime<Utc>,
    ) -> Self {
        RateDatum {
            ref_currency_id: ref_currency_id.to_string(),
            ref_amount_currency_id: ref_amount_currency_id.to_string(),
            amount,
            date,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_fallback_requires_both_halves() {
        let mut currency = Currency::with_fallback("usd", "USD", dec!(7.8), "hkd");
        assert_eq!(currency.fallback(), Some((dec!(7.8), "hkd")));

        currency.fallback_rate_currency_id = None;
        assert_eq!(currency.fallback(), None);

        assert_eq!(Currency::base("hkd", "HKD").fallback(), None);
    }

    #[test]
    fn test_currency_wire_shape() {
        let currency = Currency::with_fallback("usd", "USD", dec!(7.8), "hkd");
        let json = serde_json::to_value(&currency).unwrap();
        assert_eq!(json["isBase"], false);
        assert_eq!(json["fallbackRateAmount"], "7.8");
        assert_eq!(json["fallbackRateCurrencyId"], "hkd");
    }
}
