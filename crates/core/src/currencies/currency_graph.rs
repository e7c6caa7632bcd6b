use log::warn;
use std::collections::{HashMap, HashSet};

use super::currencies_model::Currency;
use crate::errors::ValidationError;
use crate::fx::RateError;

/// Arena of a user's currencies addressed by id.
///
/// Fallback edges are stored as ids on each record and followed by lookup,
/// never by reference, so a corrupted (cyclic) definition can still be loaded
/// and reported instead of looping.
#[derive(Debug, Clone)]
pub struct CurrencyGraph {
    currencies: HashMap<String, Currency>,
    base_currency_id: String,
}

impl CurrencyGraph {
    /// Builds the arena, checking the per-record invariants.
    ///
    /// Rejects duplicate ids, anything other than exactly one base currency,
    /// a base currency carrying a fallback, and half-present fallback pairs.
    /// A non-base currency without a fallback is accepted with a warning: it
    /// can only be resolved through rate datums.
    pub fn new(currencies: Vec<Currency>) -> Result<Self, ValidationError> {
        let mut by_id: HashMap<String, Currency> = HashMap::with_capacity(currencies.len());
        let mut base_ids: Vec<String> = Vec::new();

        for currency in currencies {
            let has_amount = currency.fallback_rate_amount.is_some();
            let has_currency = currency.fallback_rate_currency_id.is_some();

            if has_amount != has_currency {
                return Err(ValidationError::InvalidCurrency {
                    currency_id: currency.id.clone(),
                    reason: "fallback rate amount and fallback currency must be set together"
                        .to_string(),
                });
            }

            if currency.is_base {
                if has_amount {
                    return Err(ValidationError::InvalidCurrency {
                        currency_id: currency.id.clone(),
                        reason: "base currency cannot declare a fallback rate".to_string(),
                    });
                }
                base_ids.push(currency.id.clone());
            } else if !has_amount {
                warn!(
                    "Currency {} has no fallback rate; it resolves only through rate datums",
                    currency.id
                );
            }

            if by_id.contains_key(&currency.id) {
                return Err(ValidationError::InvalidCurrency {
                    currency_id: currency.id.clone(),
                    reason: "duplicate currency id".to_string(),
                });
            }
            by_id.insert(currency.id.clone(), currency);
        }

        let base_currency_id = match base_ids.as_slice() {
            [only] => only.clone(),
            _ => {
                return Err(ValidationError::InvalidInput(format!(
                    "Expected exactly one base currency, found {}",
                    base_ids.len()
                )))
            }
        };

        Ok(CurrencyGraph {
            currencies: by_id,
            base_currency_id,
        })
    }

    pub fn get(&self, currency_id: &str) -> Option<&Currency> {
        self.currencies.get(currency_id)
    }

    pub fn contains(&self, currency_id: &str) -> bool {
        self.currencies.contains_key(currency_id)
    }

    pub fn base_currency_id(&self) -> &str {
        &self.base_currency_id
    }

    pub fn len(&self) -> usize {
        self.currencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.currencies.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Currency> {
        self.currencies.values()
    }

    /// Walks every fallback chain and reports the first cycle found.
    ///
    /// This is a structural check over fallback edges only; it does not look
    /// at rate datums. Rate resolution detects cycles on its own as well.
    pub fn find_fallback_cycle(&self) -> Result<(), RateError> {
        let mut settled: HashSet<&str> = HashSet::new();

        let mut ids: Vec<&str> = self.currencies.keys().map(String::as_str).collect();
        ids.sort_unstable();

        for start in ids {
            let mut path: HashSet<&str> = HashSet::new();
            let mut current = start;

            loop {
                if settled.contains(current) {
                    break;
                }
                if !path.insert(current) {
                    return Err(RateError::CycleDetected(current.to_string()));
                }
                match self.currencies.get(current).and_then(|c| c.fallback()) {
                    Some((_, next)) => current = next,
                    None => break,
                }
            }

            settled.extend(path);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_requires_exactly_one_base() {
        let none = CurrencyGraph::new(vec![Currency::with_fallback("usd", "USD", dec!(1), "eur")]);
        assert!(matches!(none, Err(ValidationError::InvalidInput(_))));

        let two = CurrencyGraph::new(vec![Currency::base("hkd", "HKD"), Currency::base("eur", "EUR")]);
        assert!(matches!(two, Err(ValidationError::InvalidInput(_))));

        let one = CurrencyGraph::new(vec![
            Currency::base("hkd", "HKD"),
            Currency::with_fallback("usd", "USD", dec!(7.8), "hkd"),
        ])
        .unwrap();
        assert_eq!(one.base_currency_id(), "hkd");
        assert_eq!(one.len(), 2);
    }

    #[test]
    fn test_rejects_half_present_fallback() {
        let mut broken = Currency::with_fallback("usd", "USD", dec!(7.8), "hkd");
        broken.fallback_rate_currency_id = None;

        let result = CurrencyGraph::new(vec![Currency::base("hkd", "HKD"), broken]);
        assert!(matches!(
            result,
            Err(ValidationError::InvalidCurrency { currency_id, .. }) if currency_id == "usd"
        ));
    }

    #[test]
    fn test_rejects_base_with_fallback() {
        let mut base = Currency::base("hkd", "HKD");
        base.fallback_rate_amount = Some(dec!(1));
        base.fallback_rate_currency_id = Some("usd".to_string());

        let result = CurrencyGraph::new(vec![base, Currency::with_fallback("usd", "USD", dec!(1), "hkd")]);
        assert!(matches!(result, Err(ValidationError::InvalidCurrency { .. })));
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        let result = CurrencyGraph::new(vec![
            Currency::base("hkd", "HKD"),
            Currency::with_fallback("usd", "USD", dec!(7.8), "hkd"),
            Currency::with_fallback("usd", "USD2", dec!(7.7), "hkd"),
        ]);
        assert!(matches!(result, Err(ValidationError::InvalidCurrency { .. })));
    }

    #[test]
    fn test_find_fallback_cycle() {
        let acyclic = CurrencyGraph::new(vec![
            Currency::base("base", "BASE"),
            Currency::with_fallback("a", "A", dec!(2), "base"),
            Currency::with_fallback("b", "B", dec!(3), "a"),
        ])
        .unwrap();
        assert!(acyclic.find_fallback_cycle().is_ok());

        let cyclic = CurrencyGraph::new(vec![
            Currency::base("base", "BASE"),
            Currency::with_fallback("a", "A", dec!(2), "b"),
            Currency::with_fallback("b", "B", dec!(3), "a"),
        ])
        .unwrap();
        assert!(matches!(
            cyclic.find_fallback_cycle(),
            Err(RateError::CycleDetected(_))
        ));
    }
}
