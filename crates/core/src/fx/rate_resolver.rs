use chrono::{DateTime, Utc};
use log::debug;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};

use super::fx_errors::RateError;
use super::fx_model::{RateHistory, RateSample};
use super::interpolator::LinearInterpolator;
use super::rate_cache::RateCache;
use crate::currencies::{Currency, CurrencyGraph, RateDatum};
use crate::utils::decimal_utils::{checked_add, checked_mul};
use crate::utils::time_utils::evenly_spaced;

/// Resolves the value of one unit of any currency in base-currency units.
///
/// Rate datums are turned into implied base-currency points (each datum's
/// reference currency resolved at the datum's own date) and interpolated over
/// time. A currency without datums follows its fallback edge instead. Results
/// are memoized in the caller's [`RateCache`].
#[derive(Debug, Clone)]
pub struct RateResolver {
    graph: CurrencyGraph,
    /// Datums per `ref_currency_id`, ascending by date.
    datums: HashMap<String, Vec<RateDatum>>,
}

impl RateResolver {
    pub fn new(graph: CurrencyGraph, rate_datums: Vec<RateDatum>) -> Self {
        let mut datums: HashMap<String, Vec<RateDatum>> = HashMap::new();
        for datum in rate_datums {
            datums
                .entry(datum.ref_currency_id.clone())
                .or_default()
                .push(datum);
        }
        for series in datums.values_mut() {
            series.sort_by_key(|datum| datum.date);
        }

        RateResolver { graph, datums }
    }

    pub fn graph(&self) -> &CurrencyGraph {
        &self.graph
    }

    pub fn base_currency_id(&self) -> &str {
        self.graph.base_currency_id()
    }

    /// Datums recorded for `currency_id`, ascending by date.
    pub fn datums_for(&self, currency_id: &str) -> &[RateDatum] {
        self.datums
            .get(currency_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Value of one unit of `currency_id` in base-currency units at `at`.
    pub fn rate_to_base(
        &self,
        currency_id: &str,
        at: DateTime<Utc>,
        cache: &RateCache,
    ) -> Result<Decimal, RateError> {
        let mut visiting: HashSet<String> = HashSet::new();
        self.resolve(currency_id, at, &mut visiting, cache)
    }

    /// Units of `to_currency_id` worth one unit of `from_currency_id` at `at`.
    pub fn rate_between(
        &self,
        from_currency_id: &str,
        to_currency_id: &str,
        at: DateTime<Utc>,
        cache: &RateCache,
    ) -> Result<Decimal, RateError> {
        let from_rate = self.rate_to_base(from_currency_id, at, cache)?;
        let to_rate = self.rate_to_base(to_currency_id, at, cache)?;

        from_rate.checked_div(to_rate).ok_or_else(|| {
            RateError::Arithmetic(format!(
                "cannot express {} in {}: rate to base of {} is {}",
                from_currency_id, to_currency_id, to_currency_id, to_rate
            ))
        })
    }

    /// Base-currency value of a per-currency balance map at `at`.
    ///
    /// Each currency is resolved once. Zero balances are skipped so a currency
    /// that nets out does not need a resolvable rate.
    pub fn worth_of(
        &self,
        balances: &HashMap<String, Decimal>,
        at: DateTime<Utc>,
        cache: &RateCache,
    ) -> Result<Decimal, RateError> {
        let mut total = Decimal::ZERO;
        for (currency_id, amount) in balances {
            if amount.is_zero() {
                continue;
            }
            let rate = self.rate_to_base(currency_id, at, cache)?;
            let value = checked_mul(*amount, rate)?;
            total = checked_add(total, value)?;
        }
        Ok(total)
    }

    /// Samples the rate of `currency_id` at `divisions` evenly spaced instants
    /// from its earliest to its latest datum, both inclusive.
    pub fn rate_history(
        &self,
        currency_id: &str,
        divisions: usize,
        cache: &RateCache,
    ) -> Result<RateHistory, RateError> {
        if !self.graph.contains(currency_id) {
            return Err(RateError::UnknownCurrency(currency_id.to_string()));
        }

        let series = self.datums_for(currency_id);
        let (earliest, latest) = match (series.first(), series.last()) {
            (Some(first), Some(last)) if series.len() >= 2 => (first, last),
            _ => return Ok(RateHistory::empty()),
        };

        let samples = evenly_spaced(earliest.date, latest.date, divisions)
            .into_iter()
            .map(|date| {
                self.rate_to_base(currency_id, date, cache)
                    .map(|rate_to_base| RateSample { date, rate_to_base })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(RateHistory {
            samples,
            earliest_datum: Some(earliest.clone()),
            latest_datum: Some(latest.clone()),
        })
    }

    fn resolve(
        &self,
        currency_id: &str,
        at: DateTime<Utc>,
        visiting: &mut HashSet<String>,
        cache: &RateCache,
    ) -> Result<Decimal, RateError> {
        let currency = self
            .graph
            .get(currency_id)
            .ok_or_else(|| RateError::UnknownCurrency(currency_id.to_string()))?;

        if currency.is_base {
            return Ok(Decimal::ONE);
        }
        if visiting.contains(currency_id) {
            return Err(RateError::CycleDetected(currency_id.to_string()));
        }
        if let Some(rate) = cache.get(currency_id, at) {
            return Ok(rate);
        }

        visiting.insert(currency_id.to_string());
        let resolved = self.resolve_uncached(currency, at, visiting, cache);
        visiting.remove(currency_id);

        let rate = resolved?;
        cache.insert(currency_id, at, rate);
        Ok(rate)
    }

    fn resolve_uncached(
        &self,
        currency: &Currency,
        at: DateTime<Utc>,
        visiting: &mut HashSet<String>,
        cache: &RateCache,
    ) -> Result<Decimal, RateError> {
        let series = self.datums_for(&currency.id);

        if !series.is_empty() {
            let mut points = Vec::with_capacity(series.len());
            for datum in series {
                let ref_rate = self.resolve(&datum.ref_amount_currency_id, datum.date, visiting, cache)?;
                points.push((datum.date, checked_mul(datum.amount, ref_rate)?));
            }

            let interpolator = LinearInterpolator::new(points).map_err(|err| match err {
                RateError::DuplicateKey(key) => {
                    RateError::DuplicateKey(format!("{} datum at {}", currency.id, key))
                }
                other => other,
            })?;

            if let Some(rate) = interpolator.evaluate(&at)? {
                return Ok(rate);
            }
        }

        match currency.fallback() {
            Some((amount, fallback_currency_id)) => {
                debug!(
                    "Resolving {} at {} through fallback {}",
                    currency.id, at, fallback_currency_id
                );
                let fallback_rate = self.resolve(fallback_currency_id, at, visiting, cache)?;
                checked_mul(amount, fallback_rate)
            }
            None => Err(RateError::UnresolvableRate {
                currency_id: currency.id.clone(),
                timestamp: at,
            }),
        }
    }
}
