use chrono::{DateTime, Utc};
use log::{debug, warn};
use rayon::prelude::*;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

use super::ledger_model::{Balances, LedgerScope};
use super::ledger_replay::Ledger;
use crate::constants::MIN_DIVISIONS;
use crate::errors::ValidationError;
use crate::fx::{RateCache, RateError, RateResolver};
use crate::utils::time_utils::evenly_spaced;

/// A validated `[start, end]` range sampled at `divisions` instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimelineRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    divisions: usize,
}

impl TimelineRange {
    /// Rejects `start > end`, fewer than two divisions, and more than
    /// `max_divisions`.
    pub fn new(
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        divisions: i64,
        max_divisions: u32,
    ) -> Result<Self, ValidationError> {
        let invalid = || ValidationError::InvalidRange {
            start: start.timestamp_millis(),
            end: end.timestamp_millis(),
            divisions,
        };

        if start > end || divisions < MIN_DIVISIONS || divisions > i64::from(max_divisions) {
            return Err(invalid());
        }
        let divisions = usize::try_from(divisions).map_err(|_| invalid())?;

        Ok(TimelineRange {
            start,
            end,
            divisions,
        })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn divisions(&self) -> usize {
        self.divisions
    }

    /// Sample instants, first equal to `start` and last equal to `end`.
    pub fn samples(&self) -> Vec<DateTime<Utc>> {
        evenly_spaced(self.start, self.end, self.divisions)
    }
}

/// Balances and base-currency worth of a scope at one sample instant.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelinePoint {
    pub at: DateTime<Utc>,
    pub balance: Balances,
    pub worth: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContainerValuation {
    pub value: Decimal,
    pub balances: Balances,
}

/// Result of valuing several containers at one instant. Containers whose
/// currencies could not be resolved are listed in `failures`.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerValuations {
    pub rate_calculated_to: DateTime<Utc>,
    pub values: BTreeMap<String, ContainerValuation>,
    pub failures: BTreeMap<String, RateError>,
}

/// Replays a [`Ledger`] and values the results through a [`RateResolver`].
pub struct LedgerAggregator<'a> {
    ledger: &'a Ledger,
    resolver: &'a RateResolver,
}

impl<'a> LedgerAggregator<'a> {
    pub fn new(ledger: &'a Ledger, resolver: &'a RateResolver) -> Self {
        LedgerAggregator { ledger, resolver }
    }

    pub fn ledger(&self) -> &Ledger {
        self.ledger
    }

    pub fn balance_at(&self, scope: &LedgerScope, cutoff: DateTime<Utc>) -> Result<Balances, RateError> {
        self.ledger.balance_at(scope, cutoff)
    }

    /// Base-currency worth of `scope`, each currency resolved at `cutoff`.
    pub fn value_at(
        &self,
        scope: &LedgerScope,
        cutoff: DateTime<Utc>,
        cache: &RateCache,
    ) -> Result<Decimal, RateError> {
        let balances = self.ledger.balance_at(scope, cutoff)?;
        self.resolver.worth_of(&balances, cutoff, cache)
    }

    pub fn net_worth_at(&self, cutoff: DateTime<Utc>, cache: &RateCache) -> Result<Decimal, RateError> {
        self.value_at(&LedgerScope::All, cutoff, cache)
    }

    /// Balance and worth of `scope` at every sample of `range`.
    ///
    /// Balances come from one forward sweep; valuation of the samples runs in
    /// parallel against the shared cache.
    pub fn timeline(
        &self,
        scope: &LedgerScope,
        range: &TimelineRange,
        cache: &RateCache,
    ) -> Result<Vec<TimelinePoint>, RateError> {
        let samples = range.samples();
        let balances = self.ledger.balances_at_many(scope, &samples)?;
        debug!(
            "Valuing {:?} at {} samples over {} transactions",
            scope,
            samples.len(),
            self.ledger.len()
        );

        samples
            .into_par_iter()
            .zip(balances.into_par_iter())
            .map(|(at, balance)| -> Result<TimelinePoint, RateError> {
                let worth = self.resolver.worth_of(&balance, at, cache)?;
                Ok(TimelinePoint { at, balance, worth })
            })
            .collect()
    }

    /// Unconverted balances of every container merged, at every sample.
    pub fn balance_history(&self, range: &TimelineRange) -> Result<Vec<(DateTime<Utc>, Balances)>, RateError> {
        let samples = range.samples();
        let balances = self.ledger.balances_at_many(&LedgerScope::All, &samples)?;
        Ok(samples.into_iter().zip(balances).collect())
    }

    pub fn net_worth_history(
        &self,
        range: &TimelineRange,
        cache: &RateCache,
    ) -> Result<Vec<(DateTime<Utc>, Decimal)>, RateError> {
        Ok(self
            .timeline(&LedgerScope::All, range, cache)?
            .into_iter()
            .map(|point| (point.at, point.worth))
            .collect())
    }

    /// Values each container at `at`.
    ///
    /// A container whose currencies cannot be resolved, or whose balances
    /// overflow, is reported in `failures` and the rest are still valued. A cycle in the currency graph
    /// aborts the whole batch.
    pub fn container_values_at(
        &self,
        container_ids: &[String],
        at: DateTime<Utc>,
        cache: &RateCache,
    ) -> Result<ContainerValuations, RateError> {
        let mut values = BTreeMap::new();
        let mut failures = BTreeMap::new();

        for container_id in container_ids {
            let valued = self
                .ledger
                .balance_at(&LedgerScope::Container(container_id.clone()), at)
                .and_then(|balances| {
                    let value = self.resolver.worth_of(&balances, at, cache)?;
                    Ok((value, balances))
                });

            match valued {
                Ok((value, balances)) => {
                    values.insert(container_id.clone(), ContainerValuation { value, balances });
                }
                Err(err) if err.is_structural() => return Err(err),
                Err(err) => {
                    warn!("Could not value container {} at {}: {}", container_id, at, err);
                    failures.insert(container_id.clone(), err);
                }
            }
        }

        Ok(ContainerValuations {
            rate_calculated_to: at,
            values,
            failures,
        })
    }
}
