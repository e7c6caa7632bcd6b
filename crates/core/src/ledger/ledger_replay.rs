use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap};

use super::ledger_model::{Balances, LedgerScope, Transaction};
use crate::fx::RateError;
use crate::utils::decimal_utils::{checked_add, checked_sub};

/// A user's transactions, ascending by creation date.
///
/// Transactions sharing a creation date keep their input order.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    transactions: Vec<Transaction>,
}

impl Ledger {
    pub fn new(mut transactions: Vec<Transaction>) -> Self {
        transactions.sort_by_key(|transaction| transaction.creation_date);
        Ledger { transactions }
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn earliest_date(&self) -> Option<DateTime<Utc>> {
        self.transactions.first().map(|t| t.creation_date)
    }

    pub fn latest_date(&self) -> Option<DateTime<Utc>> {
        self.transactions.last().map(|t| t.creation_date)
    }

    /// Every container id referenced by any fragment leg, sorted.
    pub fn container_ids(&self) -> Vec<String> {
        let ids: BTreeSet<&str> = self
            .transactions
            .iter()
            .flat_map(|t| t.fragments.iter())
            .flat_map(|f| f.from_leg().into_iter().chain(f.to_leg()))
            .map(|leg| leg.container_id.as_str())
            .collect();
        ids.into_iter().map(str::to_string).collect()
    }

    /// Balances of `scope` including every transaction dated at or before `cutoff`.
    pub fn balance_at(&self, scope: &LedgerScope, cutoff: DateTime<Utc>) -> Result<Balances, RateError> {
        let mut sweep = BalanceSweep::new(self, scope);
        sweep.advance_to(cutoff)?;
        sweep.balances()
    }

    /// Balances of `scope` at each cutoff, from one forward pass over the ledger.
    ///
    /// Cutoffs may come in any order; the output follows the input order.
    pub fn balances_at_many(
        &self,
        scope: &LedgerScope,
        cutoffs: &[DateTime<Utc>],
    ) -> Result<Vec<Balances>, RateError> {
        let mut order: Vec<usize> = (0..cutoffs.len()).collect();
        order.sort_by_key(|&index| cutoffs[index]);

        let mut snapshots: Vec<Balances> = vec![Balances::new(); cutoffs.len()];
        let mut sweep = BalanceSweep::new(self, scope);
        for index in order {
            sweep.advance_to(cutoffs[index])?;
            snapshots[index] = sweep.balances()?;
        }
        Ok(snapshots)
    }
}

/// Forward cursor over a [`Ledger`] accumulating the balances of the
/// containers in one scope. Legs outside the scope are never summed.
pub struct BalanceSweep<'a> {
    transactions: &'a [Transaction],
    scope: &'a LedgerScope,
    position: usize,
    /// container id -> currency id -> signed amount
    containers: HashMap<&'a str, Balances>,
}

impl<'a> BalanceSweep<'a> {
    pub fn new(ledger: &'a Ledger, scope: &'a LedgerScope) -> Self {
        BalanceSweep {
            transactions: &ledger.transactions,
            scope,
            position: 0,
            containers: HashMap::new(),
        }
    }

    /// Applies every not-yet-applied transaction dated at or before `cutoff`.
    /// Moving the cutoff backwards has no effect.
    ///
    /// An overflowing balance is an `Arithmetic` error and leaves the sweep
    /// partway through the failing transaction.
    pub fn advance_to(&mut self, cutoff: DateTime<Utc>) -> Result<(), RateError> {
        let transactions = self.transactions;
        let scope = self.scope;
        while let Some(transaction) = transactions.get(self.position) {
            if transaction.creation_date > cutoff {
                break;
            }
            for fragment in &transaction.fragments {
                if let Some(leg) = fragment.from_leg().filter(|leg| scope.includes(&leg.container_id)) {
                    let balance = self
                        .containers
                        .entry(leg.container_id.as_str())
                        .or_default()
                        .entry(leg.currency_id.clone())
                        .or_default();
                    *balance = checked_sub(*balance, leg.amount)?;
                }
                if let Some(leg) = fragment.to_leg().filter(|leg| scope.includes(&leg.container_id)) {
                    let balance = self
                        .containers
                        .entry(leg.container_id.as_str())
                        .or_default()
                        .entry(leg.currency_id.clone())
                        .or_default();
                    *balance = checked_add(*balance, leg.amount)?;
                }
            }
            self.position += 1;
        }
        Ok(())
    }

    /// Current balances of the scope. `All` merges containers by currency
    /// without conversion.
    pub fn balances(&self) -> Result<Balances, RateError> {
        match self.scope {
            LedgerScope::Container(id) => Ok(self
                .containers
                .get(id.as_str())
                .cloned()
                .unwrap_or_default()),
            LedgerScope::All => {
                let mut merged = Balances::new();
                for balances in self.containers.values() {
                    for (currency_id, amount) in balances {
                        let total = merged.entry(currency_id.clone()).or_default();
                        *total = checked_add(*total, *amount)?;
                    }
                }
                Ok(merged)
            }
        }
    }
}
