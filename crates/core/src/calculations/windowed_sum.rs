use chrono::{DateTime, Duration, Utc};
use log::debug;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::CalculationSettings;
use crate::constants::{ROLLING_LONG_WINDOW_DAYS, ROLLING_SHORT_WINDOW_DAYS};
use crate::errors::ValidationError;
use crate::fx::{RateCache, RateError, RateResolver};
use crate::ledger::Transaction;
use crate::utils::decimal_utils::{checked_add, checked_mul, checked_sub};
use crate::utils::time_utils::{start_of_month, start_of_week};

/// Reference instants for the income/expense windows of one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IncomeExpenseWindows {
    pub now: DateTime<Utc>,
    pub week_start: DateTime<Utc>,
    pub month_start: DateTime<Utc>,
}

impl IncomeExpenseWindows {
    /// Calendar boundaries derived from the configured timezone and week start.
    pub fn calendar(now: DateTime<Utc>, settings: &CalculationSettings) -> Result<Self, ValidationError> {
        let week_start = start_of_week(now, settings.timezone, settings.week_start).ok_or_else(|| {
            ValidationError::InvalidInput(format!("No week start for {} in {}", now, settings.timezone))
        })?;
        let month_start = start_of_month(now, settings.timezone).ok_or_else(|| {
            ValidationError::InvalidInput(format!("No month start for {} in {}", now, settings.timezone))
        })?;

        Ok(IncomeExpenseWindows {
            now,
            week_start,
            month_start,
        })
    }

    fn in_rolling(&self, date: DateTime<Utc>, days: i64) -> bool {
        self.now - date <= Duration::days(days)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FlowTotals {
    pub expenses: Decimal,
    pub incomes: Decimal,
}

impl FlowTotals {
    /// Positive changes count as income, negative ones as expense by magnitude.
    pub fn add_change(&mut self, change: Decimal) -> Result<(), RateError> {
        if change > Decimal::ZERO {
            self.incomes = checked_add(self.incomes, change)?;
        } else if change < Decimal::ZERO {
            self.expenses = checked_sub(self.expenses, change)?;
        }
        Ok(())
    }
}

/// Income and expense totals per window, in base-currency units.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExpensesAndIncomes {
    pub current_week: FlowTotals,
    pub current_month: FlowTotals,
    pub rolling_30d: FlowTotals,
    pub rolling_7d: FlowTotals,
    pub total: FlowTotals,
}

/// Sums transaction value changes into rolling, calendar and all-time windows.
pub struct WindowedSumAggregator<'a> {
    resolver: &'a RateResolver,
}

impl<'a> WindowedSumAggregator<'a> {
    pub fn new(resolver: &'a RateResolver) -> Self {
        WindowedSumAggregator { resolver }
    }

    /// Base value of all "to" legs minus all "from" legs, each valued at the
    /// transaction's creation date.
    pub fn transaction_value_change(
        &self,
        transaction: &Transaction,
        cache: &RateCache,
    ) -> Result<Decimal, RateError> {
        let at = transaction.creation_date;
        let mut change = Decimal::ZERO;

        for fragment in &transaction.fragments {
            if let Some(leg) = fragment.to_leg() {
                let rate = self.resolver.rate_to_base(&leg.currency_id, at, cache)?;
                change = checked_add(change, checked_mul(leg.amount, rate)?)?;
            }
            if let Some(leg) = fragment.from_leg() {
                let rate = self.resolver.rate_to_base(&leg.currency_id, at, cache)?;
                change = checked_sub(change, checked_mul(leg.amount, rate)?)?;
            }
        }

        Ok(change)
    }

    /// Each window is evaluated independently for every transaction, so one
    /// transaction may land in several windows. Excluded transactions are
    /// skipped.
    pub fn summarize<'t, I>(
        &self,
        transactions: I,
        windows: &IncomeExpenseWindows,
        cache: &RateCache,
    ) -> Result<ExpensesAndIncomes, RateError>
    where
        I: IntoIterator<Item = &'t Transaction>,
    {
        let mut summary = ExpensesAndIncomes::default();
        let mut counted = 0usize;

        for transaction in transactions {
            if transaction.excluded_from_incomes_expenses {
                continue;
            }
            let change = self.transaction_value_change(transaction, cache)?;
            if change.is_zero() {
                continue;
            }
            counted += 1;

            let date = transaction.creation_date;
            summary.total.add_change(change)?;
            if windows.in_rolling(date, ROLLING_LONG_WINDOW_DAYS) {
                summary.rolling_30d.add_change(change)?;
            }
            if windows.in_rolling(date, ROLLING_SHORT_WINDOW_DAYS) {
                summary.rolling_7d.add_change(change)?;
            }
            if date >= windows.month_start {
                summary.current_month.add_change(change)?;
            }
            if date >= windows.week_start {
                summary.current_week.add_change(change)?;
            }
        }

        debug!("Summarized {} value-changing transactions", counted);
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::currencies::{Currency, CurrencyGraph, RateDatum};
    use crate::ledger::{Fragment, FragmentLeg};
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn resolver() -> RateResolver {
        let graph = CurrencyGraph::new(vec![
            Currency::base("base", "BASE"),
            Currency::with_fallback("usd", "USD", dec!(8), "base"),
        ])
        .unwrap();
        RateResolver::new(graph, vec![])
    }

    fn now() -> DateTime<Utc> {
        // a Thursday
        Utc.with_ymd_and_hms(2024, 5, 16, 12, 0, 0).unwrap()
    }

    fn days_ago(days: f64) -> DateTime<Utc> {
        now() - Duration::milliseconds((days * 86_400_000.0) as i64)
    }

    fn txn(id: &str, age_days: f64, from: Option<Decimal>, to: Option<Decimal>) -> Transaction {
        let fragment = Fragment::new(
            from.map(|amount| FragmentLeg::new(amount, "base", "wallet")),
            to.map(|amount| FragmentLeg::new(amount, "base", "bank")),
        )
        .unwrap();
        Transaction::new(id, days_ago(age_days), vec![fragment])
    }

    /// Base-currency transactions aged in days, as (from, to) amounts.
    fn fixture() -> Vec<Transaction> {
        vec![
            txn("a", 90.0, None, Some(dec!(100.0001))),
            txn("b", 50.0, Some(dec!(0.0001)), Some(dec!(0.0001))),
            txn("c", 18.0, Some(dec!(0.0001)), None),
            txn("d", 6.9, Some(dec!(0)), Some(dec!(12710))),
            txn("e", 6.7, Some(dec!(1820)), None),
            txn("f", 1.5, None, Some(dec!(78777))),
            txn("g", 0.3, Some(dec!(1912.30)), None),
            txn("h", 0.1, Some(dec!(192)), Some(dec!(72727))),
            txn("i", 0.0, Some(dec!(9037)), None),
        ]
    }

    #[test]
    fn test_rolling_and_total_windows() {
        let resolver = resolver();
        let aggregator = WindowedSumAggregator::new(&resolver);
        let cache = RateCache::new();
        let windows = IncomeExpenseWindows::calendar(now(), &CalculationSettings::default()).unwrap();

        let summary = aggregator.summarize(&fixture(), &windows, &cache).unwrap();

        assert_eq!(summary.rolling_7d.expenses, dec!(12769.3));
        assert_eq!(summary.rolling_7d.incomes, dec!(164022));
        assert_eq!(summary.rolling_30d.expenses, dec!(12769.3001));
        assert_eq!(summary.rolling_30d.incomes, dec!(164022));
        assert_eq!(summary.total.expenses, dec!(12769.3001));
        assert_eq!(summary.total.incomes, dec!(164122.0001));
    }

    #[test]
    fn test_calendar_windows() {
        let resolver = resolver();
        let aggregator = WindowedSumAggregator::new(&resolver);
        let cache = RateCache::new();
        let windows = IncomeExpenseWindows::calendar(now(), &CalculationSettings::default()).unwrap();
        assert_eq!(windows.week_start, Utc.with_ymd_and_hms(2024, 5, 13, 0, 0, 0).unwrap());
        assert_eq!(windows.month_start, Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap());

        let summary = aggregator.summarize(&fixture(), &windows, &cache).unwrap();

        // Monday 00:00 is 3.5 days back: f, g, h, i
        assert_eq!(summary.current_week.incomes, dec!(151312));
        assert_eq!(summary.current_week.expenses, dec!(10949.3));
        // May 1st is 15.5 days back: everything from d onwards
        assert_eq!(summary.current_month.incomes, dec!(164022));
        assert_eq!(summary.current_month.expenses, dec!(12769.3));
    }

    #[test]
    fn test_excluded_and_converted_transactions() {
        let resolver = resolver();
        let aggregator = WindowedSumAggregator::new(&resolver);
        let cache = RateCache::new();
        let windows = IncomeExpenseWindows::calendar(now(), &CalculationSettings::default()).unwrap();

        let salary = Transaction::new(
            "salary",
            days_ago(1.0),
            vec![Fragment::inflow(FragmentLeg::new(dec!(10), "usd", "bank"))],
        );
        let hidden = Transaction::new(
            "hidden",
            days_ago(1.0),
            vec![Fragment::outflow(FragmentLeg::new(dec!(500), "base", "bank"))],
        )
        .excluded();

        let summary = aggregator
            .summarize(&[salary, hidden], &windows, &cache)
            .unwrap();
        assert_eq!(summary.rolling_7d.incomes, dec!(80));
        assert_eq!(summary.rolling_7d.expenses, Decimal::ZERO);
    }

    #[test]
    fn test_transfer_value_change() {
        let graph = CurrencyGraph::new(vec![
            Currency::base("base", "BASE"),
            Currency::with_fallback("usd", "USD", dec!(8), "base"),
        ])
        .unwrap();
        let at = now();
        let resolver = RateResolver::new(graph, vec![RateDatum::new("usd", "base", dec!(7.9), at)]);
        let aggregator = WindowedSumAggregator::new(&resolver);
        let cache = RateCache::new();

        // 80 base exchanged for 10 USD worth 79
        let exchange = Transaction::new(
            "exchange",
            at,
            vec![Fragment::transfer(
                FragmentLeg::new(dec!(80), "base", "bank"),
                FragmentLeg::new(dec!(10), "usd", "broker"),
            )],
        );
        assert_eq!(
            aggregator.transaction_value_change(&exchange, &cache).unwrap(),
            dec!(-1)
        );
    }

    #[test]
    fn test_overflowing_conversion_is_arithmetic_error() {
        let resolver = resolver();
        let aggregator = WindowedSumAggregator::new(&resolver);
        let cache = RateCache::new();
        let windows = IncomeExpenseWindows::calendar(now(), &CalculationSettings::default()).unwrap();

        let jackpot = Transaction::new(
            "jackpot",
            days_ago(1.0),
            vec![Fragment::inflow(FragmentLeg::new(Decimal::MAX, "usd", "bank"))],
        );

        assert!(matches!(
            aggregator.transaction_value_change(&jackpot, &cache),
            Err(RateError::Arithmetic(_))
        ));
        assert!(matches!(
            aggregator.summarize(&[jackpot], &windows, &cache),
            Err(RateError::Arithmetic(_))
        ));
    }

    #[test]
    fn test_overflowing_totals_are_arithmetic_error() {
        let mut totals = FlowTotals::default();
        totals.add_change(Decimal::MAX).unwrap();
        totals.add_change(Decimal::MIN).unwrap();
        assert_eq!(totals.incomes, Decimal::MAX);
        assert_eq!(totals.expenses, Decimal::MAX);

        assert!(matches!(totals.add_change(dec!(1)), Err(RateError::Arithmetic(_))));
        assert!(matches!(totals.add_change(dec!(-1)), Err(RateError::Arithmetic(_))));
    }
}
