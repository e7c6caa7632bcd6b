//! Request orchestration: fetch a user's snapshot, run the engine once with a
//! fresh rate cache, shape the response.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, error};
use std::sync::Arc;

use super::calculations_model::{
    decimal_to_wire, parse_division, BalanceHistoryResponse, ContainerTimelineResponse,
    ContainerValuesQuery, ContainerValuesResponse, ExpensesAndIncomesQuery,
    ExpensesAndIncomesResponse, NetWorthHistoryResponse, RangeQuery, RateHistoryResponse,
};
use super::calculations_traits::{
    AcceptAll, CalculationsServiceTrait, LedgerRepositoryTrait, TransactionFilter,
};
use super::windowed_sum::{IncomeExpenseWindows, WindowedSumAggregator};
use crate::config::CalculationSettings;
use crate::constants::MIN_DIVISIONS;
use crate::currencies::CurrencyGraph;
use crate::errors::{Result, ValidationError};
use crate::fx::{RateCache, RateResolver};
use crate::ledger::{Ledger, LedgerAggregator, LedgerScope, TimelineRange};
use crate::utils::time_utils::datetime_from_millis;

/// Source of "now" for windows and open-ended ranges.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Immutable inputs of one computation.
struct Snapshot {
    resolver: RateResolver,
    ledger: Ledger,
}

/// A range request with its bounds parsed but the open start not yet resolved.
struct RangeRequest {
    start: Option<DateTime<Utc>>,
    end: DateTime<Utc>,
    divisions: i64,
}

pub struct CalculationsService {
    repository: Arc<dyn LedgerRepositoryTrait>,
    filter: Arc<dyn TransactionFilter>,
    settings: CalculationSettings,
    clock: Clock,
}

impl CalculationsService {
    pub fn new(repository: Arc<dyn LedgerRepositoryTrait>, settings: CalculationSettings) -> Self {
        Self {
            repository,
            filter: Arc::new(AcceptAll),
            settings,
            clock: Arc::new(Utc::now),
        }
    }

    pub fn with_filter(mut self, filter: Arc<dyn TransactionFilter>) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn settings(&self) -> &CalculationSettings {
        &self.settings
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    async fn load_snapshot(&self, user_id: &str) -> Result<Snapshot> {
        let (currencies, rate_datums, transactions) = futures::try_join!(
            self.repository.get_currencies(user_id),
            self.repository.get_rate_datums(user_id),
            self.repository.get_transactions(user_id),
        )?;

        let graph = CurrencyGraph::new(currencies)?;
        if let Err(err) = graph.find_fallback_cycle() {
            error!("Currency graph of user {} is corrupted: {}", user_id, err);
            return Err(err.into());
        }

        let fetched = transactions.len();
        let transactions: Vec<_> = transactions
            .into_iter()
            .filter(|transaction| self.filter.matches(transaction))
            .collect();
        debug!(
            "Loaded {} currencies, {} rate datums, {} of {} transactions for user {}",
            graph.len(),
            rate_datums.len(),
            transactions.len(),
            fetched,
            user_id
        );

        Ok(Snapshot {
            resolver: RateResolver::new(graph, rate_datums),
            ledger: Ledger::new(transactions),
        })
    }

    /// Parses and bounds-checks the request before any data is fetched.
    fn parse_range(&self, query: &RangeQuery) -> Result<RangeRequest> {
        let divisions = parse_division(query.division.as_deref(), self.settings.default_divisions)?;
        let end = match query.end_date {
            Some(millis) => datetime_from_millis(millis)?,
            None => self.now(),
        };
        let start = query.start_date.map(datetime_from_millis).transpose()?;

        TimelineRange::new(start.unwrap_or(end), end, divisions, self.settings.max_divisions)?;

        Ok(RangeRequest {
            start,
            end,
            divisions,
        })
    }

    /// An open start begins at the earliest transaction; `None` for an empty ledger.
    fn range_for(&self, request: &RangeRequest, ledger: &Ledger) -> Result<Option<TimelineRange>> {
        let start = match (request.start, ledger.earliest_date()) {
            (Some(start), _) => start,
            (None, Some(earliest)) => earliest.min(request.end),
            (None, None) => return Ok(None),
        };
        Ok(Some(TimelineRange::new(
            start,
            request.end,
            request.divisions,
            self.settings.max_divisions,
        )?))
    }

    fn log_cache(&self, user_id: &str, operation: &str, cache: &RateCache) {
        let stats = cache.stats();
        debug!(
            "{} for user {}: {} rates cached, {} hits, {} misses",
            operation, user_id, stats.entries, stats.hits, stats.misses
        );
    }
}

#[async_trait]
impl CalculationsServiceTrait for CalculationsService {
    async fn get_expenses_and_incomes(
        &self,
        user_id: &str,
        query: ExpensesAndIncomesQuery,
    ) -> Result<ExpensesAndIncomesResponse> {
        let week_start = query.current_week_start_epoch.map(datetime_from_millis).transpose()?;
        let month_start = query.current_month_start_epoch.map(datetime_from_millis).transpose()?;
        let mut windows = IncomeExpenseWindows::calendar(self.now(), &self.settings)?;
        if let Some(week_start) = week_start {
            windows.week_start = week_start;
        }
        if let Some(month_start) = month_start {
            windows.month_start = month_start;
        }

        let snapshot = self.load_snapshot(user_id).await?;
        let cache = RateCache::new();
        let summary = WindowedSumAggregator::new(&snapshot.resolver).summarize(
            snapshot.ledger.transactions(),
            &windows,
            &cache,
        )?;
        self.log_cache(user_id, "Expenses and incomes", &cache);

        Ok(ExpensesAndIncomesResponse::from(&summary))
    }

    async fn get_balance_history(&self, user_id: &str, query: RangeQuery) -> Result<BalanceHistoryResponse> {
        let request = self.parse_range(&query)?;
        let snapshot = self.load_snapshot(user_id).await?;
        let Some(range) = self.range_for(&request, &snapshot.ledger)? else {
            return Ok(BalanceHistoryResponse::default());
        };

        let history = LedgerAggregator::new(&snapshot.ledger, &snapshot.resolver).balance_history(&range)?;
        Ok(BalanceHistoryResponse::from(history.as_slice()))
    }

    async fn get_net_worth_history(&self, user_id: &str, query: RangeQuery) -> Result<NetWorthHistoryResponse> {
        let request = self.parse_range(&query)?;
        let snapshot = self.load_snapshot(user_id).await?;
        let Some(range) = self.range_for(&request, &snapshot.ledger)? else {
            return Ok(NetWorthHistoryResponse::default());
        };

        let cache = RateCache::new();
        let history = LedgerAggregator::new(&snapshot.ledger, &snapshot.resolver)
            .net_worth_history(&range, &cache)?;
        self.log_cache(user_id, "Net worth history", &cache);

        Ok(NetWorthHistoryResponse::from(history.as_slice()))
    }

    async fn get_container_timeline(
        &self,
        user_id: &str,
        container_id: &str,
        query: RangeQuery,
    ) -> Result<ContainerTimelineResponse> {
        let request = self.parse_range(&query)?;
        let snapshot = self.load_snapshot(user_id).await?;
        let Some(range) = self.range_for(&request, &snapshot.ledger)? else {
            return Ok(ContainerTimelineResponse::default());
        };

        let cache = RateCache::new();
        let timeline = LedgerAggregator::new(&snapshot.ledger, &snapshot.resolver).timeline(
            &LedgerScope::parse(container_id),
            &range,
            &cache,
        )?;
        self.log_cache(user_id, "Container timeline", &cache);

        Ok(ContainerTimelineResponse::from(timeline.as_slice()))
    }

    async fn get_container_values(
        &self,
        user_id: &str,
        query: ContainerValuesQuery,
    ) -> Result<ContainerValuesResponse> {
        let at = match query.date {
            Some(millis) => datetime_from_millis(millis)?,
            None => self.now(),
        };

        let snapshot = self.load_snapshot(user_id).await?;
        let container_ids = query
            .container_ids
            .unwrap_or_else(|| snapshot.ledger.container_ids());

        let cache = RateCache::new();
        let valuations = LedgerAggregator::new(&snapshot.ledger, &snapshot.resolver)
            .container_values_at(&container_ids, at, &cache)?;
        self.log_cache(user_id, "Container values", &cache);

        Ok(ContainerValuesResponse::from(&valuations))
    }

    async fn get_net_worth(&self, user_id: &str, date: Option<i64>) -> Result<String> {
        let at = match date {
            Some(millis) => datetime_from_millis(millis)?,
            None => self.now(),
        };

        let snapshot = self.load_snapshot(user_id).await?;
        let cache = RateCache::new();
        let net_worth = LedgerAggregator::new(&snapshot.ledger, &snapshot.resolver).net_worth_at(at, &cache)?;
        self.log_cache(user_id, "Net worth", &cache);

        Ok(decimal_to_wire(net_worth))
    }

    async fn get_currency_rate_history(
        &self,
        user_id: &str,
        currency_id: &str,
        division: Option<String>,
    ) -> Result<RateHistoryResponse> {
        let divisions = parse_division(division.as_deref(), self.settings.rate_history_divisions)?;
        let max = i64::from(self.settings.max_divisions);
        if divisions < MIN_DIVISIONS || divisions > max {
            return Err(ValidationError::DivisionsOutOfBounds {
                divisions,
                min: MIN_DIVISIONS,
                max,
            }
            .into());
        }
        let divisions = usize::try_from(divisions)
            .map_err(|_| ValidationError::InvalidDivision(divisions.to_string()))?;

        let snapshot = self.load_snapshot(user_id).await?;
        let cache = RateCache::new();
        let history = snapshot
            .resolver
            .rate_history(currency_id, divisions, &cache)?;
        self.log_cache(user_id, "Rate history", &cache);

        Ok(RateHistoryResponse::from(&history))
    }
}
