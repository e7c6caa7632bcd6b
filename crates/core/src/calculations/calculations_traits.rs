use async_trait::async_trait;

use super::calculations_model::{
    BalanceHistoryResponse, ContainerTimelineResponse, ContainerValuesQuery,
    ContainerValuesResponse, ExpensesAndIncomesQuery, ExpensesAndIncomesResponse,
    NetWorthHistoryResponse, RangeQuery, RateHistoryResponse,
};
use crate::currencies::{Currency, RateDatum};
use crate::errors::Result;
use crate::ledger::Transaction;

/// Supplies a user's snapshot data. Implementations own persistence.
#[async_trait]
pub trait LedgerRepositoryTrait: Send + Sync {
    async fn get_currencies(&self, user_id: &str) -> Result<Vec<Currency>>;
    async fn get_rate_datums(&self, user_id: &str) -> Result<Vec<RateDatum>>;
    async fn get_transactions(&self, user_id: &str) -> Result<Vec<Transaction>>;
}

/// Selects which transactions feed the aggregators.
pub trait TransactionFilter: Send + Sync {
    fn matches(&self, transaction: &Transaction) -> bool;
}

/// Filter that keeps every transaction.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl TransactionFilter for AcceptAll {
    fn matches(&self, _transaction: &Transaction) -> bool {
        true
    }
}

impl<F> TransactionFilter for F
where
    F: Fn(&Transaction) -> bool + Send + Sync,
{
    fn matches(&self, transaction: &Transaction) -> bool {
        self(transaction)
    }
}

/// Request-level operations, one fresh rate cache per call.
#[async_trait]
pub trait CalculationsServiceTrait: Send + Sync {
    async fn get_expenses_and_incomes(
        &self,
        user_id: &str,
        query: ExpensesAndIncomesQuery,
    ) -> Result<ExpensesAndIncomesResponse>;

    async fn get_balance_history(&self, user_id: &str, query: RangeQuery) -> Result<BalanceHistoryResponse>;

    async fn get_net_worth_history(&self, user_id: &str, query: RangeQuery) -> Result<NetWorthHistoryResponse>;

    /// `container_id` may be `"ALL"`.
    async fn get_container_timeline(
        &self,
        user_id: &str,
        container_id: &str,
        query: RangeQuery,
    ) -> Result<ContainerTimelineResponse>;

    async fn get_container_values(
        &self,
        user_id: &str,
        query: ContainerValuesQuery,
    ) -> Result<ContainerValuesResponse>;

    /// Net worth in base currency at `date`, now when absent.
    async fn get_net_worth(&self, user_id: &str, date: Option<i64>) -> Result<String>;

    async fn get_currency_rate_history(
        &self,
        user_id: &str,
        currency_id: &str,
        division: Option<String>,
    ) -> Result<RateHistoryResponse>;
}
