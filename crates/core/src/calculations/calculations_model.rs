use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::windowed_sum::ExpensesAndIncomes;
use crate::currencies::RateDatum;
use crate::errors::ValidationError;
use crate::fx::RateHistory;
use crate::ledger::{Balances, ContainerValuations, TimelinePoint};
use crate::utils::time_utils::millis_key;

/// Wire form of a decimal: plain notation, trailing zeros stripped.
pub fn decimal_to_wire(value: Decimal) -> String {
    if value.is_zero() {
        return "0".to_string();
    }
    value.normalize().to_string()
}

fn balances_to_wire(balances: &Balances) -> BTreeMap<String, String> {
    balances
        .iter()
        .map(|(currency_id, amount)| (currency_id.clone(), decimal_to_wire(*amount)))
        .collect()
}

/// Parses the wire `division` parameter. Absent means `default`; anything
/// that is not an integer is rejected. Bounds are checked by the range.
pub fn parse_division(raw: Option<&str>, default: u32) -> Result<i64, ValidationError> {
    match raw {
        None => Ok(i64::from(default)),
        Some(raw) => raw
            .trim()
            .parse::<i64>()
            .map_err(|_| ValidationError::InvalidDivision(raw.to_string())),
    }
}

// ============================================================================
// Requests
// ============================================================================

/// Optional `[startDate, endDate]` in epoch millis sampled at `division` points.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RangeQuery {
    pub start_date: Option<i64>,
    pub end_date: Option<i64>,
    pub division: Option<String>,
}

/// Calendar boundaries may be supplied by the client, which knows its own
/// timezone; otherwise the configured policy applies.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExpensesAndIncomesQuery {
    pub current_week_start_epoch: Option<i64>,
    pub current_month_start_epoch: Option<i64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ContainerValuesQuery {
    /// Containers to value; all containers in the ledger when absent.
    pub container_ids: Option<Vec<String>>,
    pub date: Option<i64>,
}

// ============================================================================
// Responses
// ============================================================================

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExpensesAndIncomesResponse {
    pub expenses_current_week: String,
    pub incomes_current_week: String,
    pub expenses_current_month: String,
    pub incomes_current_month: String,
    pub expenses_30d: String,
    pub incomes_30d: String,
    pub expenses_7d: String,
    pub incomes_7d: String,
    pub expenses_total: String,
    pub incomes_total: String,
}

impl From<&ExpensesAndIncomes> for ExpensesAndIncomesResponse {
    fn from(summary: &ExpensesAndIncomes) -> Self {
        Self {
            expenses_current_week: decimal_to_wire(summary.current_week.expenses),
            incomes_current_week: decimal_to_wire(summary.current_week.incomes),
            expenses_current_month: decimal_to_wire(summary.current_month.expenses),
            incomes_current_month: decimal_to_wire(summary.current_month.incomes),
            expenses_30d: decimal_to_wire(summary.rolling_30d.expenses),
            incomes_30d: decimal_to_wire(summary.rolling_30d.incomes),
            expenses_7d: decimal_to_wire(summary.rolling_7d.expenses),
            incomes_7d: decimal_to_wire(summary.rolling_7d.incomes),
            expenses_total: decimal_to_wire(summary.total.expenses),
            incomes_total: decimal_to_wire(summary.total.incomes),
        }
    }
}

/// Unconverted balances of all containers keyed by epoch millis.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct BalanceHistoryResponse {
    pub map: BTreeMap<String, BTreeMap<String, String>>,
}

impl From<&[(DateTime<Utc>, Balances)]> for BalanceHistoryResponse {
    fn from(history: &[(DateTime<Utc>, Balances)]) -> Self {
        Self {
            map: history
                .iter()
                .map(|(at, balances)| (millis_key(*at), balances_to_wire(balances)))
                .collect(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct NetWorthHistoryResponse {
    pub map: BTreeMap<String, String>,
}

impl From<&[(DateTime<Utc>, Decimal)]> for NetWorthHistoryResponse {
    fn from(history: &[(DateTime<Utc>, Decimal)]) -> Self {
        Self {
            map: history
                .iter()
                .map(|(at, worth)| (millis_key(*at), decimal_to_wire(*worth)))
                .collect(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ContainerTimelineEntry {
    pub container_balance: BTreeMap<String, String>,
    pub container_worth: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerTimelineResponse {
    pub timeline: BTreeMap<String, ContainerTimelineEntry>,
}

impl From<&[TimelinePoint]> for ContainerTimelineResponse {
    fn from(points: &[TimelinePoint]) -> Self {
        Self {
            timeline: points
                .iter()
                .map(|point| {
                    (
                        millis_key(point.at),
                        ContainerTimelineEntry {
                            container_balance: balances_to_wire(&point.balance),
                            container_worth: decimal_to_wire(point.worth),
                        },
                    )
                })
                .collect(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ContainerValueEntry {
    pub value: String,
    pub balances: BTreeMap<String, String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ContainerValuesResponse {
    pub rate_calculated_to_epoch: i64,
    pub values: BTreeMap<String, ContainerValueEntry>,
    /// Container id to failure message.
    pub failures: BTreeMap<String, String>,
}

impl From<&ContainerValuations> for ContainerValuesResponse {
    fn from(valuations: &ContainerValuations) -> Self {
        Self {
            rate_calculated_to_epoch: valuations.rate_calculated_to.timestamp_millis(),
            values: valuations
                .values
                .iter()
                .map(|(container_id, valuation)| {
                    (
                        container_id.clone(),
                        ContainerValueEntry {
                            value: decimal_to_wire(valuation.value),
                            balances: balances_to_wire(&valuation.balances),
                        },
                    )
                })
                .collect(),
            failures: valuations
                .failures
                .iter()
                .map(|(container_id, err)| (container_id.clone(), err.to_string()))
                .collect(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RateHistoryEntry {
    pub date: i64,
    pub rate_to_base: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RateDatumEntry {
    pub ref_currency_id: String,
    pub ref_amount_currency_id: String,
    pub amount: String,
    pub date: i64,
}

impl From<&RateDatum> for RateDatumEntry {
    fn from(datum: &RateDatum) -> Self {
        Self {
            ref_currency_id: datum.ref_currency_id.clone(),
            ref_amount_currency_id: datum.ref_amount_currency_id.clone(),
            amount: decimal_to_wire(datum.amount),
            date: datum.date.timestamp_millis(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RateHistoryResponse {
    pub datums: Vec<RateHistoryEntry>,
    pub earliest_datum: Option<RateDatumEntry>,
    pub latest_datum: Option<RateDatumEntry>,
}

impl From<&RateHistory> for RateHistoryResponse {
    fn from(history: &RateHistory) -> Self {
        Self {
            datums: history
                .samples
                .iter()
                .map(|sample| RateHistoryEntry {
                    date: sample.date.timestamp_millis(),
                    rate_to_base: decimal_to_wire(sample.rate_to_base),
                })
                .collect(),
            earliest_datum: history.earliest_datum.as_ref().map(RateDatumEntry::from),
            latest_datum: history.latest_datum.as_ref().map(RateDatumEntry::from),
        }
    }
}
