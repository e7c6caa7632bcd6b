use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

use crate::constants::ALL_CONTAINERS_ID;
use crate::errors::ValidationError;
use crate::utils::time_utils::datetime_from_millis;

/// Signed amount per currency id.
pub type Balances = HashMap<String, Decimal>;

/// An account holding balances in any number of currencies.
/// Balances are never stored; they are derived by replaying the ledger.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    pub id: String,
    pub name: String,
}

/// One side of a fragment: `amount` of `currency_id` leaving or entering
/// `container_id`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FragmentLeg {
    pub amount: Decimal,
    pub currency_id: String,
    pub container_id: String,
}

impl FragmentLeg {
    pub fn new(amount: Decimal, currency_id: &str, container_id: &str) -> Self {
        FragmentLeg {
            amount,
            currency_id: currency_id.to_string(),
            container_id: container_id.to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum FragmentKind {
    /// Only a "from" leg.
    Outflow,
    /// Only a "to" leg.
    Inflow,
    /// Both legs.
    Transfer,
}

/// A leg pair. At least one leg is always present.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Fragment {
    from: Option<FragmentLeg>,
    to: Option<FragmentLeg>,
}

impl Fragment {
    /// Returns `None` when both legs are absent.
    pub fn new(from: Option<FragmentLeg>, to: Option<FragmentLeg>) -> Option<Self> {
        if from.is_none() && to.is_none() {
            return None;
        }
        Some(Fragment { from, to })
    }

    pub fn outflow(from: FragmentLeg) -> Self {
        Fragment {
            from: Some(from),
            to: None,
        }
    }

    pub fn inflow(to: FragmentLeg) -> Self {
        Fragment {
            from: None,
            to: Some(to),
        }
    }

    pub fn transfer(from: FragmentLeg, to: FragmentLeg) -> Self {
        Fragment {
            from: Some(from),
            to: Some(to),
        }
    }

    pub fn from_leg(&self) -> Option<&FragmentLeg> {
        self.from.as_ref()
    }

    pub fn to_leg(&self) -> Option<&FragmentLeg> {
        self.to.as_ref()
    }

    pub fn kind(&self) -> FragmentKind {
        match (&self.from, &self.to) {
            (Some(_), Some(_)) => FragmentKind::Transfer,
            (Some(_), None) => FragmentKind::Outflow,
            _ => FragmentKind::Inflow,
        }
    }

    pub fn touches_container(&self, container_id: &str) -> bool {
        self.from
            .iter()
            .chain(self.to.iter())
            .any(|leg| leg.container_id == container_id)
    }
}

/// Flat fragment shape as stored and sent over the wire, amounts as strings.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FragmentRecord {
    pub from_amount: Option<String>,
    pub from_currency_id: Option<String>,
    pub from_container_id: Option<String>,
    pub to_amount: Option<String>,
    pub to_currency_id: Option<String>,
    pub to_container_id: Option<String>,
}

impl FragmentRecord {
    /// Parses the record into a [`Fragment`].
    ///
    /// A leg must have all three fields or none of them, and at least one
    /// leg must be present. Malformed amounts are errors, never zero.
    pub fn into_fragment(self, transaction_id: &str) -> Result<Fragment, ValidationError> {
        let from = parse_leg(
            transaction_id,
            "from",
            self.from_amount,
            self.from_currency_id,
            self.from_container_id,
        )?;
        let to = parse_leg(
            transaction_id,
            "to",
            self.to_amount,
            self.to_currency_id,
            self.to_container_id,
        )?;

        Fragment::new(from, to).ok_or_else(|| ValidationError::InvalidFragment {
            transaction_id: transaction_id.to_string(),
            reason: "fragment has neither a from leg nor a to leg".to_string(),
        })
    }
}

fn parse_leg(
    transaction_id: &str,
    side: &str,
    amount: Option<String>,
    currency_id: Option<String>,
    container_id: Option<String>,
) -> Result<Option<FragmentLeg>, ValidationError> {
    match (amount, currency_id, container_id) {
        (None, None, None) => Ok(None),
        (Some(amount), Some(currency_id), Some(container_id)) => Ok(Some(FragmentLeg {
            amount: Decimal::from_str(amount.trim())?,
            currency_id,
            container_id,
        })),
        _ => Err(ValidationError::InvalidFragment {
            transaction_id: transaction_id.to_string(),
            reason: format!(
                "{} leg must have amount, currency and container together",
                side
            ),
        }),
    }
}

/// A dated group of fragments.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub creation_date: DateTime<Utc>,
    pub fragments: Vec<Fragment>,
    pub excluded_from_incomes_expenses: bool,
}

impl Transaction {
    pub fn new(id: &str, creation_date: DateTime<Utc>, fragments: Vec<Fragment>) -> Self {
        Transaction {
            id: id.to_string(),
            creation_date,
            fragments,
            excluded_from_incomes_expenses: false,
        }
    }

    pub fn excluded(mut self) -> Self {
        self.excluded_from_incomes_expenses = true;
        self
    }
}

/// Wire shape of a transaction: epoch-millis date and flat fragments.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub id: String,
    pub creation_date: i64,
    pub fragments: Vec<FragmentRecord>,
    #[serde(default)]
    pub excluded_from_incomes_expenses: bool,
}

impl TryFrom<TransactionRecord> for Transaction {
    type Error = ValidationError;

    fn try_from(record: TransactionRecord) -> Result<Self, Self::Error> {
        let creation_date = datetime_from_millis(record.creation_date)?;
        let fragments = record
            .fragments
            .into_iter()
            .map(|fragment| fragment.into_fragment(&record.id))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Transaction {
            id: record.id,
            creation_date,
            fragments,
            excluded_from_incomes_expenses: record.excluded_from_incomes_expenses,
        })
    }
}

/// Which containers an aggregation covers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LedgerScope {
    All,
    Container(String),
}

impl LedgerScope {
    /// `"ALL"` selects every container; anything else is a container id.
    pub fn parse(container_id: &str) -> Self {
        if container_id == ALL_CONTAINERS_ID {
            LedgerScope::All
        } else {
            LedgerScope::Container(container_id.to_string())
        }
    }

    pub fn includes(&self, container_id: &str) -> bool {
        match self {
            LedgerScope::All => true,
            LedgerScope::Container(id) => id == container_id,
        }
    }
}
