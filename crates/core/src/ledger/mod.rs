//! Ledger module - containers, transactions and their fragments, replayed into
//! balances, timelines and net worth.

mod ledger_aggregator;
mod ledger_model;
mod ledger_replay;

pub use ledger_aggregator::*;
pub use ledger_model::*;
pub use ledger_replay::*;
