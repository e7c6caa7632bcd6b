//! Ledgerflow Core - valuation and ledger-aggregation engine.
//!
//! Resolves any user-defined currency against the base currency from rate
//! observations and fallback chains, and replays a ledger of transactions
//! into balances, timelines, net worth and income/expense windows.
//! Persistence is supplied by implementors of
//! [`calculations::LedgerRepositoryTrait`].

pub mod calculations;
pub mod config;
pub mod constants;
pub mod currencies;
pub mod errors;
pub mod fx;
pub mod ledger;
pub mod utils;

pub use calculations::{CalculationsService, CalculationsServiceTrait, LedgerRepositoryTrait};
pub use config::CalculationSettings;

// Re-export error types
pub use errors::Error;
pub use errors::Result;
