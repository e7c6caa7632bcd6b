//! Currencies module - user-defined currencies, rate observations and the
//! fallback graph connecting them to the base currency.

mod currencies_model;
mod currency_graph;

pub use currencies_model::{Currency, RateDatum};
pub use currency_graph::CurrencyGraph;
