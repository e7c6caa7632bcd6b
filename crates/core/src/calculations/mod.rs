//! Calculations module - income/expense windows and the request-facing service
//! that runs the valuation engine over a user's snapshot.

mod calculations_model;
mod calculations_service;
mod calculations_traits;
mod windowed_sum;

pub use calculations_model::*;
pub use calculations_service::*;
pub use calculations_traits::*;
pub use windowed_sum::*;
