//! FX module - interpolation of rate observations and resolution of any
//! currency against the base currency.

mod fx_errors;
mod fx_model;
mod interpolator;
mod rate_cache;
mod rate_resolver;

pub use fx_errors::RateError;
pub use fx_model::{RateHistory, RateSample};
pub use interpolator::{InterpolationKey, LinearInterpolator};
pub use rate_cache::{RateCache, RateCacheStats};
pub use rate_resolver::RateResolver;
