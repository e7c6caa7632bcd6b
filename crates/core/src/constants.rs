/// Scope identifier used on the wire for the all-containers aggregate
pub const ALL_CONTAINERS_ID: &str = "ALL";

/// Default number of samples for timeline and history requests
pub const DEFAULT_DIVISIONS: u32 = 500;

/// Upper bound on samples per timeline request
pub const MAX_DIVISIONS: u32 = 5000;

/// Default number of samples for a currency rate history
pub const DEFAULT_RATE_HISTORY_DIVISIONS: u32 = 10;

/// Minimum number of samples for any range request
pub const MIN_DIVISIONS: i64 = 2;

/// Length of the short rolling window, in days
pub const ROLLING_SHORT_WINDOW_DAYS: i64 = 7;

/// Length of the long rolling window, in days
pub const ROLLING_LONG_WINDOW_DAYS: i64 = 30;
