//! Engine settings, read from `LEDGERFLOW_*` environment variables.

use chrono::Weekday;
use chrono_tz::Tz;
use std::str::FromStr;

use crate::constants::{
    DEFAULT_DIVISIONS, DEFAULT_RATE_HISTORY_DIVISIONS, MAX_DIVISIONS, MIN_DIVISIONS,
};
use crate::errors::{Error, Result};
use crate::utils::time_utils::{DEFAULT_WEEK_START, DEFAULT_WINDOW_TZ};

pub const TIMEZONE_VAR: &str = "LEDGERFLOW_TIMEZONE";
pub const WEEK_START_VAR: &str = "LEDGERFLOW_WEEK_START";
pub const DEFAULT_DIVISIONS_VAR: &str = "LEDGERFLOW_DEFAULT_DIVISIONS";
pub const MAX_DIVISIONS_VAR: &str = "LEDGERFLOW_MAX_DIVISIONS";
pub const RATE_HISTORY_DIVISIONS_VAR: &str = "LEDGERFLOW_RATE_HISTORY_DIVISIONS";

#[derive(Debug, Clone, PartialEq)]
pub struct CalculationSettings {
    /// Zone in which calendar week and month boundaries are drawn.
    pub timezone: Tz,
    pub week_start: Weekday,
    /// Samples used when a range request omits `division`.
    pub default_divisions: u32,
    pub max_divisions: u32,
    pub rate_history_divisions: u32,
}

impl Default for CalculationSettings {
    fn default() -> Self {
        Self {
            timezone: DEFAULT_WINDOW_TZ,
            week_start: DEFAULT_WEEK_START,
            default_divisions: DEFAULT_DIVISIONS,
            max_divisions: MAX_DIVISIONS,
            rate_history_divisions: DEFAULT_RATE_HISTORY_DIVISIONS,
        }
    }
}

impl CalculationSettings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from any key lookup. Unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let timezone = match lookup(TIMEZONE_VAR) {
            Some(raw) => Tz::from_str(raw.trim()).map_err(|_| {
                Error::InvalidConfigValue(format!("{} is not a known timezone: {}", TIMEZONE_VAR, raw))
            })?,
            None => defaults.timezone,
        };

        let week_start = match lookup(WEEK_START_VAR) {
            Some(raw) => Weekday::from_str(raw.trim()).map_err(|_| {
                Error::InvalidConfigValue(format!("{} is not a weekday: {}", WEEK_START_VAR, raw))
            })?,
            None => defaults.week_start,
        };

        let settings = Self {
            timezone,
            week_start,
            default_divisions: parse_count(&lookup, DEFAULT_DIVISIONS_VAR, defaults.default_divisions)?,
            max_divisions: parse_count(&lookup, MAX_DIVISIONS_VAR, defaults.max_divisions)?,
            rate_history_divisions: parse_count(
                &lookup,
                RATE_HISTORY_DIVISIONS_VAR,
                defaults.rate_history_divisions,
            )?,
        };

        if settings.default_divisions > settings.max_divisions {
            return Err(Error::InvalidConfigValue(format!(
                "{} ({}) exceeds {} ({})",
                DEFAULT_DIVISIONS_VAR,
                settings.default_divisions,
                MAX_DIVISIONS_VAR,
                settings.max_divisions
            )));
        }

        Ok(settings)
    }
}

fn parse_count<F>(lookup: &F, key: &str, default: u32) -> Result<u32>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };
    let value: u32 = raw
        .trim()
        .parse()
        .map_err(|_| Error::InvalidConfigValue(format!("{} must be an integer: {}", key, raw)))?;
    if i64::from(value) < MIN_DIVISIONS {
        return Err(Error::InvalidConfigValue(format!(
            "{} must be at least {}: {}",
            key, MIN_DIVISIONS, value
        )));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let settings = CalculationSettings::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(settings, CalculationSettings::default());
        assert_eq!(settings.default_divisions, 500);
        assert_eq!(settings.week_start, Weekday::Mon);
    }

    #[test]
    fn test_reads_overrides() {
        let settings = CalculationSettings::from_lookup(lookup_from(&[
            (TIMEZONE_VAR, "Asia/Hong_Kong"),
            (WEEK_START_VAR, "sun"),
            (DEFAULT_DIVISIONS_VAR, "100"),
            (MAX_DIVISIONS_VAR, "200"),
            (RATE_HISTORY_DIVISIONS_VAR, "24"),
        ]))
        .unwrap();

        assert_eq!(settings.timezone, chrono_tz::Asia::Hong_Kong);
        assert_eq!(settings.week_start, Weekday::Sun);
        assert_eq!(settings.default_divisions, 100);
        assert_eq!(settings.max_divisions, 200);
        assert_eq!(settings.rate_history_divisions, 24);
    }

    #[test]
    fn test_rejects_invalid_values() {
        for pairs in [
            vec![(TIMEZONE_VAR, "Mars/Olympus")],
            vec![(WEEK_START_VAR, "someday")],
            vec![(DEFAULT_DIVISIONS_VAR, "ten")],
            vec![(MAX_DIVISIONS_VAR, "1")],
            vec![(DEFAULT_DIVISIONS_VAR, "900"), (MAX_DIVISIONS_VAR, "800")],
        ] {
            let result = CalculationSettings::from_lookup(lookup_from(&pairs));
            assert!(
                matches!(result, Err(Error::InvalidConfigValue(_))),
                "{:?}",
                pairs
            );
        }
    }
}
