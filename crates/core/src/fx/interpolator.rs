use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::fx_errors::RateError;

/// A key that can be placed on the numeric axis of a [`LinearInterpolator`].
pub trait InterpolationKey: Ord + Clone {
    fn to_decimal(&self) -> Decimal;
}

impl InterpolationKey for Decimal {
    fn to_decimal(&self) -> Decimal {
        *self
    }
}

impl InterpolationKey for i64 {
    fn to_decimal(&self) -> Decimal {
        Decimal::from(*self)
    }
}

/// Instants are interpolated on epoch milliseconds, keeping the sub-millisecond
/// part as a fraction so distinct instants never share a position.
impl InterpolationKey for DateTime<Utc> {
    fn to_decimal(&self) -> Decimal {
        let millis = Decimal::from(self.timestamp()) * Decimal::ONE_THOUSAND;
        millis + Decimal::new(i64::from(self.timestamp_subsec_nanos()), 6)
    }
}

/// Piecewise-linear interpolation over a set of `(key, value)` points.
///
/// Queries outside the observed key range return the nearest boundary value
/// (flat extrapolation), so a rate holds before its first observation and
/// after its last one.
#[derive(Debug, Clone)]
pub struct LinearInterpolator<K> {
    /// Sorted ascending by key, keys unique.
    entries: Vec<(K, Decimal)>,
}

impl<K: InterpolationKey> LinearInterpolator<K> {
    /// Builds an interpolator from points in any order.
    /// Two points sharing a key are rejected rather than averaged.
    pub fn new<I>(points: I) -> Result<Self, RateError>
    where
        I: IntoIterator<Item = (K, Decimal)>,
    {
        let mut entries: Vec<(K, Decimal)> = points.into_iter().collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        if let Some(pair) = entries
            .windows(2)
            .find(|pair| pair[0].0.to_decimal() == pair[1].0.to_decimal())
        {
            return Err(RateError::DuplicateKey(pair[0].0.to_decimal().normalize().to_string()));
        }

        Ok(LinearInterpolator { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn min_key(&self) -> Option<&K> {
        self.entries.first().map(|(key, _)| key)
    }

    pub fn max_key(&self) -> Option<&K> {
        self.entries.last().map(|(key, _)| key)
    }

    /// Evaluates the curve at `x`. Returns `None` only when there are no points.
    pub fn evaluate(&self, x: &K) -> Result<Option<Decimal>, RateError> {
        let (first, last) = match (self.entries.first(), self.entries.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return Ok(None),
        };

        if *x <= first.0 {
            return Ok(Some(first.1));
        }
        if *x >= last.0 {
            return Ok(Some(last.1));
        }

        // first.0 < x < last.0, so 1 <= upper < len
        let upper = self.entries.partition_point(|(key, _)| key <= x);
        let (low_key, low_value) = &self.entries[upper - 1];
        if low_key == x {
            return Ok(Some(*low_value));
        }
        let (high_key, high_value) = &self.entries[upper];

        Self::interpolate(
            x.to_decimal(),
            (low_key.to_decimal(), *low_value),
            (high_key.to_decimal(), *high_value),
        )
        .map(Some)
    }

    fn interpolate(
        x: Decimal,
        (low_key, low_value): (Decimal, Decimal),
        (high_key, high_value): (Decimal, Decimal),
    ) -> Result<Decimal, RateError> {
        if low_value == high_value {
            return Ok(low_value);
        }
        let overflow = || {
            RateError::Arithmetic(format!(
                "cannot interpolate between {} and {} at {}",
                low_key, high_key, x
            ))
        };

        let ratio = (x - low_key)
            .checked_div(high_key - low_key)
            .ok_or_else(overflow)?;
        high_value
            .checked_sub(low_value)
            .and_then(|rise| ratio.checked_mul(rise))
            .and_then(|delta| low_value.checked_add(delta))
            .ok_or_else(overflow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_empty_returns_none() {
        let interpolator: LinearInterpolator<Decimal> = LinearInterpolator::new(Vec::new()).unwrap();
        assert!(interpolator.is_empty());
        assert_eq!(interpolator.evaluate(&dec!(1)).unwrap(), None);
    }

    #[test]
    fn test_single_point_holds_everywhere() {
        let interpolator = LinearInterpolator::new(vec![(dec!(3), dec!(42))]).unwrap();
        assert_eq!(interpolator.evaluate(&dec!(-100)).unwrap(), Some(dec!(42)));
        assert_eq!(interpolator.evaluate(&dec!(3)).unwrap(), Some(dec!(42)));
        assert_eq!(interpolator.evaluate(&dec!(100)).unwrap(), Some(dec!(42)));
    }

    #[test]
    fn test_linear_midpoint() {
        let interpolator = LinearInterpolator::new(vec![(dec!(0), dec!(0)), (dec!(1), dec!(100))]).unwrap();
        assert_eq!(interpolator.evaluate(&dec!(0.5)).unwrap(), Some(dec!(50)));
    }

    #[test]
    fn test_uneven_points_interpolate_in_decimal() {
        let interpolator = LinearInterpolator::new(vec![
            (dec!(1.427), dec!(89.4)),
            (dec!(-0.725), dec!(21.7)),
            (dec!(-0.08), dec!(69.1)),
        ])
        .unwrap();

        let value = interpolator.evaluate(&dec!(-0.3)).unwrap().unwrap();
        // 52.932558139534883720930232558139 to 32 digits; Decimal carries 28
        let expected = dec!(52.932558139534883720930232558);
        assert!((value - expected).abs() < dec!(0.000000000000000000000001));
    }

    #[test]
    fn test_exact_keys_return_exact_values() {
        let interpolator = LinearInterpolator::new(vec![
            (dec!(1.427), dec!(89.4)),
            (dec!(-0.725), dec!(21.7)),
            (dec!(-0.08), dec!(69.1)),
        ])
        .unwrap();

        assert_eq!(interpolator.evaluate(&dec!(-0.725)).unwrap(), Some(dec!(21.7)));
        assert_eq!(interpolator.evaluate(&dec!(-0.08)).unwrap(), Some(dec!(69.1)));
        assert_eq!(interpolator.evaluate(&dec!(1.427)).unwrap(), Some(dec!(89.4)));
    }

    #[test]
    fn test_clamps_outside_range() {
        let interpolator = LinearInterpolator::new(vec![(10i64, dec!(5)), (20i64, dec!(9))]).unwrap();
        assert_eq!(interpolator.evaluate(&0).unwrap(), Some(dec!(5)));
        assert_eq!(interpolator.evaluate(&9).unwrap(), Some(dec!(5)));
        assert_eq!(interpolator.evaluate(&21).unwrap(), Some(dec!(9)));
        assert_eq!(interpolator.evaluate(&15).unwrap(), Some(dec!(7)));
    }

    #[test]
    fn test_repeated_key_rejected() {
        let result = LinearInterpolator::new(vec![(1i64, dec!(5)), (1i64, dec!(7))]);
        assert!(matches!(result, Err(RateError::DuplicateKey(_))));
    }

    #[test]
    fn test_instant_keys_use_milliseconds() {
        use chrono::TimeZone;
        let t0 = Utc.timestamp_millis_opt(1_000).unwrap();
        let t1 = Utc.timestamp_millis_opt(3_000).unwrap();
        let mid = Utc.timestamp_millis_opt(2_000).unwrap();

        let interpolator = LinearInterpolator::new(vec![(t1, dec!(30)), (t0, dec!(10))]).unwrap();
        assert_eq!(interpolator.min_key(), Some(&t0));
        assert_eq!(interpolator.max_key(), Some(&t1));
        assert_eq!(interpolator.evaluate(&mid).unwrap(), Some(dec!(20)));
    }

    #[test]
    fn test_instant_keys_keep_sub_millisecond_precision() {
        use chrono::{Duration, TimeZone};
        let t0 = Utc.timestamp_millis_opt(1_000).unwrap();
        let t1 = t0 + Duration::microseconds(500);

        let interpolator = LinearInterpolator::new(vec![(t0, dec!(7)), (t1, dec!(9))]).unwrap();
        assert_eq!(
            interpolator.evaluate(&(t0 + Duration::microseconds(250))).unwrap(),
            Some(dec!(8))
        );
        assert_eq!(t1.to_decimal(), dec!(1000.5));
    }

    #[test]
    fn test_overflowing_interpolation_is_arithmetic_error() {
        let interpolator =
            LinearInterpolator::new(vec![(0i64, Decimal::MIN), (2i64, Decimal::MAX)]).unwrap();
        assert!(matches!(
            interpolator.evaluate(&1),
            Err(RateError::Arithmetic(_))
        ));
    }
}
