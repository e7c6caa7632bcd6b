use rust_decimal::Decimal;

use crate::fx::RateError;

pub fn checked_mul(left: Decimal, right: Decimal) -> Result<Decimal, RateError> {
    left.checked_mul(right)
        .ok_or_else(|| RateError::Arithmetic(format!("overflow multiplying {} by {}", left, right)))
}

pub fn checked_add(left: Decimal, right: Decimal) -> Result<Decimal, RateError> {
    left.checked_add(right)
        .ok_or_else(|| RateError::Arithmetic(format!("overflow adding {} to {}", right, left)))
}

pub fn checked_sub(left: Decimal, right: Decimal) -> Result<Decimal, RateError> {
    left.checked_sub(right)
        .ok_or_else(|| RateError::Arithmetic(format!("overflow subtracting {} from {}", right, left)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_in_range_results() {
        assert_eq!(checked_mul(dec!(1.5), dec!(4)).unwrap(), dec!(6));
        assert_eq!(checked_add(dec!(1.5), dec!(4)).unwrap(), dec!(5.5));
        assert_eq!(checked_sub(dec!(1.5), dec!(4)).unwrap(), dec!(-2.5));
    }

    #[test]
    fn test_overflow_is_arithmetic_error() {
        assert!(matches!(checked_mul(Decimal::MAX, dec!(8)), Err(RateError::Arithmetic(_))));
        assert!(matches!(checked_add(Decimal::MAX, Decimal::ONE), Err(RateError::Arithmetic(_))));
        assert!(matches!(checked_sub(Decimal::MIN, Decimal::ONE), Err(RateError::Arithmetic(_))));
    }
}
