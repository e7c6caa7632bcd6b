use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Hit/miss counters of a [`RateCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RateCacheStats {
    pub entries: usize,
    pub hits: usize,
    pub misses: usize,
}

/// Request-scoped memo of resolved rates keyed by `(currency_id, instant)`.
///
/// Construct one per request and pass it by reference into every resolver
/// call. It is safe to share across rayon tasks of the same request.
#[derive(Debug, Default)]
pub struct RateCache {
    rates: DashMap<(String, DateTime<Utc>), Decimal>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl RateCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, currency_id: &str, at: DateTime<Utc>) -> Option<Decimal> {
        let found = self
            .rates
            .get(&(currency_id.to_string(), at))
            .map(|entry| *entry.value());

        let counter = if found.is_some() {
            &self.hits
        } else {
            &self.misses
        };
        counter.fetch_add(1, Ordering::Relaxed);

        found
    }

    pub fn insert(&self, currency_id: &str, at: DateTime<Utc>, rate: Decimal) {
        self.rates.insert((currency_id.to_string(), at), rate);
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    pub fn stats(&self) -> RateCacheStats {
        RateCacheStats {
            entries: self.rates.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    #[test]
    fn test_counts_hits_and_misses() {
        let cache = RateCache::new();
        let at = Utc.timestamp_millis_opt(1_000).unwrap();

        assert_eq!(cache.get("usd", at), None);
        cache.insert("usd", at, dec!(7.8));
        assert_eq!(cache.get("usd", at), Some(dec!(7.8)));
        assert_eq!(cache.get("usd", Utc.timestamp_millis_opt(2_000).unwrap()), None);

        assert_eq!(
            cache.stats(),
            RateCacheStats {
                entries: 1,
                hits: 1,
                misses: 2
            }
        );
    }
}
