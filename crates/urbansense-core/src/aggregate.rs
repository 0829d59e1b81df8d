//! Streaming per-(type, period) statistics.
//!
//! Each successful insert folds its value into the bucket for
//! `(data_type, period)` where a period is one 86400-second day. Buckets
//! are only ever folded forward: the ledger is append-only, so no
//! subtraction or recomputation path exists.

use serde::{Deserialize, Serialize};

/// Seconds per aggregation period (one day).
pub const PERIOD_SECONDS: u64 = 86_400;

/// The day-granularity period a timestamp falls into.
#[must_use]
pub const fn period_of(timestamp: u64) -> u64 {
    timestamp / PERIOD_SECONDS
}

/// Running statistics for one `(data_type, period)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateBucket {
    /// Number of records folded into the bucket.
    pub count: u64,

    /// Sum of the folded values.
    pub sum: i64,

    /// Smallest folded value (`i64::MAX` sentinel while empty).
    pub min: i64,

    /// Largest folded value (`i64::MIN` sentinel while empty).
    pub max: i64,

    /// Floor of `sum / count` (0 while empty).
    pub avg: i64,
}

impl AggregateBucket {
    /// An empty bucket with min/max sentinels.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            count: 0,
            sum: 0,
            min: i64::MAX,
            max: i64::MIN,
            avg: 0,
        }
    }

    /// Folds one observation value into the bucket.
    ///
    /// The average is floor division, also for negative sums.
    #[allow(clippy::cast_possible_wrap)] // count is bounded by the record count
    pub fn fold(&mut self, value: i64) {
        self.count += 1;
        self.sum += value;
        if value < self.min {
            self.min = value;
        }
        if value > self.max {
            self.max = value;
        }
        self.avg = self.sum.div_euclid(self.count as i64);
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_empty_bucket_sentinels() {
        let bucket = AggregateBucket::empty();
        assert_eq!(bucket.count, 0);
        assert_eq!(bucket.sum, 0);
        assert_eq!(bucket.min, i64::MAX);
        assert_eq!(bucket.max, i64::MIN);
        assert_eq!(bucket.avg, 0);
    }

    #[test]
    fn test_fold_two_values() {
        let mut bucket = AggregateBucket::empty();
        bucket.fold(25);
        bucket.fold(35);

        assert_eq!(bucket.count, 2);
        assert_eq!(bucket.sum, 60);
        assert_eq!(bucket.min, 25);
        assert_eq!(bucket.max, 35);
        assert_eq!(bucket.avg, 30);
    }

    #[test]
    fn test_average_floors_toward_negative_infinity() {
        let mut bucket = AggregateBucket::empty();
        bucket.fold(-3);
        bucket.fold(-4);

        // floor(-7 / 2) = -4, not the truncated -3.
        assert_eq!(bucket.avg, -4);
    }

    #[test]
    fn test_period_boundaries() {
        assert_eq!(period_of(1), 0);
        assert_eq!(period_of(PERIOD_SECONDS - 1), 0);
        assert_eq!(period_of(PERIOD_SECONDS), 1);
        assert_eq!(period_of(1_725_000_000), 1_725_000_000 / 86_400);
    }

    proptest! {
        #[test]
        fn prop_fold_matches_reference(
            values in proptest::collection::vec(-1_000_000i64..1_000_000, 1..64)
        ) {
            let mut bucket = AggregateBucket::empty();
            for &v in &values {
                bucket.fold(v);
            }

            prop_assert_eq!(bucket.count, values.len() as u64);
            prop_assert_eq!(bucket.sum, values.iter().sum::<i64>());
            prop_assert_eq!(bucket.min, *values.iter().min().expect("non-empty"));
            prop_assert_eq!(bucket.max, *values.iter().max().expect("non-empty"));
            prop_assert_eq!(bucket.avg, bucket.sum.div_euclid(values.len() as i64));
            prop_assert!(bucket.min <= bucket.max);
            prop_assert!(bucket.min <= bucket.avg && bucket.avg <= bucket.max);
        }
    }
}
