//! Range-based volatility metric
//!
//! Volatility here is the price range relative to its midpoint, expressed in
//! percent: `(max - min) / ((max + min) / 2) * 100`. It is not a standard
//! deviation.

use thiserror::Error;

/// Ordered prices of one instrument, as read from its trade file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceSeries(Vec<f64>);

impl PriceSeries {
    pub fn new(prices: Vec<f64>) -> Self {
        Self(prices)
    }

    pub fn push(&mut self, price: f64) {
        self.0.push(price);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Smallest and largest price, or `None` for an empty series
    pub fn bounds(&self) -> Option<(f64, f64)> {
        let mut prices = self.0.iter().copied();
        let first = prices.next()?;
        Some(prices.fold((first, first), |(min, max), p| (min.min(p), max.max(p))))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum MetricError {
    /// `max != min` and the midpoint is zero or negative
    #[error("price midpoint is not positive (min {min}, max {max})")]
    Degenerate { min: f64, max: f64 },
}

/// Compute the volatility of a price series
///
/// An empty series and a flat series (including all zeros) have volatility 0.
/// A series whose midpoint is not positive is rejected, so the result is
/// never negative.
pub fn calculate_volatility(series: &PriceSeries) -> Result<f64, MetricError> {
    let Some((min, max)) = series.bounds() else {
        return Ok(0.0);
    };
    if max == min {
        return Ok(0.0);
    }

    // halve before combining so prices near f64::MAX stay finite
    let midpoint = min / 2.0 + max / 2.0;
    if midpoint <= 0.0 {
        return Err(MetricError::Degenerate { min, max });
    }

    // half range over midpoint, doubled: (max - min) / midpoint as a percentage
    let half_range = max / 2.0 - min / 2.0;
    Ok(half_range / midpoint * 200.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn vol(prices: &[f64]) -> f64 {
        calculate_volatility(&PriceSeries::new(prices.to_vec())).unwrap()
    }

    #[test]
    fn test_empty_series_is_zero() {
        assert_eq!(vol(&[]), 0.0);
    }

    #[test]
    fn test_flat_series_is_zero() {
        assert_eq!(vol(&[42.5, 42.5, 42.5]), 0.0);
        assert_eq!(vol(&[0.0, 0.0]), 0.0);
    }

    #[test]
    fn test_range_over_midpoint() {
        // range 50, midpoint 100
        assert!((vol(&[75.0, 125.0, 100.0]) - 50.0).abs() < 1e-9);
        // range 1, midpoint 10
        assert!((vol(&[9.5, 10.5]) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_midpoint() {
        let err = calculate_volatility(&PriceSeries::new(vec![-2.0, 2.0])).unwrap_err();
        assert_eq!(err, MetricError::Degenerate { min: -2.0, max: 2.0 });
    }

    #[test]
    fn test_negative_midpoint_is_degenerate() {
        let err = calculate_volatility(&PriceSeries::new(vec![-10.0, -5.0])).unwrap_err();
        assert_eq!(err, MetricError::Degenerate { min: -10.0, max: -5.0 });

        // a negative minimum with a positive midpoint still yields a positive value
        assert!(vol(&[-1.0, 3.0]) > 0.0);
    }

    #[test]
    fn test_huge_prices_stay_finite() {
        let v = vol(&[1e308, 1.7e308]);
        assert!(v.is_finite());
        assert!((v - 0.7 / 2.7 * 200.0).abs() < 1e-9, "{v}");
    }

    #[test]
    fn test_bounds() {
        assert_eq!(PriceSeries::default().bounds(), None);
        assert_eq!(
            PriceSeries::new(vec![3.0, 1.0, 2.0]).bounds(),
            Some((1.0, 3.0))
        );
    }

    #[test]
    fn test_additive_shift_changes_volatility() {
        let base = vol(&[10.0, 20.0]);
        let shifted = vol(&[110.0, 120.0]);
        assert!(base > shifted);
    }

    fn prices() -> impl Strategy<Value = Vec<f64>> {
        prop::collection::vec(0.01f64..10_000.0, 1..64)
    }

    proptest! {
        #[test]
        fn test_volatility_ignores_order(mut series in prices(), seed in any::<u64>()) {
            let expected = vol(&series);
            // deterministic reshuffle driven by the seed
            let len = series.len();
            let mut state = seed;
            for i in (1..len).rev() {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
                let j = (state >> 33) as usize % (i + 1);
                series.swap(i, j);
            }
            prop_assert_eq!(vol(&series), expected);
        }

        #[test]
        fn test_volatility_is_scale_invariant(series in prices(), factor in 0.01f64..1_000.0) {
            let scaled: Vec<f64> = series.iter().map(|p| p * factor).collect();
            let a = vol(&series);
            let b = vol(&scaled);
            prop_assert!((a - b).abs() <= 1e-6 * a.max(1.0), "{} vs {}", a, b);
        }

        #[test]
        fn test_volatility_not_shift_invariant(series in prices(), shift in 1.0f64..1_000.0) {
            let shifted: Vec<f64> = series.iter().map(|p| p + shift).collect();
            let a = vol(&series);
            let b = vol(&shifted);
            // shifting positive prices up shrinks the relative range, unless it is flat
            prop_assert!(b <= a + 1e-9);
            if a > 1e-6 {
                prop_assert!(b < a);
            }
        }

        #[test]
        fn test_volatility_is_non_negative(series in prices()) {
            prop_assert!(vol(&series) >= 0.0);
        }
    }
}
