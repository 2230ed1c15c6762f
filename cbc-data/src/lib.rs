//! Data processing for lake boundary conditions.
//!
//! This crate turns raw reservoir observations into gap-free monthly series,
//! converts storage to elevation against rating curves and estimates lakebed
//! conductance from the model's aquifer files.

pub mod conductance;
pub mod error;
pub mod normalize;
pub mod rating_curve;

pub use conductance::{estimate_conductance, ConductanceEstimate};
pub use error::{DataError, Result};
pub use normalize::{normalize_monthly, MonthlyRecord, MonthlySeries};
pub use rating_curve::{RatingCurve, RatingCurvePoint};

/// Linear interpolation over evenly spaced positions.
pub mod interpolation {
    /// Linearly interpolate between two values `steps` positions apart.
    ///
    /// Returns `steps + 1` values, both ends included. A zero step count
    /// returns just the start value.
    pub fn interpolate_pair(start: f64, end: f64, steps: usize) -> Vec<f64> {
        if steps == 0 {
            return vec![start];
        }
        let slope = (end - start) / steps as f64;
        (0..=steps).map(|i| start + slope * i as f64).collect()
    }

    /// Fill `None` gaps in an evenly spaced series by linear interpolation
    /// between the nearest known neighbours. Leading and trailing gaps have
    /// no bracket and stay `None`.
    pub fn fill_gaps(values: &[Option<f64>]) -> Vec<Option<f64>> {
        let mut result = values.to_vec();
        let known: Vec<usize> = values
            .iter()
            .enumerate()
            .filter_map(|(i, v)| v.map(|_| i))
            .collect();

        for window in known.windows(2) {
            let (lo, hi) = (window[0], window[1]);
            if hi - lo <= 1 {
                continue;
            }
            if let (Some(start), Some(end)) = (values[lo], values[hi]) {
                let filled = interpolate_pair(start, end, hi - lo);
                for (offset, value) in filled.iter().enumerate().take(hi - lo).skip(1) {
                    result[lo + offset] = Some(*value);
                }
            }
        }
        result
    }

    /// Interpolate `y` at `x` on the segment `(x0, y0)`-`(x1, y1)`.
    pub fn linear(x: f64, x0: f64, y0: f64, x1: f64, y1: f64) -> f64 {
        if x1 == x0 {
            return y0;
        }
        y0 + (y1 - y0) * (x - x0) / (x1 - x0)
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_interpolate_pair_basic() {
            let result = interpolate_pair(7.0, 16.0, 5);
            assert_eq!(result.len(), 6);
            assert_eq!(result[0], 7.0);
            assert!((result[1] - 8.8).abs() < 1e-12);
            assert_eq!(result[5], 16.0);
        }

        #[test]
        fn test_interpolate_pair_zero_steps() {
            assert_eq!(interpolate_pair(100.0, 200.0, 0), vec![100.0]);
        }

        #[test]
        fn test_fill_gaps() {
            let values = vec![Some(100.0), Some(110.0), None, None, Some(140.0)];
            let filled = fill_gaps(&values);
            assert_eq!(
                filled,
                vec![Some(100.0), Some(110.0), Some(120.0), Some(130.0), Some(140.0)]
            );
        }

        #[test]
        fn test_fill_gaps_leaves_open_ends() {
            let filled = fill_gaps(&[None, Some(1.0), None]);
            assert_eq!(filled, vec![None, Some(1.0), None]);
        }

        #[test]
        fn test_linear() {
            assert_eq!(linear(5.0, 0.0, 10.0, 10.0, 20.0), 15.0);
            assert_eq!(linear(5.0, 5.0, 10.0, 5.0, 20.0), 10.0);
        }
    }
}
