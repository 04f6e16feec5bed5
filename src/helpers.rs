//! Helper functions for percentiles and peak picking.

use crate::matrix::FdMatrix;
use std::cmp::Ordering;

/// Small epsilon for numerical comparisons.
pub const NUMERICAL_EPS: f64 = 1e-10;

/// Percentile of `values` with linear interpolation between order statistics.
///
/// The `q`-th percentile (with `q` in `[0, 100]`) sits at rank
/// `q / 100 * (n - 1)` of the sorted values; fractional ranks interpolate
/// linearly between the two neighbours. Returns NaN for an empty slice.
///
/// # Arguments
/// * `values` - Sample values (not required to be sorted)
/// * `q` - Percentile in `[0, 100]`; values outside are clamped
pub fn percentile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    percentile_sorted(&sorted, q)
}

/// [`percentile`] for data already sorted ascending.
pub fn percentile_sorted(sorted: &[f64], q: f64) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return f64::NAN;
    }
    let rank = (q.clamp(0.0, 100.0) / 100.0) * (n - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = (lo + 1).min(n - 1);
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Column-wise percentile of a `windows x frequencies` matrix.
///
/// Returns one value per column, i.e. a curve over the frequency grid.
pub fn percentile_curve(data: &FdMatrix, q: f64) -> Vec<f64> {
    (0..data.ncols())
        .map(|j| percentile(data.column(j), q))
        .collect()
}

/// Index of the first maximum of `values`, ignoring NaN entries.
pub fn argmax(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in values.iter().enumerate() {
        if v.is_nan() {
            continue;
        }
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentile_interpolates() {
        let values = vec![4.0, 1.0, 3.0, 2.0];
        assert_eq!(percentile(&values, 0.0), 1.0);
        assert_eq!(percentile(&values, 100.0), 4.0);
        assert!((percentile(&values, 50.0) - 2.5).abs() < NUMERICAL_EPS);
        // rank 0.1 * 3 = 0.3 -> 1 + 0.3 * (2 - 1)
        assert!((percentile(&values, 10.0) - 1.3).abs() < NUMERICAL_EPS);
    }

    #[test]
    fn test_percentile_single_value() {
        assert_eq!(percentile(&[7.5], 10.0), 7.5);
        assert_eq!(percentile(&[7.5], 90.0), 7.5);
        assert!(percentile(&[], 50.0).is_nan());
    }

    #[test]
    fn test_percentile_curve_per_column() {
        // 3 windows x 2 frequencies, column-major
        let data = FdMatrix::from_column_major(vec![1.0, 2.0, 3.0, 10.0, 30.0, 20.0], 3, 2).unwrap();
        let median = percentile_curve(&data, 50.0);
        assert_eq!(median, vec![2.0, 20.0]);
    }

    #[test]
    fn test_argmax_first_maximum() {
        assert_eq!(argmax(&[1.0, 3.0, 2.0, 3.0]), Some(1));
        assert_eq!(argmax(&[f64::NAN, 0.5, 0.1]), Some(1));
        assert_eq!(argmax(&[]), None);
        assert_eq!(argmax(&[f64::NAN]), None);
    }
}
