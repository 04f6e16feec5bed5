//! Maximum-likelihood auto- and cross-covariances of one window.
//!
//! The horizontal components are combined into the complex series
//! `x = N + i·E`; the vertical component `v = Z` stays real. All estimates
//! use the biased `1/n` normalization and direct summation over the valid
//! overlap of the two shifted series.

use num_complex::Complex64;

/// Combine north and east components into `x = N + i·E`.
pub fn horizontal(n: &[f64], e: &[f64]) -> Vec<Complex64> {
    n.iter()
        .zip(e.iter())
        .map(|(&re, &im)| Complex64::new(re, im))
        .collect()
}

/// Cross-covariances of one window, lags `0..maxtau`.
#[derive(Debug, Clone, PartialEq)]
pub struct CrossCovariance {
    /// `(1/n) Σ v[t+τ]·x[t]`: vertical leading horizontal.
    pub v_x: Vec<Complex64>,
    /// `(1/n) Σ x[t+τ]·v[t]`: horizontal leading vertical.
    pub x_v: Vec<Complex64>,
}

/// Auto-covariances of one window, lags `0..maxtau`.
#[derive(Debug, Clone, PartialEq)]
pub struct AutoCovariance {
    /// `(1/n) Σ x[t+τ]·conj(x[t])`.
    pub x: Vec<Complex64>,
    /// `(1/n) Σ v[t+τ]·v[t]`.
    pub v: Vec<f64>,
}

/// Cross-covariances between `x = N + i·E` and `v = Z`.
///
/// `size` is the normalization length; lags at or beyond it are zero.
pub fn cross_covariance(
    z: &[f64],
    n: &[f64],
    e: &[f64],
    size: usize,
    maxtau: usize,
) -> CrossCovariance {
    let x = horizontal(n, e);
    let len = x.len().min(z.len());
    let norm = size as f64;

    let mut x_v = vec![Complex64::new(0.0, 0.0); maxtau];
    let mut v_x = vec![Complex64::new(0.0, 0.0); maxtau];
    for tau in 0..maxtau.min(len) {
        let mut fwd = Complex64::new(0.0, 0.0);
        let mut bwd = Complex64::new(0.0, 0.0);
        for t in 0..len - tau {
            fwd += x[t + tau] * z[t];
            bwd += x[t] * z[t + tau];
        }
        x_v[tau] = fwd / norm;
        v_x[tau] = bwd / norm;
    }
    CrossCovariance { v_x, x_v }
}

/// Auto-covariances of `x = N + i·E` and `v = Z`.
pub fn auto_covariance(
    z: &[f64],
    n: &[f64],
    e: &[f64],
    size: usize,
    maxtau: usize,
) -> AutoCovariance {
    let x = horizontal(n, e);
    let len = x.len().min(z.len());
    let norm = size as f64;

    let mut acx = vec![Complex64::new(0.0, 0.0); maxtau];
    let mut acv = vec![0.0; maxtau];
    for tau in 0..maxtau.min(len) {
        let mut sx = Complex64::new(0.0, 0.0);
        let mut sv = 0.0;
        for t in 0..len - tau {
            sx += x[t + tau] * x[t].conj();
            sv += z[t + tau] * z[t];
        }
        acx[tau] = sx / norm;
        acv[tau] = sv / norm;
    }
    AutoCovariance { x: acx, v: acv }
}

/// Covariances over lags `-maxtau..=maxtau`, stored at index `lag + maxtau`.
///
/// This is the layout the normal equations are assembled from.
#[derive(Debug, Clone, PartialEq)]
pub struct TwoSidedCovariances {
    /// Horizontal auto-covariance, Hermitian in the lag.
    pub xx: Vec<Complex64>,
    /// Vertical auto-covariance, symmetric in the lag.
    pub vv: Vec<f64>,
    /// Horizontal-vertical cross-covariance; positive lags have x leading.
    pub xv: Vec<Complex64>,
    pub maxtau: usize,
}

impl TwoSidedCovariances {
    pub fn compute(z: &[f64], n: &[f64], e: &[f64], size: usize, maxtau: usize) -> Self {
        let auto = auto_covariance(z, n, e, size, maxtau + 1);
        let cross = cross_covariance(z, n, e, size, maxtau + 1);

        let len = 2 * maxtau + 1;
        let mut xx = vec![Complex64::new(0.0, 0.0); len];
        let mut vv = vec![0.0; len];
        let mut xv = vec![Complex64::new(0.0, 0.0); len];
        for lag in 0..=maxtau {
            xx[maxtau + lag] = auto.x[lag];
            xx[maxtau - lag] = auto.x[lag].conj();
            vv[maxtau + lag] = auto.v[lag];
            vv[maxtau - lag] = auto.v[lag];
            xv[maxtau + lag] = cross.x_v[lag];
            if lag > 0 {
                xv[maxtau - lag] = cross.v_x[lag];
            }
        }
        Self { xx, vv, xv, maxtau }
    }

    /// Lag-0 variance of the vertical component.
    pub fn vertical_variance(&self) -> f64 {
        self.vv[self.maxtau]
    }

    /// Lag-0 variance of the complex horizontal series.
    pub fn horizontal_variance(&self) -> f64 {
        self.xx[self.maxtau].re
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_components() -> (Vec<f64>, Vec<f64>, Vec<f64>) {
        let z = vec![1.0, -2.0, 0.5, 3.0, -1.5, 0.25, -0.75, 2.0];
        let n = vec![0.5, 1.0, -1.0, 2.0, 0.0, -0.5, 1.5, -2.0];
        let e = vec![-1.0, 0.25, 0.75, -0.5, 1.0, 2.0, -1.0, 0.5];
        (z, n, e)
    }

    #[test]
    fn test_vertical_lag_zero_is_mean_square() {
        let (z, n, e) = sample_components();
        let auto = auto_covariance(&z, &n, &e, z.len(), 4);
        let expected: f64 = z.iter().map(|v| v * v).sum::<f64>() / z.len() as f64;
        assert!((auto.v[0] - expected).abs() < 1e-12);
    }

    #[test]
    fn test_horizontal_lag_zero_is_real_power() {
        let (z, n, e) = sample_components();
        let auto = auto_covariance(&z, &n, &e, z.len(), 4);
        let expected: f64 = n
            .iter()
            .zip(e.iter())
            .map(|(a, b)| a * a + b * b)
            .sum::<f64>()
            / z.len() as f64;
        assert!((auto.x[0].re - expected).abs() < 1e-12);
        assert!(auto.x[0].im.abs() < 1e-12);
    }

    #[test]
    fn test_cross_directions_share_lag_zero() {
        let (z, n, e) = sample_components();
        let cross = cross_covariance(&z, &n, &e, z.len(), 5);
        assert_eq!(cross.v_x.len(), 5);
        assert!((cross.v_x[0] - cross.x_v[0]).norm() < 1e-12);
    }

    #[test]
    fn test_cross_covariance_lag_one_by_hand() {
        let z = vec![1.0, 2.0, 3.0];
        let n = vec![1.0, 0.0, -1.0];
        let e = vec![0.0, 1.0, 0.0];
        let cross = cross_covariance(&z, &n, &e, 3, 2);
        // x = [1, i, -1]; x_v[1] = (x1 v0 + x2 v1) / 3 = (i - 2) / 3
        assert!((cross.x_v[1] - Complex64::new(-2.0 / 3.0, 1.0 / 3.0)).norm() < 1e-12);
        // v_x[1] = (v1 x0 + v2 x1) / 3 = (2 + 3i) / 3
        assert!((cross.v_x[1] - Complex64::new(2.0 / 3.0, 1.0)).norm() < 1e-12);
    }

    #[test]
    fn test_lags_beyond_length_are_zero() {
        let z = vec![1.0, 2.0];
        let n = vec![1.0, 1.0];
        let e = vec![0.0, 0.0];
        let auto = auto_covariance(&z, &n, &e, 2, 4);
        assert_eq!(auto.v[2], 0.0);
        assert_eq!(auto.v[3], 0.0);
    }

    #[test]
    fn test_two_sided_symmetries() {
        let (z, n, e) = sample_components();
        let cov = TwoSidedCovariances::compute(&z, &n, &e, z.len(), 3);
        assert_eq!(cov.xx.len(), 7);
        for lag in 1..=3 {
            assert_eq!(cov.vv[3 + lag], cov.vv[3 - lag]);
            assert_eq!(cov.xx[3 + lag], cov.xx[3 - lag].conj());
        }
        let cross = cross_covariance(&z, &n, &e, z.len(), 4);
        assert_eq!(cov.xv[3 + 2], cross.x_v[2]);
        assert_eq!(cov.xv[3 - 2], cross.v_x[2]);
        assert!((cov.vertical_variance() - cov.vv[3]).abs() < 1e-15);
    }
}
