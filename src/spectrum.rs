//! Frequency-domain evaluation of fitted models.
//!
//! Both the H/V transfer function and the coherence are evaluated on a
//! linearly spaced grid `[f0, f1]` that may extend to negative frequencies:
//! the horizontal series is complex, so its spectrum is not symmetric.

use crate::correlation::{AutoCovariance, CrossCovariance};
use crate::error::{HvarmaError, Result};
use nalgebra::{DMatrix, DVector};
use num_complex::Complex64;
use std::f64::consts::PI;

/// `npun` evenly spaced points from `start` to `stop` inclusive.
///
/// Point `i` is `start + i * step` and the last point is exactly `stop`.
pub fn linspace(start: f64, stop: f64, npun: usize) -> Vec<f64> {
    match npun {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (npun - 1) as f64;
            let mut grid: Vec<f64> = (0..npun).map(|i| start + i as f64 * step).collect();
            grid[npun - 1] = stop;
            grid
        }
    }
}

/// Check `f0 <= f1` and that both lie within the Nyquist frequency `1 / (2t)`.
pub fn check_frequency_range(f0: f64, f1: f64, t: f64) -> Result<()> {
    let nyquist = 1.0 / (2.0 * t);
    if f1 < f0 || nyquist < f0.abs().max(f1.abs()) {
        return Err(HvarmaError::Domain(format!(
            "Wrong frequencies [{}, {}] for Nyquist frequency {}",
            f0, f1, nyquist
        )));
    }
    Ok(())
}

/// Powers `z^0 .. z^(len-1)`.
fn powers(z: Complex64, len: usize) -> Vec<Complex64> {
    let mut out = Vec::with_capacity(len);
    let mut acc = Complex64::new(1.0, 0.0);
    for _ in 0..len {
        out.push(acc);
        acc *= z;
    }
    out
}

/// Amplitude `|H/V|` of the fitted model over `npun` frequencies in `[f0, f1]`.
///
/// With `z = exp(-i 2π f t)`, `H = Σ b_k z^k` and `V = Σ a_k z^k`. `t` is the
/// sample interval in seconds.
pub fn transfer_function(
    f0: f64,
    f1: f64,
    npun: usize,
    t: f64,
    a: &[f64],
    b: &[Complex64],
) -> Result<Vec<f64>> {
    check_frequency_range(f0, f1, t)?;
    let len = a.len().min(b.len());

    Ok(linspace(f0, f1, npun)
        .into_iter()
        .map(|f| {
            let z = Complex64::from_polar(1.0, -2.0 * PI * f * t);
            let mut h = Complex64::new(0.0, 0.0);
            let mut v = Complex64::new(0.0, 0.0);
            for (k, zk) in powers(z, len).into_iter().enumerate() {
                h += b[k] * zk;
                v += zk * a[k];
            }
            (h / v).norm()
        })
        .collect())
}

/// Toeplitz matrix with first column `col` and first row `row` (`row[0]` is ignored).
fn toeplitz(col: &[Complex64], row: &[Complex64]) -> DMatrix<Complex64> {
    let n = col.len();
    DMatrix::from_fn(n, n, |i, j| if i >= j { col[i - j] } else { row[j - i] })
}

fn invert(mat: DMatrix<Complex64>, what: &str) -> Result<DMatrix<Complex64>> {
    let inv = mat
        .try_inverse()
        .ok_or_else(|| HvarmaError::singular(what))?;
    if inv.iter().any(|v| !v.re.is_finite() || !v.im.is_finite()) {
        return Err(HvarmaError::singular(what));
    }
    Ok(inv)
}

/// Hermitian quadratic form `s^H A s`.
#[inline]
fn quadz(mat: &DMatrix<Complex64>, s: &DVector<Complex64>) -> Complex64 {
    s.dotc(&(mat * s))
}

/// Coherence between the horizontal and vertical series over `[f0, f1]`.
///
/// Uses the first `nfir` lags of each covariance sequence to build the
/// Toeplitz covariance matrices of the horizontal series, the vertical
/// series and their cross term, and combines quadratic forms of their
/// inverses along the steering vector `z^k`, `z = exp(+i 2π f t)`.
pub fn coherence(
    auto: &AutoCovariance,
    cross: &CrossCovariance,
    nfir: usize,
    f0: f64,
    f1: f64,
    npun: usize,
    t: f64,
) -> Result<Vec<f64>> {
    check_frequency_range(f0, f1, t)?;
    let available = auto.x.len().min(auto.v.len()).min(cross.v_x.len()).min(cross.x_v.len());
    if nfir == 0 || nfir > available {
        return Err(HvarmaError::Input(format!(
            "nfir ({}) must lie in 1..={} covariance lags",
            nfir, available
        )));
    }

    let acx = &auto.x[..nfir];
    let acx_conj: Vec<Complex64> = acx.iter().map(|c| c.conj()).collect();
    let acv: Vec<Complex64> = auto.v[..nfir].iter().map(|&v| Complex64::new(v, 0.0)).collect();

    let zc1 = toeplitz(acx, &acx_conj);
    let zc2 = toeplitz(&acv, &acv);
    let zc12 = toeplitz(&cross.x_v[..nfir], &cross.v_x[..nfir]);
    let zsum = &zc1 + &zc2;

    let zisum = invert(zsum, "coherence Zc1 + Zc2")?;
    let zic1 = invert(zc1, "coherence Zc1")?;
    let zic2 = invert(zc2, "coherence Zc2")?;

    let z2isum = &zisum * &zisum;
    let znum12 = &zisum * &zc12 * &zisum;
    let z2ic1 = &zic1 * &zic1;
    let z2ic2 = &zic2 * &zic2;

    Ok(linspace(f0, f1, npun)
        .into_iter()
        .map(|f| {
            let z = Complex64::from_polar(1.0, 2.0 * PI * f * t);
            let steering = DVector::from_vec(powers(z, nfir));
            let q1 = quadz(&zic1, &steering);
            let q2 = quadz(&zic2, &steering);
            let q12 = quadz(&znum12, &steering);
            let q11 = quadz(&z2ic1, &steering);
            let q22 = quadz(&z2ic2, &steering);
            let qden = quadz(&z2isum, &steering);
            ((q12 / qden).norm_sqr() / ((q1 / q11).re * (q2 / q22).re)).sqrt()
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correlation::{auto_covariance, cross_covariance};
    use rand::prelude::*;
    use rand_distr::StandardNormal;

    #[test]
    fn test_linspace_endpoints() {
        let grid = linspace(-20.0, 20.0, 1024);
        assert_eq!(grid.len(), 1024);
        assert_eq!(grid[0], -20.0);
        assert_eq!(grid[1023], 20.0);
        assert!((grid[1] - (-19.960_899_32)).abs() < 1e-8);
        assert_eq!(linspace(3.0, 4.0, 1), vec![3.0]);
    }

    #[test]
    fn test_frequency_range_checks() {
        assert!(check_frequency_range(-20.0, 20.0, 0.01).is_ok());
        assert!(check_frequency_range(-50.0, 50.0, 0.01).is_ok());
        assert!(matches!(
            check_frequency_range(-51.0, 20.0, 0.01),
            Err(HvarmaError::Domain(_))
        ));
        assert!(matches!(
            check_frequency_range(10.0, -10.0, 0.01),
            Err(HvarmaError::Domain(_))
        ));
    }

    #[test]
    fn test_identity_model_is_flat() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![Complex64::new(2.0, 0.0), Complex64::new(0.0, 0.0), Complex64::new(0.0, 0.0)];
        let tf = transfer_function(-10.0, 10.0, 21, 0.01, &a, &b).unwrap();
        assert!(tf.iter().all(|&v| (v - 2.0).abs() < 1e-12));
    }

    #[test]
    fn test_resonator_peaks_at_pole_frequency() {
        // a(z) = 1 - 2 r cos(w0) z + r^2 z^2, a pole pair at ±5 Hz for fs = 100 Hz
        let t = 0.01;
        let w0 = 2.0 * PI * 5.0 * t;
        let r = 0.95;
        let a = vec![1.0, -2.0 * r * w0.cos(), r * r];
        let b = vec![Complex64::new(1.0, 0.0), Complex64::new(0.0, 0.0), Complex64::new(0.0, 0.0)];
        let freqs = linspace(-20.0, 20.0, 401);
        let tf = transfer_function(-20.0, 20.0, 401, t, &a, &b).unwrap();

        let pos = (0..401)
            .filter(|&i| freqs[i] > 0.0)
            .max_by(|&i, &j| tf[i].partial_cmp(&tf[j]).unwrap())
            .unwrap();
        assert!((freqs[pos] - 5.0).abs() < 0.3, "peak at {}", freqs[pos]);
        // real coefficients give a symmetric amplitude
        for i in 0..401 {
            assert!((tf[i] - tf[400 - i]).abs() < 1e-9);
        }
    }

    #[test]
    fn test_transfer_function_rejects_beyond_nyquist() {
        let a = vec![1.0];
        let b = vec![Complex64::new(1.0, 0.0)];
        assert!(transfer_function(-60.0, 60.0, 10, 0.01, &a, &b).is_err());
    }

    #[test]
    fn test_toeplitz_layout() {
        let col: Vec<Complex64> = (0..3).map(|k| Complex64::new(k as f64, 0.0)).collect();
        let row: Vec<Complex64> = (0..3).map(|k| Complex64::new(0.0, k as f64)).collect();
        let m = toeplitz(&col, &row);
        assert_eq!(m[(2, 0)], Complex64::new(2.0, 0.0));
        assert_eq!(m[(0, 2)], Complex64::new(0.0, 2.0));
        assert_eq!(m[(1, 1)], Complex64::new(0.0, 0.0));
    }

    #[test]
    fn test_coherence_lies_in_unit_interval() {
        let mut rng = StdRng::seed_from_u64(21);
        let len = 1024;
        let z: Vec<f64> = (0..len).map(|_| rng.sample::<f64, _>(StandardNormal)).collect();
        let n: Vec<f64> = (0..len)
            .map(|i| 0.8 * z[i] + 0.3 * rng.sample::<f64, _>(StandardNormal))
            .collect();
        let e: Vec<f64> = (0..len).map(|_| rng.sample::<f64, _>(StandardNormal)).collect();
        let auto = auto_covariance(&z, &n, &e, len, 16);
        let cross = cross_covariance(&z, &n, &e, len, 16);

        let coh = coherence(&auto, &cross, 8, -20.0, 20.0, 64, 0.01).unwrap();
        assert_eq!(coh.len(), 64);
        assert!(coh.iter().all(|c| c.is_finite() && *c >= 0.0 && *c <= 1.0));
    }

    #[test]
    fn test_single_lag_coherence_is_normalized_cross_covariance() {
        // with nfir = 1 every quadratic form is a scalar and the coherence
        // reduces to |C_xv(0)| / sqrt(C_x(0) C_v(0)) at every frequency
        let z = vec![1.0, -2.0, 0.5, 1.5, -1.0];
        let n = vec![0.5, -1.0, 1.0, 0.2, -0.7];
        let e = vec![0.3, 0.1, -0.4, 0.6, -0.2];
        let auto = auto_covariance(&z, &n, &e, 5, 2);
        let cross = cross_covariance(&z, &n, &e, 5, 2);

        let mut sxv = Complex64::new(0.0, 0.0);
        let (mut sxx, mut svv) = (0.0, 0.0);
        for t in 0..5 {
            let x = Complex64::new(n[t], e[t]);
            sxv += x * z[t];
            sxx += x.norm_sqr();
            svv += z[t] * z[t];
        }
        let expected = sxv.norm() / (sxx * svv).sqrt();

        let coh = coherence(&auto, &cross, 1, -20.0, 20.0, 9, 0.01).unwrap();
        assert_eq!(coh.len(), 9);
        for c in coh {
            assert!((c - expected).abs() < 1e-12, "{} vs {}", c, expected);
        }
    }

    #[test]
    fn test_coherence_rejects_oversized_nfir() {
        let z = vec![1.0, -1.0, 0.5, 0.25];
        let auto = auto_covariance(&z, &z, &z, 4, 2);
        let cross = cross_covariance(&z, &z, &z, 4, 2);
        assert!(coherence(&auto, &cross, 3, -1.0, 1.0, 4, 0.1).is_err());
    }

    #[test]
    fn test_coherence_singular_matrix() {
        let zeros = vec![0.0; 32];
        let auto = auto_covariance(&zeros, &zeros, &zeros, 32, 8);
        let cross = cross_covariance(&zeros, &zeros, &zeros, 32, 8);
        let err = coherence(&auto, &cross, 4, -1.0, 1.0, 4, 0.1).unwrap_err();
        assert!(matches!(err, HvarmaError::Numeric(_)));
    }
}
