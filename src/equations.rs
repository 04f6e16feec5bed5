//! Normal equations of the weighted ARMA prediction-error fit.
//!
//! The fit minimizes, over the AR coefficients `a` (with `a_0 = 1`) and the
//! complex MA coefficients `b`, the sum over lags of a forward residual
//! weighted by `mu` and a backward residual weighted by `nu`:
//!
//! ```text
//! e_f(L) = Σ_k a_k C_xv(L-k) - Σ_k b_k C_vv(L-k)
//! e_b(L) = Σ_k a_k C_xx(L-k) - Σ_k b_k C_xv(L-k)
//! ```
//!
//! Setting the gradient to zero gives a real linear system in the unknowns
//! `[a_1..a_p, Re b_0..Re b_p, Im b_0..Im b_p]` of size `3p + 2`.

use crate::correlation::TwoSidedCovariances;
use crate::error::{HvarmaError, Result};
use crate::params::Weight;
use nalgebra::{DMatrix, DVector};
use num_complex::Complex64;

/// Fitted AR and MA coefficient vectors, both of length `p + 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct ArmaCoefficients {
    /// AR coefficients; `a[0] == 1.0` always.
    pub a: Vec<f64>,
    /// Complex MA coefficients.
    pub b: Vec<Complex64>,
}

impl ArmaCoefficients {
    /// Model order `p`.
    pub fn order(&self) -> usize {
        self.a.len() - 1
    }
}

/// Assemble the `(3p+2) x (3p+2)` system `M y = r` for one window.
///
/// `wsize` is the covariance normalization length; `Auto` weights resolve to
/// the inverse lag-0 variance of the vertical (`mu`) and horizontal (`nu`)
/// series.
pub fn compute_equations(
    z: &[f64],
    n: &[f64],
    e: &[f64],
    mu: Weight,
    nu: Weight,
    wsize: usize,
    p: usize,
    maxtau: usize,
) -> (DMatrix<f64>, DVector<f64>) {
    let cov = TwoSidedCovariances::compute(z, n, e, wsize, maxtau);
    let mu = mu.resolve(cov.vertical_variance());
    let nu = nu.resolve(cov.horizontal_variance());
    assemble(&cov, mu, nu, p)
}

/// Gradient matrix over all `3p + 3` unknowns with the `a_0` row and column removed.
fn assemble(cov: &TwoSidedCovariances, mu: f64, nu: f64, p: usize) -> (DMatrix<f64>, DVector<f64>) {
    let (xx, vv, xv) = (&cov.xx, &cov.vv, &cov.xv);
    let last = 2 * cov.maxtau;
    let full = 3 * p + 3;

    let mut mat = DMatrix::<f64>::zeros(full, full);
    let mut indep = DVector::<f64>::zeros(full);

    for i in 0..=p {
        let (ia, ib1, ib2) = (i, p + i + 1, 2 * p + i + 2);
        for j in 0..=p {
            let (ja, jb1, jb2) = (j, p + j + 1, 2 * p + j + 2);

            for tau in p..=last {
                let (ti, tj) = (tau - i, tau - j);
                let xv_xv = xv[ti] * xv[tj].conj();

                if ia != 0 {
                    if ja != 0 {
                        mat[(ia, ja)] +=
                            2.0 * (mu * xv_xv.re + nu * (xx[ti] * xx[tj].conj()).re);
                    }
                    let xx_xv = xx[ti] * xv[tj].conj();
                    mat[(ia, jb1)] += -2.0 * (mu * xv[ti].re * vv[tj] + nu * xx_xv.re);
                    mat[(ia, jb2)] += -2.0 * (mu * xv[ti].im * vv[tj] + nu * xx_xv.im);
                }

                if ja != 0 {
                    let xv_xx = xv[ti] * xx[tj].conj();
                    mat[(ib1, ja)] += -2.0 * (mu * vv[ti] * xv[tj].re + nu * xv_xx.re);
                    mat[(ib2, ja)] += -2.0 * (mu * vv[ti] * xv[tj].im + nu * xv_xx.im);
                }

                let diag = 2.0 * (mu * vv[ti] * vv[tj] + nu * xv_xv.re);
                let cross = -2.0 * nu * xv_xv.im;
                mat[(ib1, jb1)] += diag;
                mat[(ib1, jb2)] += cross;
                mat[(ib2, jb1)] += cross;
                mat[(ib2, jb2)] += diag;
            }
        }

        for tau in p..=last {
            let ti = tau - i;
            if ia != 0 {
                indep[ia] += -2.0
                    * (mu * (xv[ti] * xv[tau].conj()).re + nu * (xx[ti] * xx[tau].conj()).re);
            }
            let xv_xx = xv[ti] * xx[tau].conj();
            indep[ib1] += 2.0 * (mu * vv[ti] * xv[tau].re + nu * xv_xx.re);
            indep[ib2] += 2.0 * (mu * vv[ti] * xv[tau].im + nu * xv_xx.im);
        }
    }

    let size = full - 1;
    let reduced = mat.view((1, 1), (size, size)).into_owned();
    let rhs = indep.rows(1, size).into_owned();
    (reduced, rhs)
}

/// Solve `M y = r` by LU and split `y` into coefficient vectors of order `p`.
pub fn solve_equations(
    mat: DMatrix<f64>,
    indep: &DVector<f64>,
    p: usize,
) -> Result<ArmaCoefficients> {
    let size = 3 * p + 2;
    if mat.shape() != (size, size) || indep.len() != size {
        return Err(HvarmaError::Numeric(format!(
            "normal equations of order {} must be {}x{}, got {}x{}",
            p,
            size,
            size,
            mat.nrows(),
            mat.ncols()
        )));
    }

    let solution = mat
        .lu()
        .solve(indep)
        .ok_or_else(|| HvarmaError::singular("ARMA normal equations"))?;
    if solution.iter().any(|v| !v.is_finite()) {
        return Err(HvarmaError::singular("ARMA normal equations"));
    }

    let mut a = Vec::with_capacity(p + 1);
    a.push(1.0);
    a.extend(solution.iter().take(p).copied());
    let b = (0..=p)
        .map(|k| Complex64::new(solution[p + k], solution[2 * p + 1 + k]))
        .collect();

    Ok(ArmaCoefficients { a, b })
}

/// Fit ARMA coefficients of order `p` to one centered window.
pub fn fit_arma(
    z: &[f64],
    n: &[f64],
    e: &[f64],
    mu: Weight,
    nu: Weight,
    p: usize,
    maxtau: usize,
) -> Result<ArmaCoefficients> {
    let (mat, indep) = compute_equations(z, n, e, mu, nu, z.len(), p, maxtau);
    solve_equations(mat, &indep, p)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::prelude::*;
    use rand_distr::StandardNormal;

    fn white_noise(len: usize, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..len).map(|_| rng.sample::<f64, _>(StandardNormal)).collect()
    }

    #[test]
    fn test_system_dimensions() {
        let z = white_noise(64, 1);
        let n = white_noise(64, 2);
        let e = white_noise(64, 3);
        let (mat, indep) = compute_equations(&z, &n, &e, Weight::Fixed(0.5), Weight::Auto, 64, 3, 8);
        assert_eq!(mat.shape(), (11, 11));
        assert_eq!(indep.len(), 11);
        assert!(mat.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_auto_weights_use_inverse_variance() {
        let z = white_noise(128, 4);
        let n = white_noise(128, 5);
        let e = white_noise(128, 6);
        let cov = TwoSidedCovariances::compute(&z, &n, &e, 128, 16);
        let mu = 1.0 / cov.vertical_variance();
        let nu = 1.0 / cov.horizontal_variance();

        let (auto_mat, auto_rhs) =
            compute_equations(&z, &n, &e, Weight::Auto, Weight::Auto, 128, 4, 16);
        let (fixed_mat, fixed_rhs) =
            compute_equations(&z, &n, &e, Weight::Fixed(mu), Weight::Fixed(nu), 128, 4, 16);
        assert_eq!(auto_mat, fixed_mat);
        assert_eq!(auto_rhs, fixed_rhs);
    }

    #[test]
    fn test_leading_coefficient_is_one() {
        let z = white_noise(256, 7);
        let n = white_noise(256, 8);
        let e = white_noise(256, 9);
        for p in [0, 1, 5, 12] {
            let coefs = fit_arma(&z, &n, &e, Weight::Auto, Weight::Auto, p, 32).unwrap();
            assert_eq!(coefs.a[0], 1.0);
            assert_eq!(coefs.a.len(), p + 1);
            assert_eq!(coefs.b.len(), p + 1);
            assert_eq!(coefs.order(), p);
        }
    }

    #[test]
    fn test_recovers_moving_average_relation() {
        // x[t] = v[t] + 0.5 v[t-1] with a real horizontal series
        let len = 8192;
        let v = white_noise(len + 1, 11);
        let z: Vec<f64> = v[1..].to_vec();
        let n: Vec<f64> = (1..=len).map(|t| v[t] + 0.5 * v[t - 1]).collect();
        let e = vec![0.0; len];

        let coefs = fit_arma(&z, &n, &e, Weight::Fixed(1.0), Weight::Fixed(1e-9), 1, 16).unwrap();
        assert!(coefs.a[1].abs() < 0.05, "a1 = {}", coefs.a[1]);
        assert!((coefs.b[0].re - 1.0).abs() < 0.05, "b0 = {}", coefs.b[0]);
        assert!((coefs.b[1].re - 0.5).abs() < 0.05, "b1 = {}", coefs.b[1]);
        assert!(coefs.b[0].im.abs() < 0.05);
    }

    #[test]
    fn test_singular_system_is_reported() {
        let zeros = vec![0.0; 64];
        let err = fit_arma(&zeros, &zeros, &zeros, Weight::Fixed(0.5), Weight::Fixed(0.5), 2, 8)
            .unwrap_err();
        assert!(matches!(err, HvarmaError::Numeric(ref m) if m.contains("singular")));
    }

    #[test]
    fn test_dimension_mismatch_is_reported() {
        let mat = DMatrix::<f64>::identity(4, 4);
        let indep = DVector::<f64>::zeros(4);
        assert!(solve_equations(mat, &indep, 1).is_err());
    }
}
