//! ARMA model of a single window.
//!
//! [`HvArma`] takes ownership of a [`Window`], removes the mean of each
//! component, and then moves through `Centered -> Fitted -> CoherenceComputed`:
//!
//! - [`HvArma::solve_arma`] fits the coefficients (re-running it overwrites them);
//! - [`HvArma::transfer_function`] and [`HvArma::aic`] need a fitted model;
//! - [`HvArma::coherence`] is computed on first request and cached.

use crate::correlation::{
    auto_covariance, cross_covariance, horizontal, AutoCovariance, CrossCovariance,
};
use crate::equations::{compute_equations, solve_equations, ArmaCoefficients};
use crate::error::{HvarmaError, Result};
use crate::params::ModelParameters;
use crate::signal::Window;
use crate::spectrum;
use num_complex::Complex64;
use std::sync::OnceLock;

/// Lifecycle stage of an [`HvArma`] model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelState {
    Centered,
    Fitted,
    CoherenceComputed,
}

/// Per-window ARMA model.
#[derive(Debug)]
pub struct HvArma {
    z: Vec<f64>,
    n: Vec<f64>,
    e: Vec<f64>,
    means: [f64; 3],
    sampling_rate: f64,
    station: String,
    params: ModelParameters,
    coefficients: Option<ArmaCoefficients>,
    coherence: OnceLock<Vec<f64>>,
}

fn center(data: &mut [f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let mean = data.iter().sum::<f64>() / data.len() as f64;
    for v in data.iter_mut() {
        *v -= mean;
    }
    mean
}

impl HvArma {
    /// Take ownership of a window and center its components.
    pub fn new(window: Window, params: &ModelParameters) -> Result<Self> {
        if window.size() != params.window_size() {
            return Err(HvarmaError::Input(format!(
                "Window has {} samples but window_size is {}",
                window.size(),
                params.window_size()
            )));
        }
        let sampling_rate = window.sampling_rate();
        let station = window.station().to_string();
        let (mut z, mut n, mut e) = window.into_components();
        let means = [center(&mut z), center(&mut n), center(&mut e)];

        Ok(Self {
            z,
            n,
            e,
            means,
            sampling_rate,
            station,
            params: params.clone(),
            coefficients: None,
            coherence: OnceLock::new(),
        })
    }

    pub fn state(&self) -> ModelState {
        match (self.coefficients.is_some(), self.coherence.get().is_some()) {
            (true, true) => ModelState::CoherenceComputed,
            (true, false) => ModelState::Fitted,
            _ => ModelState::Centered,
        }
    }

    /// Means removed from `(z, n, e)` at construction.
    pub fn means(&self) -> [f64; 3] {
        self.means
    }

    pub fn station(&self) -> &str {
        &self.station
    }

    pub fn params(&self) -> &ModelParameters {
        &self.params
    }

    /// Centered `(z, n, e)` series.
    pub fn data(&self) -> (&[f64], &[f64], &[f64]) {
        (&self.z, &self.n, &self.e)
    }

    /// Fit the ARMA coefficients by solving the normal equations.
    pub fn solve_arma(&mut self) -> Result<&ArmaCoefficients> {
        let (mat, indep) = compute_equations(
            &self.z,
            &self.n,
            &self.e,
            self.params.mu(),
            self.params.nu(),
            self.params.window_size(),
            self.params.model_order(),
            self.params.maxtau(),
        );
        let coefs = solve_equations(mat, &indep, self.params.model_order())?;
        Ok(self.coefficients.insert(coefs))
    }

    pub fn coefficients(&self) -> Result<&ArmaCoefficients> {
        self.coefficients
            .as_ref()
            .ok_or_else(|| HvarmaError::Numeric("model has not been fitted".to_string()))
    }

    /// AR coefficients (`a[0] == 1`).
    pub fn a(&self) -> Result<&[f64]> {
        Ok(&self.coefficients()?.a)
    }

    /// Complex MA coefficients.
    pub fn b(&self) -> Result<&[Complex64]> {
        Ok(&self.coefficients()?.b)
    }

    /// Auto- and cross-covariances of the centered window over `0..maxtau`.
    pub fn correlations(&self) -> (AutoCovariance, CrossCovariance) {
        let size = self.params.window_size();
        let maxtau = self.params.maxtau();
        (
            auto_covariance(&self.z, &self.n, &self.e, size, maxtau),
            cross_covariance(&self.z, &self.n, &self.e, size, maxtau),
        )
    }

    /// `|H/V|` over the parameter frequency grid.
    pub fn transfer_function(&self) -> Result<Vec<f64>> {
        let coefs = self.coefficients()?;
        spectrum::transfer_function(
            self.params.neg_freq(),
            self.params.pos_freq(),
            self.params.freq_points(),
            1.0 / self.sampling_rate,
            &coefs.a,
            &coefs.b,
        )
    }

    /// Coherence over the parameter frequency grid, cached after the first call.
    pub fn coherence(&self) -> Result<&[f64]> {
        if let Some(cached) = self.coherence.get() {
            return Ok(cached);
        }
        let (auto, cross) = self.correlations();
        let computed = spectrum::coherence(
            &auto,
            &cross,
            self.params.nfir(),
            self.params.neg_freq(),
            self.params.pos_freq(),
            self.params.freq_points(),
            1.0 / self.sampling_rate,
        )?;
        Ok(self.coherence.get_or_init(|| computed))
    }

    /// Akaike information criterion `6 (p + 1) + n ln(SSR / n)`.
    ///
    /// The residual at sample `i` is `Σ_k a_k x[i-k] - b_k v[i-k]` over the
    /// `p + 1` most recent samples, for every `i >= p`.
    pub fn aic(&self) -> Result<f64> {
        let coefs = self.coefficients()?;
        let p = coefs.order();
        let size = self.z.len();
        let x = horizontal(&self.n, &self.e);

        let mut ssr = 0.0;
        // a[0] and b[0] pair with sample i itself, a[p] and b[p] with i - p.
        for i in p..size {
            let mut residual = Complex64::new(0.0, 0.0);
            for k in 0..=p {
                residual += x[i - k] * coefs.a[k] - coefs.b[k] * self.z[i - k];
            }
            ssr += residual.norm_sqr();
        }

        let n = size as f64;
        Ok(6.0 * (p + 1) as f64 + n * (ssr / n).ln())
    }
}
