//! Ensemble statistics over all windows of one run.
//!
//! Every fitted window contributes one H/V curve, one coherence curve and
//! one AIC value. The curves are stacked into `windows x frequencies`
//! [`FdMatrix`] values and summarized column-wise by percentiles; the
//! resonance peak and its uncertainty are read off those percentile curves.

use crate::error::{HvarmaError, Result};
use crate::helpers::{argmax, percentile_curve};
use crate::iter_maybe_parallel;
use crate::matrix::FdMatrix;
use crate::model::HvArma;
use crate::params::ModelParameters;
use crate::spectrum::linspace;
#[cfg(feature = "parallel")]
use rayon::iter::ParallelIterator;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;

/// Resonance peak estimate on each side of the frequency axis.
///
/// A half that is absent from the grid reports `0.0` for both values.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PeakFrequency {
    pub pos_freq: f64,
    pub pos_err: f64,
    pub neg_freq: f64,
    pub neg_err: f64,
}

/// Stacked per-window results and the statistics derived from them.
#[derive(Debug)]
pub struct EnsembleStatistics {
    spectra: FdMatrix,
    coherence: FdMatrix,
    aic: Vec<f64>,
    frequencies: Vec<f64>,
    params: ModelParameters,
    station: String,
    peaks: Mutex<HashMap<u64, PeakFrequency>>,
}

impl EnsembleStatistics {
    /// Evaluate every fitted model and stack the results.
    ///
    /// Coherence is computed (or read from the model's cache) for each
    /// window. Fails on an empty ensemble and propagates the first error of
    /// any window.
    pub fn from_models(models: &[HvArma], params: &ModelParameters) -> Result<Self> {
        let station = match models.first() {
            Some(m) => m.station().to_string(),
            None => {
                return Err(HvarmaError::Input(
                    "Cannot aggregate an empty set of models".to_string(),
                ))
            }
        };

        let rows: Vec<(Vec<f64>, Vec<f64>, f64)> = iter_maybe_parallel!(0..models.len())
            .map(|i| {
                let model = &models[i];
                let spectrum = model.transfer_function()?;
                let coherence = model.coherence()?.to_vec();
                let aic = model.aic()?;
                Ok((spectrum, coherence, aic))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut spectra = Vec::with_capacity(rows.len());
        let mut coherence = Vec::with_capacity(rows.len());
        let mut aic = Vec::with_capacity(rows.len());
        for (s, c, a) in rows {
            spectra.push(s);
            coherence.push(c);
            aic.push(a);
        }

        let spectra = FdMatrix::from_rows(&spectra)
            .ok_or_else(|| HvarmaError::Input("Spectra differ in length".to_string()))?;
        let coherence = FdMatrix::from_rows(&coherence)
            .ok_or_else(|| HvarmaError::Input("Coherence curves differ in length".to_string()))?;
        Self::from_curves(spectra, coherence, aic, params, station)
    }

    /// Build from precomputed curves (rows = windows, columns = frequencies).
    pub fn from_curves(
        spectra: FdMatrix,
        coherence: FdMatrix,
        aic: Vec<f64>,
        params: &ModelParameters,
        station: impl Into<String>,
    ) -> Result<Self> {
        if spectra.nrows() == 0 {
            return Err(HvarmaError::Input(
                "Cannot aggregate an empty set of models".to_string(),
            ));
        }
        if spectra.shape() != coherence.shape() || aic.len() != spectra.nrows() {
            return Err(HvarmaError::Input(format!(
                "Inconsistent ensemble: spectra {}, coherence {}, {} AIC values",
                spectra,
                coherence,
                aic.len()
            )));
        }
        if spectra.ncols() != params.freq_points() {
            return Err(HvarmaError::Input(format!(
                "Curves have {} points but freq_points is {}",
                spectra.ncols(),
                params.freq_points()
            )));
        }

        Ok(Self {
            frequencies: linspace(params.neg_freq(), params.pos_freq(), params.freq_points()),
            spectra,
            coherence,
            aic,
            params: params.clone(),
            station: station.into(),
            peaks: Mutex::new(HashMap::new()),
        })
    }

    /// Frequency grid shared by every curve.
    pub fn frequencies(&self) -> &[f64] {
        &self.frequencies
    }

    pub fn spectra(&self) -> &FdMatrix {
        &self.spectra
    }

    pub fn coherence(&self) -> &FdMatrix {
        &self.coherence
    }

    /// Column-wise `q`-th percentile of the H/V curves.
    pub fn spectrum_percentile(&self, q: f64) -> Vec<f64> {
        percentile_curve(&self.spectra, q)
    }

    /// Column-wise `q`-th percentile of the coherence curves.
    pub fn coherence_percentile(&self, q: f64) -> Vec<f64> {
        percentile_curve(&self.coherence, q)
    }

    /// AIC of each window, in window order.
    pub fn aic(&self) -> &[f64] {
        &self.aic
    }

    pub fn num_windows(&self) -> usize {
        self.spectra.nrows()
    }

    pub fn station(&self) -> &str {
        &self.station
    }

    pub fn params(&self) -> &ModelParameters {
        &self.params
    }

    /// Peak frequency and error on each half of the axis at `confidence` percent.
    ///
    /// The point estimate is the argmax of the median curve; the error is the
    /// larger distance to the argmax of the `confidence / 2` and
    /// `100 - confidence / 2` percentile curves. Results are cached per
    /// confidence value.
    pub fn peak_frequency(&self, confidence: f64) -> PeakFrequency {
        let key = confidence.to_bits();
        if let Some(peak) = self.lock_peaks().get(&key) {
            return *peak;
        }

        let median = self.spectrum_percentile(50.0);
        let lower = self.spectrum_percentile(confidence / 2.0);
        let upper = self.spectrum_percentile(100.0 - confidence / 2.0);

        let mut peak = PeakFrequency::default();
        if self.params.pos_freq() > 0.0 {
            let half: Vec<usize> = (0..self.frequencies.len())
                .filter(|&i| self.frequencies[i] > 0.0)
                .collect();
            (peak.pos_freq, peak.pos_err) = self.half_peak(&half, &median, &lower, &upper);
        }
        if self.params.neg_freq() < 0.0 {
            let half: Vec<usize> = (0..self.frequencies.len())
                .filter(|&i| self.frequencies[i] < 0.0)
                .collect();
            (peak.neg_freq, peak.neg_err) = self.half_peak(&half, &median, &lower, &upper);
        }

        self.lock_peaks().insert(key, peak);
        peak
    }

    fn lock_peaks(&self) -> std::sync::MutexGuard<'_, HashMap<u64, PeakFrequency>> {
        self.peaks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn half_peak(&self, half: &[usize], median: &[f64], lower: &[f64], upper: &[f64]) -> (f64, f64) {
        let pick = |curve: &[f64]| -> Option<f64> {
            let values: Vec<f64> = half.iter().map(|&i| curve[i]).collect();
            argmax(&values).map(|k| self.frequencies[half[k]])
        };
        match (pick(median), pick(lower), pick(upper)) {
            (Some(point), Some(low), Some(up)) => {
                (point, (up - point).abs().max((point - low).abs()))
            }
            _ => (0.0, 0.0),
        }
    }
}
