//! Full H/V estimation run over a recording.

use crate::ensemble::EnsembleStatistics;
use crate::error::Result;
use crate::iter_maybe_parallel;
use crate::model::HvArma;
use crate::params::ModelParameters;
use crate::signal::{expected_window_count, windows, Signal, Window};
use crate::spectrum::check_frequency_range;
#[cfg(feature = "parallel")]
use rayon::iter::ParallelIterator;
use tracing::{debug, info};

/// Fit one ARMA model per window and aggregate the ensemble.
///
/// At most `max_windows` windows are taken from the start of the signal.
/// Windows are fitted in parallel when the `parallel` feature is on; the
/// first window that fails aborts the run with its error.
pub fn run_model(signal: &Signal, params: &ModelParameters) -> Result<EnsembleStatistics> {
    check_frequency_range(
        params.neg_freq(),
        params.pos_freq(),
        signal.sampling_interval(),
    )?;

    let batch: Vec<Window> = windows(signal, params.window_size(), params.overlap())?
        .take(params.max_windows())
        .collect();
    info!(
        station = signal.station(),
        order = params.model_order(),
        windows = batch.len(),
        available = expected_window_count(
            signal.size(),
            params.window_size(),
            params.overlap(),
            usize::MAX
        ),
        window_size = params.window_size(),
        "fitting H/V ARMA models"
    );

    let models: Vec<HvArma> = iter_maybe_parallel!(batch)
        .map(|window| {
            let mut model = HvArma::new(window, params)?;
            model.solve_arma()?;
            model.coherence()?;
            Ok(model)
        })
        .collect::<Result<Vec<_>>>()?;
    debug!(fitted = models.len(), "window batch fitted");

    let stats = EnsembleStatistics::from_models(&models, params)?;
    let peak = stats.peak_frequency(params.freq_conf());
    info!(
        order = params.model_order(),
        pos_freq = peak.pos_freq,
        pos_err = peak.pos_err,
        neg_freq = peak.neg_freq,
        neg_err = peak.neg_err,
        "run finished"
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HvarmaError;
    use crate::simulation::{resonant_noise, ResonanceSpec};

    fn params() -> ModelParameters {
        ModelParameters::builder()
            .model_order(8)
            .maxtau(32)
            .nfir(12)
            .window_size(256)
            .overlap(128)
            .max_windows(6)
            .freq_points(201)
            .build()
            .unwrap()
    }

    #[test]
    fn test_window_cap_is_respected() {
        let signal = resonant_noise(&ResonanceSpec::default(), 4096, Some(5)).unwrap();
        let stats = run_model(&signal, &params()).unwrap();
        assert_eq!(stats.num_windows(), 6);
        assert_eq!(stats.aic().len(), 6);
        assert_eq!(stats.spectra().ncols(), 201);
        assert_eq!(stats.station(), "SYN");
    }

    #[test]
    fn test_resonance_is_found() {
        let signal = resonant_noise(&ResonanceSpec::default(), 8192, Some(11)).unwrap();
        let p = params().update([("max_windows", "40")]).unwrap();
        let stats = run_model(&signal, &p).unwrap();
        let peak = stats.peak_frequency(20.0);
        assert!((peak.pos_freq - 5.0).abs() < 1.0, "pos peak {}", peak.pos_freq);
        assert!((peak.neg_freq + 5.0).abs() < 1.0, "neg peak {}", peak.neg_freq);
    }

    #[test]
    fn test_short_signal_is_rejected() {
        let signal = resonant_noise(&ResonanceSpec::default(), 100, Some(1)).unwrap();
        assert!(matches!(
            run_model(&signal, &params()),
            Err(HvarmaError::Input(_))
        ));
    }

    #[test]
    fn test_range_beyond_nyquist_is_rejected() {
        let spec = ResonanceSpec {
            sampling_rate: 20.0,
            resonance: 2.0,
            ..ResonanceSpec::default()
        };
        let signal = resonant_noise(&spec, 2048, Some(1)).unwrap();
        assert!(matches!(
            run_model(&signal, &params()),
            Err(HvarmaError::Domain(_))
        ));
    }

    #[test]
    fn test_silent_signal_reports_numeric_error() {
        let zeros = vec![0.0; 1024];
        let signal = Signal::new(zeros.clone(), zeros.clone(), zeros, 100.0, "ZERO").unwrap();
        assert!(matches!(
            run_model(&signal, &params()),
            Err(HvarmaError::Numeric(_))
        ));
    }
}
