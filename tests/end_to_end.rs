//! End-to-end runs of the H/V pipeline.
//!
//! The synthetic tests use a recording with a known resonance. The B001
//! reference tests need the field recording `B001_{Z,N,E}.sac` in the
//! directory named by `HVARMA_DATA_DIR` and are ignored by default:
//!
//! Run: HVARMA_DATA_DIR=/path/to/data cargo test --release --test end_to_end -- --ignored

use hvarma::order_search::find_optimal_order;
use hvarma::report::{write_order_search, write_run, RESULTS_HEADER};
use hvarma::simulation::{resonant_noise, ResonanceSpec};
use hvarma::{run_model, HvarmaError, ModelParameters, Signal};
use std::path::PathBuf;

fn synthetic_params() -> ModelParameters {
    ModelParameters::builder()
        .model_order(10)
        .maxtau(48)
        .nfir(16)
        .window_size(256)
        .overlap(128)
        .max_windows(30)
        .freq_points(256)
        .build()
        .unwrap()
}

#[test]
fn test_synthetic_run_locates_resonance() {
    let spec = ResonanceSpec::default();
    let signal = resonant_noise(&spec, 6000, Some(2024)).unwrap();
    let stats = run_model(&signal, &synthetic_params()).unwrap();

    assert_eq!(stats.num_windows(), 30);
    let peak = stats.peak_frequency(20.0);
    assert!((peak.pos_freq - spec.resonance).abs() < 1.0, "{:?}", peak);
    assert!((peak.neg_freq + spec.resonance).abs() < 1.0, "{:?}", peak);
    assert!(peak.pos_err >= 0.0 && peak.neg_err >= 0.0);

    let coherence = stats.coherence_percentile(50.0);
    assert!(coherence.iter().all(|c| c.is_finite()));
}

#[test]
fn test_synthetic_run_writes_table() {
    let dir = tempfile::tempdir().unwrap();
    let params = synthetic_params()
        .update([
            ("max_windows", "5"),
            ("output_dir", dir.path().to_str().unwrap()),
        ])
        .unwrap();
    let signal = resonant_noise(&ResonanceSpec::default(), 2048, Some(7)).unwrap();
    let stats = run_model(&signal, &params).unwrap();

    let path = write_run(&stats).unwrap();
    assert_eq!(path, dir.path().join("SYN_p10_win5.txt"));
    let text = std::fs::read_to_string(path).unwrap();
    assert_eq!(text.lines().next(), Some(RESULTS_HEADER));
    assert_eq!(text.lines().count(), 1 + params.freq_points());
}

#[test]
fn test_synthetic_order_search() {
    let params = synthetic_params()
        .update([("max_windows", "12"), ("freq_points", "401")])
        .unwrap();
    let signal = resonant_noise(&ResonanceSpec::default(), 4096, Some(99)).unwrap();
    let result = find_optimal_order(&signal, &params, 0.5, 4).unwrap();

    assert!(result.final_order >= 3 && result.final_order <= params.maxtau());
    assert!(result.order_results.contains_key(&result.final_order));
    assert_eq!(result.station, "SYN");
    if result.success {
        let prev = &result.order_results[&(result.final_order - 3)];
        let now = result.statistics.peak_frequency(20.0);
        let before = prev.peak_frequency(20.0);
        assert!((now.pos_freq - before.pos_freq).abs() + (now.neg_freq - before.neg_freq).abs() < 1.0);
    }

    let dir = tempfile::tempdir().unwrap();
    let (freq, diff) = write_order_search(dir.path(), &result).unwrap();
    assert!(freq.exists() && diff.exists());
}

#[test]
fn test_parameter_file_drives_run() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("args.txt");
    std::fs::write(
        &path,
        "model_order=6\nmaxtau=24\nnfir=8\n\nwindow_size=128\noverlap=64\nmax_windows=4\nfreq_points=64\n",
    )
    .unwrap();
    let params = ModelParameters::from_file(&path).unwrap();
    let signal = resonant_noise(&ResonanceSpec::default(), 1024, Some(3)).unwrap();
    let stats = run_model(&signal, &params).unwrap();
    assert_eq!(stats.num_windows(), 4);
    assert_eq!(stats.frequencies().len(), 64);
}

#[test]
fn test_unknown_parameter_is_rejected() {
    let err = ModelParameters::from_pairs([("arma_order", "10")]).unwrap_err();
    assert!(matches!(err, HvarmaError::Configuration(_)));
}

// ─── B001 reference recording ───────────────────────────────────────────────

fn b001() -> Signal {
    let dir = PathBuf::from(
        std::env::var("HVARMA_DATA_DIR").expect("HVARMA_DATA_DIR must point at the B001 data"),
    );
    Signal::from_sac(
        dir.join("B001_Z.sac"),
        dir.join("B001_N.sac"),
        dir.join("B001_E.sac"),
    )
    .unwrap()
}

#[test]
#[ignore = "needs the B001 recording in HVARMA_DATA_DIR"]
fn test_b001_reference_run() {
    let signal = b001();
    assert_eq!(signal.size(), 1_886_784);
    let params = ModelParameters::builder()
        .model_order(74)
        .window_size(512)
        .overlap(256)
        .max_windows(100)
        .build()
        .unwrap();
    let stats = run_model(&signal, &params).unwrap();
    assert_eq!(stats.num_windows(), 100);

    let peak = stats.peak_frequency(20.0);
    assert!((peak.pos_freq - 3.3431085043988276).abs() < 1e-6);
    assert!((peak.pos_err - 0.8993157380254146).abs() < 1e-6);
    assert!((peak.neg_freq + 3.3431085043988276).abs() < 1e-6);
    assert!((peak.neg_err - 16.53958944281525).abs() < 1e-6);
}

#[test]
#[ignore = "needs the B001 recording in HVARMA_DATA_DIR"]
fn test_b001_order_search() {
    let signal = b001();
    let params = ModelParameters::builder()
        .model_order(10)
        .frequency_range(-10.0, 10.0)
        .freq_points(2000)
        .window_size(1024)
        .max_windows(50)
        .build()
        .unwrap();
    let result = find_optimal_order(&signal, &params, 0.1, 4).unwrap();
    assert_eq!(result.final_order, 65);
    assert!(result.success);
}
