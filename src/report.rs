//! Text reports of runs and order searches.
//!
//! Run results go to `{station}_p{order}_win{windows}.txt` under the
//! configured output directory, as a whitespace-separated table:
//!
//! ```text
//! Frequency H/V Low_err Upp_err Coherence
//! -20 1.02 0.91 1.13 0.35
//! ...
//! ```
//!
//! `Low_err` and `Upp_err` are the `50 ∓ plot_conf / 2` percentile curves.

use crate::ensemble::{EnsembleStatistics, PeakFrequency};
use crate::error::{HvarmaError, Result};
use crate::order_search::{OrderSearchResult, INTERNAL_CONFIDENCE};
use crate::params::ModelParameters;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

pub const RESULTS_HEADER: &str = "Frequency H/V Low_err Upp_err Coherence";

/// Directory reports are written to; `default` stands for the working directory.
pub fn output_directory(params: &ModelParameters) -> PathBuf {
    let dir = params.output_dir();
    if dir.as_os_str() == "default" || dir.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        dir.to_path_buf()
    }
}

/// `{output_dir}/{station}_p{order}_win{windows}`, without extension.
pub fn output_stem(station: &str, params: &ModelParameters, num_windows: usize) -> PathBuf {
    output_directory(params).join(format!(
        "{}_p{}_win{}",
        station,
        params.model_order(),
        num_windows
    ))
}

/// One line of the results table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResultRow {
    pub frequency: f64,
    pub hv: f64,
    pub low: f64,
    pub upp: f64,
    pub coherence: f64,
}

/// Median H/V with its percentile band and the median coherence per frequency.
pub fn results_table(stats: &EnsembleStatistics) -> Vec<ResultRow> {
    let half_band = stats.params().plot_conf() / 2.0;
    let hv = stats.spectrum_percentile(50.0);
    let low = stats.spectrum_percentile(50.0 - half_band);
    let upp = stats.spectrum_percentile(50.0 + half_band);
    let coherence = stats.coherence_percentile(50.0);

    stats
        .frequencies()
        .iter()
        .enumerate()
        .map(|(i, &frequency)| ResultRow {
            frequency,
            hv: hv[i],
            low: low[i],
            upp: upp[i],
            coherence: coherence[i],
        })
        .collect()
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| HvarmaError::io(parent, e))?;
        }
    }
    let file = File::create(path).map_err(|e| HvarmaError::io(path, e))?;
    Ok(BufWriter::new(file))
}

/// Write the results table of a run to `path`.
pub fn write_results(path: impl AsRef<Path>, stats: &EnsembleStatistics) -> Result<()> {
    let path = path.as_ref();
    let mut out = create(path)?;
    let io = |e: std::io::Error| HvarmaError::io(path, e);

    writeln!(out, "{}", RESULTS_HEADER).map_err(io)?;
    for row in results_table(stats) {
        writeln!(
            out,
            "{} {} {} {} {}",
            row.frequency, row.hv, row.low, row.upp, row.coherence
        )
        .map_err(io)?;
    }
    out.flush().map_err(io)?;
    info!(path = %path.display(), "results written");
    Ok(())
}

/// Write the results table under the parameters' output directory.
///
/// Returns the path written.
pub fn write_run(stats: &EnsembleStatistics) -> Result<PathBuf> {
    let mut path = output_stem(stats.station(), stats.params(), stats.num_windows()).into_os_string();
    path.push(".txt");
    let path = PathBuf::from(path);
    write_results(&path, stats)?;
    Ok(path)
}

/// Serializable digest of a run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub station: String,
    pub model_order: usize,
    pub num_windows: usize,
    pub confidence: f64,
    pub peak: PeakFrequency,
}

pub fn run_summary(stats: &EnsembleStatistics) -> RunSummary {
    let confidence = stats.params().freq_conf();
    RunSummary {
        station: stats.station().to_string(),
        model_order: stats.params().model_order(),
        num_windows: stats.num_windows(),
        confidence,
        peak: stats.peak_frequency(confidence),
    }
}

/// Peak frequencies against model order, and their change over 3 orders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderSearchSeries {
    pub orders: Vec<usize>,
    pub pos_freq: Vec<f64>,
    pub neg_freq: Vec<f64>,
    /// Orders `p` for which `p - 3` was also evaluated.
    pub diff_orders: Vec<usize>,
    pub pos_diff: Vec<f64>,
    pub neg_diff: Vec<f64>,
    pub final_order: usize,
    pub tol: f64,
}

pub fn order_search_series(result: &OrderSearchResult) -> OrderSearchSeries {
    let peaks: Vec<(usize, PeakFrequency)> = result
        .order_results
        .iter()
        .map(|(&order, stats)| (order, stats.peak_frequency(INTERNAL_CONFIDENCE)))
        .collect();

    let mut series = OrderSearchSeries {
        orders: peaks.iter().map(|(order, _)| *order).collect(),
        pos_freq: peaks.iter().map(|(_, peak)| peak.pos_freq).collect(),
        neg_freq: peaks.iter().map(|(_, peak)| peak.neg_freq).collect(),
        diff_orders: Vec::new(),
        pos_diff: Vec::new(),
        neg_diff: Vec::new(),
        final_order: result.final_order,
        tol: result.tol,
    };
    for (order, peak) in &peaks {
        let Some(prev_order) = order.checked_sub(3) else {
            continue;
        };
        if let Some((_, prev)) = peaks.iter().find(|(o, _)| *o == prev_order) {
            series.diff_orders.push(*order);
            series.pos_diff.push((peak.pos_freq - prev.pos_freq).abs());
            series.neg_diff.push((peak.neg_freq - prev.neg_freq).abs());
        }
    }
    series
}

fn write_columns(
    path: &Path,
    header: &str,
    orders: &[usize],
    pos: &[f64],
    neg: &[f64],
    result: &OrderSearchResult,
) -> Result<()> {
    let mut out = create(path)?;
    let io = |e: std::io::Error| HvarmaError::io(path, e);
    writeln!(
        out,
        "# station {} final_order {} tol {} success {}",
        result.station, result.final_order, result.tol, result.success
    )
    .map_err(io)?;
    writeln!(out, "{}", header).map_err(io)?;
    for ((order, p), n) in orders.iter().zip(pos).zip(neg) {
        writeln!(out, "{} {} {}", order, p, n).map_err(io)?;
    }
    out.flush().map_err(io)
}

/// Write `{station}_order_search_freq.txt` and `{station}_order_search_diff.txt` into `dir`.
pub fn write_order_search(
    dir: impl AsRef<Path>,
    result: &OrderSearchResult,
) -> Result<(PathBuf, PathBuf)> {
    let dir = dir.as_ref();
    let series = order_search_series(result);
    let freq_path = dir.join(format!("{}_order_search_freq.txt", result.station));
    let diff_path = dir.join(format!("{}_order_search_diff.txt", result.station));

    write_columns(
        &freq_path,
        "Order Positive Negative",
        &series.orders,
        &series.pos_freq,
        &series.neg_freq,
        result,
    )?;
    write_columns(
        &diff_path,
        "Order Positive_diff Negative_diff",
        &series.diff_orders,
        &series.pos_diff,
        &series.neg_diff,
        result,
    )?;
    info!(
        freq = %freq_path.display(),
        diff = %diff_path.display(),
        "order search series written"
    );
    Ok((freq_path, diff_path))
}
