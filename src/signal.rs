//! Three-component recordings and their windowing.
//!
//! A [`Signal`] holds the vertical (Z), north (N) and east (E) components of
//! one station. [`windows`] slices it into fixed-size, possibly overlapping
//! [`Window`]s, each of which owns an independent copy of its samples.

use crate::error::{HvarmaError, Result};

/// Three equal-length components sampled at one rate.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    z: Vec<f64>,
    n: Vec<f64>,
    e: Vec<f64>,
    sampling_rate: f64,
    station: String,
}

impl Signal {
    /// Create a signal, checking that the components agree in length.
    pub fn new(
        z: Vec<f64>,
        n: Vec<f64>,
        e: Vec<f64>,
        sampling_rate: f64,
        station: impl Into<String>,
    ) -> Result<Self> {
        if z.len() != n.len() || n.len() != e.len() {
            return Err(HvarmaError::Input(format!(
                "Data do not have the same size in Z, N or E directions ({}, {}, {})",
                z.len(),
                n.len(),
                e.len()
            )));
        }
        if z.is_empty() {
            return Err(HvarmaError::Input("Signal has no samples".to_string()));
        }
        if !sampling_rate.is_finite() || sampling_rate <= 0.0 {
            return Err(HvarmaError::Input(format!(
                "Invalid sampling rate {}",
                sampling_rate
            )));
        }
        Ok(Self {
            z,
            n,
            e,
            sampling_rate,
            station: station.into(),
        })
    }

    /// Number of samples per component.
    #[inline]
    pub fn size(&self) -> usize {
        self.z.len()
    }

    #[inline]
    pub fn sampling_rate(&self) -> f64 {
        self.sampling_rate
    }

    /// Sample interval in seconds.
    #[inline]
    pub fn sampling_interval(&self) -> f64 {
        1.0 / self.sampling_rate
    }

    pub fn station(&self) -> &str {
        &self.station
    }

    pub fn z(&self) -> &[f64] {
        &self.z
    }

    pub fn n(&self) -> &[f64] {
        &self.n
    }

    pub fn e(&self) -> &[f64] {
        &self.e
    }

    /// Copy `[start, start + size)` into a new window.
    pub fn window(&self, start: usize, size: usize) -> Result<Window> {
        if size == 0 || start + size > self.size() {
            return Err(HvarmaError::Input(format!(
                "Window [{}, {}) exceeds data size {}",
                start,
                start + size,
                self.size()
            )));
        }
        let range = start..start + size;
        Ok(Window {
            start,
            z: self.z[range.clone()].to_vec(),
            n: self.n[range.clone()].to_vec(),
            e: self.e[range].to_vec(),
            sampling_rate: self.sampling_rate,
            station: self.station.clone(),
        })
    }
}

/// An owned slice of a [`Signal`].
#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    start: usize,
    z: Vec<f64>,
    n: Vec<f64>,
    e: Vec<f64>,
    sampling_rate: f64,
    station: String,
}

impl Window {
    /// Offset of the first sample in the parent signal.
    pub fn start(&self) -> usize {
        self.start
    }

    pub fn size(&self) -> usize {
        self.z.len()
    }

    pub fn sampling_rate(&self) -> f64 {
        self.sampling_rate
    }

    pub fn station(&self) -> &str {
        &self.station
    }

    pub fn z(&self) -> &[f64] {
        &self.z
    }

    pub fn n(&self) -> &[f64] {
        &self.n
    }

    pub fn e(&self) -> &[f64] {
        &self.e
    }

    /// Consume into `(z, n, e)`.
    pub fn into_components(self) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
        (self.z, self.n, self.e)
    }
}

/// Lazy sequence of windows over a signal. Each call to [`windows`] starts at offset 0.
#[derive(Debug, Clone)]
pub struct Windows<'a> {
    signal: &'a Signal,
    size: usize,
    stride: usize,
    next_start: usize,
}

impl Iterator for Windows<'_> {
    type Item = Window;

    fn next(&mut self) -> Option<Window> {
        if self.next_start + self.size > self.signal.size() {
            return None;
        }
        let window = self.signal.window(self.next_start, self.size).ok()?;
        self.next_start += self.stride;
        Some(window)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = window_count(self.signal.size(), self.size, self.stride, self.next_start);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Windows<'_> {}

fn window_count(total: usize, size: usize, stride: usize, from: usize) -> usize {
    if from + size > total {
        0
    } else {
        (total - size - from) / stride + 1
    }
}

/// Windows of `size` samples starting at `0, size - overlap, 2 (size - overlap), ...`.
///
/// Fails if the signal is shorter than one window or if `overlap >= size`.
pub fn windows(signal: &Signal, size: usize, overlap: usize) -> Result<Windows<'_>> {
    if signal.size() < size {
        return Err(HvarmaError::Input(format!(
            "Window of {} samples exceeds available data ({} samples)",
            size,
            signal.size()
        )));
    }
    if overlap >= size {
        return Err(HvarmaError::Input(format!(
            "Overlap ({}) must be smaller than the window size ({})",
            overlap, size
        )));
    }
    Ok(Windows {
        signal,
        size,
        stride: size - overlap,
        next_start: 0,
    })
}

/// Number of windows a run over `signal_size` samples will process.
pub fn expected_window_count(
    signal_size: usize,
    size: usize,
    overlap: usize,
    max_windows: usize,
) -> usize {
    if signal_size < size || overlap >= size {
        return 0;
    }
    ((signal_size - overlap) / (size - overlap)).min(max_windows)
}
