//! Model parameters and the `key=value` parameter file format.
//!
//! A [`ModelParameters`] record is validated when it is built and never
//! mutated afterwards: [`ModelParameters::update`] and
//! [`ModelParameters::with_model_order`] return a new, re-validated record.
//!
//! ```text
//! model_order=30
//! maxtau=128
//! mu=sigma
//! nu=0.5
//! window_size=512
//! ```

use crate::error::{HvarmaError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Prediction-error weight used by the normal equations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Weight {
    /// User-fixed positive weight.
    Fixed(f64),
    /// Derived from the lag-0 covariance of the window at fit time.
    Auto,
}

impl Weight {
    /// Parse the textual form: `auto`/`sigma` or a positive number.
    ///
    /// A numeric `0` also selects [`Weight::Auto`].
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.eq_ignore_ascii_case("auto") || text.eq_ignore_ascii_case("sigma") {
            return Some(Weight::Auto);
        }
        match text.parse::<f64>().ok()? {
            w if w == 0.0 => Some(Weight::Auto),
            w => Some(Weight::Fixed(w)),
        }
    }

    /// Resolve against the variance the `Auto` variant derives from.
    pub fn resolve(self, variance: f64) -> f64 {
        match self {
            Weight::Fixed(w) => w,
            Weight::Auto => 1.0 / variance,
        }
    }
}

impl fmt::Display for Weight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Weight::Fixed(w) => write!(f, "{}", w),
            Weight::Auto => write!(f, "sigma"),
        }
    }
}

/// Parameter keys accepted in files and in [`ModelParameters::update`].
pub const PARAMETER_KEYS: [&str; 14] = [
    "model_order",
    "maxtau",
    "mu",
    "nu",
    "nfir",
    "neg_freq",
    "pos_freq",
    "freq_points",
    "window_size",
    "overlap",
    "max_windows",
    "freq_conf",
    "plot_conf",
    "output_dir",
];

/// Validated parameters of one H/V ARMA run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelParameters {
    model_order: usize,
    maxtau: usize,
    mu: Weight,
    nu: Weight,
    nfir: usize,
    neg_freq: f64,
    pos_freq: f64,
    freq_points: usize,
    window_size: usize,
    overlap: usize,
    max_windows: usize,
    freq_conf: f64,
    plot_conf: f64,
    output_dir: PathBuf,
}

impl Default for ModelParameters {
    fn default() -> Self {
        Self {
            model_order: 30,
            maxtau: 128,
            mu: Weight::Fixed(0.5),
            nu: Weight::Fixed(0.5),
            nfir: 40,
            neg_freq: -20.0,
            pos_freq: 20.0,
            freq_points: 1024,
            window_size: 512,
            overlap: 256,
            max_windows: 1000,
            freq_conf: 20.0,
            plot_conf: 50.0,
            output_dir: PathBuf::from("."),
        }
    }
}

impl ModelParameters {
    /// Start a builder from the default values.
    pub fn builder() -> ModelParametersBuilder {
        ModelParametersBuilder {
            inner: ModelParameters::default(),
        }
    }

    /// Build from `(key, value)` pairs over the defaults.
    pub fn from_pairs<'a, I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        ModelParameters::default().update(pairs)
    }

    /// Read a `key=value` parameter file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| HvarmaError::io(path, e))?;
        let pairs = parse_params(&text).map_err(|e| match e {
            HvarmaError::Configuration(msg) => {
                HvarmaError::Configuration(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })?;
        ModelParameters::from_pairs(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    }

    /// New record with the given `(key, value)` overrides applied.
    pub fn update<'a, I>(&self, pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut next = self.clone();
        for (key, value) in pairs {
            next.set(key.trim(), value.trim())?;
        }
        next.validate()?;
        Ok(next)
    }

    /// New record differing only in model order.
    pub fn with_model_order(&self, model_order: usize) -> Result<Self> {
        let mut next = self.clone();
        next.model_order = model_order;
        next.validate()?;
        Ok(next)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "model_order" => self.model_order = parse_value(key, value)?,
            "maxtau" => self.maxtau = parse_value(key, value)?,
            "mu" => self.mu = parse_weight(key, value)?,
            "nu" => self.nu = parse_weight(key, value)?,
            "nfir" => self.nfir = parse_value(key, value)?,
            "neg_freq" => self.neg_freq = parse_value(key, value)?,
            "pos_freq" => self.pos_freq = parse_value(key, value)?,
            "freq_points" => self.freq_points = parse_value(key, value)?,
            "window_size" => self.window_size = parse_value(key, value)?,
            "overlap" => self.overlap = parse_value(key, value)?,
            "max_windows" => self.max_windows = parse_value(key, value)?,
            "freq_conf" => self.freq_conf = parse_value(key, value)?,
            "plot_conf" => self.plot_conf = parse_value(key, value)?,
            "output_dir" => self.output_dir = PathBuf::from(value),
            _ => {
                return Err(HvarmaError::Configuration(format!(
                    "Parameter {} is unknown",
                    key
                )))
            }
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        let fail = |msg: String| -> Result<()> { Err(HvarmaError::Configuration(msg)) };

        if 2 * self.maxtau > self.window_size {
            return fail(format!(
                "2*maxtau ({}) must not exceed window_size ({})",
                2 * self.maxtau,
                self.window_size
            ));
        }
        if self.model_order > self.maxtau {
            return fail(format!(
                "model_order ({}) must not exceed maxtau ({})",
                self.model_order, self.maxtau
            ));
        }
        if self.overlap > self.window_size {
            return fail(format!(
                "overlap ({}) must not exceed window_size ({})",
                self.overlap, self.window_size
            ));
        }
        if !(self.neg_freq < self.pos_freq) {
            return fail(format!(
                "neg_freq ({}) must be lower than pos_freq ({})",
                self.neg_freq, self.pos_freq
            ));
        }
        if self.nfir > self.maxtau {
            return fail(format!(
                "nfir ({}) must not exceed maxtau ({})",
                self.nfir, self.maxtau
            ));
        }
        if self.nfir == 0 {
            return fail("nfir must be at least 1".to_string());
        }
        if self.freq_points < 2 {
            return fail(format!(
                "freq_points ({}) must be at least 2",
                self.freq_points
            ));
        }
        if self.max_windows == 0 {
            return fail("max_windows must be at least 1".to_string());
        }
        for (name, weight) in [("mu", self.mu), ("nu", self.nu)] {
            if let Weight::Fixed(w) = weight {
                if !w.is_finite() || w <= 0.0 {
                    return fail(format!("{} must be positive or 'sigma', got {}", name, w));
                }
            }
        }
        for (name, conf) in [("freq_conf", self.freq_conf), ("plot_conf", self.plot_conf)] {
            if !(0.0..=100.0).contains(&conf) {
                return fail(format!("{} ({}) must lie in [0, 100]", name, conf));
            }
        }
        Ok(())
    }

    pub fn model_order(&self) -> usize {
        self.model_order
    }

    pub fn maxtau(&self) -> usize {
        self.maxtau
    }

    /// Forward prediction-error weight.
    pub fn mu(&self) -> Weight {
        self.mu
    }

    /// Backward prediction-error weight.
    pub fn nu(&self) -> Weight {
        self.nu
    }

    /// Number of covariance lags used by the coherence Toeplitz matrices.
    pub fn nfir(&self) -> usize {
        self.nfir
    }

    pub fn neg_freq(&self) -> f64 {
        self.neg_freq
    }

    pub fn pos_freq(&self) -> f64 {
        self.pos_freq
    }

    pub fn freq_points(&self) -> usize {
        self.freq_points
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    pub fn max_windows(&self) -> usize {
        self.max_windows
    }

    /// Confidence used for the reported peak-frequency uncertainty.
    pub fn freq_conf(&self) -> f64 {
        self.freq_conf
    }

    /// Width of the spectral percentile band written to reports.
    pub fn plot_conf(&self) -> f64 {
        self.plot_conf
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Render back into the parameter file format.
    pub fn to_file_string(&self) -> String {
        let mut out = String::new();
        for key in PARAMETER_KEYS {
            let value = match key {
                "model_order" => self.model_order.to_string(),
                "maxtau" => self.maxtau.to_string(),
                "mu" => self.mu.to_string(),
                "nu" => self.nu.to_string(),
                "nfir" => self.nfir.to_string(),
                "neg_freq" => self.neg_freq.to_string(),
                "pos_freq" => self.pos_freq.to_string(),
                "freq_points" => self.freq_points.to_string(),
                "window_size" => self.window_size.to_string(),
                "overlap" => self.overlap.to_string(),
                "max_windows" => self.max_windows.to_string(),
                "freq_conf" => self.freq_conf.to_string(),
                "plot_conf" => self.plot_conf.to_string(),
                _ => self.output_dir.display().to_string(),
            };
            out.push_str(key);
            out.push('=');
            out.push_str(&value);
            out.push('\n');
        }
        out
    }
}

/// Builder for [`ModelParameters`]; validation happens in [`build`](Self::build).
#[derive(Debug, Clone)]
pub struct ModelParametersBuilder {
    inner: ModelParameters,
}

impl ModelParametersBuilder {
    pub fn model_order(mut self, value: usize) -> Self {
        self.inner.model_order = value;
        self
    }

    pub fn maxtau(mut self, value: usize) -> Self {
        self.inner.maxtau = value;
        self
    }

    pub fn mu(mut self, value: Weight) -> Self {
        self.inner.mu = value;
        self
    }

    pub fn nu(mut self, value: Weight) -> Self {
        self.inner.nu = value;
        self
    }

    pub fn nfir(mut self, value: usize) -> Self {
        self.inner.nfir = value;
        self
    }

    pub fn frequency_range(mut self, neg_freq: f64, pos_freq: f64) -> Self {
        self.inner.neg_freq = neg_freq;
        self.inner.pos_freq = pos_freq;
        self
    }

    pub fn freq_points(mut self, value: usize) -> Self {
        self.inner.freq_points = value;
        self
    }

    pub fn window_size(mut self, value: usize) -> Self {
        self.inner.window_size = value;
        self
    }

    pub fn overlap(mut self, value: usize) -> Self {
        self.inner.overlap = value;
        self
    }

    pub fn max_windows(mut self, value: usize) -> Self {
        self.inner.max_windows = value;
        self
    }

    pub fn freq_conf(mut self, value: f64) -> Self {
        self.inner.freq_conf = value;
        self
    }

    pub fn plot_conf(mut self, value: f64) -> Self {
        self.inner.plot_conf = value;
        self
    }

    pub fn output_dir(mut self, value: impl Into<PathBuf>) -> Self {
        self.inner.output_dir = value.into();
        self
    }

    pub fn build(self) -> Result<ModelParameters> {
        self.inner.validate()?;
        Ok(self.inner)
    }
}

/// Split parameter file text into `(key, value)` pairs.
///
/// Blank lines are skipped. Any other line must contain exactly one `=`.
pub fn parse_params(text: &str) -> Result<Vec<(String, String)>> {
    let mut pairs = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let mut parts = trimmed.split('=');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(key), Some(value), None) if !key.trim().is_empty() => {
                pairs.push((key.trim().to_string(), value.trim().to_string()));
            }
            _ => {
                return Err(HvarmaError::Configuration(format!(
                    "Wrong syntax at line {}: '{}'. Use: parameter=value",
                    lineno + 1,
                    line
                )))
            }
        }
    }
    Ok(pairs)
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value.parse::<T>().map_err(|_| {
        HvarmaError::Configuration(format!("Invalid value '{}' for parameter {}", value, key))
    })
}

fn parse_weight(key: &str, value: &str) -> Result<Weight> {
    Weight::parse(value).ok_or_else(|| {
        HvarmaError::Configuration(format!("Invalid value '{}' for parameter {}", value, key))
    })
}
