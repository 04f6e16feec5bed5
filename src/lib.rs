//! # hvarma
//!
//! H/V spectral ratio of ambient seismic noise estimated from windowed ARMA
//! models.
//!
//! A three-component recording (vertical Z, north N, east E) is cut into
//! overlapping windows. In each window the complex horizontal series
//! `x = N + i·E` is modelled as the output of an ARMA filter driven by the
//! vertical series `v = Z`:
//!
//! ```text
//! Σ_k a_k x[t-k] = Σ_k b_k v[t-k]
//! ```
//!
//! The fitted filter's amplitude response `|B(z) / A(z)|` is the H/V ratio
//! of that window. Percentiles over all windows give the ratio curve, its
//! uncertainty band, and the resonance peak on each side of the frequency
//! axis. An order search picks the smallest model order whose peaks are
//! stable.
//!
//! ## Pipeline
//!
//! - [`signal`] and [`sac`]: loading and windowing recordings
//! - [`correlation`], [`equations`]: covariances and the normal equations
//! - [`model`]: per-window fit, transfer function, coherence and AIC
//! - [`ensemble`], [`pipeline`]: aggregation over windows
//! - [`order_search`]: model order selection
//! - [`report`]: text tables and JSON summaries
//!
//! ## Data Layout
//!
//! Per-window curves are stacked in a column-major [`FdMatrix`] with one
//! row per window and one column per frequency.

#![allow(clippy::needless_range_loop)]
#![allow(clippy::too_many_arguments)]

pub mod parallel;

pub mod correlation;
pub mod ensemble;
pub mod equations;
pub mod error;
pub mod helpers;
pub mod matrix;
pub mod model;
pub mod order_search;
pub mod params;
pub mod pipeline;
pub mod report;
pub mod sac;
pub mod signal;
pub mod simulation;
pub mod spectrum;

pub use ensemble::{EnsembleStatistics, PeakFrequency};
pub use error::{HvarmaError, Result};
pub use helpers::{argmax, percentile, NUMERICAL_EPS};
pub use matrix::FdMatrix;
pub use model::{HvArma, ModelState};
pub use order_search::{find_optimal_order, find_optimal_order_with, OrderSearchResult};
pub use params::{ModelParameters, Weight};
pub use pipeline::run_model;
pub use sac::{read_sac, SacTrace};
pub use signal::{windows, Signal, Window};
