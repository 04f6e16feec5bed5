//! Search for the smallest stable model order.
//!
//! An order `p` is *converged* when the resonance peaks barely move between
//! the ensembles of orders `p` and `p - 3`:
//!
//! ```text
//! |pos(p) - pos(p-3)| + |neg(p) - neg(p-3)| < 2 tol
//! ```
//!
//! The search doubles the order from `start_order` until the condition holds
//! (or `maxtau` is reached) and then bisects between half that order and the
//! order itself. Every ensemble is computed at most once and kept in an
//! [`OrderCache`].

use crate::ensemble::{EnsembleStatistics, PeakFrequency};
use crate::error::{HvarmaError, Result};
use crate::parallel::maybe_join;
use crate::params::ModelParameters;
use crate::pipeline::run_model;
use crate::signal::Signal;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

/// Confidence level the peak frequencies are compared at.
pub const INTERNAL_CONFIDENCE: f64 = 20.0;

/// Orders below this cannot be compared against `order - 3`.
pub const MIN_START_ORDER: usize = 4;

type Slot = Arc<Mutex<Option<Arc<EnsembleStatistics>>>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Insert-or-fetch store of ensembles keyed by model order.
///
/// The map lock is only held to find or create an order's slot; the slot's
/// own lock is held while that order is computed, so concurrent requests for
/// the same order wait for one computation while other orders proceed.
#[derive(Debug, Default)]
pub struct OrderCache {
    slots: Mutex<HashMap<usize, Slot>>,
}

impl OrderCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached ensemble for `order`, computing it with `compute` on a miss.
    ///
    /// A failed computation leaves the slot empty.
    pub fn get_or_compute<F>(&self, order: usize, compute: F) -> Result<Arc<EnsembleStatistics>>
    where
        F: FnOnce(usize) -> Result<EnsembleStatistics>,
    {
        let slot = Arc::clone(lock(&self.slots).entry(order).or_default());
        let mut guard = lock(&slot);
        if let Some(stats) = guard.as_ref() {
            return Ok(Arc::clone(stats));
        }
        let stats = Arc::new(compute(order)?);
        *guard = Some(Arc::clone(&stats));
        Ok(stats)
    }

    pub fn get(&self, order: usize) -> Option<Arc<EnsembleStatistics>> {
        let slot = lock(&self.slots).get(&order).cloned()?;
        let guard = lock(&slot);
        guard.clone()
    }

    /// Number of orders with a computed ensemble.
    pub fn len(&self) -> usize {
        lock(&self.slots)
            .values()
            .filter(|slot| lock(slot).is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every computed ensemble, by ascending order.
    pub fn into_results(self) -> BTreeMap<usize, Arc<EnsembleStatistics>> {
        let slots = self
            .slots
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        slots
            .into_iter()
            .filter_map(|(order, slot)| {
                let stats = lock(&slot).clone();
                stats.map(|stats| (order, stats))
            })
            .collect()
    }
}

/// `|pos_diff| + |neg_diff| < 2 tol`.
pub fn convergence_condition(pos_diff: f64, neg_diff: f64, tol: f64) -> bool {
    pos_diff.abs() + neg_diff.abs() < 2.0 * tol
}

/// Change of the positive and negative peak frequencies between two ensembles.
pub fn frequency_difference(
    current: &EnsembleStatistics,
    previous: &EnsembleStatistics,
) -> (f64, f64) {
    let now = current.peak_frequency(INTERNAL_CONFIDENCE);
    let before = previous.peak_frequency(INTERNAL_CONFIDENCE);
    (now.pos_freq - before.pos_freq, now.neg_freq - before.neg_freq)
}

struct Search<'a, F> {
    evaluate: &'a F,
    cache: OrderCache,
    tol: f64,
}

impl<F> Search<'_, F>
where
    F: Fn(usize) -> Result<EnsembleStatistics> + Sync,
{
    fn statistics(&self, order: usize) -> Result<Arc<EnsembleStatistics>> {
        self.cache.get_or_compute(order, |order| {
            info!(order, "testing model order");
            (self.evaluate)(order)
        })
    }

    fn is_converged(&self, order: usize) -> Result<bool> {
        let previous_order = order.saturating_sub(3);
        let (current, previous) = maybe_join(
            || self.statistics(order),
            || self.statistics(previous_order),
        );
        let (current, previous) = (current?, previous?);
        let (pos_diff, neg_diff) = frequency_difference(&current, &previous);
        let converged = convergence_condition(pos_diff, neg_diff, self.tol);
        debug!(order, pos_diff, neg_diff, converged, "convergence check");
        Ok(converged)
    }

    /// Smallest converged order in `[low, high]`, assuming `high` is the upper end.
    fn binary_search(&self, mut low: usize, mut high: usize) -> Result<usize> {
        while low < high {
            let mid = (low + high) / 2;
            if self.is_converged(mid)? {
                high = mid;
            } else {
                low = mid + 1;
            }
        }
        Ok(low)
    }
}

/// Outcome of an order search.
#[derive(Debug)]
pub struct OrderSearchResult {
    pub final_order: usize,
    pub statistics: Arc<EnsembleStatistics>,
    /// Every order that was evaluated, including `final_order`.
    pub order_results: BTreeMap<usize, Arc<EnsembleStatistics>>,
    pub tol: f64,
    pub station: String,
    /// Highest order the search was allowed to reach.
    pub max_order: usize,
    /// Whether `final_order` satisfies the tolerance.
    pub success: bool,
}

/// Serializable digest of an [`OrderSearchResult`].
#[derive(Debug, Clone, Serialize)]
pub struct OrderSearchSummary {
    pub station: String,
    pub final_order: usize,
    pub success: bool,
    pub tol: f64,
    pub peak: PeakFrequency,
    pub tested_orders: Vec<usize>,
}

impl OrderSearchResult {
    /// Peak frequencies of the final order at `confidence` percent.
    pub fn peak_frequency(&self, confidence: f64) -> PeakFrequency {
        self.statistics.peak_frequency(confidence)
    }

    /// Orders evaluated during the search, ascending.
    pub fn tested_orders(&self) -> Vec<usize> {
        self.order_results.keys().copied().collect()
    }

    /// Fail with [`HvarmaError::ConvergenceFailure`] unless the search succeeded.
    pub fn into_converged(self) -> Result<Self> {
        if self.success {
            Ok(self)
        } else {
            Err(HvarmaError::ConvergenceFailure {
                ceiling: self.max_order,
                tol: self.tol,
            })
        }
    }

    pub fn summary(&self, confidence: f64) -> OrderSearchSummary {
        OrderSearchSummary {
            station: self.station.clone(),
            final_order: self.final_order,
            success: self.success,
            tol: self.tol,
            peak: self.peak_frequency(confidence),
            tested_orders: self.tested_orders(),
        }
    }
}

/// Search orders of the ARMA model fitted to `signal`.
///
/// Every other parameter is taken from `params`; `maxtau` bounds the search.
pub fn find_optimal_order(
    signal: &Signal,
    params: &ModelParameters,
    tol: f64,
    start_order: usize,
) -> Result<OrderSearchResult> {
    info!(
        station = signal.station(),
        start_order,
        tol,
        maxtau = params.maxtau(),
        "starting model order search"
    );
    find_optimal_order_with(
        |order| run_model(signal, &params.with_model_order(order)?),
        params.maxtau(),
        tol,
        start_order,
    )
}

/// Order search over an arbitrary `order -> ensemble` evaluator.
pub fn find_optimal_order_with<F>(
    evaluate: F,
    max_order: usize,
    tol: f64,
    start_order: usize,
) -> Result<OrderSearchResult>
where
    F: Fn(usize) -> Result<EnsembleStatistics> + Sync,
{
    if start_order < MIN_START_ORDER {
        return Err(HvarmaError::Configuration(format!(
            "Starting order ({}) must be at least {}",
            start_order, MIN_START_ORDER
        )));
    }
    if start_order > max_order {
        return Err(HvarmaError::Configuration(format!(
            "Starting order ({}) exceeds maxtau ({})",
            start_order, max_order
        )));
    }
    if !tol.is_finite() || tol <= 0.0 {
        return Err(HvarmaError::Configuration(format!(
            "Tolerance must be positive, got {}",
            tol
        )));
    }

    let search = Search {
        evaluate: &evaluate,
        cache: OrderCache::new(),
        tol,
    };

    let mut order = start_order;
    while !search.is_converged(order)? {
        if order == max_order {
            break;
        }
        order = (2 * order).min(max_order);
    }

    let final_order = search.binary_search((order / 2).max(3), order)?;
    let success = search.is_converged(final_order)?;
    let statistics = search.statistics(final_order)?;
    if success {
        info!(final_order, "model order search converged");
    } else {
        info!(final_order, max_order, "model order search reached its ceiling");
    }

    Ok(OrderSearchResult {
        final_order,
        station: statistics.station().to_string(),
        statistics,
        order_results: search.cache.into_results(),
        tol,
        max_order,
        success,
    })
}
