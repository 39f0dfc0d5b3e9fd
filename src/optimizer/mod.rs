//! The sequential fit → propose → evaluate loop.

#[cfg(feature = "async")]
mod async_impl;
mod builder;
mod optimize;
mod run;

use parking_lot::Mutex;

use crate::acquisition::{Acquisition, AcquisitionOptimizer};
use crate::design::InitialDesign;
use crate::domain::SearchDomain;
use crate::error::Error;
use crate::gp::GaussianProcess;
use crate::history::{History, ObservedPoint};
use crate::kernel::Kernel;
use crate::types::{Direction, Termination};

pub use builder::BayesianOptimizerBuilder;

/// Optional early-stopping rules. Both are off by default.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ConvergenceCriteria {
    /// Stop, without evaluating, once the best acquisition value found for
    /// the next candidate falls below this threshold.
    pub acquisition_threshold: Option<f64>,
    /// Stop once the best outcome has improved by less than `threshold`
    /// over the last `window` loop evaluations.
    pub improvement: Option<ImprovementWindow>,
}

/// Trailing-window improvement rule for [`ConvergenceCriteria`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ImprovementWindow {
    /// Minimum improvement of the best outcome required to keep going.
    pub threshold: f64,
    /// Number of most recent loop evaluations considered.
    pub window: usize,
}

impl ConvergenceCriteria {
    fn acquisition_converged(&self, acquisition_value: Option<f64>) -> bool {
        match (self.acquisition_threshold, acquisition_value) {
            (Some(threshold), Some(value)) => value < threshold,
            _ => false,
        }
    }

    fn improvement_converged(
        &self,
        history: &History,
        iterations: usize,
        direction: Direction,
    ) -> bool {
        let Some(rule) = self.improvement else {
            return false;
        };
        if rule.window == 0 || iterations < rule.window {
            return false;
        }
        let before = history.best_value_in_prefix(history.len() - rule.window, direction);
        let now = history.best(direction).map(|p| p.y);
        match (before, now) {
            (Some(before), Some(now)) => direction.sign() * (now - before) < rule.threshold,
            _ => false,
        }
    }
}

/// Outcome of a completed optimization run.
#[derive(Clone, Debug, PartialEq)]
pub struct OptimizationResult {
    /// The best observation in the history (per the configured direction).
    pub best: ObservedPoint,
    /// Every observation, initial design included, in evaluation order.
    pub history: History,
    /// Why the loop stopped.
    pub termination: Termination,
    /// Number of surrogate-guided evaluations (initial design excluded).
    pub iterations: usize,
}

/// An unrecoverable error together with the history gathered before it.
///
/// Objective failures, non-finite outcomes, and timeouts end the run here.
/// The partial history is never discarded.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
#[error("optimization interrupted after {} evaluations: {error}", .history.len())]
pub struct Interrupted {
    /// What went wrong.
    pub error: Error,
    /// Observations recorded before the failure.
    pub history: History,
}

impl From<Interrupted> for Error {
    fn from(interrupted: Interrupted) -> Self {
        interrupted.error
    }
}

/// Sequential model-based optimizer driven by a Gaussian-process surrogate.
///
/// Created via [`BayesianOptimizer::builder`]. Each run starts from the
/// configured prior and seed, so two runs with the same configuration and
/// a deterministic objective produce identical histories.
///
/// # Examples
///
/// ```
/// use bayesopt::prelude::*;
///
/// let optimizer = BayesianOptimizer::builder()
///     .domain(SearchDomain::interval(-2.0, 2.0).unwrap())
///     .n_initial(3)
///     .n_iters(10)
///     .seed(42)
///     .build()
///     .unwrap();
///
/// let result = optimizer
///     .optimize(|x: &[f64]| Ok::<_, Error>(-(x[0] - 1.0).powi(2)))
///     .unwrap();
/// assert!(result.best.y > -0.1);
/// ```
pub struct BayesianOptimizer {
    domain: SearchDomain,
    direction: Direction,
    n_iters: usize,
    n_initial: usize,
    initial_design: InitialDesign,
    surrogate: GaussianProcess,
    acquisition: Box<dyn Acquisition>,
    acquisition_optimizer: AcquisitionOptimizer,
    convergence: ConvergenceCriteria,
    seed: Option<u64>,
    #[cfg(feature = "async")]
    evaluation_timeout: Option<core::time::Duration>,
    fitted_kernel: Mutex<Option<Kernel>>,
}

impl BayesianOptimizer {
    /// Returns a builder with default settings.
    #[must_use]
    pub fn builder() -> BayesianOptimizerBuilder {
        BayesianOptimizerBuilder::new()
    }

    /// The search domain.
    #[must_use]
    pub fn domain(&self) -> &SearchDomain {
        &self.domain
    }

    /// The optimization direction.
    #[must_use]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Maximum number of surrogate-guided evaluations per run.
    #[must_use]
    pub fn n_iters(&self) -> usize {
        self.n_iters
    }

    /// Kernel hyperparameters at the end of the most recent run, in
    /// unit-cube input coordinates. `None` before the first run.
    #[must_use]
    pub fn fitted_kernel(&self) -> Option<Kernel> {
        self.fitted_kernel.lock().clone()
    }

    fn make_rng(&self) -> fastrand::Rng {
        self.seed
            .map_or_else(fastrand::Rng::new, fastrand::Rng::with_seed)
    }
}

impl core::fmt::Debug for BayesianOptimizer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BayesianOptimizer")
            .field("domain", &self.domain)
            .field("direction", &self.direction)
            .field("n_iters", &self.n_iters)
            .field("n_initial", &self.n_initial)
            .field("initial_design", &self.initial_design)
            .field("surrogate", &self.surrogate)
            .field("convergence", &self.convergence)
            .field("seed", &self.seed)
            .finish_non_exhaustive()
    }
}
