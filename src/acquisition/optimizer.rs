//! Multi-start maximization of an acquisition function over a box.

use crate::gp::Posterior;
use crate::lbfgs::{self, LbfgsConfig};
use crate::restarts;
use crate::rng_util;

use super::{Acquisition, value, value_and_gradient};

/// Default number of L-BFGS starts.
pub(crate) const DEFAULT_N_RESTARTS: usize = 10;
/// Default number of random candidates screened before the local searches.
pub(crate) const DEFAULT_N_CANDIDATES: usize = 1000;

/// A proposed point and the acquisition value it achieved.
#[derive(Clone, Debug, PartialEq)]
pub struct Candidate {
    /// Proposed input, inside the bounds passed to
    /// [`AcquisitionOptimizer::maximize`].
    pub x: Vec<f64>,
    /// Acquisition value at `x`.
    pub acquisition_value: f64,
}

/// Maximizes an acquisition function with bounded L-BFGS from several
/// starting points.
///
/// Starting points are the best of `n_candidates` uniform random samples
/// plus `n_restarts - 1` further uniform samples. The best local optimum
/// wins; ties keep the earliest start, so results are deterministic for a
/// seeded RNG. A surface that is non-finite everywhere falls back to a
/// uniform random candidate, and a flat surface (for example EI when
/// `σ = 0` everywhere) returns the first random candidate.
///
/// # Examples
///
/// ```
/// use bayesopt::acquisition::{AcquisitionOptimizer, ExpectedImprovement};
/// use bayesopt::{GaussianProcess, History, Kernel, KernelFamily};
///
/// let history = History::from_pairs([(vec![0.1], 0.0), (vec![0.9], 1.0)]).unwrap();
/// let gp = GaussianProcess::new(Kernel::isotropic(KernelFamily::Matern52, 1, 0.2).unwrap());
/// let posterior = gp.condition(&history).unwrap();
///
/// let mut rng = fastrand::Rng::with_seed(42);
/// let candidate = AcquisitionOptimizer::new().maximize(
///     &ExpectedImprovement::new(),
///     &posterior,
///     1.0,
///     &[(0.0, 1.0)],
///     &mut rng,
/// );
/// assert!((0.0..=1.0).contains(&candidate.x[0]));
/// assert!(candidate.acquisition_value >= 0.0);
/// ```
#[derive(Clone, Debug)]
pub struct AcquisitionOptimizer {
    n_restarts: usize,
    n_candidates: usize,
    lbfgs: LbfgsConfig,
}

impl Default for AcquisitionOptimizer {
    fn default() -> Self {
        Self::new()
    }
}

impl AcquisitionOptimizer {
    /// Creates an optimizer with default settings:
    ///
    /// - `n_restarts`: 10
    /// - `n_candidates`: 1000
    #[must_use]
    pub fn new() -> Self {
        Self {
            n_restarts: DEFAULT_N_RESTARTS,
            n_candidates: DEFAULT_N_CANDIDATES,
            lbfgs: LbfgsConfig::default(),
        }
    }

    /// Sets the number of L-BFGS starts. `0` disables local refinement and
    /// returns the best random candidate.
    #[must_use]
    pub fn n_restarts(mut self, n: usize) -> Self {
        self.n_restarts = n;
        self
    }

    /// Sets the number of random candidates screened for the first start.
    #[must_use]
    pub fn n_candidates(mut self, n: usize) -> Self {
        self.n_candidates = n;
        self
    }

    /// Maximizes `acquisition` over `bounds` given the incumbent `best`.
    #[must_use]
    pub fn maximize(
        &self,
        acquisition: &dyn Acquisition,
        posterior: &Posterior,
        best: f64,
        bounds: &[(f64, f64)],
        rng: &mut fastrand::Rng,
    ) -> Candidate {
        let sample = |rng: &mut fastrand::Rng| -> Vec<f64> {
            bounds
                .iter()
                .map(|&(lo, hi)| rng_util::f64_range(rng, lo, hi))
                .collect()
        };

        // Screen random candidates; ties keep the earliest sample.
        let mut screened: Option<Candidate> = None;
        for _ in 0..self.n_candidates.max(1) {
            let x = sample(rng);
            let v = value(acquisition, posterior, &x, best);
            if !v.is_finite() {
                continue;
            }
            if screened
                .as_ref()
                .is_none_or(|c| v > c.acquisition_value)
            {
                screened = Some(Candidate {
                    x,
                    acquisition_value: v,
                });
            }
        }

        if self.n_restarts == 0 {
            return screened.unwrap_or_else(|| fallback(sample(rng)));
        }

        let mut starts = Vec::with_capacity(self.n_restarts);
        if let Some(c) = &screened {
            starts.push(c.x.clone());
        }
        while starts.len() < self.n_restarts {
            starts.push(sample(rng));
        }

        let minima = restarts::map_starts(&starts, |start| {
            lbfgs::minimize(
                |x| {
                    let (v, g) = value_and_gradient(acquisition, posterior, x, best);
                    (-v, g.into_iter().map(|gi| -gi).collect())
                },
                start,
                bounds,
                &self.lbfgs,
            )
        });

        let best_local = restarts::argmin_finite(minima.iter().map(|m| m.value)).map(|i| {
            let m = &minima[i];
            Candidate {
                x: clamp(&m.x, bounds),
                acquisition_value: -m.value,
            }
        });

        match (best_local, screened) {
            (Some(local), Some(raw)) if raw.acquisition_value > local.acquisition_value => raw,
            (Some(local), _) => local,
            (None, Some(raw)) => raw,
            (None, None) => {
                trace_debug!("acquisition non-finite everywhere; using a random candidate");
                fallback(sample(rng))
            }
        }
    }
}

fn clamp(x: &[f64], bounds: &[(f64, f64)]) -> Vec<f64> {
    x.iter()
        .zip(bounds)
        .map(|(&v, &(lo, hi))| v.clamp(lo, hi))
        .collect()
}

fn fallback(x: Vec<f64>) -> Candidate {
    Candidate {
        x,
        acquisition_value: 0.0,
    }
}
