use parking_lot::Mutex;

use crate::acquisition::optimizer::{DEFAULT_N_CANDIDATES, DEFAULT_N_RESTARTS};
use crate::acquisition::{Acquisition, AcquisitionOptimizer, ExpectedImprovement};
use crate::design::InitialDesign;
use crate::domain::SearchDomain;
use crate::error::{Error, Result};
use crate::gp::{DEFAULT_JITTER, GaussianProcess};
use crate::kernel::{Kernel, KernelFamily};
use crate::types::Direction;

use super::{BayesianOptimizer, ConvergenceCriteria, ImprovementWindow};

const DEFAULT_N_ITERS: usize = 20;
const DEFAULT_N_INITIAL: usize = 5;
/// Initial isotropic length-scale, in unit-cube coordinates.
const DEFAULT_LENGTH_SCALE: f64 = 0.5;

/// A builder for constructing [`BayesianOptimizer`] instances with a fluent API.
///
/// Created via [`BayesianOptimizer::builder()`]. Only the domain is
/// required.
///
/// # Defaults
///
/// | Option | Default |
/// |--------|---------|
/// | `direction` | [`Maximize`](Direction::Maximize) |
/// | `n_iters` | 20 |
/// | `n_initial` | 5 |
/// | `initial_design` | [`LatinHypercube`](InitialDesign::LatinHypercube) |
/// | `kernel_family` | [`Matern52`](KernelFamily::Matern52) |
/// | `length_scale` | 0.5 (unit-cube coordinates) |
/// | `jitter` | 1e-6 |
/// | `normalize_y` | true |
/// | `n_restarts` | 10 (kernel fit and acquisition maximization) |
/// | `n_candidates` | 1000 |
/// | `acquisition` | [`ExpectedImprovement`] |
/// | `seed` | random |
/// | convergence | off |
///
/// # Examples
///
/// ```
/// use bayesopt::prelude::*;
///
/// let optimizer = BayesianOptimizer::builder()
///     .domain(SearchDomain::new(vec![(0.0, 1.0), (-5.0, 5.0)]).unwrap())
///     .minimize()
///     .n_iters(30)
///     .kernel_family(KernelFamily::Matern32)
///     .jitter(1e-4)
///     .n_restarts(15)
///     .stop_when_improvement_below(1e-3, 5)
///     .seed(42)
///     .build()
///     .unwrap();
///
/// assert_eq!(optimizer.direction(), Direction::Minimize);
/// ```
pub struct BayesianOptimizerBuilder {
    domain: Option<SearchDomain>,
    direction: Direction,
    n_iters: usize,
    n_initial: usize,
    initial_design: InitialDesign,
    kernel: Option<Kernel>,
    kernel_family: KernelFamily,
    length_scale: f64,
    jitter: f64,
    normalize_y: bool,
    n_restarts: usize,
    n_candidates: usize,
    acquisition: Option<Box<dyn Acquisition>>,
    convergence: ConvergenceCriteria,
    seed: Option<u64>,
    #[cfg(feature = "async")]
    evaluation_timeout: Option<core::time::Duration>,
}

impl Default for BayesianOptimizerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BayesianOptimizerBuilder {
    /// Create a new builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            domain: None,
            direction: Direction::Maximize,
            n_iters: DEFAULT_N_ITERS,
            n_initial: DEFAULT_N_INITIAL,
            initial_design: InitialDesign::default(),
            kernel: None,
            kernel_family: KernelFamily::default(),
            length_scale: DEFAULT_LENGTH_SCALE,
            jitter: DEFAULT_JITTER,
            normalize_y: true,
            n_restarts: DEFAULT_N_RESTARTS,
            n_candidates: DEFAULT_N_CANDIDATES,
            acquisition: None,
            convergence: ConvergenceCriteria::default(),
            seed: None,
            #[cfg(feature = "async")]
            evaluation_timeout: None,
        }
    }

    /// Set the search domain (required).
    #[must_use]
    pub fn domain(mut self, domain: SearchDomain) -> Self {
        self.domain = Some(domain);
        self
    }

    /// Set the optimization direction to minimize.
    #[must_use]
    pub fn minimize(mut self) -> Self {
        self.direction = Direction::Minimize;
        self
    }

    /// Set the optimization direction to maximize (the default).
    #[must_use]
    pub fn maximize(mut self) -> Self {
        self.direction = Direction::Maximize;
        self
    }

    /// Set the optimization direction explicitly.
    #[must_use]
    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Maximum number of surrogate-guided evaluations per run.
    #[must_use]
    pub fn n_iters(mut self, n: usize) -> Self {
        self.n_iters = n;
        self
    }

    /// Number of initial-design evaluations made by
    /// [`optimize`](BayesianOptimizer::optimize). At least one is always made.
    #[must_use]
    pub fn n_initial(mut self, n: usize) -> Self {
        self.n_initial = n;
        self
    }

    /// Placement of the initial-design points.
    #[must_use]
    pub fn initial_design(mut self, design: InitialDesign) -> Self {
        self.initial_design = design;
        self
    }

    /// Use a fully specified kernel. Length-scales are interpreted in
    /// unit-cube coordinates and the dimension must match the domain.
    /// Overrides [`kernel_family`](Self::kernel_family) and
    /// [`length_scale`](Self::length_scale).
    #[must_use]
    pub fn kernel(mut self, kernel: Kernel) -> Self {
        self.kernel = Some(kernel);
        self
    }

    /// Kernel family for the default isotropic kernel.
    #[must_use]
    pub fn kernel_family(mut self, family: KernelFamily) -> Self {
        self.kernel_family = family;
        self
    }

    /// Initial length-scale for the default isotropic kernel, in unit-cube
    /// coordinates.
    #[must_use]
    pub fn length_scale(mut self, length_scale: f64) -> Self {
        self.length_scale = length_scale;
        self
    }

    /// Diagonal jitter `α` added to the Gram matrix.
    ///
    /// Measured in standardized-outcome units while outcomes are normalized
    /// (the default); see [`GaussianProcess::jitter`](crate::GaussianProcess::jitter).
    #[must_use]
    pub fn jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter;
        self
    }

    /// Standardize outcomes before fitting the surrogate.
    #[must_use]
    pub fn normalize_y(mut self, normalize: bool) -> Self {
        self.normalize_y = normalize;
        self
    }

    /// Restart count for both kernel fitting and acquisition maximization.
    #[must_use]
    pub fn n_restarts(mut self, n: usize) -> Self {
        self.n_restarts = n;
        self
    }

    /// Random candidates screened before acquisition refinement.
    #[must_use]
    pub fn n_candidates(mut self, n: usize) -> Self {
        self.n_candidates = n;
        self
    }

    /// Acquisition function. Defaults to [`ExpectedImprovement`].
    #[must_use]
    pub fn acquisition(mut self, acquisition: impl Acquisition + 'static) -> Self {
        self.acquisition = Some(Box::new(acquisition));
        self
    }

    /// Stop once the best acquisition value drops below `threshold`.
    #[must_use]
    pub fn stop_when_acquisition_below(mut self, threshold: f64) -> Self {
        self.convergence.acquisition_threshold = Some(threshold);
        self
    }

    /// Stop once the best outcome improves by less than `threshold` over the
    /// last `window` loop evaluations.
    #[must_use]
    pub fn stop_when_improvement_below(mut self, threshold: f64, window: usize) -> Self {
        self.convergence.improvement = Some(ImprovementWindow { threshold, window });
        self
    }

    /// Replace all convergence rules at once.
    #[must_use]
    pub fn convergence(mut self, criteria: ConvergenceCriteria) -> Self {
        self.convergence = criteria;
        self
    }

    /// Seed for every random choice made during a run.
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Abort the run if a single evaluation takes longer than `timeout`.
    /// Only honored by the async methods.
    #[cfg(feature = "async")]
    #[must_use]
    pub fn evaluation_timeout(mut self, timeout: core::time::Duration) -> Self {
        self.evaluation_timeout = Some(timeout);
        self
    }

    /// Build the [`BayesianOptimizer`].
    ///
    /// # Errors
    ///
    /// - [`Error::EmptyDomain`] if no domain was set.
    /// - [`Error::InvalidJitter`] if the jitter is not finite and positive.
    /// - [`Error::InvalidKernelParameter`] for an invalid length-scale.
    /// - [`Error::DimensionMismatch`] if an explicit kernel's dimension
    ///   differs from the domain's.
    pub fn build(self) -> Result<BayesianOptimizer> {
        let domain = self.domain.ok_or(Error::EmptyDomain)?;
        if !(self.jitter.is_finite() && self.jitter > 0.0) {
            return Err(Error::InvalidJitter(self.jitter));
        }

        let kernel = match self.kernel {
            Some(kernel) if kernel.dimension() != domain.dimension() => {
                return Err(Error::DimensionMismatch {
                    expected: domain.dimension(),
                    got: kernel.dimension(),
                });
            }
            Some(kernel) => kernel,
            None => Kernel::isotropic(self.kernel_family, domain.dimension(), self.length_scale)?,
        };

        let surrogate = GaussianProcess::new(kernel)
            .jitter(self.jitter)
            .normalize_y(self.normalize_y)
            .n_restarts(self.n_restarts);
        let acquisition_optimizer = AcquisitionOptimizer::new()
            .n_restarts(self.n_restarts)
            .n_candidates(self.n_candidates);
        let acquisition = self
            .acquisition
            .unwrap_or_else(|| Box::new(ExpectedImprovement::new()));

        Ok(BayesianOptimizer {
            domain,
            direction: self.direction,
            n_iters: self.n_iters,
            n_initial: self.n_initial,
            initial_design: self.initial_design,
            surrogate,
            acquisition,
            acquisition_optimizer,
            convergence: self.convergence,
            seed: self.seed,
            #[cfg(feature = "async")]
            evaluation_timeout: self.evaluation_timeout,
            fitted_kernel: Mutex::new(None),
        })
    }
}
