//! Gaussian-process surrogate.
//!
//! [`GaussianProcess`] holds the prior (kernel, jitter, fitting options) and
//! carries kernel hyperparameters from one fit to the next. Each call to
//! [`fit`](GaussianProcess::fit) produces a self-contained [`Posterior`]
//! snapshot that answers predictive queries without further mutation.
//!
//! # Numerics
//!
//! The Gram matrix `K = k(X, X) + αI` is factored once with a Cholesky
//! decomposition; every solve goes through that factor, never through an
//! explicit inverse (the inverse is only formed inside the likelihood
//! gradient). If the factorization fails, the effective jitter is raised
//! tenfold up to six times before giving up with
//! [`Error::IllConditioned`].
//!
//! Hyperparameters are fitted by maximizing the log marginal likelihood
//!
//! `log p(y | X, θ) = -½ yᵀK⁻¹y - ½ log|K| - (n/2) log 2π`
//!
//! with its analytic gradient `½ tr((aaᵀ - K⁻¹) ∂K/∂θ)`, `a = K⁻¹y`, using
//! `argmin`'s L-BFGS from several starting points. The search runs
//! unconstrained in log space; each optimum is clamped to the
//! hyperparameter bounds before it is scored.

use argmin::core::{CostFunction, Error as SolverError, Executor, Gradient, State};
use argmin::solver::linesearch::MoreThuenteLineSearch;
use argmin::solver::quasinewton::LBFGS;
use nalgebra::{DMatrix, DVector, Dyn, linalg::Cholesky};

use crate::error::{Error, Result};
use crate::history::History;
use crate::kernel::Kernel;
use crate::restarts;
use crate::rng_util;

/// Default diagonal jitter.
pub(crate) const DEFAULT_JITTER: f64 = 1e-6;
/// Default number of likelihood-fit restarts.
pub(crate) const DEFAULT_FIT_RESTARTS: usize = 10;
/// Number of tenfold jitter increases tried before a fit is abandoned.
const MAX_JITTER_ESCALATIONS: usize = 6;
/// Minimum likelihood gain required to replace the current hyperparameters.
const MIN_LML_GAIN: f64 = 1e-9;
/// L-BFGS history length for the likelihood fit.
const FIT_LBFGS_MEMORY: usize = 7;
/// Iteration cap per likelihood-fit start.
const FIT_MAX_ITERS: u64 = 200;
const FIT_TOL_GRAD: f64 = 1e-6;
const FIT_TOL_COST: f64 = 1e-10;

const LN_2PI: f64 = 1.837_877_066_409_345_3;

/// Gaussian-process prior plus the hyperparameter-fitting policy.
///
/// # Examples
///
/// ```
/// use bayesopt::{GaussianProcess, History, Kernel, KernelFamily};
///
/// let kernel = Kernel::isotropic(KernelFamily::Matern52, 1, 0.3).unwrap();
/// let mut gp = GaussianProcess::new(kernel).jitter(1e-6);
///
/// let history = History::from_pairs([(vec![0.0], 0.0), (vec![0.5], 1.0), (vec![1.0], 0.0)]).unwrap();
/// let mut rng = fastrand::Rng::with_seed(1);
/// let posterior = gp.fit(&history, &mut rng).unwrap();
///
/// let at_peak = posterior.predict(&[0.5]);
/// assert!((at_peak.mean - 1.0).abs() < 1e-2);
/// ```
#[derive(Clone, Debug)]
pub struct GaussianProcess {
    kernel: Kernel,
    jitter: f64,
    normalize_y: bool,
    n_restarts: usize,
    length_scale_bounds: (f64, f64),
    variance_bounds: (f64, f64),
}

impl GaussianProcess {
    /// Creates a GP with the given kernel and default options:
    ///
    /// - `jitter`: 1e-6
    /// - `normalize_y`: true
    /// - `n_restarts`: 10
    /// - `length_scale_bounds`: `(1e-2, 1e2)`
    /// - `variance_bounds`: `(1e-2, 1e2)`
    #[must_use]
    pub fn new(kernel: Kernel) -> Self {
        Self {
            kernel,
            jitter: DEFAULT_JITTER,
            normalize_y: true,
            n_restarts: DEFAULT_FIT_RESTARTS,
            length_scale_bounds: (1e-2, 1e2),
            variance_bounds: (1e-2, 1e2),
        }
    }

    /// Sets the value added to the Gram matrix diagonal.
    ///
    /// Acts both as observation-noise variance and as a conditioning guard.
    /// With [`normalize_y`](Self::normalize_y) on, `α` applies to the
    /// standardized outcomes: the predictive variance at an observed point
    /// is about `α·s²`, where `s` is the sample standard deviation of the
    /// observed outcomes. Turn normalization off to state `α` in the
    /// outcome's own units.
    #[must_use]
    pub fn jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter;
        self
    }

    /// Standardize outcomes to zero mean and unit variance before fitting.
    #[must_use]
    pub fn normalize_y(mut self, normalize: bool) -> Self {
        self.normalize_y = normalize;
        self
    }

    /// Number of L-BFGS starts for hyperparameter fitting.
    ///
    /// `0` keeps the kernel parameters fixed.
    #[must_use]
    pub fn n_restarts(mut self, n: usize) -> Self {
        self.n_restarts = n;
        self
    }

    /// Bounds applied to every length-scale during fitting.
    #[must_use]
    pub fn length_scale_bounds(mut self, low: f64, high: f64) -> Self {
        self.length_scale_bounds = (low, high);
        self
    }

    /// Bounds applied to the signal variance during fitting.
    #[must_use]
    pub fn variance_bounds(mut self, low: f64, high: f64) -> Self {
        self.variance_bounds = (low, high);
        self
    }

    /// The kernel with its current hyperparameters.
    #[must_use]
    pub fn kernel(&self) -> &Kernel {
        &self.kernel
    }

    /// The configured diagonal jitter.
    #[must_use]
    pub fn jitter_value(&self) -> f64 {
        self.jitter
    }

    fn validate(&self, history: &History) -> Result<()> {
        if !(self.jitter.is_finite() && self.jitter > 0.0) {
            return Err(Error::InvalidJitter(self.jitter));
        }
        if let Some(d) = history.dimension()
            && d != self.kernel.dimension()
        {
            return Err(Error::DimensionMismatch {
                expected: self.kernel.dimension(),
                got: d,
            });
        }
        Ok(())
    }

    fn log_bounds(&self) -> Vec<(f64, f64)> {
        let (l_lo, l_hi) = self.length_scale_bounds;
        let (v_lo, v_hi) = self.variance_bounds;
        let mut bounds = vec![(l_lo.ln(), l_hi.ln()); self.kernel.dimension()];
        bounds.push((v_lo.ln(), v_hi.ln()));
        bounds
    }

    /// Conditions the GP on `history` with the current hyperparameters,
    /// without refitting them.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidJitter`], [`Error::DimensionMismatch`], or
    /// [`Error::IllConditioned`] if the Gram matrix cannot be factored.
    pub fn condition(&self, history: &History) -> Result<Posterior> {
        self.validate(history)?;
        let data = TrainingData::new(history, self.normalize_y);
        Posterior::build(self.kernel.clone(), data, self.jitter)
    }

    /// Refits the kernel hyperparameters on `history` and returns the
    /// resulting posterior.
    ///
    /// The first L-BFGS start is the current hyperparameters; the others
    /// are drawn uniformly from the log-space bounds using `rng`. Each
    /// optimum is clamped to the bounds and rescored; the best one replaces the current hyperparameters only if it improves the
    /// log marginal likelihood; otherwise the previous values are kept.
    /// Fewer than two observations skip the refit.
    ///
    /// # Errors
    ///
    /// Same as [`condition`](Self::condition).
    pub fn fit(&mut self, history: &History, rng: &mut fastrand::Rng) -> Result<Posterior> {
        self.validate(history)?;
        let data = TrainingData::new(history, self.normalize_y);

        if data.len() >= 2 && self.n_restarts > 0 {
            self.refit_hyperparameters(&data, rng);
        }

        Posterior::build(self.kernel.clone(), data, self.jitter)
    }

    fn refit_hyperparameters(&mut self, data: &TrainingData, rng: &mut fastrand::Rng) {
        let bounds = self.log_bounds();
        let current = self.kernel.log_params();
        let baseline = neg_log_marginal_likelihood(&self.kernel, data, self.jitter, &current).0;

        let mut starts = Vec::with_capacity(self.n_restarts);
        starts.push(current);
        for _ in 1..self.n_restarts {
            starts.push(
                bounds
                    .iter()
                    .map(|&(lo, hi)| rng_util::f64_range(rng, lo, hi))
                    .collect::<Vec<f64>>(),
            );
        }

        let kernel = &self.kernel;
        let jitter = self.jitter;
        let fits = restarts::map_starts(&starts, |start| {
            let theta = maximize_likelihood(kernel, data, jitter, start)
                .map_or_else(|| start.clone(), |theta| clamp_to(&theta, &bounds));
            let value = neg_log_marginal_likelihood(kernel, data, jitter, &theta).0;
            (theta, value)
        });

        let best = restarts::argmin_finite(fits.iter().map(|(_, value)| *value)).map(|i| &fits[i]);
        match best {
            Some((theta, value)) if !baseline.is_finite() || *value < baseline - MIN_LML_GAIN => {
                if self.kernel.set_log_params(theta).is_ok() {
                    trace_debug!(
                        log_marginal_likelihood = -value,
                        "kernel hyperparameters updated"
                    );
                } else {
                    trace_warn!("fitted kernel hyperparameters rejected; keeping previous values");
                }
            }
            Some(_) => {
                trace_debug!("no restart improved the marginal likelihood; keeping hyperparameters");
            }
            None => {
                trace_warn!(
                    n_restarts = starts.len(),
                    "kernel fit failed on every restart; keeping previous hyperparameters"
                );
            }
        }
    }
}

/// Observations prepared for the GP: inputs plus (optionally) standardized
/// outcomes and the affine map back to original units.
#[derive(Clone, Debug)]
struct TrainingData {
    x: Vec<Vec<f64>>,
    y: DVector<f64>,
    y_mean: f64,
    y_std: f64,
}

impl TrainingData {
    #[allow(clippy::cast_precision_loss)]
    fn new(history: &History, normalize: bool) -> Self {
        let x: Vec<Vec<f64>> = history.iter().map(|p| p.x.clone()).collect();
        let raw: Vec<f64> = history.iter().map(|p| p.y).collect();
        let n = raw.len();

        let (y_mean, y_std) = if normalize && n > 0 {
            let mean = raw.iter().sum::<f64>() / n as f64;
            let var = if n > 1 {
                raw.iter().map(|&y| (y - mean).powi(2)).sum::<f64>() / (n - 1) as f64
            } else {
                0.0
            };
            let std = var.sqrt();
            (mean, if std > 1e-12 { std } else { 1.0 })
        } else {
            (0.0, 1.0)
        };

        let y = DVector::from_iterator(n, raw.iter().map(|&v| (v - y_mean) / y_std));
        Self {
            x,
            y,
            y_mean,
            y_std,
        }
    }

    fn len(&self) -> usize {
        self.x.len()
    }
}

/// Build `k(X, X) + jitter·I`.
fn gram_matrix(kernel: &Kernel, x: &[Vec<f64>], jitter: f64) -> DMatrix<f64> {
    let n = x.len();
    let mut k = DMatrix::zeros(n, n);
    for i in 0..n {
        for j in 0..=i {
            let v = kernel.covariance(&x[i], &x[j]);
            k[(i, j)] = v;
            k[(j, i)] = v;
        }
        k[(i, i)] += jitter;
    }
    k
}

/// `log|K| = 2 Σ log L_ii`.
fn log_determinant(cholesky: &Cholesky<f64, Dyn>) -> f64 {
    2.0 * cholesky.l_dirty().diagonal().iter().map(|v| v.ln()).sum::<f64>()
}

/// Runs L-BFGS with a Moré–Thuente line search on the negative log marginal
/// likelihood from `start`. `None` when the solver aborts, which happens as
/// soon as a trial step leaves the region where `K` can be factored.
fn maximize_likelihood(
    kernel: &Kernel,
    data: &TrainingData,
    jitter: f64,
    start: &[f64],
) -> Option<Vec<f64>> {
    let solver = LBFGS::new(MoreThuenteLineSearch::new(), FIT_LBFGS_MEMORY)
        .with_tolerance_grad(FIT_TOL_GRAD)
        .ok()?
        .with_tolerance_cost(FIT_TOL_COST)
        .ok()?;
    let problem = MarginalLikelihood {
        kernel,
        data,
        jitter,
    };
    let result = Executor::new(problem, solver)
        .configure(|state| state.param(start.to_vec()).max_iters(FIT_MAX_ITERS))
        .run()
        .ok()?;
    result.state().get_best_param().cloned()
}

fn clamp_to(theta: &[f64], bounds: &[(f64, f64)]) -> Vec<f64> {
    theta
        .iter()
        .zip(bounds)
        .map(|(&t, &(lo, hi))| t.clamp(lo, hi))
        .collect()
}

/// `-log p(y | X, θ)` over log-parameters, in the shape `argmin` expects.
struct MarginalLikelihood<'a> {
    kernel: &'a Kernel,
    data: &'a TrainingData,
    jitter: f64,
}

impl MarginalLikelihood<'_> {
    fn ill_conditioned(&self) -> SolverError {
        Error::IllConditioned {
            jitter: self.jitter,
        }
        .into()
    }
}

impl CostFunction for MarginalLikelihood<'_> {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, theta: &Self::Param) -> core::result::Result<f64, SolverError> {
        let (value, _) = neg_log_marginal_likelihood(self.kernel, self.data, self.jitter, theta);
        if value.is_finite() {
            Ok(value)
        } else {
            Err(self.ill_conditioned())
        }
    }
}

impl Gradient for MarginalLikelihood<'_> {
    type Param = Vec<f64>;
    type Gradient = Vec<f64>;

    fn gradient(&self, theta: &Self::Param) -> core::result::Result<Vec<f64>, SolverError> {
        let (_, grad) = neg_log_marginal_likelihood(self.kernel, self.data, self.jitter, theta);
        if grad.iter().all(|g| g.is_finite()) {
            Ok(grad)
        } else {
            Err(self.ill_conditioned())
        }
    }
}

/// Negative log marginal likelihood and its gradient at log-parameters `theta`.
///
/// Returns `(+inf, NaN…)` when `theta` is invalid or `K` is not positive
/// definite.
#[allow(clippy::cast_precision_loss)]
fn neg_log_marginal_likelihood(
    kernel: &Kernel,
    data: &TrainingData,
    jitter: f64,
    theta: &[f64],
) -> (f64, Vec<f64>) {
    let failed = || (f64::INFINITY, vec![f64::NAN; theta.len()]);

    let mut kernel = kernel.clone();
    if kernel.set_log_params(theta).is_err() {
        return failed();
    }
    let n = data.len();
    let Some(cholesky) = Cholesky::new(gram_matrix(&kernel, &data.x, jitter)) else {
        return failed();
    };

    let alpha = cholesky.solve(&data.y);
    let lml = -0.5 * data.y.dot(&alpha) - 0.5 * log_determinant(&cholesky) - 0.5 * n as f64 * LN_2PI;

    // W = a aᵀ - K⁻¹; dL/dθ_j = ½ Σ_ik W_ik ∂K_ik/∂θ_j
    let k_inv = cholesky.inverse();
    let mut grad = vec![0.0; theta.len()];
    for i in 0..n {
        for k in 0..=i {
            let w = alpha[i] * alpha[k] - k_inv[(i, k)];
            let weight = if i == k { 0.5 * w } else { w };
            let dk = kernel.gradient_params(&data.x[i], &data.x[k]);
            for (g, d) in grad.iter_mut().zip(&dk) {
                *g += weight * d;
            }
        }
    }

    if !lml.is_finite() {
        return failed();
    }
    (-lml, grad.into_iter().map(|g| -g).collect())
}

/// Posterior mean and standard deviation at a query point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Prediction {
    /// Posterior mean `μ(x)`.
    pub mean: f64,
    /// Posterior standard deviation `σ(x) ≥ 0`.
    pub std: f64,
}

impl Prediction {
    /// Posterior variance `σ²(x)`.
    #[must_use]
    pub fn variance(&self) -> f64 {
        self.std * self.std
    }
}

/// A [`Prediction`] together with its gradients with respect to the input.
#[derive(Clone, Debug, PartialEq)]
pub struct PredictionGradient {
    /// Posterior mean and standard deviation.
    pub prediction: Prediction,
    /// `∂μ/∂x`.
    pub mean_grad: Vec<f64>,
    /// `∂σ/∂x`; zero wherever `σ = 0`.
    pub std_grad: Vec<f64>,
}

/// An immutable GP posterior conditioned on a fixed set of observations.
///
/// Produced by [`GaussianProcess::fit`] or
/// [`GaussianProcess::condition`]. Predictions are reported in the units
/// of the original outcomes.
#[derive(Clone, Debug)]
pub struct Posterior {
    kernel: Kernel,
    x_train: Vec<Vec<f64>>,
    factor: Option<Factor>,
    y_mean: f64,
    y_std: f64,
    jitter: f64,
    log_marginal_likelihood: f64,
}

#[derive(Clone, Debug)]
struct Factor {
    cholesky: Cholesky<f64, Dyn>,
    /// `K⁻¹ y` in standardized units.
    alpha: DVector<f64>,
}

impl Posterior {
    #[allow(clippy::cast_precision_loss)]
    fn build(kernel: Kernel, data: TrainingData, jitter: f64) -> Result<Self> {
        if data.x.is_empty() {
            return Ok(Self {
                kernel,
                x_train: Vec::new(),
                factor: None,
                y_mean: data.y_mean,
                y_std: data.y_std,
                jitter,
                log_marginal_likelihood: 0.0,
            });
        }

        let base = gram_matrix(&kernel, &data.x, 0.0);
        let mut effective = jitter;
        let mut cholesky = None;
        for attempt in 0..=MAX_JITTER_ESCALATIONS {
            let mut k = base.clone();
            for i in 0..k.nrows() {
                k[(i, i)] += effective;
            }
            if let Some(c) = Cholesky::new(k) {
                if attempt > 0 {
                    trace_warn!(
                        jitter = effective,
                        "Gram matrix ill-conditioned; jitter increased"
                    );
                }
                cholesky = Some(c);
                break;
            }
            if attempt < MAX_JITTER_ESCALATIONS {
                effective *= 10.0;
            }
        }
        let cholesky = cholesky.ok_or(Error::IllConditioned { jitter: effective })?;

        let alpha = cholesky.solve(&data.y);
        let n = data.len() as f64;
        let log_marginal_likelihood =
            -0.5 * data.y.dot(&alpha) - 0.5 * log_determinant(&cholesky) - 0.5 * n * LN_2PI;

        Ok(Self {
            kernel,
            x_train: data.x,
            factor: Some(Factor { cholesky, alpha }),
            y_mean: data.y_mean,
            y_std: data.y_std,
            jitter: effective,
            log_marginal_likelihood,
        })
    }

    /// Number of observations conditioned on.
    #[must_use]
    pub fn n_observations(&self) -> usize {
        self.x_train.len()
    }

    /// The kernel used by this posterior.
    #[must_use]
    pub fn kernel(&self) -> &Kernel {
        &self.kernel
    }

    /// Jitter actually added to the diagonal, after any escalation.
    #[must_use]
    pub fn effective_jitter(&self) -> f64 {
        self.jitter
    }

    /// Log marginal likelihood of the (standardized) observations.
    /// Zero for the prior.
    #[must_use]
    pub fn log_marginal_likelihood(&self) -> f64 {
        self.log_marginal_likelihood
    }

    fn kernel_vector(&self, x: &[f64]) -> DVector<f64> {
        DVector::from_fn(self.x_train.len(), |i, _| {
            self.kernel.covariance(x, &self.x_train[i])
        })
    }

    /// Standardized mean and variance, plus `K⁻¹k*` when observations exist.
    fn latent(&self, x: &[f64]) -> (f64, f64, Option<DVector<f64>>) {
        let prior_var = self.kernel.variance();
        match &self.factor {
            None => (0.0, prior_var, None),
            Some(factor) => {
                let k_star = self.kernel_vector(x);
                let mean = k_star.dot(&factor.alpha);
                let v = factor.cholesky.solve(&k_star);
                let var = (prior_var - k_star.dot(&v)).max(0.0);
                (mean, var, Some(v))
            }
        }
    }

    /// Posterior mean and standard deviation at `x`.
    ///
    /// Before any observation this is the prior: mean `0` (or the
    /// normalization offset) and variance `k(x, x)`.
    #[must_use]
    pub fn predict(&self, x: &[f64]) -> Prediction {
        let (mean, var, _) = self.latent(x);
        Prediction {
            mean: self.y_mean + self.y_std * mean,
            std: self.y_std * var.sqrt(),
        }
    }

    /// Posterior prediction and its input gradients at `x`.
    #[must_use]
    pub fn predict_with_gradient(&self, x: &[f64]) -> PredictionGradient {
        let d = x.len();
        let (mean, var, v) = self.latent(x);
        let std = var.sqrt();

        let mut mean_grad = vec![0.0; d];
        let mut var_grad = vec![0.0; d];
        if let (Some(factor), Some(v)) = (&self.factor, v) {
            for (i, xi) in self.x_train.iter().enumerate() {
                let dk = self.kernel.gradient_x(x, xi);
                for j in 0..d {
                    mean_grad[j] += factor.alpha[i] * dk[j];
                    // σ² = k** - k*ᵀK⁻¹k*, k** constant for stationary kernels
                    var_grad[j] -= 2.0 * v[i] * dk[j];
                }
            }
        }

        let std_grad = var_grad
            .iter()
            .map(|g| if std > 0.0 { self.y_std * g / (2.0 * std) } else { 0.0 })
            .collect();
        PredictionGradient {
            prediction: Prediction {
                mean: self.y_mean + self.y_std * mean,
                std: self.y_std * std,
            },
            mean_grad: mean_grad.iter().map(|g| self.y_std * g).collect(),
            std_grad,
        }
    }
}
