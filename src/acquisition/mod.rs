//! Acquisition functions and their maximization.
//!
//! An acquisition function scores a point from the surrogate's posterior
//! mean `μ`, standard deviation `σ`, and the best outcome observed so far.
//! Scores are always framed for **maximization**: higher is more
//! promising, and the incumbent is the largest observed outcome. The
//! optimization loop negates outcomes once, up front, when minimizing.
//!
//! | Acquisition | Value |
//! |-------------|-------|
//! | [`ExpectedImprovement`] | `(μ - y* - ξ) Φ(z) + σ φ(z)`, `z = (μ - y* - ξ) / σ` |
//! | [`ProbabilityOfImprovement`] | `Φ(z)` |
//! | [`UpperConfidenceBound`] | `μ + κ σ` |
//!
//! Each implementation also reports `∂a/∂μ` and `∂a/∂σ`, which
//! [`value_and_gradient`] chains with the posterior's input gradients.

pub mod optimizer;

use crate::gp::Posterior;

pub use optimizer::{AcquisitionOptimizer, Candidate};

/// Standard deviations below this are treated as zero.
const MIN_STD: f64 = 1e-12;

/// Standard normal PDF.
pub(crate) fn norm_pdf(x: f64) -> f64 {
    const INV_SQRT_2PI: f64 = 0.398_942_280_401_432_7;
    INV_SQRT_2PI * (-0.5 * x * x).exp()
}

/// Standard normal CDF (Abramowitz-Stegun 26.2.17, |error| < 7.5e-8).
pub(crate) fn norm_cdf(x: f64) -> f64 {
    if x < -8.0 {
        return 0.0;
    }
    if x > 8.0 {
        return 1.0;
    }

    let t = 1.0 / (1.0 + 0.231_641_9 * x.abs());
    let poly = t
        * (0.319_381_530
            + t * (-0.356_563_782 + t * (1.781_477_937 + t * (-1.821_255_978 + t * 1.330_274_429))));
    let upper_tail = norm_pdf(x) * poly;

    if x >= 0.0 { 1.0 - upper_tail } else { upper_tail }
}

/// An acquisition value with its partial derivatives in `μ` and `σ`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AcquisitionValue {
    /// The acquisition score.
    pub value: f64,
    /// `∂a/∂μ`.
    pub d_mean: f64,
    /// `∂a/∂σ`.
    pub d_std: f64,
}

impl AcquisitionValue {
    const ZERO: Self = Self {
        value: 0.0,
        d_mean: 0.0,
        d_std: 0.0,
    };
}

/// A utility over the surrogate posterior used to rank candidate points.
pub trait Acquisition: Send + Sync {
    /// Score a point with posterior `mean` and `std` against the incumbent
    /// `best` (maximization frame).
    fn evaluate(&self, mean: f64, std: f64, best: f64) -> AcquisitionValue;
}

/// Expected Improvement over the incumbent.
///
/// `ξ` (`xi`) shifts the incumbent upward to favor exploration; the
/// default `0.0` gives the classical criterion. The value is zero wherever
/// `σ = 0` and never negative.
///
/// # Examples
///
/// ```
/// use bayesopt::acquisition::{Acquisition, ExpectedImprovement};
///
/// let ei = ExpectedImprovement::new();
/// assert_eq!(ei.evaluate(5.0, 0.0, 1.0).value, 0.0);
/// assert!(ei.evaluate(1.0, 1.0, 1.0).value > 0.39);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ExpectedImprovement {
    xi: f64,
}

impl ExpectedImprovement {
    /// Classical EI (`ξ = 0`).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the exploration margin `ξ ≥ 0`.
    #[must_use]
    pub fn xi(mut self, xi: f64) -> Self {
        self.xi = xi.max(0.0);
        self
    }
}

impl Acquisition for ExpectedImprovement {
    fn evaluate(&self, mean: f64, std: f64, best: f64) -> AcquisitionValue {
        if std < MIN_STD {
            return AcquisitionValue::ZERO;
        }
        let improvement = mean - best - self.xi;
        let z = improvement / std;
        let cdf = norm_cdf(z);
        let pdf = norm_pdf(z);
        let value = improvement * cdf + std * pdf;
        if value <= 0.0 {
            return AcquisitionValue::ZERO;
        }
        AcquisitionValue {
            value,
            d_mean: cdf,
            d_std: pdf,
        }
    }
}

/// Probability that a point improves on the incumbent by more than `ξ`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ProbabilityOfImprovement {
    xi: f64,
}

impl ProbabilityOfImprovement {
    /// PI with `ξ = 0`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the improvement margin `ξ ≥ 0`.
    #[must_use]
    pub fn xi(mut self, xi: f64) -> Self {
        self.xi = xi.max(0.0);
        self
    }
}

impl Acquisition for ProbabilityOfImprovement {
    fn evaluate(&self, mean: f64, std: f64, best: f64) -> AcquisitionValue {
        let improvement = mean - best - self.xi;
        if std < MIN_STD {
            let value = if improvement > 0.0 { 1.0 } else { 0.0 };
            return AcquisitionValue {
                value,
                ..AcquisitionValue::ZERO
            };
        }
        let z = improvement / std;
        let pdf = norm_pdf(z);
        AcquisitionValue {
            value: norm_cdf(z),
            d_mean: pdf / std,
            d_std: -z * pdf / std,
        }
    }
}

/// Optimistic bound `μ + κσ`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UpperConfidenceBound {
    kappa: f64,
}

impl UpperConfidenceBound {
    /// UCB with exploration weight `κ` (clamped to be non-negative).
    #[must_use]
    pub fn new(kappa: f64) -> Self {
        Self {
            kappa: kappa.max(0.0),
        }
    }
}

impl Default for UpperConfidenceBound {
    fn default() -> Self {
        Self::new(2.0)
    }
}

impl Acquisition for UpperConfidenceBound {
    fn evaluate(&self, mean: f64, std: f64, _best: f64) -> AcquisitionValue {
        AcquisitionValue {
            value: mean + self.kappa * std,
            d_mean: 1.0,
            d_std: self.kappa,
        }
    }
}

/// Acquisition value at `x` and its gradient with respect to `x`, chained
/// through the posterior's mean and standard-deviation gradients.
#[must_use]
pub fn value_and_gradient(
    acquisition: &dyn Acquisition,
    posterior: &Posterior,
    x: &[f64],
    best: f64,
) -> (f64, Vec<f64>) {
    let pg = posterior.predict_with_gradient(x);
    let a = acquisition.evaluate(pg.prediction.mean, pg.prediction.std, best);
    let grad = pg
        .mean_grad
        .iter()
        .zip(&pg.std_grad)
        .map(|(dm, ds)| a.d_mean * dm + a.d_std * ds)
        .collect();
    (a.value, grad)
}

/// Acquisition value at `x`.
#[must_use]
pub fn value(acquisition: &dyn Acquisition, posterior: &Posterior, x: &[f64], best: f64) -> f64 {
    let p = posterior.predict(x);
    acquisition.evaluate(p.mean, p.std, best).value
}
