//! Stationary covariance kernels with ARD length-scales.
//!
//! Every family is a function of the scaled distance
//! `r = sqrt(Σ ((a_i - b_i) / l_i)²)` multiplied by a signal variance `σ²`:
//!
//! | Family | `k(r) / σ²` |
//! |--------|-------------|
//! | [`Matern32`](KernelFamily::Matern32) | `(1 + √3 r) exp(-√3 r)` |
//! | [`Matern52`](KernelFamily::Matern52) | `(1 + √5 r + 5/3 r²) exp(-√5 r)` |
//! | [`SquaredExponential`](KernelFamily::SquaredExponential) | `exp(-r² / 2)` |
//!
//! All three are positive-definite on any finite set of distinct inputs and
//! differentiable in both the inputs and the parameters, which the
//! likelihood fit and the acquisition gradient rely on.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const SQRT_3: f64 = 1.732_050_807_568_877;
const SQRT_5: f64 = 2.236_067_977_499_79;

/// Shape of the covariance as a function of scaled distance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum KernelFamily {
    /// Matérn ν = 3/2: once mean-square differentiable sample paths.
    Matern32,
    /// Matérn ν = 5/2: twice differentiable; the usual choice for tuning.
    #[default]
    Matern52,
    /// Squared exponential (RBF): infinitely smooth sample paths.
    SquaredExponential,
}

impl KernelFamily {
    /// `k(r) / σ²` evaluated at `r² = r_sq`.
    fn profile(self, r_sq: f64) -> f64 {
        match self {
            Self::Matern32 => {
                let s = SQRT_3 * r_sq.sqrt();
                (1.0 + s) * (-s).exp()
            }
            Self::Matern52 => {
                let s = SQRT_5 * r_sq.sqrt();
                (1.0 + s + 5.0 / 3.0 * r_sq) * (-s).exp()
            }
            Self::SquaredExponential => (-0.5 * r_sq).exp(),
        }
    }

    /// Derivative of the profile with respect to `r²`. Finite at `r = 0`.
    fn profile_slope(self, r_sq: f64) -> f64 {
        match self {
            Self::Matern32 => -1.5 * (-SQRT_3 * r_sq.sqrt()).exp(),
            Self::Matern52 => {
                let s = SQRT_5 * r_sq.sqrt();
                -5.0 / 6.0 * (1.0 + s) * (-s).exp()
            }
            Self::SquaredExponential => -0.5 * (-0.5 * r_sq).exp(),
        }
    }
}

/// A parameterized stationary kernel.
///
/// Parameters are exposed in log space as
/// `[ln l_1, …, ln l_d, ln σ²]` so that unconstrained optimization keeps
/// them positive.
///
/// # Examples
///
/// ```
/// use bayesopt::{Kernel, KernelFamily};
///
/// let k = Kernel::isotropic(KernelFamily::Matern52, 2, 0.5).unwrap();
/// assert!((k.covariance(&[0.0, 0.0], &[0.0, 0.0]) - 1.0).abs() < 1e-12);
/// assert!(k.covariance(&[0.0, 0.0], &[1.0, 1.0]) < 0.1);
/// ```
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Kernel {
    family: KernelFamily,
    length_scales: Vec<f64>,
    variance: f64,
}

impl Kernel {
    /// Creates a kernel with one length-scale per dimension.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKernelParameter`] if any length-scale or the
    /// variance is non-finite or not positive, or if no length-scale is
    /// given.
    pub fn new(family: KernelFamily, length_scales: Vec<f64>, variance: f64) -> Result<Self> {
        if length_scales.is_empty() {
            return Err(Error::InvalidKernelParameter {
                name: "length_scale",
                value: 0.0,
            });
        }
        if let Some(&bad) = length_scales.iter().find(|l| !(l.is_finite() && **l > 0.0)) {
            return Err(Error::InvalidKernelParameter {
                name: "length_scale",
                value: bad,
            });
        }
        if !(variance.is_finite() && variance > 0.0) {
            return Err(Error::InvalidKernelParameter {
                name: "variance",
                value: variance,
            });
        }
        Ok(Self {
            family,
            length_scales,
            variance,
        })
    }

    /// Creates a kernel with the same length-scale in every dimension and
    /// unit variance.
    ///
    /// # Errors
    ///
    /// See [`Kernel::new`].
    pub fn isotropic(family: KernelFamily, dims: usize, length_scale: f64) -> Result<Self> {
        Self::new(family, vec![length_scale; dims], 1.0)
    }

    /// The kernel family.
    #[must_use]
    pub fn family(&self) -> KernelFamily {
        self.family
    }

    /// Input dimension.
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.length_scales.len()
    }

    /// Per-dimension length-scales.
    #[must_use]
    pub fn length_scales(&self) -> &[f64] {
        &self.length_scales
    }

    /// Signal variance, equal to `k(x, x)`.
    #[must_use]
    pub fn variance(&self) -> f64 {
        self.variance
    }

    /// Number of tunable parameters (`d + 1`).
    #[must_use]
    pub fn n_params(&self) -> usize {
        self.length_scales.len() + 1
    }

    /// Parameters as `[ln l_1, …, ln l_d, ln σ²]`.
    #[must_use]
    pub fn log_params(&self) -> Vec<f64> {
        self.length_scales
            .iter()
            .map(|l| l.ln())
            .chain(core::iter::once(self.variance.ln()))
            .collect()
    }

    /// Replaces the parameters from their log-space representation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if `theta` has the wrong length
    /// and [`Error::InvalidKernelParameter`] if exponentiation overflows.
    pub fn set_log_params(&mut self, theta: &[f64]) -> Result<()> {
        if theta.len() != self.n_params() {
            return Err(Error::DimensionMismatch {
                expected: self.n_params(),
                got: theta.len(),
            });
        }
        let d = self.length_scales.len();
        let updated = Self::new(
            self.family,
            theta[..d].iter().map(|t| t.exp()).collect(),
            theta[d].exp(),
        )?;
        *self = updated;
        Ok(())
    }

    fn scaled_sq_distance(&self, a: &[f64], b: &[f64]) -> f64 {
        a.iter()
            .zip(b)
            .zip(&self.length_scales)
            .map(|((ai, bi), l)| {
                let d = (ai - bi) / l;
                d * d
            })
            .sum()
    }

    /// Covariance between `a` and `b`.
    #[must_use]
    pub fn covariance(&self, a: &[f64], b: &[f64]) -> f64 {
        self.variance * self.family.profile(self.scaled_sq_distance(a, b))
    }

    /// Gradient of `k(a, b)` with respect to the log-parameters.
    #[must_use]
    pub fn gradient_params(&self, a: &[f64], b: &[f64]) -> Vec<f64> {
        let r_sq = self.scaled_sq_distance(a, b);
        let slope = self.variance * self.family.profile_slope(r_sq);
        let mut grad: Vec<f64> = a
            .iter()
            .zip(b)
            .zip(&self.length_scales)
            .map(|((ai, bi), l)| {
                let d = (ai - bi) / l;
                // d(r²)/d(ln l) = -2 (Δ/l)²
                -2.0 * d * d * slope
            })
            .collect();
        grad.push(self.variance * self.family.profile(r_sq));
        grad
    }

    /// Gradient of `k(a, b)` with respect to the first argument `a`.
    #[must_use]
    pub fn gradient_x(&self, a: &[f64], b: &[f64]) -> Vec<f64> {
        let r_sq = self.scaled_sq_distance(a, b);
        let slope = self.variance * self.family.profile_slope(r_sq);
        a.iter()
            .zip(b)
            .zip(&self.length_scales)
            .map(|((ai, bi), l)| 2.0 * (ai - bi) / (l * l) * slope)
            .collect()
    }
}
