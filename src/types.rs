//! Core types shared across the optimizer.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The direction of optimization.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Direction {
    /// Minimize the objective value.
    Minimize,
    /// Maximize the objective value (the default).
    #[default]
    Maximize,
}

impl Direction {
    /// Multiplier that turns an outcome into the maximization frame used by
    /// the surrogate and the acquisition function.
    #[must_use]
    pub fn sign(self) -> f64 {
        match self {
            Self::Maximize => 1.0,
            Self::Minimize => -1.0,
        }
    }

    /// Returns `true` if `a` is strictly better than `b` in this direction.
    #[must_use]
    pub fn is_better(self, a: f64, b: f64) -> bool {
        match self {
            Self::Maximize => a > b,
            Self::Minimize => a < b,
        }
    }
}

/// Why an optimization run stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Termination {
    /// All `n_iters` iterations ran.
    BudgetExhausted,
    /// A configured convergence criterion was met.
    Converged,
    /// An objective hook returned `ControlFlow::Break`.
    Cancelled,
    /// Every dimension of the domain is a single point.
    DegenerateDomain,
}

/// Lifecycle of an optimization run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum LoopState {
    /// History is seeded but no surrogate has been fitted.
    Init,
    /// Fit/propose/evaluate iterations are running.
    Iterating,
    /// The run finished for the given reason.
    Done(Termination),
}
