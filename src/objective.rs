//! The [`Objective`] trait defines what gets optimized.
//!
//! For simple closures, pass them directly to
//! [`BayesianOptimizer::optimize`](crate::BayesianOptimizer::optimize):
//!
//! ```
//! use bayesopt::prelude::*;
//!
//! let optimizer = BayesianOptimizer::builder()
//!     .domain(SearchDomain::interval(-2.0, 2.0).unwrap())
//!     .n_iters(5)
//!     .seed(1)
//!     .build()
//!     .unwrap();
//!
//! let result = optimizer
//!     .optimize(|x: &[f64]| Ok::<_, Error>(-(x[0] - 1.0).powi(2)))
//!     .unwrap();
//! assert_eq!(result.history.len(), 5 + 5);
//! ```
//!
//! For cancellation or per-iteration logging, implement [`Objective`] on a
//! struct and override the hooks:
//!
//! ```
//! use std::ops::ControlFlow;
//!
//! use bayesopt::prelude::*;
//!
//! struct StopAtTarget {
//!     target: f64,
//! }
//!
//! impl Objective for StopAtTarget {
//!     type Error = Error;
//!
//!     fn evaluate(&self, x: &[f64]) -> Result<f64> {
//!         Ok(-(x[0] - 0.5).powi(2))
//!     }
//!
//!     fn after_iteration(&self, _history: &History, latest: &ObservedPoint) -> ControlFlow<()> {
//!         if latest.y > self.target {
//!             ControlFlow::Break(())
//!         } else {
//!             ControlFlow::Continue(())
//!         }
//!     }
//! }
//!
//! let optimizer = BayesianOptimizer::builder()
//!     .domain(SearchDomain::interval(0.0, 1.0).unwrap())
//!     .n_iters(30)
//!     .seed(7)
//!     .build()
//!     .unwrap();
//! let result = optimizer.optimize(StopAtTarget { target: -1e-2 }).unwrap();
//! assert!(result.best.y > -1e-2 || result.iterations == 30);
//! ```

use core::ops::ControlFlow;

use crate::history::{History, ObservedPoint};

/// A black-box objective with lifecycle hooks.
///
/// The only required method is [`evaluate`](Objective::evaluate). It may be
/// slow and noisy and has no access to the optimizer's internal state.
/// Each loop iteration calls it exactly once.
///
/// # Thread safety
///
/// The async methods additionally require `Send + Sync + 'static` on the
/// objective. The sync methods have no thread-safety requirements.
pub trait Objective {
    /// The error type returned by [`evaluate`](Objective::evaluate).
    type Error: ToString + 'static;

    /// Evaluate the objective at `x`.
    ///
    /// # Errors
    ///
    /// Any error whose type implements `ToString`. An error halts the loop;
    /// the history collected so far is returned alongside it.
    fn evaluate(&self, x: &[f64]) -> Result<f64, Self::Error>;

    /// Called before each fit/propose/evaluate iteration.
    ///
    /// Return `ControlFlow::Break(())` to stop before the next evaluation.
    ///
    /// Default: always continues.
    fn before_iteration(&self, _history: &History) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }

    /// Called after each evaluation has been appended to the history.
    ///
    /// Return `ControlFlow::Break(())` to stop the loop.
    ///
    /// Default: always continues.
    fn after_iteration(&self, _history: &History, _latest: &ObservedPoint) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }
}

impl<F, E> Objective for F
where
    F: Fn(&[f64]) -> Result<f64, E>,
    E: ToString + 'static,
{
    type Error = E;

    fn evaluate(&self, x: &[f64]) -> Result<f64, E> {
        self(x)
    }
}
