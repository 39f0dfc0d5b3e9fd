#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![deny(unreachable_pub)]
#![deny(clippy::correctness)]
#![deny(clippy::suspicious)]
#![deny(clippy::style)]
#![deny(clippy::complexity)]
#![deny(clippy::perf)]
#![deny(clippy::pedantic)]
#![deny(clippy::std_instead_of_core)]

//! Sequential model-based optimization of expensive black-box functions
//! over box-bounded continuous domains. A Gaussian-process surrogate is
//! refit after every evaluation and the next point is chosen by maximizing
//! an acquisition function such as Expected Improvement.
//!
//! # Getting Started
//!
//! ```
//! use bayesopt::prelude::*;
//!
//! let optimizer = BayesianOptimizer::builder()
//!     .domain(SearchDomain::interval(-2.0, 2.0).unwrap())
//!     .n_initial(3)
//!     .n_iters(15)
//!     .seed(7)
//!     .build()
//!     .unwrap();
//!
//! let result = optimizer
//!     .optimize(|x: &[f64]| Ok::<_, Error>(-(x[0] - 1.0).powi(2)))
//!     .unwrap();
//!
//! println!("x = {:.4}, f(x) = {:.4}", result.best.x[0], result.best.y);
//! ```
//!
//! # Core Concepts
//!
//! | Type | Role |
//! |------|------|
//! | [`BayesianOptimizer`] | Drive the fit → propose → evaluate loop and track the best observation. |
//! | [`SearchDomain`] | Per-dimension `[low, high]` bounds of the search space. |
//! | [`History`] | Every `(x, y)` observation in evaluation order. |
//! | [`GaussianProcess`] / [`Posterior`] | The surrogate and its predictive distribution. |
//! | [`Kernel`] | Stationary covariance: Matérn 3/2, Matérn 5/2, or squared exponential. |
//! | [`Acquisition`](acquisition::Acquisition) | Scores candidates from the posterior mean and standard deviation. |
//! | [`Objective`] | The function being optimized, plus optional lifecycle hooks. |
//!
//! # Feature Flags
//!
//! | Flag | What it enables | Default |
//! |------|----------------|---------|
//! | `async` | Async optimization via tokio with per-evaluation timeouts ([`BayesianOptimizer::optimize_async`], [`BayesianOptimizer::run_async`]) | off |
//! | `parallel` | Kernel-fit and acquisition restarts run on the rayon thread pool | off |
//! | `serde` | `Serialize`/`Deserialize` on histories, domains, and configuration enums | off |
//! | `tracing` | Structured log events via [`tracing`](https://docs.rs/tracing) at key optimization points | off |

/// Emit a `tracing::info!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_info {
    ($($arg:tt)*) => { tracing::info!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_info {
    ($($arg:tt)*) => {};
}

/// Emit a `tracing::debug!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_debug {
    ($($arg:tt)*) => { tracing::debug!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_debug {
    ($($arg:tt)*) => {};
}

/// Emit a `tracing::warn!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_warn {
    ($($arg:tt)*) => { tracing::warn!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_warn {
    ($($arg:tt)*) => {};
}

pub mod acquisition;
mod design;
mod domain;
mod error;
mod gp;
mod history;
mod kernel;
mod lbfgs;
pub mod objective;
mod optimizer;
mod restarts;
mod rng_util;
mod types;

pub use design::InitialDesign;
pub use domain::SearchDomain;
pub use error::{Error, Result};
pub use gp::{GaussianProcess, Posterior, Prediction, PredictionGradient};
pub use history::{History, ObservedPoint};
pub use kernel::{Kernel, KernelFamily};
pub use objective::Objective;
pub use optimizer::{
    BayesianOptimizer, BayesianOptimizerBuilder, ConvergenceCriteria, ImprovementWindow,
    Interrupted, OptimizationResult,
};
pub use types::{Direction, Termination};

/// Convenient wildcard import for the most common types.
///
/// ```
/// use bayesopt::prelude::*;
/// ```
pub mod prelude {
    pub use crate::acquisition::{
        Acquisition, ExpectedImprovement, ProbabilityOfImprovement, UpperConfidenceBound,
    };
    pub use crate::design::InitialDesign;
    pub use crate::domain::SearchDomain;
    pub use crate::error::{Error, Result};
    pub use crate::gp::{GaussianProcess, Posterior, Prediction};
    pub use crate::history::{History, ObservedPoint};
    pub use crate::kernel::{Kernel, KernelFamily};
    pub use crate::objective::Objective;
    pub use crate::optimizer::{
        BayesianOptimizer, BayesianOptimizerBuilder, ConvergenceCriteria, ImprovementWindow,
        Interrupted, OptimizationResult,
    };
    pub use crate::types::{Direction, Termination};
}
