use core::ops::ControlFlow;

use crate::error::Result;
use crate::history::History;
use crate::objective::Objective;

use super::run::Run;
use super::{BayesianOptimizer, Interrupted, OptimizationResult};

impl BayesianOptimizer {
    /// Run the optimization from a freshly drawn initial design.
    ///
    /// Evaluates `n_initial` points from the configured
    /// [`InitialDesign`](crate::InitialDesign), then alternates surrogate
    /// fitting, acquisition maximization, and a single evaluation for up to
    /// `n_iters` iterations. The [`Objective`] hooks can stop the loop early.
    ///
    /// # Errors
    ///
    /// Returns [`Interrupted`] carrying the partial history if the objective
    /// fails or returns a non-finite value.
    ///
    /// # Examples
    ///
    /// ```
    /// use bayesopt::prelude::*;
    ///
    /// let optimizer = BayesianOptimizer::builder()
    ///     .domain(SearchDomain::new(vec![(-1.0, 1.0), (-1.0, 1.0)]).unwrap())
    ///     .minimize()
    ///     .n_iters(8)
    ///     .seed(3)
    ///     .build()
    ///     .unwrap();
    ///
    /// let result = optimizer
    ///     .optimize(|x: &[f64]| Ok::<_, Error>(x[0] * x[0] + x[1] * x[1]))
    ///     .unwrap();
    /// assert_eq!(result.iterations, 8);
    /// assert!(result.best.y < 0.5);
    /// ```
    pub fn optimize<O: Objective>(
        &self,
        objective: O,
    ) -> core::result::Result<OptimizationResult, Interrupted> {
        #[cfg(feature = "tracing")]
        let _span = tracing::info_span!(
            "optimize",
            n_iters = self.n_iters,
            dimension = self.domain.dimension(),
            direction = ?self.direction
        )
        .entered();

        self.drive(History::new(), true, &objective)
    }

    /// Run the optimization from a caller-supplied initial design.
    ///
    /// Every observation in `initial` must match the domain's dimension.
    /// Nothing from the configured initial design is drawn.
    ///
    /// # Errors
    ///
    /// Returns [`Interrupted`] with [`Error::EmptyInitialDesign`](crate::Error::EmptyInitialDesign)
    /// if `initial` is empty (unless the domain is degenerate),
    /// [`Error::DimensionMismatch`](crate::Error::DimensionMismatch) for a
    /// misshapen observation, and otherwise as [`optimize`](Self::optimize).
    ///
    /// # Examples
    ///
    /// ```
    /// use bayesopt::prelude::*;
    ///
    /// let optimizer = BayesianOptimizer::builder()
    ///     .domain(SearchDomain::interval(-2.0, 2.0).unwrap())
    ///     .n_iters(5)
    ///     .seed(0)
    ///     .build()
    ///     .unwrap();
    ///
    /// let initial = History::from_pairs([(vec![-1.5], -6.25), (vec![0.0], -1.0)]).unwrap();
    /// let result = optimizer
    ///     .run(initial, |x: &[f64]| Ok::<_, Error>(-(x[0] - 1.0).powi(2)))
    ///     .unwrap();
    /// assert_eq!(result.history.len(), 2 + 5);
    /// ```
    pub fn run<O: Objective>(
        &self,
        initial: History,
        objective: O,
    ) -> core::result::Result<OptimizationResult, Interrupted> {
        #[cfg(feature = "tracing")]
        let _span = tracing::info_span!(
            "run",
            n_iters = self.n_iters,
            initial = initial.len(),
            direction = ?self.direction
        )
        .entered();

        self.drive(initial, false, &objective)
    }

    fn drive<O: Objective>(
        &self,
        initial: History,
        draw_design: bool,
        objective: &O,
    ) -> core::result::Result<OptimizationResult, Interrupted> {
        let mut run = Run::new(self, initial);
        match iterate(&mut run, draw_design, objective) {
            Ok(()) => run.into_result(),
            Err(e) => Err(run.interrupt(e)),
        }
    }
}

fn iterate<O: Objective>(run: &mut Run<'_>, draw_design: bool, objective: &O) -> Result<()> {
    for x in run.begin(draw_design)? {
        let outcome = objective.evaluate(&x).map_err(|e| e.to_string());
        run.record(x, outcome)?;
    }

    while run.wants_more() {
        if let ControlFlow::Break(()) = objective.before_iteration(run.history()) {
            run.cancel();
            break;
        }
        let Some(x) = run.propose() else {
            break;
        };
        let outcome = objective.evaluate(&x).map_err(|e| e.to_string());
        run.record(x, outcome)?;

        if let Some(latest) = run.history().last()
            && let ControlFlow::Break(()) = objective.after_iteration(run.history(), latest)
        {
            run.cancel();
            break;
        }
        run.check_convergence();
    }
    Ok(())
}
