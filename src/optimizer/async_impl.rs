use core::ops::ControlFlow;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::history::History;
use crate::objective::Objective;

use super::run::Run;
use super::{BayesianOptimizer, Interrupted, OptimizationResult};

impl BayesianOptimizer {
    /// Run async optimization from a freshly drawn initial design.
    ///
    /// Like [`optimize`](Self::optimize), but each evaluation is wrapped in
    /// [`spawn_blocking`](tokio::task::spawn_blocking), keeping the async
    /// runtime responsive for slow objectives. Evaluations stay sequential.
    /// Surrogate fitting runs on the calling task.
    ///
    /// # Errors
    ///
    /// As [`optimize`](Self::optimize), plus
    /// [`Error::EvaluationTimedOut`] when an evaluation exceeds the
    /// configured timeout and [`Error::TaskError`] if an evaluation panics.
    ///
    /// # Examples
    ///
    /// ```
    /// use bayesopt::prelude::*;
    ///
    /// # #[cfg(feature = "async")]
    /// # async fn example() -> bayesopt::Result<()> {
    /// let optimizer = BayesianOptimizer::builder()
    ///     .domain(SearchDomain::interval(0.0, 1.0)?)
    ///     .n_iters(5)
    ///     .seed(42)
    ///     .build()?;
    ///
    /// let result = optimizer
    ///     .optimize_async(|x: &[f64]| Ok::<_, Error>(-(x[0] - 0.3).powi(2)))
    ///     .await?;
    /// assert_eq!(result.iterations, 5);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn optimize_async<O>(
        &self,
        objective: O,
    ) -> core::result::Result<OptimizationResult, Interrupted>
    where
        O: Objective + Send + Sync + 'static,
        O::Error: Send,
    {
        let run = self.drive_async(History::new(), true, objective);

        #[cfg(feature = "tracing")]
        let run = tracing::Instrument::instrument(
            run,
            tracing::info_span!(
                "optimize_async",
                n_iters = self.n_iters,
                dimension = self.domain.dimension(),
                direction = ?self.direction
            ),
        );

        run.await
    }

    /// Run async optimization from a caller-supplied initial design.
    ///
    /// The async counterpart of [`run`](Self::run).
    ///
    /// # Errors
    ///
    /// As [`run`](Self::run) and [`optimize_async`](Self::optimize_async).
    pub async fn run_async<O>(
        &self,
        initial: History,
        objective: O,
    ) -> core::result::Result<OptimizationResult, Interrupted>
    where
        O: Objective + Send + Sync + 'static,
        O::Error: Send,
    {
        #[cfg(feature = "tracing")]
        let span = tracing::info_span!(
            "run_async",
            n_iters = self.n_iters,
            initial = initial.len(),
            direction = ?self.direction
        );

        let run = self.drive_async(initial, false, objective);

        #[cfg(feature = "tracing")]
        let run = tracing::Instrument::instrument(run, span);

        run.await
    }

    async fn drive_async<O>(
        &self,
        initial: History,
        draw_design: bool,
        objective: O,
    ) -> core::result::Result<OptimizationResult, Interrupted>
    where
        O: Objective + Send + Sync + 'static,
        O::Error: Send,
    {
        let objective = Arc::new(objective);
        let mut run = Run::new(self, initial);
        match self.iterate_async(&mut run, draw_design, &objective).await {
            Ok(()) => run.into_result(),
            Err(e) => Err(run.interrupt(e)),
        }
    }

    async fn iterate_async<O>(
        &self,
        run: &mut Run<'_>,
        draw_design: bool,
        objective: &Arc<O>,
    ) -> Result<()>
    where
        O: Objective + Send + Sync + 'static,
        O::Error: Send,
    {
        for x in run.begin(draw_design)? {
            let (x, outcome) = self.evaluate_blocking(objective, x).await?;
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
            let (x, outcome) = self.evaluate_blocking(objective, x).await?;
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

    /// Evaluates `x` on the blocking pool, honoring the evaluation timeout.
    /// A timed-out evaluation is abandoned; its late result is discarded.
    async fn evaluate_blocking<O>(
        &self,
        objective: &Arc<O>,
        x: Vec<f64>,
    ) -> Result<(Vec<f64>, core::result::Result<f64, String>)>
    where
        O: Objective + Send + Sync + 'static,
        O::Error: Send,
    {
        let obj = Arc::clone(objective);
        let task = tokio::task::spawn_blocking(move || {
            let outcome = obj.evaluate(&x).map_err(|e| e.to_string());
            (x, outcome)
        });

        let joined = match self.evaluation_timeout {
            Some(limit) => tokio::time::timeout(limit, task)
                .await
                .map_err(|_| Error::EvaluationTimedOut(limit))?,
            None => task.await,
        };
        joined.map_err(|e| Error::TaskError(e.to_string()))
    }
}
