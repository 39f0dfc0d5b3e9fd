use crate::error::{Error, Result};
use crate::gp::GaussianProcess;
use crate::history::History;
use crate::types::{LoopState, Termination};

use super::{BayesianOptimizer, Interrupted, OptimizationResult};

/// Normalized distance below which a proposal counts as already observed.
const DUPLICATE_TOLERANCE: f64 = 1e-9;

/// State of a single optimization run.
///
/// The driver (sync or async) owns the objective and its hooks; this type
/// owns everything else: the history, the surrogate being refit, and the
/// RNG behind every random choice.
pub(super) struct Run<'a> {
    optimizer: &'a BayesianOptimizer,
    surrogate: GaussianProcess,
    rng: fastrand::Rng,
    history: History,
    iterations: usize,
    state: LoopState,
}

impl<'a> Run<'a> {
    pub(super) fn new(optimizer: &'a BayesianOptimizer, history: History) -> Self {
        Self {
            optimizer,
            surrogate: optimizer.surrogate.clone(),
            rng: optimizer.make_rng(),
            history,
            iterations: 0,
            state: LoopState::Init,
        }
    }

    pub(super) fn history(&self) -> &History {
        &self.history
    }

    /// Points to evaluate before the surrogate takes over.
    ///
    /// A degenerate domain yields its single point (unless already
    /// observed) and ends the run. Otherwise `draw_design` controls whether
    /// the configured initial design is drawn; without it the caller-supplied
    /// history must be nonempty.
    pub(super) fn begin(&mut self, draw_design: bool) -> Result<Vec<Vec<f64>>> {
        let domain = &self.optimizer.domain;
        for p in &self.history {
            domain.check_dimension(&p.x)?;
        }

        if domain.is_degenerate() {
            self.state = LoopState::Done(Termination::DegenerateDomain);
            let point = domain.lower();
            if self.history.iter().any(|p| p.x == point) {
                return Ok(Vec::new());
            }
            return Ok(vec![point]);
        }

        if draw_design {
            let n = self.optimizer.n_initial.max(1);
            return Ok(self
                .optimizer
                .initial_design
                .points(domain, n, &mut self.rng));
        }
        if self.history.is_empty() {
            return Err(Error::EmptyInitialDesign);
        }
        Ok(Vec::new())
    }

    /// Appends an evaluation. Objective failures and non-finite outcomes
    /// are returned as errors and nothing is appended.
    pub(super) fn record(
        &mut self,
        x: Vec<f64>,
        outcome: core::result::Result<f64, String>,
    ) -> Result<()> {
        let y = outcome.map_err(Error::Objective)?;
        self.history.push(x, y)?;
        if self.state == LoopState::Iterating {
            self.iterations += 1;
            trace_info!(iteration = self.iterations, y, "evaluation recorded");
        }
        Ok(())
    }

    /// Whether another loop iteration should run. Marks the run as done once
    /// the budget is spent.
    pub(super) fn wants_more(&mut self) -> bool {
        match self.state {
            LoopState::Done(_) => false,
            _ if self.iterations >= self.optimizer.n_iters => {
                self.state = LoopState::Done(Termination::BudgetExhausted);
                false
            }
            LoopState::Init => {
                self.state = LoopState::Iterating;
                true
            }
            LoopState::Iterating => true,
        }
    }

    pub(super) fn cancel(&mut self) {
        self.finish(Termination::Cancelled);
    }

    fn finish(&mut self, termination: Termination) {
        if !matches!(self.state, LoopState::Done(_)) {
            trace_debug!(?termination, "run finished");
            self.state = LoopState::Done(termination);
        }
    }

    /// Fits the surrogate and proposes the next point in domain coordinates.
    ///
    /// Returns `None` when the acquisition-threshold rule fires.
    pub(super) fn propose(&mut self) -> Option<Vec<f64>> {
        let optimizer = self.optimizer;
        let domain = &optimizer.domain;
        let sign = optimizer.direction.sign();

        let unit_history = match History::from_pairs(
            self.history
                .iter()
                .map(|p| (domain.to_unit(&p.x), sign * p.y)),
        ) {
            Ok(h) => h,
            Err(_) => return Some(domain.sample_uniform(&mut self.rng)),
        };
        let unit_bounds: Vec<(f64, f64)> = domain
            .bounds()
            .iter()
            .map(|&(lo, hi)| if (hi - lo).abs() < 1e-15 { (0.5, 0.5) } else { (0.0, 1.0) })
            .collect();

        let posterior = match self.surrogate.fit(&unit_history, &mut self.rng) {
            Ok(posterior) => posterior,
            Err(e) => {
                trace_warn!(error = %e, "surrogate fit failed; proposing a random point");
                #[cfg(not(feature = "tracing"))]
                let _ = e;
                return Some(domain.sample_uniform(&mut self.rng));
            }
        };

        let best = unit_history
            .iter()
            .map(|p| p.y)
            .fold(f64::NEG_INFINITY, f64::max);
        let candidate = optimizer.acquisition_optimizer.maximize(
            optimizer.acquisition.as_ref(),
            &posterior,
            best,
            &unit_bounds,
            &mut self.rng,
        );
        trace_debug!(
            acquisition_value = candidate.acquisition_value,
            "candidate proposed"
        );

        if optimizer
            .convergence
            .acquisition_converged(Some(candidate.acquisition_value))
        {
            self.finish(Termination::Converged);
            return None;
        }

        if is_duplicate(&candidate.x, &unit_history) {
            trace_debug!("candidate duplicates an observation; sampling uniformly instead");
            return Some(domain.sample_uniform(&mut self.rng));
        }
        Some(domain.from_unit(&candidate.x))
    }

    /// Applies the improvement-window rule after an evaluation.
    pub(super) fn check_convergence(&mut self) {
        let optimizer = self.optimizer;
        if optimizer.convergence.improvement_converged(
            &self.history,
            self.iterations,
            optimizer.direction,
        ) {
            self.finish(Termination::Converged);
        }
    }

    fn publish_kernel(&self) {
        *self.optimizer.fitted_kernel.lock() = Some(self.surrogate.kernel().clone());
    }

    pub(super) fn into_result(self) -> core::result::Result<OptimizationResult, Interrupted> {
        self.publish_kernel();
        let termination = match self.state {
            LoopState::Done(t) => t,
            LoopState::Init | LoopState::Iterating => Termination::BudgetExhausted,
        };
        let Some(best) = self.history.best(self.optimizer.direction).cloned() else {
            return Err(Interrupted {
                error: Error::EmptyInitialDesign,
                history: self.history,
            });
        };
        trace_info!(
            best = best.y,
            iterations = self.iterations,
            ?termination,
            "optimization finished"
        );
        Ok(OptimizationResult {
            best,
            history: self.history,
            termination,
            iterations: self.iterations,
        })
    }

    pub(super) fn interrupt(self, error: Error) -> Interrupted {
        self.publish_kernel();
        trace_warn!(error = %error, evaluations = self.history.len(), "optimization interrupted");
        Interrupted {
            error,
            history: self.history,
        }
    }
}

fn is_duplicate(u: &[f64], unit_history: &History) -> bool {
    unit_history.iter().any(|p| {
        let d2: f64 = p.x.iter().zip(u).map(|(a, b)| (a - b).powi(2)).sum();
        d2.sqrt() < DUPLICATE_TOLERANCE
    })
}
