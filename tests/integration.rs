//! End-to-end tests of the optimization loop.


use core::cell::Cell;
use core::ops::ControlFlow;

use bayesopt::acquisition::{ProbabilityOfImprovement, UpperConfidenceBound};
use bayesopt::prelude::*;

fn quadratic(x: &[f64]) -> Result<f64> {
    Ok(-(x[0] - 1.0).powi(2))
}

fn quadratic_optimizer(seed: u64) -> BayesianOptimizer {
    BayesianOptimizer::builder()
        .domain(SearchDomain::interval(-2.0, 2.0).unwrap())
        .n_initial(3)
        .n_iters(15)
        .initial_design(InitialDesign::Random)
        .kernel_family(KernelFamily::Matern52)
        .jitter(1e-4)
        .seed(seed)
        .build()
        .unwrap()
}

// =============================================================================
// Convergence on smooth objectives
// =============================================================================

#[test]
fn finds_maximum_of_one_dimensional_quadratic() {
    for seed in 0..5 {
        let result = quadratic_optimizer(seed).optimize(quadratic).unwrap();

        assert_eq!(result.history.len(), 3 + 15);
        assert_eq!(result.iterations, 15);
        assert_eq!(result.termination, Termination::BudgetExhausted);
        assert!(
            (result.best.x[0] - 1.0).abs() < 0.1,
            "seed {seed}: best x = {}",
            result.best.x[0]
        );
        assert!(
            result.best.y.abs() < 0.05,
            "seed {seed}: best y = {}",
            result.best.y
        );
    }
}

#[test]
fn minimizes_forrester_function() {
    let optimizer = BayesianOptimizer::builder()
        .domain(SearchDomain::interval(0.0, 1.0).unwrap())
        .minimize()
        .n_initial(4)
        .n_iters(16)
        .seed(5)
        .build()
        .unwrap();

    let result = optimizer
        .optimize(|x: &[f64]| Ok::<_, Error>(test_functions::forrester(x)))
        .unwrap();

    assert!(
        result.best.y < -5.0,
        "best y = {} (global minimum {})",
        result.best.y,
        test_functions::FORRESTER_MIN
    );
    let min_in_history = result
        .history
        .iter()
        .map(|p| p.y)
        .fold(f64::INFINITY, f64::min);
    assert_eq!(result.best.y, min_in_history);
}

#[test]
fn every_candidate_stays_inside_the_domain() {
    let domain = SearchDomain::new(test_functions::BRANIN_BOUNDS.to_vec()).unwrap();
    let optimizer = BayesianOptimizer::builder()
        .domain(domain.clone())
        .minimize()
        .n_iters(10)
        .seed(11)
        .build()
        .unwrap();

    let result = optimizer
        .optimize(|x: &[f64]| Ok::<_, Error>(test_functions::branin(x)))
        .unwrap();

    for p in &result.history {
        assert!(domain.contains(&p.x), "{:?} outside the domain", p.x);
    }
}

#[test]
fn alternative_acquisitions_run_to_budget() {
    let base = || {
        BayesianOptimizer::builder()
            .domain(SearchDomain::interval(-2.0, 2.0).unwrap())
            .n_initial(3)
            .n_iters(6)
            .seed(8)
    };

    let ucb = base()
        .acquisition(UpperConfidenceBound::new(1.5))
        .build()
        .unwrap()
        .optimize(quadratic)
        .unwrap();
    assert_eq!(ucb.iterations, 6);

    let pi = base()
        .acquisition(ProbabilityOfImprovement::new().xi(0.01))
        .build()
        .unwrap()
        .optimize(quadratic)
        .unwrap();
    assert_eq!(pi.iterations, 6);
}

#[test]
fn random_initial_design_and_fixed_kernel() {
    let optimizer = BayesianOptimizer::builder()
        .domain(SearchDomain::new(vec![(0.0, 1.0), (0.0, 1.0)]).unwrap())
        .initial_design(InitialDesign::Random)
        .kernel(Kernel::new(KernelFamily::Matern32, vec![0.3, 0.6], 1.0).unwrap())
        .n_restarts(2)
        .n_candidates(100)
        .n_initial(4)
        .n_iters(4)
        .seed(3)
        .build()
        .unwrap();

    let result = optimizer
        .optimize(|x: &[f64]| Ok::<_, Error>(-test_functions::sphere(x)))
        .unwrap();
    assert_eq!(result.history.len(), 8);

    let fitted = optimizer.fitted_kernel().unwrap();
    assert_eq!(fitted.family(), KernelFamily::Matern32);
    assert_eq!(fitted.dimension(), 2);
}

// =============================================================================
// Degenerate and pinned domains
// =============================================================================

#[test]
fn degenerate_domain_evaluates_once() {
    let calls = Cell::new(0);
    let optimizer = BayesianOptimizer::builder()
        .domain(SearchDomain::new(vec![(1.0, 1.0), (-2.0, -2.0)]).unwrap())
        .n_iters(10)
        .seed(1)
        .build()
        .unwrap();

    let result = optimizer
        .optimize(|x: &[f64]| {
            calls.set(calls.get() + 1);
            Ok::<_, Error>(x[0] + x[1])
        })
        .unwrap();

    assert_eq!(calls.get(), 1);
    assert_eq!(result.termination, Termination::DegenerateDomain);
    assert_eq!(result.history.len(), 1);
    assert_eq!(result.best.x, vec![1.0, -2.0]);
    assert_eq!(result.best.y, -1.0);
    assert_eq!(result.iterations, 0);
}

#[test]
fn degenerate_domain_skips_already_observed_point() {
    let calls = Cell::new(0);
    let optimizer = BayesianOptimizer::builder()
        .domain(SearchDomain::new(vec![(3.0, 3.0)]).unwrap())
        .build()
        .unwrap();

    let initial = History::from_pairs([(vec![3.0], 9.0)]).unwrap();
    let result = optimizer
        .run(initial, |x: &[f64]| {
            calls.set(calls.get() + 1);
            Ok::<_, Error>(x[0] * x[0])
        })
        .unwrap();

    assert_eq!(calls.get(), 0);
    assert_eq!(result.history.len(), 1);
    assert_eq!(result.termination, Termination::DegenerateDomain);
}

#[test]
fn pinned_dimension_keeps_its_value() {
    let optimizer = BayesianOptimizer::builder()
        .domain(SearchDomain::new(vec![(0.0, 1.0), (0.25, 0.25)]).unwrap())
        .n_initial(3)
        .n_iters(5)
        .seed(9)
        .build()
        .unwrap();

    let result = optimizer
        .optimize(|x: &[f64]| Ok::<_, Error>(-(x[0] - 0.7).powi(2) + x[1]))
        .unwrap();

    assert_eq!(result.history.len(), 8);
    assert!(result.history.iter().all(|p| p.x[1] == 0.25));
}

// =============================================================================
// Reproducibility
// =============================================================================

#[test]
fn domain_too_wide_to_map_is_rejected() {
    let err = SearchDomain::interval(-1e308, 1e308).unwrap_err();
    assert!(matches!(err, Error::InvalidBounds { dim: 0, .. }), "{err:?}");

    let optimizer = BayesianOptimizer::builder()
        .domain(SearchDomain::interval(-1e307, 1e307).unwrap())
        .n_initial(3)
        .n_iters(3)
        .seed(1)
        .build()
        .unwrap();
    let result = optimizer
        .optimize(|x: &[f64]| {
            if x[0].is_finite() {
                Ok(-(x[0] / 1e307).powi(2))
            } else {
                Err(Error::Objective(format!("got non-finite x {}", x[0])))
            }
        })
        .unwrap();
    assert_eq!(result.history.len(), 6);
}

#[test]
fn same_seed_same_history() {
    let a = quadratic_optimizer(123).optimize(quadratic).unwrap();
    let b = quadratic_optimizer(123).optimize(quadratic).unwrap();
    assert_eq!(a.history, b.history);
    assert_eq!(a.best, b.best);
}

#[test]
fn repeated_runs_on_one_optimizer_are_identical() {
    let optimizer = quadratic_optimizer(77);
    let a = optimizer.optimize(quadratic).unwrap();
    let b = optimizer.optimize(quadratic).unwrap();
    assert_eq!(a.history, b.history);
}

#[test]
fn different_seeds_explore_differently() {
    let a = quadratic_optimizer(1).optimize(quadratic).unwrap();
    let b = quadratic_optimizer(2).optimize(quadratic).unwrap();
    assert_ne!(a.history.points()[0].x, b.history.points()[0].x);
}

// =============================================================================
// Caller-supplied initial design
// =============================================================================

#[test]
fn run_continues_from_supplied_history() {
    let optimizer = BayesianOptimizer::builder()
        .domain(SearchDomain::interval(-2.0, 2.0).unwrap())
        .n_iters(4)
        .seed(4)
        .build()
        .unwrap();

    let initial = History::from_pairs([
        (vec![-2.0], -9.0),
        (vec![0.0], -1.0),
        (vec![2.0], -1.0),
    ])
    .unwrap();
    let result = optimizer.run(initial.clone(), quadratic).unwrap();

    assert_eq!(result.history.len(), 3 + 4);
    assert_eq!(&result.history.points()[..3], initial.points());
    assert_eq!(result.iterations, 4);
}

#[test]
fn unfactorable_surrogate_falls_back_to_random_candidates() {
    let optimizer = BayesianOptimizer::builder()
        .domain(SearchDomain::interval(-2.0, 2.0).unwrap())
        .n_iters(4)
        .jitter(1e-300)
        .seed(8)
        .build()
        .unwrap();

    let initial = History::from_pairs((0..4).map(|_| (vec![0.5], -0.25))).unwrap();
    let result = optimizer.run(initial, quadratic).unwrap();

    assert_eq!(result.termination, Termination::BudgetExhausted);
    assert_eq!(result.history.len(), 4 + 4);
    let domain = SearchDomain::interval(-2.0, 2.0).unwrap();
    for p in &result.history.points()[4..] {
        assert!(p.x[0].is_finite() && p.y.is_finite(), "{p:?}");
        assert!(domain.contains(&p.x), "{:?}", p.x);
    }
}

#[test]
fn run_rejects_empty_initial_design() {
    let optimizer = quadratic_optimizer(0);
    let err = optimizer.run(History::new(), quadratic).unwrap_err();
    assert_eq!(err.error, Error::EmptyInitialDesign);
    assert!(err.history.is_empty());
}

#[test]
fn run_rejects_misshapen_initial_design() {
    let optimizer = quadratic_optimizer(0);
    let initial = History::from_pairs([(vec![0.0, 1.0], 1.0)]).unwrap();
    let err = optimizer.run(initial, quadratic).unwrap_err();
    assert_eq!(
        err.error,
        Error::DimensionMismatch {
            expected: 1,
            got: 2
        }
    );
    assert_eq!(err.history.len(), 1);
}

#[test]
fn zero_iterations_only_evaluates_the_design() {
    let optimizer = BayesianOptimizer::builder()
        .domain(SearchDomain::interval(0.0, 1.0).unwrap())
        .n_initial(4)
        .n_iters(0)
        .seed(0)
        .build()
        .unwrap();

    let result = optimizer.optimize(quadratic).unwrap();
    assert_eq!(result.history.len(), 4);
    assert_eq!(result.iterations, 0);
    assert_eq!(result.termination, Termination::BudgetExhausted);
}

// =============================================================================
// Failures keep the partial history
// =============================================================================

#[test]
fn objective_error_halts_with_partial_history() {
    let calls = Cell::new(0);
    let optimizer = quadratic_optimizer(6);

    let err = optimizer
        .optimize(|x: &[f64]| {
            calls.set(calls.get() + 1);
            if calls.get() == 5 {
                Err("simulator crashed".to_string())
            } else {
                Ok(-(x[0] - 1.0).powi(2))
            }
        })
        .unwrap_err();

    assert_eq!(err.error, Error::Objective("simulator crashed".into()));
    assert_eq!(err.history.len(), 4);
    assert_eq!(calls.get(), 5);
}

#[test]
fn non_finite_outcome_halts() {
    let calls = Cell::new(0);
    let optimizer = quadratic_optimizer(6);

    let err = optimizer
        .optimize(|x: &[f64]| {
            calls.set(calls.get() + 1);
            if calls.get() == 4 {
                Ok::<_, Error>(f64::NAN)
            } else {
                Ok(x[0])
            }
        })
        .unwrap_err();

    assert!(matches!(err.error, Error::NonFiniteObjective { .. }));
    assert_eq!(err.history.len(), 3);
    assert!(err.to_string().contains("after 3 evaluations"));
}

#[test]
fn failure_in_initial_design_is_reported() {
    let optimizer = quadratic_optimizer(6);
    let err = optimizer
        .optimize(|_: &[f64]| Err::<f64, _>(Error::Objective("no license".into())))
        .unwrap_err();
    assert!(err.history.is_empty());
    assert_eq!(
        Error::from(err),
        Error::Objective("objective failed: no license".into())
    );
}

// =============================================================================
// Lifecycle hooks
// =============================================================================

struct StopAfter {
    max_evaluations: usize,
}

impl Objective for StopAfter {
    type Error = Error;

    fn evaluate(&self, x: &[f64]) -> Result<f64> {
        quadratic(x)
    }

    fn before_iteration(&self, history: &History) -> ControlFlow<()> {
        if history.len() >= self.max_evaluations {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    }
}

#[test]
fn before_iteration_hook_cancels() {
    let result = quadratic_optimizer(2)
        .optimize(StopAfter { max_evaluations: 6 })
        .unwrap();
    assert_eq!(result.termination, Termination::Cancelled);
    assert_eq!(result.history.len(), 6);
    assert_eq!(result.iterations, 3);
}

struct StopOnFirstIteration;

impl Objective for StopOnFirstIteration {
    type Error = Error;

    fn evaluate(&self, x: &[f64]) -> Result<f64> {
        quadratic(x)
    }

    fn after_iteration(&self, history: &History, latest: &ObservedPoint) -> ControlFlow<()> {
        assert_eq!(history.last(), Some(latest));
        ControlFlow::Break(())
    }
}

#[test]
fn after_iteration_hook_cancels() {
    let result = quadratic_optimizer(2)
        .optimize(StopOnFirstIteration)
        .unwrap();
    assert_eq!(result.termination, Termination::Cancelled);
    assert_eq!(result.iterations, 1);
    assert_eq!(result.history.len(), 4);
}

// =============================================================================
// Convergence rules
// =============================================================================

#[test]
fn acquisition_threshold_stops_before_evaluating() {
    let calls = Cell::new(0);
    let optimizer = BayesianOptimizer::builder()
        .domain(SearchDomain::interval(-2.0, 2.0).unwrap())
        .n_initial(3)
        .n_iters(10)
        .stop_when_acquisition_below(f64::INFINITY)
        .seed(1)
        .build()
        .unwrap();

    let result = optimizer
        .optimize(|x: &[f64]| {
            calls.set(calls.get() + 1);
            quadratic(x)
        })
        .unwrap();

    assert_eq!(result.termination, Termination::Converged);
    assert_eq!(result.iterations, 0);
    assert_eq!(calls.get(), 3);
}

#[test]
fn improvement_window_stops_after_window() {
    let optimizer = BayesianOptimizer::builder()
        .domain(SearchDomain::interval(-2.0, 2.0).unwrap())
        .n_initial(3)
        .n_iters(10)
        .stop_when_improvement_below(f64::INFINITY, 2)
        .seed(1)
        .build()
        .unwrap();

    let result = optimizer.optimize(quadratic).unwrap();
    assert_eq!(result.termination, Termination::Converged);
    assert_eq!(result.iterations, 2);
    assert_eq!(result.history.len(), 5);
}

#[test]
fn convergence_struct_matches_builder_shortcuts() {
    let criteria = ConvergenceCriteria {
        acquisition_threshold: None,
        improvement: Some(ImprovementWindow {
            threshold: f64::INFINITY,
            window: 1,
        }),
    };
    let optimizer = BayesianOptimizer::builder()
        .domain(SearchDomain::interval(-2.0, 2.0).unwrap())
        .n_initial(2)
        .convergence(criteria)
        .seed(1)
        .build()
        .unwrap();

    let result = optimizer.optimize(quadratic).unwrap();
    assert_eq!(result.iterations, 1);
    assert_eq!(result.termination, Termination::Converged);
}
