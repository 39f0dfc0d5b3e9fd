//! Async integration tests for the optimizer.
//!
//! These tests are only compiled when the `async` feature is enabled.

#![cfg(feature = "async")]

use core::ops::ControlFlow;
use core::time::Duration;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use bayesopt::prelude::*;

fn optimizer() -> BayesianOptimizerBuilder {
    BayesianOptimizer::builder()
        .domain(SearchDomain::interval(-2.0, 2.0).unwrap())
        .n_initial(3)
        .n_iters(6)
        .seed(42)
}

#[tokio::test]
async fn optimize_async_matches_sync_history() {
    let opt = optimizer().build().unwrap();
    let objective = |x: &[f64]| Ok::<_, Error>(-(x[0] - 1.0).powi(2));

    let async_result = opt.optimize_async(objective).await.unwrap();
    let sync_result = opt.optimize(objective).unwrap();

    assert_eq!(async_result.history, sync_result.history);
    assert_eq!(async_result.iterations, 6);
    assert_eq!(async_result.termination, Termination::BudgetExhausted);
}

#[tokio::test]
async fn optimization_future_can_be_spawned() {
    let opt = Arc::new(optimizer().build().unwrap());
    let handle = tokio::spawn({
        let opt = Arc::clone(&opt);
        async move {
            opt.optimize_async(|x: &[f64]| Ok::<_, Error>(-(x[0] - 1.0).powi(2)))
                .await
        }
    });

    let result = handle.await.unwrap().unwrap();
    assert_eq!(result.iterations, 6);
    assert_eq!(result.termination, Termination::BudgetExhausted);
}

#[tokio::test]
async fn run_async_uses_supplied_history() {
    let opt = optimizer().build().unwrap();
    let initial = History::from_pairs([(vec![-1.0], -4.0), (vec![1.5], -0.25)]).unwrap();

    let result = opt
        .run_async(initial, |x: &[f64]| Ok::<_, Error>(-(x[0] - 1.0).powi(2)))
        .await
        .unwrap();

    assert_eq!(result.history.len(), 2 + 6);
}

#[tokio::test]
async fn slow_evaluation_times_out_and_keeps_history() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let opt = optimizer()
        .evaluation_timeout(Duration::from_millis(50))
        .build()
        .unwrap();

    let err = opt
        .optimize_async(move |x: &[f64]| {
            if counter.fetch_add(1, Ordering::SeqCst) == 4 {
                std::thread::sleep(Duration::from_millis(500));
            }
            Ok::<_, Error>(x[0])
        })
        .await
        .unwrap_err();

    assert_eq!(
        err.error,
        Error::EvaluationTimedOut(Duration::from_millis(50))
    );
    assert_eq!(err.history.len(), 4);
}

#[tokio::test]
async fn objective_error_is_reported_async() {
    let opt = optimizer().build().unwrap();
    let err = opt
        .optimize_async(|_: &[f64]| Err::<f64, _>("out of memory"))
        .await
        .unwrap_err();
    assert_eq!(err.error, Error::Objective("out of memory".into()));
    assert!(err.history.is_empty());
}

#[tokio::test]
async fn panicking_objective_becomes_task_error() {
    let opt = optimizer().build().unwrap();
    let err = opt
        .optimize_async(|_: &[f64]| -> core::result::Result<f64, Error> { panic!("boom") })
        .await
        .unwrap_err();
    assert!(matches!(err.error, Error::TaskError(_)));
}

struct Budgeted {
    limit: usize,
}

impl Objective for Budgeted {
    type Error = Error;

    fn evaluate(&self, x: &[f64]) -> Result<f64> {
        Ok(-x[0].abs())
    }

    fn before_iteration(&self, history: &History) -> ControlFlow<()> {
        if history.len() >= self.limit {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    }
}

#[tokio::test]
async fn hooks_cancel_async_runs() {
    let opt = optimizer().build().unwrap();
    let result = opt.optimize_async(Budgeted { limit: 5 }).await.unwrap();
    assert_eq!(result.termination, Termination::Cancelled);
    assert_eq!(result.history.len(), 5);
}
