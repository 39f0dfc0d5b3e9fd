//! Box-constrained limited-memory BFGS.
//!
//! A projected variant: the quasi-Newton direction is computed with the
//! standard two-loop recursion, components that would push an active
//! coordinate further out of bounds are zeroed, and each trial step is
//! projected back onto the box before the Armijo test. Acquisition
//! maximization uses it so that every iterate stays inside the unit cube.

use std::collections::VecDeque;

/// Tuning knobs for [`minimize`].
#[derive(Clone, Copy, Debug)]
pub(crate) struct LbfgsConfig {
    /// Number of curvature pairs kept.
    pub(crate) memory: usize,
    /// Iteration cap.
    pub(crate) max_iters: usize,
    /// Stop when the projected gradient's infinity norm falls below this.
    pub(crate) gtol: f64,
    /// Stop when the relative decrease of the objective falls below this.
    pub(crate) ftol: f64,
}

impl Default for LbfgsConfig {
    fn default() -> Self {
        Self {
            memory: 8,
            max_iters: 100,
            gtol: 1e-6,
            ftol: 1e-10,
        }
    }
}

/// Result of a local minimization.
#[derive(Clone, Debug)]
pub(crate) struct Minimum {
    pub(crate) x: Vec<f64>,
    pub(crate) value: f64,
    #[cfg_attr(not(test), allow(dead_code))]
    pub(crate) iterations: usize,
    #[cfg_attr(not(test), allow(dead_code))]
    pub(crate) converged: bool,
}

const ARMIJO_C1: f64 = 1e-4;
const MAX_BACKTRACKS: usize = 40;
const ACTIVE_TOL: f64 = 1e-12;

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn inf_norm(a: &[f64]) -> f64 {
    a.iter().fold(0.0_f64, |m, v| m.max(v.abs()))
}

fn project(x: &[f64], bounds: &[(f64, f64)]) -> Vec<f64> {
    x.iter()
        .zip(bounds)
        .map(|(&v, &(lo, hi))| v.clamp(lo, hi))
        .collect()
}

fn all_finite(v: &[f64]) -> bool {
    v.iter().all(|x| x.is_finite())
}

/// Infinity norm of the gradient restricted to directions that stay feasible.
fn projected_gradient_norm(x: &[f64], g: &[f64], bounds: &[(f64, f64)]) -> f64 {
    x.iter()
        .zip(g)
        .zip(bounds)
        .map(|((&xi, &gi), &(lo, hi))| {
            if (xi <= lo + ACTIVE_TOL && gi > 0.0) || (xi >= hi - ACTIVE_TOL && gi < 0.0) {
                0.0
            } else {
                gi.abs()
            }
        })
        .fold(0.0, f64::max)
}

/// Zero out direction components blocked by an active bound.
fn drop_blocked(d: &mut [f64], x: &[f64], bounds: &[(f64, f64)]) {
    for ((di, &xi), &(lo, hi)) in d.iter_mut().zip(x).zip(bounds) {
        if (xi <= lo + ACTIVE_TOL && *di < 0.0) || (xi >= hi - ACTIVE_TOL && *di > 0.0) {
            *di = 0.0;
        }
    }
}

struct CurvatureMemory {
    s: VecDeque<Vec<f64>>,
    y: VecDeque<Vec<f64>>,
    rho: VecDeque<f64>,
    capacity: usize,
}

impl CurvatureMemory {
    fn new(capacity: usize) -> Self {
        Self {
            s: VecDeque::with_capacity(capacity),
            y: VecDeque::with_capacity(capacity),
            rho: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    fn is_empty(&self) -> bool {
        self.s.is_empty()
    }

    fn clear(&mut self) {
        self.s.clear();
        self.y.clear();
        self.rho.clear();
    }

    fn push(&mut self, s: Vec<f64>, y: Vec<f64>) {
        let sy = dot(&s, &y);
        // Skip pairs that would break positive-definiteness of the inverse Hessian.
        if sy <= 1e-12 * dot(&y, &y).max(f64::MIN_POSITIVE) {
            return;
        }
        if self.s.len() == self.capacity {
            self.s.pop_front();
            self.y.pop_front();
            self.rho.pop_front();
        }
        self.s.push_back(s);
        self.y.push_back(y);
        self.rho.push_back(1.0 / sy);
    }

    /// Two-loop recursion: returns `-H g`.
    fn direction(&self, g: &[f64]) -> Vec<f64> {
        let m = self.s.len();
        let mut q = g.to_vec();
        let mut alphas = vec![0.0; m];
        for i in (0..m).rev() {
            let a = self.rho[i] * dot(&self.s[i], &q);
            for (qj, yj) in q.iter_mut().zip(&self.y[i]) {
                *qj -= a * yj;
            }
            alphas[i] = a;
        }
        let gamma = match (self.s.back(), self.y.back()) {
            (Some(s), Some(y)) => dot(s, y) / dot(y, y),
            _ => 1.0,
        };
        for qj in &mut q {
            *qj *= gamma;
        }
        for i in 0..m {
            let b = self.rho[i] * dot(&self.y[i], &q);
            for (qj, sj) in q.iter_mut().zip(&self.s[i]) {
                *qj += sj * (alphas[i] - b);
            }
        }
        q.iter().map(|v| -v).collect()
    }
}

/// Minimize `f` over the box `bounds` starting from `x0`.
///
/// `f` returns the objective value and its gradient. Non-finite values are
/// treated as infeasible: the line search backs off from them, and a
/// non-finite starting value returns immediately with `value = +inf`.
pub(crate) fn minimize<F>(
    mut f: F,
    x0: &[f64],
    bounds: &[(f64, f64)],
    config: &LbfgsConfig,
) -> Minimum
where
    F: FnMut(&[f64]) -> (f64, Vec<f64>),
{
    let mut x = project(x0, bounds);
    let (mut fx, mut g) = f(&x);
    if !fx.is_finite() || !all_finite(&g) {
        return Minimum {
            x,
            value: f64::INFINITY,
            iterations: 0,
            converged: false,
        };
    }

    let mut memory = CurvatureMemory::new(config.memory.max(1));
    let mut converged = false;
    let mut iterations = 0;

    while iterations < config.max_iters {
        if projected_gradient_norm(&x, &g, bounds) <= config.gtol {
            converged = true;
            break;
        }
        iterations += 1;

        let mut d = memory.direction(&g);
        drop_blocked(&mut d, &x, bounds);
        if dot(&g, &d) >= 0.0 {
            memory.clear();
            d = g.iter().map(|v| -v).collect();
            drop_blocked(&mut d, &x, bounds);
        }
        if dot(&g, &d) >= 0.0 {
            converged = true;
            break;
        }

        let mut step = if memory.is_empty() {
            (1.0 / inf_norm(&d)).min(1.0)
        } else {
            1.0
        };
        let mut accepted = None;
        for _ in 0..MAX_BACKTRACKS {
            let trial: Vec<f64> = x.iter().zip(&d).map(|(xi, di)| xi + step * di).collect();
            let trial = project(&trial, bounds);
            let moved: Vec<f64> = trial.iter().zip(&x).map(|(a, b)| a - b).collect();
            let (f_new, g_new) = f(&trial);
            let decrease = dot(&g, &moved).min(0.0);
            if f_new.is_finite() && all_finite(&g_new) && f_new <= fx + ARMIJO_C1 * decrease {
                accepted = Some((trial, moved, f_new, g_new));
                break;
            }
            step *= 0.5;
        }

        let Some((x_new, s, f_new, g_new)) = accepted else {
            if memory.is_empty() {
                break;
            }
            memory.clear();
            continue;
        };

        let y: Vec<f64> = g_new.iter().zip(&g).map(|(a, b)| a - b).collect();
        let step_size = inf_norm(&s);
        memory.push(s, y);

        let f_change = fx - f_new;
        x = x_new;
        fx = f_new;
        g = g_new;

        if f_change.abs() <= config.ftol * fx.abs().max(1.0) || step_size < 1e-14 {
            converged = true;
            break;
        }
    }

    Minimum {
        x,
        value: fx,
        iterations,
        converged,
    }
}
