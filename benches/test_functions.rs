//! Expensive-objective stand-ins used by the benchmarks and integration tests.
//!
//! Each function is paired with the box it is conventionally optimized over
//! and its known global minimum.

use std::f64::consts::PI;

/// Sphere: convex bowl. Minimum 0 at the origin.
pub fn sphere(x: &[f64]) -> f64 {
    x.iter().map(|xi| xi * xi).sum()
}

/// Forrester et al. (2008) one-dimensional test function on `[0, 1]`.
/// Minimum ≈ -6.0207 at x ≈ 0.7572.
pub fn forrester(x: &[f64]) -> f64 {
    let t = x[0];
    (6.0 * t - 2.0).powi(2) * (12.0 * t - 4.0).sin()
}

pub const FORRESTER_MIN: f64 = -6.020_740_055_767_083;

/// Branin on `[-5, 10] x [0, 15]`. Three global minima with f* ≈ 0.397887.
pub fn branin(x: &[f64]) -> f64 {
    let (x1, x2) = (x[0], x[1]);
    let b = 5.1 / (4.0 * PI * PI);
    let c = 5.0 / PI;
    let t = 1.0 / (8.0 * PI);
    (x2 - b * x1 * x1 + c * x1 - 6.0).powi(2) + 10.0 * (1.0 - t) * x1.cos() + 10.0
}

pub const BRANIN_BOUNDS: [(f64, f64); 2] = [(-5.0, 10.0), (0.0, 15.0)];
pub const BRANIN_MIN: f64 = 0.397_887_357_729_738;

/// Six-hump camel on `[-3, 3] x [-2, 2]`. Two global minima with
/// f* ≈ -1.0316.
pub fn six_hump_camel(x: &[f64]) -> f64 {
    let (x1, x2) = (x[0], x[1]);
    (4.0 - 2.1 * x1 * x1 + x1.powi(4) / 3.0) * x1 * x1 + x1 * x2 + (-4.0 + 4.0 * x2 * x2) * x2 * x2
}

pub const CAMEL_BOUNDS: [(f64, f64); 2] = [(-3.0, 3.0), (-2.0, 2.0)];

/// Hartmann 6-D on the unit hypercube. Minimum ≈ -3.3224.
pub fn hartmann6(x: &[f64]) -> f64 {
    const ALPHA: [f64; 4] = [1.0, 1.2, 3.0, 3.2];
    const A: [[f64; 6]; 4] = [
        [10.0, 3.0, 17.0, 3.5, 1.7, 8.0],
        [0.05, 10.0, 17.0, 0.1, 8.0, 14.0],
        [3.0, 3.5, 1.7, 10.0, 17.0, 8.0],
        [17.0, 8.0, 0.05, 10.0, 0.1, 14.0],
    ];
    const P: [[f64; 6]; 4] = [
        [0.1312, 0.1696, 0.5569, 0.0124, 0.8283, 0.5886],
        [0.2329, 0.4135, 0.8307, 0.3736, 0.1004, 0.9991],
        [0.2348, 0.1451, 0.3522, 0.2883, 0.3047, 0.6650],
        [0.4047, 0.8828, 0.8732, 0.5743, 0.1091, 0.0381],
    ];

    -ALPHA
        .iter()
        .zip(A.iter().zip(&P))
        .map(|(alpha, (a, p))| {
            let inner: f64 = x
                .iter()
                .enumerate()
                .map(|(j, xj)| a[j] * (xj - p[j]).powi(2))
                .sum();
            alpha * (-inner).exp()
        })
        .sum::<f64>()
}
