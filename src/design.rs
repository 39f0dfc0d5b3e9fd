//! Initial designs used to seed the history before the surrogate takes over.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::domain::SearchDomain;
use crate::rng_util;

/// How the initial points are placed in the domain.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum InitialDesign {
    /// Independent uniform samples.
    Random,
    /// Latin hypercube: each dimension is split into `n` equal strata and
    /// every stratum receives exactly one point.
    #[default]
    LatinHypercube,
}

impl InitialDesign {
    /// Generates `n` points inside `domain`.
    #[must_use]
    pub fn points(self, domain: &SearchDomain, n: usize, rng: &mut fastrand::Rng) -> Vec<Vec<f64>> {
        match self {
            Self::Random => (0..n).map(|_| domain.sample_uniform(rng)).collect(),
            Self::LatinHypercube => latin_hypercube(domain, n, rng),
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn latin_hypercube(domain: &SearchDomain, n: usize, rng: &mut fastrand::Rng) -> Vec<Vec<f64>> {
    let mut points = vec![Vec::with_capacity(domain.dimension()); n];
    let width = 1.0 / n as f64;
    for &(lo, hi) in domain.bounds() {
        let mut strata: Vec<usize> = (0..n).collect();
        rng.shuffle(&mut strata);
        for (point, stratum) in points.iter_mut().zip(strata) {
            let start = stratum as f64 * width;
            let u = rng_util::f64_range(rng, start, start + width);
            point.push(lo + u * (hi - lo));
        }
    }
    points
}
