//! Bounded continuous search domains.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::rng_util;

/// Per-dimension `[lower, upper]` bounds of the feasible region.
///
/// The domain is fixed for the lifetime of a run. Both the initial design
/// and the acquisition maximization stay inside it. A dimension with
/// `lower == upper` is allowed and pins that coordinate.
///
/// # Examples
///
/// ```
/// use bayesopt::SearchDomain;
///
/// let domain = SearchDomain::new(vec![(-2.0, 2.0), (0.0, 10.0)]).unwrap();
/// assert_eq!(domain.dimension(), 2);
/// assert_eq!(domain.clamp(&[5.0, -1.0]), vec![2.0, 0.0]);
/// ```
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SearchDomain {
    bounds: Vec<(f64, f64)>,
}

impl SearchDomain {
    /// Creates a domain from `(lower, upper)` pairs.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyDomain`] if `bounds` is empty and
    /// [`Error::InvalidBounds`] if a bound is non-finite, `lower > upper`, or
    /// the width `upper - lower` overflows to infinity.
    pub fn new(bounds: Vec<(f64, f64)>) -> Result<Self> {
        if bounds.is_empty() {
            return Err(Error::EmptyDomain);
        }
        for (dim, &(low, high)) in bounds.iter().enumerate() {
            let width = high - low;
            if !low.is_finite() || !high.is_finite() || low > high || !width.is_finite() {
                return Err(Error::InvalidBounds { dim, low, high });
            }
        }
        Ok(Self { bounds })
    }

    /// Creates a one-dimensional domain `[low, high]`.
    ///
    /// # Errors
    ///
    /// Same as [`SearchDomain::new`].
    pub fn interval(low: f64, high: f64) -> Result<Self> {
        Self::new(vec![(low, high)])
    }

    /// Number of dimensions.
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.bounds.len()
    }

    /// The `(lower, upper)` pairs.
    #[must_use]
    pub fn bounds(&self) -> &[(f64, f64)] {
        &self.bounds
    }

    /// Returns `true` if every dimension collapses to a single point.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.bounds.iter().all(|&(lo, hi)| lo == hi)
    }

    /// Returns `true` if `x` has the right dimension and lies inside the bounds.
    #[must_use]
    pub fn contains(&self, x: &[f64]) -> bool {
        x.len() == self.bounds.len()
            && x
                .iter()
                .zip(&self.bounds)
                .all(|(&v, &(lo, hi))| (lo..=hi).contains(&v))
    }

    /// Clamps every coordinate of `x` into its bounds.
    #[must_use]
    pub fn clamp(&self, x: &[f64]) -> Vec<f64> {
        x.iter()
            .zip(&self.bounds)
            .map(|(&v, &(lo, hi))| v.clamp(lo, hi))
            .collect()
    }

    /// Lower corner of the domain; the only point of a degenerate domain.
    #[must_use]
    pub fn lower(&self) -> Vec<f64> {
        self.bounds.iter().map(|&(lo, _)| lo).collect()
    }

    /// Draws a point uniformly at random from the domain.
    #[must_use]
    pub fn sample_uniform(&self, rng: &mut fastrand::Rng) -> Vec<f64> {
        self.bounds
            .iter()
            .map(|&(lo, hi)| rng_util::f64_range(rng, lo, hi))
            .collect()
    }

    /// Checks that `x` has this domain's dimension.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] otherwise.
    pub fn check_dimension(&self, x: &[f64]) -> Result<()> {
        if x.len() == self.bounds.len() {
            Ok(())
        } else {
            Err(Error::DimensionMismatch {
                expected: self.bounds.len(),
                got: x.len(),
            })
        }
    }

    /// Maps a point of the domain into the unit cube.
    ///
    /// Pinned dimensions map to `0.5`.
    pub(crate) fn to_unit(&self, x: &[f64]) -> Vec<f64> {
        x.iter()
            .zip(&self.bounds)
            .map(|(&v, &(lo, hi))| {
                if (hi - lo).abs() < 1e-15 {
                    0.5
                } else {
                    (v - lo) / (hi - lo)
                }
            })
            .collect()
    }

    /// Maps a unit-cube point back into the domain, clamping overshoot.
    pub(crate) fn from_unit(&self, u: &[f64]) -> Vec<f64> {
        u.iter()
            .zip(&self.bounds)
            .map(|(&v, &(lo, hi))| (lo + v * (hi - lo)).clamp(lo, hi))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_inverted_and_non_finite_bounds() {
        assert_eq!(
            SearchDomain::new(vec![(0.0, 1.0), (2.0, 1.0)]),
            Err(Error::InvalidBounds {
                dim: 1,
                low: 2.0,
                high: 1.0
            })
        );
        assert!(SearchDomain::new(vec![(f64::NEG_INFINITY, 0.0)]).is_err());
        assert_eq!(SearchDomain::new(Vec::new()), Err(Error::EmptyDomain));
    }

    #[test]
    fn rejects_bounds_whose_width_overflows() {
        assert_eq!(
            SearchDomain::interval(-1e308, 1e308),
            Err(Error::InvalidBounds {
                dim: 0,
                low: -1e308,
                high: 1e308
            })
        );
        assert!(SearchDomain::new(vec![(0.0, 1.0), (-f64::MAX, f64::MAX)]).is_err());
    }

    #[test]
    fn wide_finite_domain_maps_stay_finite() {
        let domain = SearchDomain::interval(-1e307, 1e307).unwrap();
        let mut rng = fastrand::Rng::with_seed(3);
        for _ in 0..100 {
            let x = domain.sample_uniform(&mut rng);
            assert!(domain.contains(&x), "{x:?}");
            let u = domain.to_unit(&x);
            assert!((0.0..=1.0).contains(&u[0]), "{u:?}");
            assert!(domain.contains(&domain.from_unit(&u)));
        }
    }

    #[test]
    fn unit_cube_mapping_round_trips() {
        let domain = SearchDomain::new(vec![(-2.0, 2.0), (10.0, 20.0)]).unwrap();
        let u = domain.to_unit(&[0.0, 12.5]);
        assert!((u[0] - 0.5).abs() < 1e-12);
        assert!((u[1] - 0.25).abs() < 1e-12);
        let x = domain.from_unit(&u);
        assert!((x[0] - 0.0).abs() < 1e-12);
        assert!((x[1] - 12.5).abs() < 1e-12);
    }

    #[test]
    fn from_unit_clamps_overshoot() {
        let domain = SearchDomain::interval(0.0, 1.0).unwrap();
        assert_eq!(domain.from_unit(&[1.0 + 1e-9]), vec![1.0]);
        assert_eq!(domain.from_unit(&[-1e-9]), vec![0.0]);
    }

    #[test]
    fn degenerate_domain_detection() {
        let pinned = SearchDomain::new(vec![(1.0, 1.0), (3.0, 3.0)]).unwrap();
        assert!(pinned.is_degenerate());
        assert_eq!(pinned.to_unit(&[1.0, 3.0]), vec![0.5, 0.5]);
        assert_eq!(pinned.from_unit(&[0.2, 0.9]), vec![1.0, 3.0]);

        let partial = SearchDomain::new(vec![(1.0, 1.0), (0.0, 3.0)]).unwrap();
        assert!(!partial.is_degenerate());
    }

    #[test]
    fn uniform_samples_stay_inside() {
        let domain = SearchDomain::new(vec![(-5.0, 5.0), (0.0, 0.1)]).unwrap();
        let mut rng = fastrand::Rng::with_seed(7);
        for _ in 0..200 {
            assert!(domain.contains(&domain.sample_uniform(&mut rng)));
        }
    }
}
