//! Append-only record of objective evaluations.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::Direction;

/// One evaluated input and its (possibly noisy) outcome.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ObservedPoint {
    /// The evaluated input.
    pub x: Vec<f64>,
    /// The objective value at `x`.
    pub y: f64,
}

impl ObservedPoint {
    /// Creates a new observation.
    #[must_use]
    pub fn new(x: Vec<f64>, y: f64) -> Self {
        Self { x, y }
    }
}

/// Every observation made so far, in evaluation order.
///
/// Points are never removed or reordered. All inputs share the dimension
/// of the first point pushed, and outcomes are always finite. Duplicate
/// inputs are accepted.
///
/// # Examples
///
/// ```
/// use bayesopt::{Direction, History};
///
/// let mut history = History::new();
/// history.push(vec![0.0], 1.0).unwrap();
/// history.push(vec![1.0], 3.0).unwrap();
///
/// assert_eq!(history.len(), 2);
/// assert_eq!(history.best(Direction::Maximize).unwrap().y, 3.0);
/// assert_eq!(history.best(Direction::Minimize).unwrap().y, 1.0);
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct History {
    points: Vec<ObservedPoint>,
}

impl History {
    /// Creates an empty history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a history from `(x, y)` pairs, validating each one.
    ///
    /// # Errors
    ///
    /// See [`History::push`].
    pub fn from_pairs(pairs: impl IntoIterator<Item = (Vec<f64>, f64)>) -> Result<Self> {
        let mut history = Self::new();
        for (x, y) in pairs {
            history.push(x, y)?;
        }
        Ok(history)
    }

    /// Appends an observation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if `x` differs in length from the
    /// points already recorded and [`Error::NonFiniteObjective`] if `y` is
    /// NaN or infinite.
    pub fn push(&mut self, x: Vec<f64>, y: f64) -> Result<()> {
        if let Some(expected) = self.dimension()
            && x.len() != expected
        {
            return Err(Error::DimensionMismatch {
                expected,
                got: x.len(),
            });
        }
        if !y.is_finite() {
            return Err(Error::NonFiniteObjective { x, value: y });
        }
        self.points.push(ObservedPoint { x, y });
        Ok(())
    }

    /// Number of observations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns `true` if nothing has been observed yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Input dimension, or `None` while empty.
    #[must_use]
    pub fn dimension(&self) -> Option<usize> {
        self.points.first().map(|p| p.x.len())
    }

    /// All observations in evaluation order.
    #[must_use]
    pub fn points(&self) -> &[ObservedPoint] {
        &self.points
    }

    /// Iterates over observations in evaluation order.
    pub fn iter(&self) -> core::slice::Iter<'_, ObservedPoint> {
        self.points.iter()
    }

    /// The most recent observation.
    #[must_use]
    pub fn last(&self) -> Option<&ObservedPoint> {
        self.points.last()
    }

    /// The best observation in `direction`. Ties keep the earliest point.
    #[must_use]
    pub fn best(&self, direction: Direction) -> Option<&ObservedPoint> {
        self.points.iter().fold(None, |best, p| match best {
            Some(b) if !direction.is_better(p.y, b.y) => Some(b),
            _ => Some(p),
        })
    }

    /// Best outcome among the first `n` observations.
    pub(crate) fn best_value_in_prefix(&self, n: usize, direction: Direction) -> Option<f64> {
        self.points[..n.min(self.points.len())]
            .iter()
            .map(|p| p.y)
            .reduce(|a, b| if direction.is_better(b, a) { b } else { a })
    }
}

impl<'a> IntoIterator for &'a History {
    type Item = &'a ObservedPoint;
    type IntoIter = core::slice::Iter<'a, ObservedPoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}
