//! Fan-out of independent multi-start local searches.
//!
//! Start points are always drawn up front from the caller's RNG, so the
//! result order (and therefore tie-breaking) is identical with and without
//! the `parallel` feature.

/// Apply `run` to every start point, in parallel when the `parallel`
/// feature is enabled. Results keep the order of `starts`.
#[cfg(feature = "parallel")]
pub(crate) fn map_starts<T, R, F>(starts: &[T], run: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync + Send,
{
    use rayon::prelude::*;
    starts.par_iter().map(run).collect()
}

/// Apply `run` to every start point sequentially.
#[cfg(not(feature = "parallel"))]
pub(crate) fn map_starts<T, R, F>(starts: &[T], run: F) -> Vec<R>
where
    F: Fn(&T) -> R,
{
    starts.iter().map(run).collect()
}

/// Index of the smallest finite value; ties keep the lowest index.
pub(crate) fn argmin_finite(values: impl IntoIterator<Item = f64>) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, v) in values.into_iter().enumerate() {
        if !v.is_finite() {
            continue;
        }
        match best {
            Some((_, b)) if v >= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}
