#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// Returned when a domain dimension has a lower bound above its upper bound,
    /// a non-finite bound, or a width too large to represent.
    #[error(
        "invalid bounds in dimension {dim}: low ({low}) must be finite and <= high ({high}) with a finite width"
    )]
    InvalidBounds {
        /// The offending dimension.
        dim: usize,
        /// The lower bound value.
        low: f64,
        /// The upper bound value.
        high: f64,
    },

    /// Returned when a search domain has no dimensions.
    #[error("search domain must have at least one dimension")]
    EmptyDomain,

    /// Returned when an input vector does not match the expected dimension.
    #[error("dimension mismatch: expected {expected} values, got {got}")]
    DimensionMismatch {
        /// The expected number of coordinates.
        expected: usize,
        /// The actual number of coordinates.
        got: usize,
    },

    /// Returned when a kernel is configured with a non-positive or
    /// non-finite length-scale or variance.
    #[error("invalid kernel parameter '{name}': {value} must be finite and positive")]
    InvalidKernelParameter {
        /// The parameter name.
        name: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// Returned when the diagonal jitter is not finite and positive.
    #[error("invalid jitter: {0} must be finite and positive")]
    InvalidJitter(f64),

    /// Returned when the loop is started from an empty initial design.
    #[error("initial design must contain at least one observation")]
    EmptyInitialDesign,

    /// Returned when the Gram matrix stays non-positive-definite even after
    /// escalating the jitter.
    #[error("Gram matrix is not positive definite (effective jitter {jitter:e})")]
    IllConditioned {
        /// The largest jitter tried.
        jitter: f64,
    },

    /// Returned when the objective produces NaN or an infinite value.
    #[error("objective returned a non-finite value ({value}) at {x:?}")]
    NonFiniteObjective {
        /// The evaluated input.
        x: Vec<f64>,
        /// The returned outcome.
        value: f64,
    },

    /// Returned when the objective itself reports a failure.
    #[error("objective failed: {0}")]
    Objective(String),

    /// Returned when an evaluation exceeds the configured timeout.
    #[cfg(feature = "async")]
    #[error("objective evaluation timed out after {0:?}")]
    EvaluationTimedOut(core::time::Duration),

    /// Returned when an async task fails.
    #[cfg(feature = "async")]
    #[error("async task error: {0}")]
    TaskError(String),
}

pub type Result<T> = core::result::Result<T, Error>;
