//! Solver error taxonomy.

use crate::linalg::BackendError;
use thiserror::Error;

/// Errors surfaced by problem construction and the solve loop.
///
/// Dimension mismatches and non-finite values are never swallowed; KKT
/// factorization trouble is only reported here after the solver's local
/// regularization/backoff recovery has been exhausted.
#[derive(Debug, Error)]
pub enum Error {
    /// A vector or matrix had the wrong size for the operation.
    #[error("dimension mismatch in {what}: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Which quantity was mis-sized.
        what: &'static str,
        /// Expected dimension.
        expected: usize,
        /// Received dimension.
        actual: usize,
    },

    /// A NaN or infinity showed up in a computed quantity.
    #[error("non-finite value detected in {0}")]
    NonFinite(&'static str),

    /// Per-constraint access on a problem with no constraints.
    #[error("problem has no constraints: per-constraint access is invalid")]
    EmptyProblem,

    /// KKT factorization failed past the recovery ladder.
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Check every coefficient of a slice-like quantity for NaN/Inf.
pub(crate) fn ensure_all_finite<'a, I>(values: I, what: &'static str) -> Result<(), Error>
where
    I: IntoIterator<Item = &'a f64>,
{
    if values.into_iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(Error::NonFinite(what))
    }
}

/// Check a scalar for NaN/Inf.
pub(crate) fn ensure_finite(value: f64, what: &'static str) -> Result<f64, Error> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(Error::NonFinite(what))
    }
}
