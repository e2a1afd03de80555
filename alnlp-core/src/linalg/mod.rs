//! Symmetric-indefinite linear-system backends for the KKT system.
//!
//! The solver only depends on the two-method contract below (`compute` +
//! `solve_in_place`), so factorization strategies are swappable without
//! touching solver logic. Backends must produce numerically equivalent
//! solves.

mod block_ldlt;
mod dense_ldlt;

pub use block_ldlt::BlockLdlt;
pub use dense_ldlt::DenseLdlt;

use crate::{MatrixXs, VectorXs};
use thiserror::Error;

/// Backend factorization/solve errors.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The matrix handed to `compute` does not match the backend dimension.
    #[error("KKT matrix is {rows}x{cols}, expected {dim}x{dim}")]
    WrongShape {
        /// Backend dimension.
        dim: usize,
        /// Matrix rows received.
        rows: usize,
        /// Matrix columns received.
        cols: usize,
    },

    /// The right-hand side does not match the factorized dimension.
    #[error("right-hand side has length {actual}, expected {expected}")]
    RhsDimension {
        /// Expected length.
        expected: usize,
        /// Received length.
        actual: usize,
    },

    /// The condensed primal block was not positive definite.
    #[error("Schur complement is not positive definite")]
    NotPositiveDefinite,

    /// `solve_in_place` called before a successful `compute`.
    #[error("solve called before a successful factorization")]
    NotFactorized,
}

/// Symmetric-indefinite factorization contract for KKT systems.
pub trait KktBackend: Send {
    /// System dimension.
    fn dim(&self) -> usize;

    /// Factorize the symmetric matrix `kkt`.
    fn compute(&mut self, kkt: &MatrixXs) -> Result<(), BackendError>;

    /// Solve in place: on entry `rhs` holds the right-hand side, on return
    /// the solution.
    fn solve_in_place(&self, rhs: &mut VectorXs) -> Result<(), BackendError>;

    /// Inertia `(positive, negative, zero)` of the factorized matrix, when
    /// the backend can report it.
    fn inertia(&self) -> Option<(usize, usize, usize)> {
        None
    }

    /// Number of dynamic regularization bumps applied so far.
    fn dynamic_bumps(&self) -> u64 {
        0
    }
}
