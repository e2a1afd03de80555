//! Affine residual on a vector space.

use super::{check_jacobian_shape, BaseFunction, C1Function, C2Function};
use crate::{MatrixXs, VectorXs};

/// `r(x) = A x + b` on `R^n` (`nx == ndx == A.ncols()`).
///
/// The Jacobian is constant and the function is exactly second-order with a
/// zero vector-Hessian product.
#[derive(Debug, Clone)]
pub struct LinearFunction {
    mat: MatrixXs,
    rhs: VectorXs,
}

impl LinearFunction {
    /// Residual `A x + b`.
    pub fn new(mat: MatrixXs, rhs: VectorXs) -> Self {
        assert_eq!(
            mat.nrows(),
            rhs.len(),
            "A has {} rows but b has length {}",
            mat.nrows(),
            rhs.len()
        );
        Self { mat, rhs }
    }

    /// The constraint matrix `A`.
    pub fn matrix(&self) -> &MatrixXs {
        &self.mat
    }

    /// The offset `b`.
    pub fn offset(&self) -> &VectorXs {
        &self.rhs
    }
}

impl BaseFunction for LinearFunction {
    fn nx(&self) -> usize {
        self.mat.ncols()
    }

    fn ndx(&self) -> usize {
        self.mat.ncols()
    }

    fn nr(&self) -> usize {
        self.mat.nrows()
    }

    fn call(&self, x: &VectorXs) -> VectorXs {
        &self.mat * x + &self.rhs
    }
}

impl C1Function for LinearFunction {
    fn jacobian(&self, _x: &VectorXs, jout: &mut MatrixXs) {
        check_jacobian_shape(self, jout);
        jout.copy_from(&self.mat);
    }
}

impl C2Function for LinearFunction {}
