//! Euclidean vector space, the trivial manifold.

use super::{check_point_dim, check_tangent_dim, Manifold};
use crate::{MatrixXs, VectorXs};

/// `R^n` with the identity chart: `integrate` is addition and `difference`
/// is subtraction, so `nx == ndx` and all Jacobians are `±I`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VectorSpace {
    dim: usize,
}

impl VectorSpace {
    /// Euclidean space of dimension `dim`.
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }
}

impl Manifold for VectorSpace {
    fn nx(&self) -> usize {
        self.dim
    }

    fn ndx(&self) -> usize {
        self.dim
    }

    fn integrate(&self, x: &VectorXs, v: &VectorXs, out: &mut VectorXs) {
        check_point_dim(self, x, "integrate point");
        check_tangent_dim(self, v, "integrate tangent");
        out.copy_from(x);
        *out += v;
    }

    fn difference(&self, x0: &VectorXs, x1: &VectorXs, out: &mut VectorXs) {
        check_point_dim(self, x0, "difference base point");
        check_point_dim(self, x1, "difference target point");
        out.copy_from(x1);
        *out -= x0;
    }

    fn jintegrate(&self, _x: &VectorXs, _v: &VectorXs, jout: &mut MatrixXs, arg: usize) {
        debug_assert!(arg < 2, "Jacobian argument must be 0 or 1");
        jout.fill(0.0);
        jout.fill_diagonal(1.0);
    }

    fn jdifference(&self, _x0: &VectorXs, _x1: &VectorXs, jout: &mut MatrixXs, arg: usize) {
        debug_assert!(arg < 2, "Jacobian argument must be 0 or 1");
        jout.fill(0.0);
        jout.fill_diagonal(if arg == 0 { -1.0 } else { 1.0 });
    }
}
