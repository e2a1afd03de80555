//! Function composition.

use std::sync::Arc;

use super::{check_jacobian_shape, BaseFunction, C1Function, C2Function};
use crate::{MatrixXs, VectorXs};

/// Composition `(left ∘ right)(x) = left(right(x))`.
///
/// The Jacobian chains through the standard rule
/// `J(x) = J_left(right(x)) · J_right(x)`. The inner function must map into
/// a vector space matching the outer function's domain
/// (`left.nx() == left.ndx() == right.nr()`), since the outer chart is
/// applied to the inner residual values directly.
pub struct ComposeFunction {
    left: Arc<dyn C2Function>,
    right: Arc<dyn C2Function>,
}

impl ComposeFunction {
    /// Compose `left ∘ right`.
    pub fn new(left: Arc<dyn C2Function>, right: Arc<dyn C2Function>) -> Self {
        assert_eq!(
            left.nx(),
            right.nr(),
            "outer function expects inputs of dimension {}, inner produces {}",
            left.nx(),
            right.nr()
        );
        assert_eq!(
            left.nx(),
            left.ndx(),
            "outer function must live on a vector space (nx == ndx)"
        );
        Self { left, right }
    }
}

impl BaseFunction for ComposeFunction {
    fn nx(&self) -> usize {
        self.right.nx()
    }

    fn ndx(&self) -> usize {
        self.right.ndx()
    }

    fn nr(&self) -> usize {
        self.left.nr()
    }

    fn call(&self, x: &VectorXs) -> VectorXs {
        self.left.call(&self.right.call(x))
    }
}

impl C1Function for ComposeFunction {
    fn jacobian(&self, x: &VectorXs, jout: &mut MatrixXs) {
        check_jacobian_shape(self, jout);
        let inner_val = self.right.call(x);
        let mut jl = MatrixXs::zeros(self.left.nr(), self.left.ndx());
        let mut jr = MatrixXs::zeros(self.right.nr(), self.right.ndx());
        self.left.jacobian(&inner_val, &mut jl);
        self.right.jacobian(x, &mut jr);
        jl.mul_to(&jr, jout);
    }
}

// Second-order curvature of the composition is not chained; the zero
// default amounts to a Gauss-Newton treatment of the composite.
impl C2Function for ComposeFunction {}
