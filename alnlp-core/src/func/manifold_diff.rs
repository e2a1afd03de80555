//! Residual between a point and a fixed target on the manifold.

use std::sync::Arc;

use super::{check_jacobian_shape, BaseFunction, C1Function, C2Function};
use crate::manifold::Manifold;
use crate::{MatrixXs, VectorXs};

/// `r(x) = x ⊖ target`, the inverse-retraction residual (`nr == ndx`).
///
/// Its zero set pins `x` to `target`; its squared weighted norm is the
/// squared manifold distance used by [`crate::cost::QuadraticDistanceCost`].
pub struct ManifoldDifferenceToPoint {
    space: Arc<dyn Manifold>,
    target: VectorXs,
}

impl ManifoldDifferenceToPoint {
    /// Residual to the given target point.
    pub fn new(space: Arc<dyn Manifold>, target: VectorXs) -> Self {
        assert_eq!(
            target.len(),
            space.nx(),
            "target has length {}, expected nx = {}",
            target.len(),
            space.nx()
        );
        Self { space, target }
    }

    /// The target point.
    pub fn target(&self) -> &VectorXs {
        &self.target
    }
}

impl BaseFunction for ManifoldDifferenceToPoint {
    fn nx(&self) -> usize {
        self.space.nx()
    }

    fn ndx(&self) -> usize {
        self.space.ndx()
    }

    fn nr(&self) -> usize {
        self.space.ndx()
    }

    fn call(&self, x: &VectorXs) -> VectorXs {
        let mut out = VectorXs::zeros(self.space.ndx());
        self.space.difference(&self.target, x, &mut out);
        out
    }
}

impl C1Function for ManifoldDifferenceToPoint {
    fn jacobian(&self, x: &VectorXs, jout: &mut MatrixXs) {
        check_jacobian_shape(self, jout);
        self.space.jdifference(&self.target, x, jout, 1);
    }
}

impl C2Function for ManifoldDifferenceToPoint {}
