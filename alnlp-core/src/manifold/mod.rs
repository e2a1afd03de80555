//! Manifold abstraction.
//!
//! A manifold provides the retraction `integrate` (x ⊕ v) and its inverse
//! `difference` (x1 ⊖ x0), together with their Jacobians taken with respect
//! to either argument. The solver is written purely against this contract;
//! points are only ever moved through these operators, never by raw vector
//! arithmetic on the ambient representation.
//!
//! # Conventions
//!
//! - Points live in the ambient representation, dimension `nx()`.
//! - Tangent vectors have dimension `ndx()`, which may differ from `nx()`.
//! - Jacobians of both operators are `ndx × ndx` matrices expressed in
//!   tangent coordinates; `arg ∈ {0, 1}` selects the differentiation
//!   argument.
//!
//! Implementations must satisfy, to numerical tolerance:
//! `integrate(x, difference(x, y)) == y` and `difference(x, x) == 0`.

mod product;
mod so2;
mod vector_space;

pub use product::Product;
pub use so2::So2;
pub use vector_space::VectorSpace;

use crate::{MatrixXs, VectorXs};

/// Differentiable-manifold contract.
///
/// All methods operate on caller-provided buffers; the allocating
/// convenience wrappers below are provided for construction-time and test
/// code. Implementations must be usable from multiple threads at once
/// (`solve` calls on disjoint workspaces may run concurrently).
pub trait Manifold: Send + Sync {
    /// Ambient (point) representation dimension.
    fn nx(&self) -> usize;

    /// Tangent space dimension.
    fn ndx(&self) -> usize;

    /// Identity-like reference point. Defaults to the zero vector.
    fn neutral(&self) -> VectorXs {
        VectorXs::zeros(self.nx())
    }

    /// Retraction `out = x ⊕ v`.
    fn integrate(&self, x: &VectorXs, v: &VectorXs, out: &mut VectorXs);

    /// Inverse retraction `out = x1 ⊖ x0`, the tangent vector at `x0`
    /// taking `x0` to `x1`.
    fn difference(&self, x0: &VectorXs, x1: &VectorXs, out: &mut VectorXs);

    /// Jacobian of `integrate(x, v)` with respect to argument `arg`.
    fn jintegrate(&self, x: &VectorXs, v: &VectorXs, jout: &mut MatrixXs, arg: usize);

    /// Jacobian of `difference(x0, x1)` with respect to argument `arg`.
    fn jdifference(&self, x0: &VectorXs, x1: &VectorXs, jout: &mut MatrixXs, arg: usize);

    /// Geodesic-like interpolation between `x0` and `x1` at `u ∈ [0, 1]`.
    ///
    /// Default: `integrate(x0, u * difference(x0, x1))`.
    fn interpolate(&self, x0: &VectorXs, x1: &VectorXs, u: f64, out: &mut VectorXs) {
        let mut d = VectorXs::zeros(self.ndx());
        self.difference(x0, x1, &mut d);
        d *= u;
        self.integrate(x0, &d, out);
    }
}

/// Allocating wrappers around the in-place manifold operators.
impl dyn Manifold + '_ {
    /// Out-of-place retraction.
    pub fn integrate_owned(&self, x: &VectorXs, v: &VectorXs) -> VectorXs {
        let mut out = VectorXs::zeros(self.nx());
        self.integrate(x, v, &mut out);
        out
    }

    /// Out-of-place inverse retraction.
    pub fn difference_owned(&self, x0: &VectorXs, x1: &VectorXs) -> VectorXs {
        let mut out = VectorXs::zeros(self.ndx());
        self.difference(x0, x1, &mut out);
        out
    }

    /// Out-of-place interpolation.
    pub fn interpolate_owned(&self, x0: &VectorXs, x1: &VectorXs, u: f64) -> VectorXs {
        let mut out = VectorXs::zeros(self.nx());
        self.interpolate(x0, x1, u, &mut out);
        out
    }
}

pub(crate) fn check_point_dim(space: &dyn Manifold, x: &VectorXs, what: &str) {
    assert_eq!(
        x.len(),
        space.nx(),
        "{} has length {}, expected nx = {}",
        what,
        x.len(),
        space.nx()
    );
}

pub(crate) fn check_tangent_dim(space: &dyn Manifold, v: &VectorXs, what: &str) {
    assert_eq!(
        v.len(),
        space.ndx(),
        "{} has length {}, expected ndx = {}",
        what,
        v.len(),
        space.ndx()
    );
}
