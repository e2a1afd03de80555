//! Differentiable residual functions `r : M → R^nr`.
//!
//! Two capability levels are modeled as a trait ladder:
//!
//! - [`C1Function`]: value + Jacobian (`nr × ndx`, in tangent coordinates);
//! - [`C2Function`]: adds the vector-Hessian product
//!   `Σ_i λ_i ∇²r_i(x)` contracted with a dual vector `λ`, so per-component
//!   Hessians are never materialized.
//!
//! Capability downgrades (opaque value-only callables to C1/C2) live in
//! [`finite_diff`]; composition in [`compose`].

mod compose;
mod finite_diff;
mod linear;
mod manifold_diff;

pub use compose::ComposeFunction;
pub use finite_diff::{CentralDiff1, CentralDiff2};
pub use linear::LinearFunction;
pub use manifold_diff::ManifoldDifferenceToPoint;

use crate::{MatrixXs, VectorXs};

/// A plain residual: dimensions and a value. The bottom of the capability
/// ladder, wrappable into a [`C1Function`] through finite differences.
pub trait BaseFunction: Send + Sync {
    /// Input point dimension.
    fn nx(&self) -> usize;
    /// Input tangent dimension.
    fn ndx(&self) -> usize;
    /// Output (residual) dimension.
    fn nr(&self) -> usize;

    /// Evaluate the residual at `x`.
    fn call(&self, x: &VectorXs) -> VectorXs;
}

/// First-order residual: value and Jacobian.
pub trait C1Function: BaseFunction {
    /// Write the `nr × ndx` Jacobian of the residual at `x` into `jout`.
    fn jacobian(&self, x: &VectorXs, jout: &mut MatrixXs);

    /// Allocating Jacobian, for construction-time and test code.
    fn jacobian_owned(&self, x: &VectorXs) -> MatrixXs {
        let mut jout = MatrixXs::zeros(self.nr(), self.ndx());
        self.jacobian(x, &mut jout);
        jout
    }
}

/// Second-order residual: adds the vector-Hessian product.
pub trait C2Function: C1Function {
    /// Accumulate `Σ_i lam_i ∇²r_i(x)` into `hout` (`ndx × ndx`).
    ///
    /// `hout` is overwritten. The default is the zero matrix, which is the
    /// correct exact Hessian contribution for residuals that are linear in
    /// tangent coordinates and the usual Gauss-Newton surrogate otherwise.
    fn vector_hessian_product(&self, x: &VectorXs, lam: &VectorXs, hout: &mut MatrixXs) {
        let _ = (x, lam);
        hout.fill(0.0);
    }
}

pub(crate) fn check_jacobian_shape(f: &dyn BaseFunction, jout: &MatrixXs) {
    assert_eq!(
        (jout.nrows(), jout.ncols()),
        (f.nr(), f.ndx()),
        "Jacobian buffer is {}x{}, expected {}x{}",
        jout.nrows(),
        jout.ncols(),
        f.nr(),
        f.ndx()
    );
}
