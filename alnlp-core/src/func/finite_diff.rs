//! Finite-difference capability adapters.
//!
//! These wrappers upgrade a function one derivative order by central
//! differences taken coordinate-wise in tangent space. Perturbed points are
//! produced through the manifold retraction, never by raw vector addition,
//! so the adapters are valid on curved manifolds. Each derivative request
//! costs `2 · ndx` evaluations of the wrapped quantity.

use std::sync::Arc;

use super::{check_jacobian_shape, BaseFunction, C1Function, C2Function};
use crate::manifold::Manifold;
use crate::{MatrixXs, VectorXs};

/// Upgrade a value-only residual to first order.
///
/// `J(x) · e_i ≈ (r(x ⊕ ε e_i) − r(x ⊖ ε e_i)) / 2ε`.
pub struct CentralDiff1 {
    space: Arc<dyn Manifold>,
    func: Arc<dyn BaseFunction>,
    eps: f64,
}

impl CentralDiff1 {
    /// Wrap `func` with finite-difference Jacobians of step `eps`.
    pub fn new(space: Arc<dyn Manifold>, func: Arc<dyn BaseFunction>, eps: f64) -> Self {
        assert!(eps > 0.0, "finite-difference step must be positive");
        assert_eq!(
            space.nx(),
            func.nx(),
            "manifold nx = {} does not match function nx = {}",
            space.nx(),
            func.nx()
        );
        Self { space, func, eps }
    }
}

impl BaseFunction for CentralDiff1 {
    fn nx(&self) -> usize {
        self.func.nx()
    }

    fn ndx(&self) -> usize {
        self.func.ndx()
    }

    fn nr(&self) -> usize {
        self.func.nr()
    }

    fn call(&self, x: &VectorXs) -> VectorXs {
        self.func.call(x)
    }
}

impl C1Function for CentralDiff1 {
    fn jacobian(&self, x: &VectorXs, jout: &mut MatrixXs) {
        check_jacobian_shape(self, jout);
        let ndx = self.ndx();
        let mut ei = VectorXs::zeros(ndx);
        let mut xplus = VectorXs::zeros(self.nx());
        let mut xminus = VectorXs::zeros(self.nx());
        for i in 0..ndx {
            ei[i] = self.eps;
            self.space.integrate(x, &ei, &mut xplus);
            ei[i] = -self.eps;
            self.space.integrate(x, &ei, &mut xminus);
            ei[i] = 0.0;
            let col = (self.func.call(&xplus) - self.func.call(&xminus)) / (2.0 * self.eps);
            jout.column_mut(i).copy_from(&col);
        }
    }
}

impl C2Function for CentralDiff1 {}

/// Upgrade a first-order residual to second order.
///
/// The Jacobian is delegated to the wrapped function; the vector-Hessian
/// product is a central difference of the Jacobian contracted with the dual
/// vector: `(Σ_i λ_i ∇²r_i) e_j ≈ (J(x ⊕ ε e_j) − J(x ⊖ ε e_j))ᵀ λ / 2ε`.
pub struct CentralDiff2 {
    space: Arc<dyn Manifold>,
    func: Arc<dyn C1Function>,
    eps: f64,
}

impl CentralDiff2 {
    /// Wrap `func` with finite-difference curvature of step `eps`.
    pub fn new(space: Arc<dyn Manifold>, func: Arc<dyn C1Function>, eps: f64) -> Self {
        assert!(eps > 0.0, "finite-difference step must be positive");
        assert_eq!(
            space.nx(),
            func.nx(),
            "manifold nx = {} does not match function nx = {}",
            space.nx(),
            func.nx()
        );
        Self { space, func, eps }
    }
}

impl BaseFunction for CentralDiff2 {
    fn nx(&self) -> usize {
        self.func.nx()
    }

    fn ndx(&self) -> usize {
        self.func.ndx()
    }

    fn nr(&self) -> usize {
        self.func.nr()
    }

    fn call(&self, x: &VectorXs) -> VectorXs {
        self.func.call(x)
    }
}

impl C1Function for CentralDiff2 {
    fn jacobian(&self, x: &VectorXs, jout: &mut MatrixXs) {
        self.func.jacobian(x, jout);
    }
}

impl C2Function for CentralDiff2 {
    fn vector_hessian_product(&self, x: &VectorXs, lam: &VectorXs, hout: &mut MatrixXs) {
        assert_eq!(
            lam.len(),
            self.nr(),
            "dual vector has length {}, expected nr = {}",
            lam.len(),
            self.nr()
        );
        let ndx = self.ndx();
        let mut ei = VectorXs::zeros(ndx);
        let mut xplus = VectorXs::zeros(self.nx());
        let mut xminus = VectorXs::zeros(self.nx());
        let mut jplus = MatrixXs::zeros(self.nr(), ndx);
        let mut jminus = MatrixXs::zeros(self.nr(), ndx);
        for j in 0..ndx {
            ei[j] = self.eps;
            self.space.integrate(x, &ei, &mut xplus);
            ei[j] = -self.eps;
            self.space.integrate(x, &ei, &mut xminus);
            ei[j] = 0.0;
            self.func.jacobian(&xplus, &mut jplus);
            self.func.jacobian(&xminus, &mut jminus);
            let col = ((&jplus - &jminus) / (2.0 * self.eps)).transpose() * lam;
            hout.column_mut(j).copy_from(&col);
        }
    }
}
