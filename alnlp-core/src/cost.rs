//! Scalar cost functionals.

use std::sync::Arc;

use crate::func::{BaseFunction, C1Function, C2Function, ManifoldDifferenceToPoint};
use crate::manifold::Manifold;
use crate::{MatrixXs, VectorXs};

/// Scalar functional `f : M → R` with gradient and symmetric Hessian in
/// tangent coordinates.
pub trait CostFunction: Send + Sync {
    /// Point dimension.
    fn nx(&self) -> usize;
    /// Tangent dimension.
    fn ndx(&self) -> usize;

    /// Evaluate the cost at `x`.
    fn call(&self, x: &VectorXs) -> f64;

    /// Write the `ndx` gradient into `out`.
    fn gradient(&self, x: &VectorXs, out: &mut VectorXs);

    /// Write the `ndx × ndx` Hessian into `out`.
    fn hessian(&self, x: &VectorXs, out: &mut MatrixXs);

    /// Allocating gradient.
    fn gradient_owned(&self, x: &VectorXs) -> VectorXs {
        let mut out = VectorXs::zeros(self.ndx());
        self.gradient(x, &mut out);
        out
    }

    /// Allocating Hessian.
    fn hessian_owned(&self, x: &VectorXs) -> MatrixXs {
        let mut out = MatrixXs::zeros(self.ndx(), self.ndx());
        self.hessian(x, &mut out);
        out
    }
}

/// Quadratic form `½ r(x)ᵀ Q r(x) + bᵀ r(x) + c` of a residual.
///
/// Gradient: `Jᵀ (Q r + b)`. Exact Hessian: `Jᵀ Q J` plus the residual's
/// vector-Hessian product contracted with `Q r + b`; the `gauss_newton`
/// flag drops that curvature term, trading accuracy for a guaranteed
/// positive semi-definite Hessian.
pub struct QuadraticResidualCost {
    residual: Arc<dyn C2Function>,
    weights: MatrixXs,
    slope: VectorXs,
    constant: f64,
    /// Drop the second-order residual curvature from the Hessian.
    pub gauss_newton: bool,
}

impl QuadraticResidualCost {
    /// Full form with weights `Q`, slope `b` and constant `c`.
    pub fn new(
        residual: Arc<dyn C2Function>,
        weights: MatrixXs,
        slope: VectorXs,
        constant: f64,
    ) -> Self {
        let nr = residual.nr();
        assert_eq!(
            (weights.nrows(), weights.ncols()),
            (nr, nr),
            "weight matrix is {}x{}, expected {}x{}",
            weights.nrows(),
            weights.ncols(),
            nr,
            nr
        );
        assert_eq!(
            slope.len(),
            nr,
            "slope has length {}, expected nr = {}",
            slope.len(),
            nr
        );
        Self {
            residual,
            weights,
            slope,
            constant,
            gauss_newton: false,
        }
    }

    /// Pure quadratic form `½ rᵀ Q r + c`.
    pub fn weighted(residual: Arc<dyn C2Function>, weights: MatrixXs, constant: f64) -> Self {
        let nr = residual.nr();
        Self::new(residual, weights, VectorXs::zeros(nr), constant)
    }

    /// The wrapped residual.
    pub fn residual(&self) -> &Arc<dyn C2Function> {
        &self.residual
    }

    /// `Q r(x) + b`, the inner gradient of the quadratic form.
    fn weighted_error(&self, x: &VectorXs) -> (VectorXs, VectorXs) {
        let err = self.residual.call(x);
        let werr = &self.weights * &err + &self.slope;
        (err, werr)
    }
}

impl CostFunction for QuadraticResidualCost {
    fn nx(&self) -> usize {
        self.residual.nx()
    }

    fn ndx(&self) -> usize {
        self.residual.ndx()
    }

    fn call(&self, x: &VectorXs) -> f64 {
        let err = self.residual.call(x);
        0.5 * (&self.weights * &err).dot(&err) + self.slope.dot(&err) + self.constant
    }

    fn gradient(&self, x: &VectorXs, out: &mut VectorXs) {
        let (_, werr) = self.weighted_error(x);
        let mut jac = MatrixXs::zeros(self.residual.nr(), self.ndx());
        self.residual.jacobian(x, &mut jac);
        out.gemv_tr(1.0, &jac, &werr, 0.0);
    }

    fn hessian(&self, x: &VectorXs, out: &mut MatrixXs) {
        let (_, werr) = self.weighted_error(x);
        let mut jac = MatrixXs::zeros(self.residual.nr(), self.ndx());
        self.residual.jacobian(x, &mut jac);
        let jtq = jac.transpose() * &self.weights;
        jtq.mul_to(&jac, out);
        if !self.gauss_newton {
            let mut curv = MatrixXs::zeros(self.ndx(), self.ndx());
            self.residual.vector_hessian_product(x, &werr, &mut curv);
            *out += curv;
        }
    }
}

/// Squared manifold distance `½ (x ⊖ target)ᵀ W (x ⊖ target)`.
///
/// A [`QuadraticResidualCost`] over the inverse-retraction residual; exact
/// on vector spaces, Gauss-Newton on curved manifolds (the retraction
/// curvature is dropped).
pub struct QuadraticDistanceCost {
    inner: QuadraticResidualCost,
}

impl QuadraticDistanceCost {
    /// Squared distance to `target` with weights `W`.
    pub fn new(space: Arc<dyn Manifold>, target: VectorXs, weights: MatrixXs) -> Self {
        let residual = Arc::new(ManifoldDifferenceToPoint::new(space, target));
        Self {
            inner: QuadraticResidualCost::weighted(residual, weights, 0.0),
        }
    }

    /// Unit-weight squared distance to the manifold's neutral element.
    pub fn to_neutral(space: Arc<dyn Manifold>) -> Self {
        let target = space.neutral();
        let ndx = space.ndx();
        Self::new(space, target, MatrixXs::identity(ndx, ndx))
    }
}

impl CostFunction for QuadraticDistanceCost {
    fn nx(&self) -> usize {
        self.inner.nx()
    }

    fn ndx(&self) -> usize {
        self.inner.ndx()
    }

    fn call(&self, x: &VectorXs) -> f64 {
        self.inner.call(x)
    }

    fn gradient(&self, x: &VectorXs, out: &mut VectorXs) {
        self.inner.gradient(x, out);
    }

    fn hessian(&self, x: &VectorXs, out: &mut MatrixXs) {
        self.inner.hessian(x, out);
    }
}

/// Present a scalar cost as an `nr = 1` residual function.
///
/// The Jacobian is the gradient transposed and the vector-Hessian product
/// is `λ_0` times the cost Hessian. This is what lets a quadratic cost act
/// as an inequality residual (e.g. `‖x‖² − R² ≤ 0` for a disk constraint).
pub struct CostAsFunction {
    cost: Arc<dyn CostFunction>,
}

impl CostAsFunction {
    /// View `cost` as a one-dimensional residual.
    pub fn new(cost: Arc<dyn CostFunction>) -> Self {
        Self { cost }
    }
}

impl BaseFunction for CostAsFunction {
    fn nx(&self) -> usize {
        self.cost.nx()
    }

    fn ndx(&self) -> usize {
        self.cost.ndx()
    }

    fn nr(&self) -> usize {
        1
    }

    fn call(&self, x: &VectorXs) -> VectorXs {
        VectorXs::from_element(1, self.cost.call(x))
    }
}

impl C1Function for CostAsFunction {
    fn jacobian(&self, x: &VectorXs, jout: &mut MatrixXs) {
        let grad = self.cost.gradient_owned(x);
        jout.row_mut(0).copy_from(&grad.transpose());
    }
}

impl C2Function for CostAsFunction {
    fn vector_hessian_product(&self, x: &VectorXs, lam: &VectorXs, hout: &mut MatrixXs) {
        self.cost.hessian(x, hout);
        *hout *= lam[0];
    }
}
