//! Merit functions: the Lagrangian and the primal-dual augmented
//! Lagrangian (PDAL).
//!
//! Both are built from a [`Problem`] and evaluate into a caller-owned
//! [`MeritScratch`], so repeated evaluations inside a line search allocate
//! nothing beyond the residual calls themselves.

use std::sync::Arc;

use crate::problem::Problem;
use crate::{MatrixXs, VectorXs};

/// Pre-sized evaluation buffers for the merit functions.
///
/// `cval`/`shifted`/`proj`/`lams_plus` are stacked over all constraints in
/// multiplier-layout order; `jac` stacks the constraint Jacobians row-wise.
pub struct MeritScratch {
    /// Stacked constraint values `c(x)`.
    pub cval: VectorXs,
    /// Shifted residuals `z = c(x) + μ λ`.
    pub shifted: VectorXs,
    /// Normal-cone projections `Π(z)` per block.
    pub proj: VectorXs,
    /// Activity mask of `Π` at `z`.
    pub mask: Vec<bool>,
    /// Stacked constraint Jacobian (`nc × ndx`).
    pub jac: MatrixXs,
    /// First-order multiplier estimates `λ⁺ = Π(z)/μ`.
    pub lams_plus: VectorXs,
}

impl MeritScratch {
    /// Buffers sized for `problem`.
    pub fn new(problem: &Problem) -> Self {
        let nc = problem.total_constraint_dim();
        let ndx = problem.ndx();
        Self {
            cval: VectorXs::zeros(nc),
            shifted: VectorXs::zeros(nc),
            proj: VectorXs::zeros(nc),
            mask: vec![false; nc],
            jac: MatrixXs::zeros(nc, ndx),
            lams_plus: VectorXs::zeros(nc),
        }
    }
}

/// Stack all constraint values of `problem` at `x` into `cval`.
pub(crate) fn stack_constraint_values(problem: &Problem, x: &VectorXs, cval: &mut VectorXs) {
    for (cstr, &(offset, len)) in problem
        .constraints()
        .iter()
        .zip(problem.multiplier_layout())
    {
        cval.rows_mut(offset, len).copy_from(&cstr.func.call(x));
    }
}

/// Stack all constraint Jacobians of `problem` at `x` into `jac` row-wise.
pub(crate) fn stack_constraint_jacobians(problem: &Problem, x: &VectorXs, jac: &mut MatrixXs) {
    let ndx = problem.ndx();
    for (cstr, &(offset, len)) in problem
        .constraints()
        .iter()
        .zip(problem.multiplier_layout())
    {
        let mut block = MatrixXs::zeros(len, ndx);
        cstr.func.jacobian(x, &mut block);
        jac.view_mut((offset, 0), (len, ndx)).copy_from(&block);
    }
}

/// The plain Lagrangian `L(x, λ) = f(x) + Σ_i λ_iᵀ c_i(x)`.
pub struct Lagrangian {
    problem: Arc<Problem>,
}

impl Lagrangian {
    /// Lagrangian of `problem`.
    pub fn new(problem: Arc<Problem>) -> Self {
        Self { problem }
    }

    /// `L(x, λ)`.
    pub fn evaluate(&self, x: &VectorXs, lams: &VectorXs, scratch: &mut MeritScratch) -> f64 {
        stack_constraint_values(&self.problem, x, &mut scratch.cval);
        self.problem.cost().call(x) + lams.dot(&scratch.cval)
    }

    /// `∇_x L = ∇f(x) + Σ_i J_iᵀ λ_i`.
    pub fn gradient(
        &self,
        x: &VectorXs,
        lams: &VectorXs,
        out: &mut VectorXs,
        scratch: &mut MeritScratch,
    ) {
        stack_constraint_jacobians(&self.problem, x, &mut scratch.jac);
        self.problem.cost().gradient(x, out);
        out.gemv_tr(1.0, &scratch.jac, lams, 1.0);
    }

    /// `∇²_xx L = ∇²f(x) + Σ_i vhp_i(x, λ_i)`.
    pub fn hessian(
        &self,
        x: &VectorXs,
        lams: &VectorXs,
        out: &mut MatrixXs,
        _scratch: &mut MeritScratch,
    ) {
        let ndx = self.problem.ndx();
        self.problem.cost().hessian(x, out);
        let mut vhp = MatrixXs::zeros(ndx, ndx);
        for (cstr, &(offset, len)) in self
            .problem
            .constraints()
            .iter()
            .zip(self.problem.multiplier_layout())
        {
            let lam_i = lams.rows(offset, len).clone_owned();
            cstr.func.vector_hessian_product(x, &lam_i, &mut vhp);
            *out += &vhp;
        }
    }
}

/// Primal-dual augmented Lagrangian, parameterized by the penalty `μ > 0`:
///
/// ```text
/// Φ(x; λ, μ) = f(x) + Σ_i 1/(2μ) ( ‖Π_i(c_i(x) + μ λ_i)‖² − ‖μ λ_i‖² )
/// ```
///
/// where `Π_i(z) = z − proj_{C_i}(z)`. The function is smooth under the
/// usual augmented-Lagrangian regularity assumptions even though each
/// projection is only piecewise smooth. The first-order multiplier
/// estimates `λ⁺_i = Π_i(z_i)/μ` drive both the gradient
/// (`∇Φ = ∇f + Jᵀλ⁺`) and the outer multiplier updates.
pub struct PdalFunction {
    problem: Arc<Problem>,
    mu: f64,
    mu_inv: f64,
}

impl PdalFunction {
    /// PDAL of `problem` with penalty `mu`.
    pub fn new(problem: Arc<Problem>, mu: f64) -> Self {
        assert!(mu > 0.0, "penalty parameter must be positive, got {}", mu);
        Self {
            problem,
            mu,
            mu_inv: 1.0 / mu,
        }
    }

    /// Current penalty.
    pub fn penalty(&self) -> f64 {
        self.mu
    }

    /// Update the penalty.
    pub fn set_penalty(&mut self, mu: f64) {
        assert!(mu > 0.0, "penalty parameter must be positive, got {}", mu);
        self.mu = mu;
        self.mu_inv = 1.0 / mu;
    }

    /// Fill `cval`, `shifted`, `proj`, `mask` and `lams_plus` at `(x, λ)`.
    pub fn compute_residuals(&self, x: &VectorXs, lams: &VectorXs, s: &mut MeritScratch) {
        stack_constraint_values(&self.problem, x, &mut s.cval);
        s.shifted.copy_from(&s.cval);
        s.shifted.axpy(self.mu, lams, 1.0);
        for (cstr, &(offset, len)) in self
            .problem
            .constraints()
            .iter()
            .zip(self.problem.multiplier_layout())
        {
            let z = &s.shifted.as_slice()[offset..offset + len];
            let proj = &mut s.proj.as_mut_slice()[offset..offset + len];
            cstr.set.normal_cone_projection(z, proj);
            cstr.set.active_set(z, &mut s.mask[offset..offset + len]);
        }
        s.lams_plus.copy_from(&s.proj);
        s.lams_plus *= self.mu_inv;
    }

    /// `Φ(x; λ, μ)`.
    pub fn evaluate(&self, x: &VectorXs, lams: &VectorXs, s: &mut MeritScratch) -> f64 {
        self.compute_residuals(x, lams, s);
        self.evaluate_cached(x, lams, s)
    }

    /// `Φ` from residuals already present in the scratch. The scratch must
    /// have been filled at the same `(x, λ)`.
    pub fn evaluate_cached(&self, x: &VectorXs, lams: &VectorXs, s: &MeritScratch) -> f64 {
        let penal = s.proj.norm_squared() - self.mu * self.mu * lams.norm_squared();
        self.problem.cost().call(x) + 0.5 * self.mu_inv * penal
    }

    /// `∇Φ = ∇f(x) + J(x)ᵀ λ⁺`. Also refreshes the scratch Jacobian.
    pub fn gradient(
        &self,
        x: &VectorXs,
        lams: &VectorXs,
        out: &mut VectorXs,
        s: &mut MeritScratch,
    ) {
        self.compute_residuals(x, lams, s);
        stack_constraint_jacobians(&self.problem, x, &mut s.jac);
        self.problem.cost().gradient(x, out);
        out.gemv_tr(1.0, &s.jac, &s.lams_plus, 1.0);
    }

    /// PDAL Hessian: `∇²f + Σ_i vhp_i(x, λ⁺_i) + (1/μ) J_mᵀ J_m`, where
    /// `J_m` masks out rows inactive in the projection. With `gauss_newton`
    /// the residual curvature terms are dropped, leaving a positive
    /// semi-definite matrix.
    pub fn hessian(
        &self,
        x: &VectorXs,
        lams: &VectorXs,
        gauss_newton: bool,
        out: &mut MatrixXs,
        s: &mut MeritScratch,
    ) {
        self.gradient(x, lams, &mut VectorXs::zeros(self.problem.ndx()), s);
        self.problem.cost().hessian(x, out);
        let ndx = self.problem.ndx();
        if !gauss_newton {
            let mut vhp = MatrixXs::zeros(ndx, ndx);
            for (cstr, &(offset, len)) in self
                .problem
                .constraints()
                .iter()
                .zip(self.problem.multiplier_layout())
            {
                let lam_i = s.lams_plus.rows(offset, len).clone_owned();
                cstr.func.vector_hessian_product(x, &lam_i, &mut vhp);
                *out += &vhp;
            }
        }
        let mut jm = s.jac.clone();
        for (i, &active) in s.mask.iter().enumerate() {
            if !active {
                jm.row_mut(i).fill(0.0);
            }
        }
        let jtj = jm.transpose() * &jm;
        *out += jtj * self.mu_inv;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::{Constraint, EqualitySet, NegativeOrthant};
    use crate::cost::{CostAsFunction, QuadraticDistanceCost, QuadraticResidualCost};
    use crate::func::{LinearFunction, ManifoldDifferenceToPoint};
    use crate::manifold::{Manifold, VectorSpace};

    fn toy_problem() -> Arc<Problem> {
        let space = Arc::new(VectorSpace::new(2));
        let cost = Arc::new(QuadraticDistanceCost::to_neutral(space.clone()));
        let a = MatrixXs::from_row_slice(1, 2, &[1.0, -1.0]);
        let cstr = Constraint::new(
            Arc::new(LinearFunction::new(a, VectorXs::from_element(1, 0.5))),
            Arc::new(EqualitySet),
        );
        Arc::new(Problem::new(space, cost, vec![cstr]).unwrap())
    }

    #[test]
    fn lagrangian_value_and_gradient() {
        let problem = toy_problem();
        let lagr = Lagrangian::new(problem.clone());
        let mut scratch = MeritScratch::new(&problem);

        let x = VectorXs::from_column_slice(&[1.0, 2.0]);
        let lam = VectorXs::from_element(1, 0.75);
        // f = 1/2 (1 + 4), c = 1 - 2 + 0.5.
        let val = lagr.evaluate(&x, &lam, &mut scratch);
        assert!((val - (2.5 + 0.75 * (-0.5))).abs() < 1e-14);

        let mut grad = VectorXs::zeros(2);
        lagr.gradient(&x, &lam, &mut grad, &mut scratch);
        // grad = x + A^T lam.
        assert!((grad[0] - (1.0 + 0.75)).abs() < 1e-14);
        assert!((grad[1] - (2.0 - 0.75)).abs() < 1e-14);
    }

    #[test]
    fn pdal_reduces_to_penalty_at_zero_multipliers() {
        let problem = toy_problem();
        let merit = PdalFunction::new(problem.clone(), 0.5);
        let mut scratch = MeritScratch::new(&problem);

        let x = VectorXs::from_column_slice(&[1.0, 2.0]);
        let lam = VectorXs::zeros(1);
        // Phi = f + 1/(2 mu) ||c||^2 for equalities with zero shift.
        let val = merit.evaluate(&x, &lam, &mut scratch);
        assert!((val - (2.5 + 0.5 / 0.5 * 0.25)).abs() < 1e-14);
        assert!((scratch.lams_plus[0] - (-0.5 / 0.5)).abs() < 1e-14);
        assert!(scratch.mask[0]);
    }

    // min ½‖x‖² s.t. ‖x‖² − 1 ≤ 0: the constraint carries genuine
    // curvature, so the vhp terms of both Hessians are exercised.
    fn ball_problem() -> Arc<Problem> {
        let space: Arc<dyn Manifold> = Arc::new(VectorSpace::new(2));
        let cost = Arc::new(QuadraticDistanceCost::to_neutral(space.clone()));
        let sq_norm = Arc::new(QuadraticResidualCost::weighted(
            Arc::new(ManifoldDifferenceToPoint::new(space.clone(), space.neutral())),
            2.0 * MatrixXs::identity(2, 2),
            -1.0,
        ));
        let cstr = Constraint::new(
            Arc::new(CostAsFunction::new(sq_norm)),
            Arc::new(NegativeOrthant),
        );
        Arc::new(Problem::new(space, cost, vec![cstr]).unwrap())
    }

    #[test]
    fn lagrangian_hessian_accumulates_constraint_curvature() {
        let problem = ball_problem();
        let lagr = Lagrangian::new(problem.clone());
        let mut scratch = MeritScratch::new(&problem);

        let x = VectorXs::from_column_slice(&[1.2, 0.6]);
        let lam = VectorXs::from_element(1, 0.7);
        let mut hess = MatrixXs::zeros(2, 2);
        lagr.hessian(&x, &lam, &mut hess, &mut scratch);

        // f = 1/2 ||x||^2, c = ||x||^2 - 1: hessian = (1 + 2 lam) I.
        let expected = MatrixXs::identity(2, 2) * (1.0 + 2.0 * lam[0]);
        assert!((hess - expected).amax() < 1e-14);
    }

    #[test]
    fn pdal_hessian_matches_finite_differences() {
        let problem = ball_problem();
        let merit = PdalFunction::new(problem.clone(), 0.5);
        let mut scratch = MeritScratch::new(&problem);

        // Outside the ball: the shifted residual stays strictly active, so
        // the mask is constant under the perturbations below.
        let x = VectorXs::from_column_slice(&[1.2, 0.6]);
        let lam = VectorXs::from_element(1, 0.3);

        let mut hess = MatrixXs::zeros(2, 2);
        merit.hessian(&x, &lam, false, &mut hess, &mut scratch);

        let eps = 1e-5;
        let mut gp = VectorXs::zeros(2);
        let mut gm = VectorXs::zeros(2);
        for k in 0..2 {
            let mut xp = x.clone();
            xp[k] += eps;
            let mut xm = x.clone();
            xm[k] -= eps;
            merit.gradient(&xp, &lam, &mut gp, &mut scratch);
            merit.gradient(&xm, &lam, &mut gm, &mut scratch);
            let fd_col = (&gp - &gm) / (2.0 * eps);
            assert!(
                (hess.column(k).clone_owned() - &fd_col).amax() < 1e-5,
                "PDAL Hessian column {} deviates from finite differences",
                k
            );
        }
    }
}
