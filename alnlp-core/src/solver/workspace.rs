//! Per-solve scratch state and the externally visible solution record.

use crate::merit::MeritScratch;
use crate::problem::Problem;
use crate::{MatrixXs, VectorXs};

/// Solution status of one `solve` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SolveStatus {
    /// No solve has run yet.
    #[default]
    Uninit,
    /// Primal and dual residuals below tolerance.
    Converged,
    /// Iteration budget exhausted; best iterate retained.
    MaxItersReached,
    /// A non-finite value was produced, or factorization recovery failed.
    Diverged,
}

impl std::fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolveStatus::Uninit => write!(f, "Uninit"),
            SolveStatus::Converged => write!(f, "Converged"),
            SolveStatus::MaxItersReached => write!(f, "MaxItersReached"),
            SolveStatus::Diverged => write!(f, "Diverged"),
        }
    }
}

/// Iteration-scoped buffers, exclusively owned by one `solve` call and
/// reused across outer/inner iterations so the hot loop never reallocates.
pub struct Workspace {
    /// Current point.
    pub x: VectorXs,
    /// Line-search trial point.
    pub x_trial: VectorXs,
    /// Proximal center (previous outer iterate).
    pub x_prox: VectorXs,
    /// Primal Newton step (tangent vector).
    pub dx: VectorXs,
    /// Scaled step buffer for retraction trials.
    pub dx_scaled: VectorXs,
    /// Dual Newton step.
    pub dlam: VectorXs,
    /// Working (inner-loop) multipliers.
    pub lams: VectorXs,
    /// Outer multiplier estimates, the PDAL shift. Also a convenient
    /// all-zero initial guess right after construction.
    pub lams_prev: VectorXs,
    /// Objective gradient buffer.
    pub grad_cost: VectorXs,
    /// Merit gradient (PDAL gradient plus proximal term).
    pub merit_grad: VectorXs,
    /// Regularized Hessian block of the KKT system.
    pub hess: MatrixXs,
    /// Residual curvature buffer (vector-Hessian products).
    pub vhp: MatrixXs,
    /// Assembled KKT matrix.
    pub kkt_matrix: MatrixXs,
    /// KKT right-hand side.
    pub kkt_rhs: VectorXs,
    /// KKT solution buffer (solved in place).
    pub kkt_step: VectorXs,
    /// Merit-function evaluation buffers.
    pub merit: MeritScratch,
    /// Unshifted per-constraint set distances (primal infeasibility).
    pub prim_resid: VectorXs,
    /// Proximal displacement `x ⊖ x_prox`.
    pub prox_diff: VectorXs,
    /// Jacobian of the proximal displacement.
    pub prox_jac: MatrixXs,
    /// Step sizes tried by the last line search.
    pub ls_alphas: Vec<f64>,
    /// Merit values observed by the last line search.
    pub ls_values: Vec<f64>,
    /// Directional derivative of the merit along the last step.
    pub d1: f64,
    /// Stationarity measure of the last inner iteration.
    pub inner_criterion: f64,
}

impl Workspace {
    /// Pre-size every buffer for `problem`.
    pub fn new(problem: &Problem) -> Self {
        let nx = problem.nx();
        let ndx = problem.ndx();
        let nc = problem.total_constraint_dim();
        let kkt_dim = ndx + nc;
        Self {
            x: VectorXs::zeros(nx),
            x_trial: VectorXs::zeros(nx),
            x_prox: VectorXs::zeros(nx),
            dx: VectorXs::zeros(ndx),
            dx_scaled: VectorXs::zeros(ndx),
            dlam: VectorXs::zeros(nc),
            lams: VectorXs::zeros(nc),
            lams_prev: VectorXs::zeros(nc),
            grad_cost: VectorXs::zeros(ndx),
            merit_grad: VectorXs::zeros(ndx),
            hess: MatrixXs::zeros(ndx, ndx),
            vhp: MatrixXs::zeros(ndx, ndx),
            kkt_matrix: MatrixXs::zeros(kkt_dim, kkt_dim),
            kkt_rhs: VectorXs::zeros(kkt_dim),
            kkt_step: VectorXs::zeros(kkt_dim),
            merit: MeritScratch::new(problem),
            prim_resid: VectorXs::zeros(nc),
            prox_diff: VectorXs::zeros(ndx),
            prox_jac: MatrixXs::zeros(ndx, ndx),
            ls_alphas: Vec::new(),
            ls_values: Vec::new(),
            d1: 0.0,
            inner_criterion: 0.0,
        }
    }
}

/// Solver output: final iterate, multipliers, and diagnostics.
///
/// Rebuilt (or reused) per `solve`; immutable to the caller between solves.
#[derive(Debug, Clone)]
pub struct Results {
    /// Final point.
    pub x_opt: VectorXs,
    /// Final multiplier estimates, one segment per constraint in problem
    /// order.
    pub lams_opt: VectorXs,
    /// Objective value at `x_opt`.
    pub value: f64,
    /// Primal infeasibility `max_i ‖dist(c_i(x), C_i)‖_∞`.
    pub prim_infeas: f64,
    /// Dual infeasibility `‖∇f + Jᵀλ‖_∞`.
    pub dual_infeas: f64,
    /// Solution status.
    pub status: SolveStatus,
    /// Convenience flag: `status == Converged`.
    pub converged: bool,
    /// Total inner (Newton) iterations.
    pub num_iters: usize,
    /// Outer (BCL) iterations.
    pub outer_iters: usize,
    /// Final penalty parameter.
    pub mu_final: f64,
}

impl Results {
    /// Fresh results record for `problem`.
    pub fn new(problem: &Problem) -> Self {
        Self {
            x_opt: problem.manifold().neutral(),
            lams_opt: problem.allocate_multipliers(),
            value: 0.0,
            prim_infeas: f64::INFINITY,
            dual_infeas: f64::INFINITY,
            status: SolveStatus::Uninit,
            converged: false,
            num_iters: 0,
            outer_iters: 0,
            mu_final: 0.0,
        }
    }
}

impl std::fmt::Display for Results {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Results {{ status: {}, value: {:.6e}, prim: {:.3e}, dual: {:.3e}, iters: {} ({} outer) }}",
            self.status,
            self.value,
            self.prim_infeas,
            self.dual_infeas,
            self.num_iters,
            self.outer_iters
        )
    }
}
