//! Primal-dual augmented-Lagrangian solver.
//!
//! The solver runs a bound-constrained-Lagrangian (BCL) outer loop around a
//! semismooth-Newton inner loop on the primal-dual augmented Lagrangian.
//! Outer iterations drive the penalty and the multiplier estimates; inner
//! iterations take regularized Newton steps obtained from a symmetric
//! saddle-point system handed to a pluggable [`KktBackend`].

mod callbacks;
mod solve;
mod workspace;

pub use callbacks::{Callback, HistoryCallback};
pub use workspace::{Results, SolveStatus, Workspace};

use std::sync::Arc;

use crate::linalg::{DenseLdlt, KktBackend};
use crate::problem::Problem;

/// Console output level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum VerboseLevel {
    /// No output.
    #[default]
    Quiet,
    /// One row per outer iteration.
    Verbose,
    /// Outer rows plus one row per inner Newton step.
    Very,
}

/// Tuning knobs. `Default` gives a working configuration; most uses only
/// override `tol`, `max_iters` or `verbose`.
#[derive(Debug, Clone)]
pub struct SolverSettings {
    /// Target tolerance on primal and dual infeasibility.
    pub tol: f64,
    /// Initial penalty parameter `μ`.
    pub mu_init: f64,
    /// Lower bound on `μ`.
    pub mu_min: f64,
    /// Multiplicative penalty decrease on successful outer iterations.
    pub mu_factor: f64,
    /// Initial proximal weight `ρ`.
    pub rho_init: f64,
    /// Exponent resetting the primal target after a failed outer iteration.
    pub prim_alpha: f64,
    /// Exponent tightening the primal target after a success.
    pub prim_beta: f64,
    /// Exponent resetting the inner (dual) target after a failure; also the
    /// relaxation factor of the failure-branch multiplier update.
    pub dual_alpha: f64,
    /// Exponent tightening the inner target after a success.
    pub dual_beta: f64,
    /// Armijo sufficient-decrease coefficient.
    pub armijo_c1: f64,
    /// Line-search backtracking factor.
    pub ls_beta: f64,
    /// Smallest step size; the floor step is taken if backtracking reaches
    /// it without satisfying the Armijo test.
    pub alpha_min: f64,
    /// Budget shared by outer iterations and total inner iterations.
    pub max_iters: usize,
    /// Drop residual curvature terms from the Newton matrix.
    pub use_gauss_newton: bool,
    /// Console output level.
    pub verbose: VerboseLevel,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            tol: 1e-6,
            mu_init: 1e-2,
            mu_min: 1e-9,
            mu_factor: 0.1,
            rho_init: 0.0,
            prim_alpha: 0.1,
            prim_beta: 0.9,
            dual_alpha: 1.0,
            dual_beta: 1.0,
            armijo_c1: 1e-4,
            ls_beta: 0.5,
            alpha_min: 1e-7,
            max_iters: 100,
            use_gauss_newton: false,
            verbose: VerboseLevel::Quiet,
        }
    }
}

/// The solver itself: a problem reference, settings, a KKT backend, and
/// registered callbacks. Reusable across `solve` calls; per-solve state
/// lives in the caller's [`Workspace`] and [`Results`].
pub struct Solver {
    pub(crate) problem: Arc<Problem>,
    /// Tuning knobs; may be edited between solves.
    pub settings: SolverSettings,
    pub(crate) backend: Box<dyn KktBackend>,
    pub(crate) callbacks: Vec<Box<dyn Callback>>,
}

impl Solver {
    // Dynamic-regularization floor of the default backend.
    const DEFAULT_MIN_PIVOT: f64 = 1e-13;

    /// Solver with the default dense LDLᵀ backend.
    pub fn new(problem: Arc<Problem>, settings: SolverSettings) -> Self {
        let dim = problem.ndx() + problem.total_constraint_dim();
        let backend = Box::new(DenseLdlt::new(dim, 0.0, Self::DEFAULT_MIN_PIVOT));
        Self {
            problem,
            settings,
            backend,
            callbacks: Vec::new(),
        }
    }

    /// Solver with a caller-chosen KKT backend. The backend dimension must
    /// be `ndx + total_constraint_dim`.
    pub fn with_backend(
        problem: Arc<Problem>,
        settings: SolverSettings,
        backend: Box<dyn KktBackend>,
    ) -> Result<Self, crate::Error> {
        let dim = problem.ndx() + problem.total_constraint_dim();
        if backend.dim() != dim {
            return Err(crate::Error::DimensionMismatch {
                what: "KKT backend dimension",
                expected: dim,
                actual: backend.dim(),
            });
        }
        Ok(Self {
            problem,
            settings,
            backend,
            callbacks: Vec::new(),
        })
    }

    /// The problem being solved.
    pub fn problem(&self) -> &Arc<Problem> {
        &self.problem
    }

    /// Override the initial penalty parameter.
    pub fn set_penalty(&mut self, mu: f64) {
        assert!(mu > 0.0, "penalty parameter must be positive, got {}", mu);
        self.settings.mu_init = mu;
    }

    /// Override the proximal weight.
    pub fn set_prox_param(&mut self, rho: f64) {
        assert!(rho >= 0.0, "proximal weight must be non-negative, got {}", rho);
        self.settings.rho_init = rho;
    }

    /// Override the target tolerance.
    pub fn set_tolerance(&mut self, tol: f64) {
        assert!(tol > 0.0, "tolerance must be positive, got {}", tol);
        self.settings.tol = tol;
    }

    /// Register an observer invoked once per outer iteration.
    pub fn register_callback(&mut self, cb: Box<dyn Callback>) {
        self.callbacks.push(cb);
    }

    /// Drop all registered observers.
    pub fn clear_callbacks(&mut self) {
        self.callbacks.clear();
    }
}
