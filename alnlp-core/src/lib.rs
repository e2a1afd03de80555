//! Alnlp: an augmented-Lagrangian solver for nonlinear programs on manifolds
//!
//! This library implements a primal-dual augmented-Lagrangian method for
//! equality- and inequality-constrained nonlinear programs whose decision
//! variable lives on a differentiable manifold:
//!
//! ```text
//! minimize    f(x)        x ∈ M
//! subject to  c_i(x) ∈ C_i,   i = 1..k
//! ```
//!
//! where each `C_i` is a closed convex set with a cheap projection (the zero
//! set for equalities, the negative orthant for inequalities, boxes).
//!
//! # Algorithm
//!
//! The solver runs a **bound-constrained Lagrangian (BCL)** outer loop that
//! adapts the penalty `μ` and proximal weight `ρ` from observed
//! infeasibility reduction. Each inner iteration:
//!
//! - assembles the primal-dual KKT system of the augmented Lagrangian,
//! - factorizes it through a pluggable symmetric-indefinite backend
//!   (dense regularized LDLᵀ, or a block factorization exploiting the
//!   KKT structure),
//! - corrects inertia by bumping a diagonal shift when needed,
//! - line-searches the primal-dual augmented Lagrangian merit with an
//!   Armijo condition, retracting trial points through the manifold.
//!
//! # Example
//!
//! ```ignore
//! use alnlp_core::{
//!     Problem, Solver, SolverSettings, Workspace, Results,
//!     manifold::VectorSpace,
//!     func::LinearFunction,
//!     cost::QuadraticDistanceCost,
//!     constraints::{Constraint, EqualitySet},
//! };
//! use std::sync::Arc;
//!
//! // min 1/2 ||x||^2  s.t.  A x + b = 0
//! let space = Arc::new(VectorSpace::new(3));
//! let cost = Arc::new(QuadraticDistanceCost::to_neutral(space.clone()));
//! let cstr = Constraint::new(Arc::new(LinearFunction::new(a, b)), Arc::new(EqualitySet));
//! let problem = Arc::new(Problem::new(space, cost, vec![cstr])?);
//!
//! let mut solver = Solver::new(problem.clone(), SolverSettings::default());
//! let mut workspace = Workspace::new(&problem);
//! let mut results = Results::new(&problem);
//! solver.solve(&mut workspace, &mut results, &x0, None)?;
//! assert!(results.converged);
//! ```

#![warn(clippy::all)]
#![allow(clippy::too_many_arguments)]

pub mod constraints;
pub mod cost;
pub mod error;
pub mod func;
pub mod linalg;
pub mod manifold;
pub mod merit;
pub mod problem;
pub mod solver;

/// Dense dynamic vector, the ambient/tangent representation everywhere.
pub type VectorXs = nalgebra::DVector<f64>;
/// Dense dynamic matrix (Jacobians, Hessians, KKT systems).
pub type MatrixXs = nalgebra::DMatrix<f64>;

pub use constraints::{Constraint, ConstraintSet, EqualitySet, NegativeOrthant};
pub use cost::{CostAsFunction, CostFunction, QuadraticDistanceCost, QuadraticResidualCost};
pub use error::Error;
pub use func::{BaseFunction, C1Function, C2Function};
pub use manifold::Manifold;
pub use merit::{Lagrangian, PdalFunction};
pub use problem::Problem;
pub use solver::{
    Callback, HistoryCallback, Results, SolveStatus, Solver, SolverSettings, VerboseLevel,
    Workspace,
};
