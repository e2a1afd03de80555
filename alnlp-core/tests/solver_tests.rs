//! End-to-end solver checks on problems with known solutions.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use alnlp_core::constraints::{Constraint, EqualitySet, NegativeOrthant};
use alnlp_core::cost::{
    CostAsFunction, CostFunction, QuadraticDistanceCost, QuadraticResidualCost,
};
use alnlp_core::func::{LinearFunction, ManifoldDifferenceToPoint};
use alnlp_core::linalg::BlockLdlt;
use alnlp_core::manifold::{So2, VectorSpace};
use alnlp_core::{
    Error, HistoryCallback, MatrixXs, PdalFunction, Problem, Results, SolveStatus, Solver,
    SolverSettings, VectorXs, VerboseLevel, Workspace,
};
use rand::Rng;
use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn random_vec(rng: &mut ChaCha8Rng, n: usize) -> VectorXs {
    VectorXs::from_fn(n, |_, _| rng.gen_range(-1.0..1.0))
}

fn random_spd(rng: &mut ChaCha8Rng, n: usize) -> MatrixXs {
    let m = MatrixXs::from_fn(n, n, |_, _| rng.gen_range(-1.0..1.0));
    &m * m.transpose() + (n as f64) * MatrixXs::identity(n, n)
}

/// Equality-constrained QP `min ½xᵀQx + qᵀx  s.t.  Ax + b = 0` together
/// with its closed-form primal-dual solution.
fn equality_qp(
    rng: &mut ChaCha8Rng,
    n: usize,
    m: usize,
) -> (Arc<Problem>, VectorXs, VectorXs) {
    let q = random_spd(rng, n);
    let qvec = random_vec(rng, n);
    let a = MatrixXs::from_fn(m, n, |_, _| rng.gen_range(-1.0..1.0));
    let b = random_vec(rng, m);

    let space = Arc::new(VectorSpace::new(n));
    let identity = Arc::new(LinearFunction::new(
        MatrixXs::identity(n, n),
        VectorXs::zeros(n),
    ));
    let cost = Arc::new(QuadraticResidualCost::new(
        identity,
        q.clone(),
        qvec.clone(),
        0.0,
    ));
    let cstr = Constraint::new(
        Arc::new(LinearFunction::new(a.clone(), b.clone())),
        Arc::new(EqualitySet),
    );
    let problem = Arc::new(Problem::new(space, cost, vec![cstr]).unwrap());

    // Stationarity: [Q Aᵀ; A 0] [x; λ] = [-q; -b].
    let dim = n + m;
    let mut kkt = MatrixXs::zeros(dim, dim);
    kkt.view_mut((0, 0), (n, n)).copy_from(&q);
    kkt.view_mut((n, 0), (m, n)).copy_from(&a);
    kkt.view_mut((0, n), (n, m)).copy_from(&a.transpose());
    let mut rhs = VectorXs::zeros(dim);
    rhs.rows_mut(0, n).copy_from(&(-&qvec));
    rhs.rows_mut(n, m).copy_from(&(-&b));
    let sol = kkt.lu().solve(&rhs).unwrap();

    (
        problem,
        sol.rows(0, n).clone_owned(),
        sol.rows(n, m).clone_owned(),
    )
}

/// `min ½‖x − p0‖²  s.t.  ‖x‖² ≤ r²`: projection of `p0` onto the disk.
fn disk_problem(p0: &VectorXs, radius: f64) -> Arc<Problem> {
    let space: Arc<dyn alnlp_core::Manifold> = Arc::new(VectorSpace::new(2));
    let cost = Arc::new(QuadraticDistanceCost::new(
        space.clone(),
        p0.clone(),
        MatrixXs::identity(2, 2),
    ));
    // ‖x‖² − r² as a quadratic residual cost viewed as a scalar residual.
    let sq_norm = Arc::new(QuadraticResidualCost::weighted(
        Arc::new(ManifoldDifferenceToPoint::new(space.clone(), space.neutral())),
        2.0 * MatrixXs::identity(2, 2),
        -radius * radius,
    ));
    let cstr = Constraint::new(
        Arc::new(CostAsFunction::new(sq_norm)),
        Arc::new(NegativeOrthant),
    );
    Arc::new(Problem::new(space, cost, vec![cstr]).unwrap())
}

#[test]
fn equality_qp_matches_closed_form() {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    for &(n, m) in &[(2usize, 1usize), (4, 2), (6, 3)] {
        let (problem, x_star, lam_star) = equality_qp(&mut rng, n, m);
        let settings = SolverSettings {
            tol: 1e-8,
            ..Default::default()
        };
        let mut solver = Solver::new(problem.clone(), settings);
        let mut ws = Workspace::new(&problem);
        let mut res = Results::new(&problem);
        solver
            .solve(&mut ws, &mut res, &VectorXs::zeros(n), None)
            .unwrap();

        assert!(res.converged, "QP ({}, {}) did not converge: {}", n, m, res);
        assert_eq!(res.status, SolveStatus::Converged);
        assert!((&res.x_opt - &x_star).amax() < 1e-6);
        assert!((&res.lams_opt - &lam_star).amax() < 1e-6);
        assert!(res.prim_infeas <= 1e-8);
        assert!(res.dual_infeas <= 1e-8);
    }
}

#[test]
fn inactive_inequality_leaves_solution_unchanged() {
    let mut rng = ChaCha8Rng::seed_from_u64(43);
    let (problem, x_star, _) = equality_qp(&mut rng, 4, 2);
    // Rebuild with an extra inequality that is slack at the solution.
    let mut row = MatrixXs::zeros(1, 4);
    row[(0, 0)] = 1.0;
    let slack = Constraint::new(
        Arc::new(LinearFunction::new(row, VectorXs::from_element(1, -10.0))),
        Arc::new(NegativeOrthant),
    );
    let augmented = Arc::new(
        Problem::new(
            problem.manifold().clone(),
            problem.cost().clone(),
            vec![
                Constraint::new(
                    problem.constraints()[0].func.clone(),
                    problem.constraints()[0].set.clone(),
                ),
                slack,
            ],
        )
        .unwrap(),
    );

    let settings = SolverSettings {
        tol: 1e-8,
        ..Default::default()
    };
    let mut solver = Solver::new(augmented.clone(), settings);
    let mut ws = Workspace::new(&augmented);
    let mut res = Results::new(&augmented);
    solver
        .solve(&mut ws, &mut res, &VectorXs::zeros(4), None)
        .unwrap();

    assert!(res.converged);
    assert!((&res.x_opt - &x_star).amax() < 1e-6);
    // The slack inequality carries a vanishing multiplier.
    assert!(res.lams_opt[2].abs() < 1e-6);
}

#[test]
fn disk_projection_recovers_analytic_solution() {
    let p0 = VectorXs::from_column_slice(&[2.0, 1.0]);
    let radius = 1.0;
    let problem = disk_problem(&p0, radius);

    let mut solver = Solver::new(problem.clone(), SolverSettings::default());
    let mut ws = Workspace::new(&problem);
    let mut res = Results::new(&problem);
    solver.solve(&mut ws, &mut res, &p0, None).unwrap();

    let norm = p0.norm();
    let x_star = &p0 * (radius / norm);
    let lam_star = 0.5 * (norm / radius - 1.0);
    assert!(res.converged, "disk projection did not converge: {}", res);
    assert!((&res.x_opt - &x_star).amax() < 1e-5);
    assert!((res.lams_opt[0] - lam_star).abs() < 1e-5);
}

#[test]
fn gauss_newton_mode_converges_on_the_disk() {
    let p0 = VectorXs::from_column_slice(&[-1.5, 2.5]);
    let problem = disk_problem(&p0, 1.0);
    let settings = SolverSettings {
        use_gauss_newton: true,
        ..Default::default()
    };
    let mut solver = Solver::new(problem.clone(), settings);
    let mut ws = Workspace::new(&problem);
    let mut res = Results::new(&problem);
    solver.solve(&mut ws, &mut res, &p0, None).unwrap();

    let x_star = &p0 / p0.norm();
    assert!(res.converged);
    assert!((&res.x_opt - &x_star).amax() < 1e-5);
}

#[test]
fn proximal_regularization_reaches_the_same_minimizer() {
    let mut rng = ChaCha8Rng::seed_from_u64(48);
    let (problem, x_star, lam_star) = equality_qp(&mut rng, 4, 2);
    // The proximal center tracks the outer iterate, so the bias it adds
    // vanishes at the fixed point and the original KKT pair is recovered.
    let settings = SolverSettings {
        tol: 1e-8,
        rho_init: 1e-2,
        verbose: VerboseLevel::Very,
        ..Default::default()
    };
    let mut solver = Solver::new(problem.clone(), settings);
    let mut ws = Workspace::new(&problem);
    let mut res = Results::new(&problem);
    solver
        .solve(&mut ws, &mut res, &VectorXs::zeros(4), None)
        .unwrap();

    assert!(res.converged, "proximal QP did not converge: {}", res);
    assert!((&res.x_opt - &x_star).amax() < 1e-6);
    assert!((&res.lams_opt - &lam_star).amax() < 1e-6);
}

#[test]
fn pdal_gradient_vanishes_at_the_analytic_solution() {
    let p0 = VectorXs::from_column_slice(&[2.0, 1.0]);
    let problem = disk_problem(&p0, 1.0);
    let norm = p0.norm();
    let x_star = &p0 / norm;
    let lam_star = VectorXs::from_element(1, 0.5 * (norm - 1.0));

    let merit = PdalFunction::new(problem.clone(), 1e-2);
    let mut scratch = alnlp_core::merit::MeritScratch::new(&problem);
    let mut grad = VectorXs::zeros(2);
    merit.gradient(&x_star, &lam_star, &mut grad, &mut scratch);
    assert!(grad.amax() < 1e-9);
}

#[test]
fn warm_start_from_solution_is_idempotent() {
    let mut rng = ChaCha8Rng::seed_from_u64(44);
    let (problem, _, _) = equality_qp(&mut rng, 4, 2);
    let mut solver = Solver::new(problem.clone(), SolverSettings::default());

    let mut ws = Workspace::new(&problem);
    let mut res = Results::new(&problem);
    solver
        .solve(&mut ws, &mut res, &VectorXs::zeros(4), None)
        .unwrap();
    assert!(res.converged);

    let mut ws2 = Workspace::new(&problem);
    let mut res2 = Results::new(&problem);
    solver
        .solve(&mut ws2, &mut res2, &res.x_opt, Some(&res.lams_opt))
        .unwrap();

    assert!(res2.converged);
    assert_eq!(res2.outer_iters, 1);
    assert_eq!(res2.num_iters, 0);
    assert!((&res2.x_opt - &res.x_opt).amax() < 1e-12);
    assert!((&res2.lams_opt - &res.lams_opt).amax() < 1e-12);
}

#[test]
fn starved_budget_reports_max_iters() {
    let mut rng = ChaCha8Rng::seed_from_u64(45);
    let (problem, _, _) = equality_qp(&mut rng, 4, 2);
    let settings = SolverSettings {
        tol: 1e-14,
        max_iters: 2,
        ..Default::default()
    };
    let mut solver = Solver::new(problem.clone(), settings);
    let mut ws = Workspace::new(&problem);
    let mut res = Results::new(&problem);
    solver
        .solve(&mut ws, &mut res, &VectorXs::zeros(4), None)
        .unwrap();

    assert!(!res.converged);
    assert_eq!(res.status, SolveStatus::MaxItersReached);
    assert!(res.num_iters <= 2);
}

struct NanCost;

impl CostFunction for NanCost {
    fn nx(&self) -> usize {
        2
    }
    fn ndx(&self) -> usize {
        2
    }
    fn call(&self, _x: &VectorXs) -> f64 {
        f64::NAN
    }
    fn gradient(&self, _x: &VectorXs, out: &mut VectorXs) {
        out.fill(f64::NAN);
    }
    fn hessian(&self, _x: &VectorXs, out: &mut MatrixXs) {
        out.fill(f64::NAN);
    }
}

#[test]
fn nan_cost_surfaces_as_divergence() {
    let space = Arc::new(VectorSpace::new(2));
    let problem = Arc::new(Problem::new(space, Arc::new(NanCost), vec![]).unwrap());
    let mut solver = Solver::new(problem.clone(), SolverSettings::default());
    let mut ws = Workspace::new(&problem);
    let mut res = Results::new(&problem);

    let err = solver
        .solve(&mut ws, &mut res, &VectorXs::zeros(2), None)
        .unwrap_err();
    assert!(matches!(err, Error::NonFinite(_)));
    assert_eq!(res.status, SolveStatus::Diverged);
}

#[test]
fn mis_sized_initial_point_is_rejected() {
    let mut rng = ChaCha8Rng::seed_from_u64(46);
    let (problem, _, _) = equality_qp(&mut rng, 3, 1);
    let mut solver = Solver::new(problem.clone(), SolverSettings::default());
    let mut ws = Workspace::new(&problem);
    let mut res = Results::new(&problem);
    let err = solver
        .solve(&mut ws, &mut res, &VectorXs::zeros(5), None)
        .unwrap_err();
    assert!(matches!(err, Error::DimensionMismatch { .. }));
}

#[test]
fn history_callback_records_every_outer_iteration() {
    let mut rng = ChaCha8Rng::seed_from_u64(47);
    let (problem, _, _) = equality_qp(&mut rng, 4, 2);
    let mut solver = Solver::new(problem.clone(), SolverSettings::default());
    let history = Rc::new(RefCell::new(HistoryCallback::new()));
    solver.register_callback(Box::new(history.clone()));

    let mut ws = Workspace::new(&problem);
    let mut res = Results::new(&problem);
    solver
        .solve(&mut ws, &mut res, &VectorXs::zeros(4), None)
        .unwrap();

    let h = history.borrow();
    assert!(!h.is_empty());
    assert_eq!(h.len(), res.outer_iters);
    assert!(h.values.iter().all(|v| v.is_finite()));
    assert!(*h.prim_infeas.last().unwrap() <= 1e-6);
    // Infeasibility is non-increasing over the recorded tail.
    assert!(h.prim_infeas.last().unwrap() <= h.prim_infeas.first().unwrap());
}

#[test]
fn block_backend_reproduces_dense_solution() {
    let p0 = VectorXs::from_column_slice(&[2.0, 1.0]);
    let problem = disk_problem(&p0, 1.0);

    let mut dense = Solver::new(problem.clone(), SolverSettings::default());
    let mut ws1 = Workspace::new(&problem);
    let mut res1 = Results::new(&problem);
    dense.solve(&mut ws1, &mut res1, &p0, None).unwrap();

    let backend = Box::new(BlockLdlt::new(problem.ndx(), problem.total_constraint_dim()));
    let mut block = Solver::with_backend(problem.clone(), SolverSettings::default(), backend)
        .unwrap();
    let mut ws2 = Workspace::new(&problem);
    let mut res2 = Results::new(&problem);
    block.solve(&mut ws2, &mut res2, &p0, None).unwrap();

    assert!(res1.converged && res2.converged);
    assert!((&res1.x_opt - &res2.x_opt).amax() < 1e-9);
    assert!((&res1.lams_opt - &res2.lams_opt).amax() < 1e-9);
}

#[test]
fn unconstrained_minimization_on_the_circle() {
    let space: Arc<dyn alnlp_core::Manifold> = Arc::new(So2);
    let target = So2::point(2.0);
    let cost = Arc::new(QuadraticDistanceCost::new(
        space.clone(),
        target,
        MatrixXs::identity(1, 1),
    ));
    let problem = Arc::new(Problem::new(space, cost, vec![]).unwrap());

    let mut solver = Solver::new(problem.clone(), SolverSettings::default());
    let mut ws = Workspace::new(&problem);
    let mut res = Results::new(&problem);
    solver
        .solve(&mut ws, &mut res, &So2::point(0.5), None)
        .unwrap();

    assert!(res.converged);
    assert!((So2::angle(&res.x_opt) - 2.0).abs() < 1e-6);
    assert!(res.value < 1e-10);
}
