//! The solve loop: BCL outer iterations around semismooth Newton steps.

use super::{Results, SolveStatus, Solver, VerboseLevel, Workspace};
use crate::error::{ensure_all_finite, Error};
use crate::linalg::BackendError;
use crate::merit::PdalFunction;
use crate::VectorXs;

// Inertia-correction ladder: first primal diagonal shift tried when the
// factorization fails or reports the wrong inertia, the geometric growth
// between retries, and the retry cap before giving up.
const DELTA_INIT: f64 = 1e-6;
const DELTA_FACTOR: f64 = 100.0;
const MAX_REG_ATTEMPTS: usize = 10;

fn inf_norm(v: &VectorXs) -> f64 {
    v.iter().fold(0.0, |m, &c| m.max(c.abs()))
}

impl Solver {
    /// Minimize the problem from `x0` (and optionally warm-started
    /// multipliers), writing the trace into `workspace` and the outcome
    /// into `results`.
    ///
    /// Returns `Err` only on fatal conditions (non-finite values, KKT
    /// factorization failure past the regularization ladder, mis-sized
    /// inputs); running out of iterations is reported through
    /// [`SolveStatus::MaxItersReached`], not as an error.
    pub fn solve(
        &mut self,
        workspace: &mut Workspace,
        results: &mut Results,
        x0: &VectorXs,
        lams0: Option<&VectorXs>,
    ) -> Result<(), Error> {
        let problem = self.problem.clone();
        let settings = self.settings.clone();
        let manifold = problem.manifold().clone();
        let nd = problem.ndx();
        let nc = problem.total_constraint_dim();
        let ws = workspace;
        let res = results;

        if x0.len() != problem.nx() {
            return Err(Error::DimensionMismatch {
                what: "initial point",
                expected: problem.nx(),
                actual: x0.len(),
            });
        }
        ensure_all_finite(x0.iter(), "initial point")?;
        ws.x.copy_from(x0);
        ws.x_prox.copy_from(x0);
        match lams0 {
            Some(lams) => {
                if lams.len() != nc {
                    return Err(Error::DimensionMismatch {
                        what: "initial multipliers",
                        expected: nc,
                        actual: lams.len(),
                    });
                }
                ensure_all_finite(lams.iter(), "initial multipliers")?;
                ws.lams_prev.copy_from(lams);
            }
            None => ws.lams_prev.fill(0.0),
        }
        ws.lams.copy_from(&ws.lams_prev);

        res.status = SolveStatus::MaxItersReached;
        res.converged = false;
        res.num_iters = 0;
        res.outer_iters = 0;

        let mut mu = settings.mu_init.max(settings.mu_min);
        let rho = settings.rho_init;
        let mut merit = PdalFunction::new(problem.clone(), mu);

        // BCL targets: eta bounds the primal infeasibility an outer
        // iteration must reach to count as a success, omega the inner
        // stationarity tolerance. Both tighten as mu decreases.
        let (eta0, omega0) = (1.0, 1.0);
        let mut eta = eta0 * mu.powf(settings.prim_alpha);
        let mut omega = (omega0 * mu.powf(settings.dual_alpha)).max(settings.tol);

        'outer: while res.outer_iters < settings.max_iters {
            res.outer_iters += 1;
            let mut dual_res;

            // ---- inner loop: semismooth Newton on the PDAL ----
            loop {
                merit.gradient(&ws.x, &ws.lams_prev, &mut ws.merit_grad, &mut ws.merit);
                if let Err(e) = ensure_all_finite(ws.merit_grad.iter(), "merit gradient") {
                    res.status = SolveStatus::Diverged;
                    return Err(e);
                }

                // KKT dual residual at the working iterate (x, lams), not
                // at the first-order estimates: this is what convergence is
                // declared on.
                problem.cost().gradient(&ws.x, &mut ws.grad_cost);
                let mut lag_grad = ws.grad_cost.clone();
                lag_grad.gemv_tr(1.0, &ws.merit.jac, &ws.lams, 1.0);
                dual_res = inf_norm(&lag_grad);

                if rho > 0.0 {
                    manifold.difference(&ws.x_prox, &ws.x, &mut ws.prox_diff);
                    manifold.jdifference(&ws.x_prox, &ws.x, &mut ws.prox_jac, 1);
                    ws.merit_grad.gemv_tr(rho, &ws.prox_jac, &ws.prox_diff, 1.0);
                }

                let mut dual_gap = 0.0f64;
                for i in 0..nc {
                    dual_gap = dual_gap.max((mu * (ws.merit.lams_plus[i] - ws.lams[i])).abs());
                }
                let inner_crit = inf_norm(&ws.merit_grad).max(dual_gap);
                ws.inner_criterion = inner_crit;
                if inner_crit <= omega {
                    break;
                }
                if res.num_iters >= settings.max_iters {
                    break;
                }

                let phi = merit.evaluate_cached(&ws.x, &ws.lams_prev, &ws.merit);
                if let Err(e) = crate::error::ensure_finite(phi, "merit value") {
                    res.status = SolveStatus::Diverged;
                    return Err(e);
                }
                let prox0 = if rho > 0.0 {
                    0.5 * rho * ws.prox_diff.norm_squared()
                } else {
                    0.0
                };

                // Newton matrix: Lagrangian curvature at the working
                // multipliers (dropped under Gauss-Newton).
                problem.cost().hessian(&ws.x, &mut ws.hess);
                if !settings.use_gauss_newton {
                    for (cstr, &(offset, len)) in problem
                        .constraints()
                        .iter()
                        .zip(problem.multiplier_layout())
                    {
                        let lam_i = ws.lams.rows(offset, len).clone_owned();
                        cstr.func.vector_hessian_product(&ws.x, &lam_i, &mut ws.vhp);
                        ws.hess += &ws.vhp;
                    }
                }

                // KKT assembly. Rows of constraints inactive in the shifted
                // projection are decoupled from the primal block; their
                // equations reduce to `dlam_i = -lam_i`.
                ws.kkt_matrix.fill(0.0);
                ws.kkt_matrix.view_mut((0, 0), (nd, nd)).copy_from(&ws.hess);
                for k in 0..nd {
                    ws.kkt_matrix[(k, k)] += rho;
                }
                for i in 0..nc {
                    ws.kkt_matrix[(nd + i, nd + i)] = -mu;
                    if ws.merit.mask[i] {
                        for k in 0..nd {
                            let v = ws.merit.jac[(i, k)];
                            ws.kkt_matrix[(nd + i, k)] = v;
                            ws.kkt_matrix[(k, nd + i)] = v;
                        }
                    }
                }

                // Right-hand side. Masking the multipliers in the primal
                // residual makes the condensed system the Newton system of
                // the merit, so the step is a descent direction once the
                // inertia is corrected. `grad_cost` is still current.
                let mut lams_masked = ws.lams.clone();
                for (i, &active) in ws.merit.mask.iter().enumerate() {
                    if !active {
                        lams_masked[i] = 0.0;
                    }
                }
                {
                    let mut rhs_x = ws.kkt_rhs.rows_mut(0, nd);
                    rhs_x.copy_from(&ws.grad_cost);
                    rhs_x.gemv_tr(1.0, &ws.merit.jac, &lams_masked, 1.0);
                    if rho > 0.0 {
                        rhs_x.gemv_tr(rho, &ws.prox_jac, &ws.prox_diff, 1.0);
                    }
                    rhs_x.neg_mut();
                }
                for i in 0..nc {
                    ws.kkt_rhs[nd + i] = mu * ws.lams[i] - ws.merit.proj[i];
                }

                // Factorize, correcting the inertia to (nd, nc, 0) by
                // shifting the primal diagonal when needed.
                let mut delta = 0.0f64;
                let mut attempt = 0;
                loop {
                    let outcome = self.backend.compute(&ws.kkt_matrix);
                    match outcome {
                        Ok(()) => {
                            let ok = match self.backend.inertia() {
                                Some((pos, neg, zero)) => pos == nd && neg == nc && zero == 0,
                                None => true,
                            };
                            if ok {
                                break;
                            }
                            attempt += 1;
                            if attempt >= MAX_REG_ATTEMPTS {
                                res.status = SolveStatus::Diverged;
                                return Err(BackendError::NotPositiveDefinite.into());
                            }
                        }
                        Err(err) => {
                            attempt += 1;
                            if attempt >= MAX_REG_ATTEMPTS {
                                res.status = SolveStatus::Diverged;
                                return Err(err.into());
                            }
                        }
                    }
                    let next = if delta == 0.0 {
                        DELTA_INIT
                    } else {
                        delta * DELTA_FACTOR
                    };
                    for k in 0..nd {
                        ws.kkt_matrix[(k, k)] += next - delta;
                    }
                    delta = next;
                }

                ws.kkt_step.copy_from(&ws.kkt_rhs);
                if let Err(e) = self.backend.solve_in_place(&mut ws.kkt_step) {
                    res.status = SolveStatus::Diverged;
                    return Err(e.into());
                }
                if let Err(e) = ensure_all_finite(ws.kkt_step.iter(), "Newton step") {
                    res.status = SolveStatus::Diverged;
                    return Err(e);
                }
                ws.dx.copy_from(&ws.kkt_step.rows(0, nd));
                ws.dlam.copy_from(&ws.kkt_step.rows(nd, nc));

                ws.d1 = ws.merit_grad.dot(&ws.dx);
                if ws.d1 >= 0.0 {
                    // Stationary up to the regularization floor.
                    break;
                }

                // Armijo backtracking on the proximal merit. The floor step
                // is taken if backtracking exhausts the step-size range.
                let phi0 = phi + prox0;
                let mut alpha = 1.0f64;
                ws.ls_alphas.clear();
                ws.ls_values.clear();
                loop {
                    ws.dx_scaled.copy_from(&ws.dx);
                    ws.dx_scaled *= alpha;
                    manifold.integrate(&ws.x, &ws.dx_scaled, &mut ws.x_trial);
                    let mut phi_t = merit.evaluate(&ws.x_trial, &ws.lams_prev, &mut ws.merit);
                    if rho > 0.0 {
                        manifold.difference(&ws.x_prox, &ws.x_trial, &mut ws.prox_diff);
                        phi_t += 0.5 * rho * ws.prox_diff.norm_squared();
                    }
                    if let Err(e) = crate::error::ensure_finite(phi_t, "merit value") {
                        res.status = SolveStatus::Diverged;
                        return Err(e);
                    }
                    ws.ls_alphas.push(alpha);
                    ws.ls_values.push(phi_t);
                    if phi_t <= phi0 + settings.armijo_c1 * alpha * ws.d1 {
                        break;
                    }
                    if alpha <= settings.alpha_min {
                        break;
                    }
                    alpha = (alpha * settings.ls_beta).max(settings.alpha_min);
                }

                ws.x.copy_from(&ws.x_trial);
                ws.lams.axpy(alpha, &ws.dlam, 1.0);
                res.num_iters += 1;

                if settings.verbose >= VerboseLevel::Very {
                    eprintln!(
                        "[alnlp]   it {:>4} | crit={:.3e} | d1={:.3e} | alpha={:.2e} | reg={:.1e}",
                        res.num_iters, inner_crit, ws.d1, alpha, delta
                    );
                }
            }

            // ---- outer bookkeeping ----
            // Unshifted primal infeasibility at the inner solution.
            for (cstr, &(offset, len)) in problem
                .constraints()
                .iter()
                .zip(problem.multiplier_layout())
            {
                let c = &ws.merit.cval.as_slice()[offset..offset + len];
                let out = &mut ws.prim_resid.as_mut_slice()[offset..offset + len];
                cstr.set.normal_cone_projection(c, out);
            }
            let prim_res = inf_norm(&ws.prim_resid);

            res.x_opt.copy_from(&ws.x);
            res.lams_opt.copy_from(&ws.lams);
            res.value = problem.cost().call(&ws.x);
            res.prim_infeas = prim_res;
            res.dual_infeas = dual_res;
            res.mu_final = mu;

            if settings.verbose >= VerboseLevel::Verbose {
                eprintln!(
                    "[alnlp] outer {:>3} | mu={:.1e} | prim={:.3e} | dual={:.3e} | cost={:.6e} | inner={}",
                    res.outer_iters, mu, prim_res, dual_res, res.value, res.num_iters
                );
            }
            for cb in self.callbacks.iter_mut() {
                cb.call(ws, res);
            }

            if prim_res <= settings.tol && dual_res <= settings.tol {
                res.status = SolveStatus::Converged;
                break 'outer;
            }
            if res.num_iters >= settings.max_iters {
                break 'outer;
            }

            // BCL update: accept the multiplier estimates and tighten the
            // penalty when the primal target was met, otherwise keep the
            // penalty and relax the targets.
            if prim_res <= eta.max(settings.tol) {
                ws.lams_prev.copy_from(&ws.merit.lams_plus);
                mu = (mu * settings.mu_factor).max(settings.mu_min);
                merit.set_penalty(mu);
                eta *= mu.powf(settings.prim_beta);
                omega = (omega * mu.powf(settings.dual_beta)).max(settings.tol);
            } else {
                let mut corr = ws.merit.lams_plus.clone();
                corr -= &ws.lams_prev;
                ws.lams_prev.axpy(settings.dual_alpha, &corr, 1.0);
                eta = eta0 * mu.powf(settings.prim_alpha);
                omega = (omega0 * mu.powf(settings.dual_alpha)).max(settings.tol);
            }
            ws.lams.copy_from(&ws.lams_prev);
            ws.x_prox.copy_from(&ws.x);
        }

        res.converged = res.status == SolveStatus::Converged;
        Ok(())
    }
}
