//! Per-iteration observer hooks.

use std::cell::RefCell;
use std::rc::Rc;

use super::{Results, Workspace};
use crate::VectorXs;

/// Observer invoked once per outer iteration, after the results record has
/// been refreshed. Callbacks see a consistent snapshot and must not assume
/// the solve will continue.
pub trait Callback {
    /// Inspect the current iteration.
    fn call(&mut self, workspace: &Workspace, results: &Results);
}

impl<F> Callback for F
where
    F: FnMut(&Workspace, &Results),
{
    fn call(&mut self, workspace: &Workspace, results: &Results) {
        self(workspace, results)
    }
}

/// Records the full iterate trace: points, multipliers, objective values,
/// residual norms, and the line-search trail of the last inner step of each
/// outer iteration.
#[derive(Default)]
pub struct HistoryCallback {
    /// Iterates.
    pub xs: Vec<VectorXs>,
    /// Multiplier estimates.
    pub lams: Vec<VectorXs>,
    /// Objective values.
    pub values: Vec<f64>,
    /// Primal infeasibilities.
    pub prim_infeas: Vec<f64>,
    /// Dual infeasibilities.
    pub dual_infeas: Vec<f64>,
    /// Step sizes tried by the most recent line search.
    pub ls_alphas: Vec<Vec<f64>>,
    /// Merit values seen by the most recent line search.
    pub ls_values: Vec<Vec<f64>>,
    /// Merit directional derivatives.
    pub d1s: Vec<f64>,
}

impl HistoryCallback {
    /// Empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of recorded iterations.
    pub fn len(&self) -> usize {
        self.xs.len()
    }

    /// Whether anything was recorded.
    pub fn is_empty(&self) -> bool {
        self.xs.is_empty()
    }

    fn record(&mut self, workspace: &Workspace, results: &Results) {
        self.xs.push(workspace.x.clone());
        self.lams.push(results.lams_opt.clone());
        self.values.push(results.value);
        self.prim_infeas.push(results.prim_infeas);
        self.dual_infeas.push(results.dual_infeas);
        self.ls_alphas.push(workspace.ls_alphas.clone());
        self.ls_values.push(workspace.ls_values.clone());
        self.d1s.push(workspace.d1);
    }
}

// Shared handle so the caller can keep reading the history after handing
// the callback to the solver.
impl Callback for Rc<RefCell<HistoryCallback>> {
    fn call(&mut self, workspace: &Workspace, results: &Results) {
        self.borrow_mut().record(workspace, results);
    }
}
