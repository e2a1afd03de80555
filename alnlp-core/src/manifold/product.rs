//! Cartesian product of manifolds.

use std::sync::Arc;

use super::{check_point_dim, check_tangent_dim, Manifold};
use crate::{MatrixXs, VectorXs};

/// Cartesian product `M_1 × ... × M_k`.
///
/// Points and tangents are the concatenation of the component
/// representations; all operators apply componentwise, so the Jacobians are
/// block-diagonal in the component tangent dimensions.
pub struct Product {
    components: Vec<Arc<dyn Manifold>>,
    nx: usize,
    ndx: usize,
}

impl Product {
    /// Product of the given component manifolds.
    pub fn new(components: Vec<Arc<dyn Manifold>>) -> Self {
        let nx = components.iter().map(|c| c.nx()).sum();
        let ndx = components.iter().map(|c| c.ndx()).sum();
        Self {
            components,
            nx,
            ndx,
        }
    }

    /// Number of factors.
    pub fn num_components(&self) -> usize {
        self.components.len()
    }

    fn for_each_block(&self, mut f: impl FnMut(&dyn Manifold, usize, usize)) {
        let (mut ox, mut od) = (0, 0);
        for c in &self.components {
            f(c.as_ref(), ox, od);
            ox += c.nx();
            od += c.ndx();
        }
    }
}

impl Manifold for Product {
    fn nx(&self) -> usize {
        self.nx
    }

    fn ndx(&self) -> usize {
        self.ndx
    }

    fn neutral(&self) -> VectorXs {
        let mut out = VectorXs::zeros(self.nx);
        self.for_each_block(|c, ox, _| {
            out.rows_mut(ox, c.nx()).copy_from(&c.neutral());
        });
        out
    }

    fn integrate(&self, x: &VectorXs, v: &VectorXs, out: &mut VectorXs) {
        check_point_dim(self, x, "integrate point");
        check_tangent_dim(self, v, "integrate tangent");
        self.for_each_block(|c, ox, od| {
            let xi = x.rows(ox, c.nx()).clone_owned();
            let vi = v.rows(od, c.ndx()).clone_owned();
            let mut oi = VectorXs::zeros(c.nx());
            c.integrate(&xi, &vi, &mut oi);
            out.rows_mut(ox, c.nx()).copy_from(&oi);
        });
    }

    fn difference(&self, x0: &VectorXs, x1: &VectorXs, out: &mut VectorXs) {
        check_point_dim(self, x0, "difference base point");
        check_point_dim(self, x1, "difference target point");
        self.for_each_block(|c, ox, od| {
            let a = x0.rows(ox, c.nx()).clone_owned();
            let b = x1.rows(ox, c.nx()).clone_owned();
            let mut oi = VectorXs::zeros(c.ndx());
            c.difference(&a, &b, &mut oi);
            out.rows_mut(od, c.ndx()).copy_from(&oi);
        });
    }

    fn jintegrate(&self, x: &VectorXs, v: &VectorXs, jout: &mut MatrixXs, arg: usize) {
        jout.fill(0.0);
        self.for_each_block(|c, ox, od| {
            let xi = x.rows(ox, c.nx()).clone_owned();
            let vi = v.rows(od, c.ndx()).clone_owned();
            let mut ji = MatrixXs::zeros(c.ndx(), c.ndx());
            c.jintegrate(&xi, &vi, &mut ji, arg);
            jout.view_mut((od, od), (c.ndx(), c.ndx())).copy_from(&ji);
        });
    }

    fn jdifference(&self, x0: &VectorXs, x1: &VectorXs, jout: &mut MatrixXs, arg: usize) {
        jout.fill(0.0);
        self.for_each_block(|c, ox, od| {
            let a = x0.rows(ox, c.nx()).clone_owned();
            let b = x1.rows(ox, c.nx()).clone_owned();
            let mut ji = MatrixXs::zeros(c.ndx(), c.ndx());
            c.jdifference(&a, &b, &mut ji, arg);
            jout.view_mut((od, od), (c.ndx(), c.ndx())).copy_from(&ji);
        });
    }
}
