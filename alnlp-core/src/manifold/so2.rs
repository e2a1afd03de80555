//! Planar rotation group SO(2).

use super::{check_point_dim, check_tangent_dim, Manifold};
use crate::{MatrixXs, VectorXs};

/// The unit circle as a Lie group: points are stored as `(cos θ, sin θ)`
/// so `nx = 2` while the tangent space is one-dimensional (`ndx = 1`).
///
/// `integrate` composes rotations and `difference` recovers the relative
/// angle, wrapped to `(-π, π]`. Since the group is abelian and
/// one-dimensional, all operator Jacobians are `±1`.
#[derive(Debug, Clone, Copy, Default)]
pub struct So2;

impl So2 {
    /// Build the point representation of the angle `theta`.
    pub fn point(theta: f64) -> VectorXs {
        VectorXs::from_column_slice(&[theta.cos(), theta.sin()])
    }

    /// Recover the angle of a point.
    pub fn angle(x: &VectorXs) -> f64 {
        x[1].atan2(x[0])
    }
}

impl Manifold for So2 {
    fn nx(&self) -> usize {
        2
    }

    fn ndx(&self) -> usize {
        1
    }

    fn neutral(&self) -> VectorXs {
        VectorXs::from_column_slice(&[1.0, 0.0])
    }

    fn integrate(&self, x: &VectorXs, v: &VectorXs, out: &mut VectorXs) {
        check_point_dim(self, x, "integrate point");
        check_tangent_dim(self, v, "integrate tangent");
        let (c, s) = (v[0].cos(), v[0].sin());
        let out0 = x[0] * c - x[1] * s;
        let out1 = x[1] * c + x[0] * s;
        out[0] = out0;
        out[1] = out1;
    }

    fn difference(&self, x0: &VectorXs, x1: &VectorXs, out: &mut VectorXs) {
        check_point_dim(self, x0, "difference base point");
        check_point_dim(self, x1, "difference target point");
        // Relative rotation x0^{-1} * x1, read off as an angle.
        let c = x1[0] * x0[0] + x1[1] * x0[1];
        let s = x1[1] * x0[0] - x1[0] * x0[1];
        out[0] = s.atan2(c);
    }

    fn jintegrate(&self, _x: &VectorXs, _v: &VectorXs, jout: &mut MatrixXs, arg: usize) {
        debug_assert!(arg < 2, "Jacobian argument must be 0 or 1");
        jout[(0, 0)] = 1.0;
    }

    fn jdifference(&self, _x0: &VectorXs, _x1: &VectorXs, jout: &mut MatrixXs, arg: usize) {
        debug_assert!(arg < 2, "Jacobian argument must be 0 or 1");
        jout[(0, 0)] = if arg == 0 { -1.0 } else { 1.0 };
    }
}
