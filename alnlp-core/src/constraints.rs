//! Constraint sets and constraints.
//!
//! A [`ConstraintSet`] is a closed convex set `C` with a cheap projection.
//! The augmented-Lagrangian machinery only needs two derived quantities:
//! the *normal-cone projection* `Π(z) = z − proj_C(z)` (the displacement to
//! the set, which penalizes violation), and its generalized Jacobian, a
//! diagonal 0/1 activity mask. Pairing a set with a residual function forms
//! a [`Constraint`] `c(x) ∈ C`.

use std::sync::Arc;

use crate::func::C2Function;

/// Closed convex set with projection and generalized-Jacobian information.
///
/// All methods operate on the slice of the stacked constraint vector owned
/// by one constraint and must be allocation-free.
pub trait ConstraintSet: Send + Sync {
    /// Project `z` onto the set, writing into `out` (`out.len() == z.len()`).
    fn project(&self, z: &[f64], out: &mut [f64]);

    /// `Π(z) = z − proj_C(z)`, the displacement onto the set.
    fn normal_cone_projection(&self, z: &[f64], out: &mut [f64]) {
        self.project(z, out);
        for (o, zi) in out.iter_mut().zip(z) {
            *o = zi - *o;
        }
    }

    /// Generalized Jacobian of `Π` at `z`: `mask[i]` is true where `Π` is
    /// locally the identity in coordinate `i` (the constraint coordinate is
    /// active), false where it is locally zero.
    fn active_set(&self, z: &[f64], mask: &mut [bool]);
}

/// The single point `{0}`: equality constraints `c(x) = 0`.
///
/// Projection is identically zero, so `Π(z) = z` and every coordinate is
/// always active.
#[derive(Debug, Clone, Copy, Default)]
pub struct EqualitySet;

impl ConstraintSet for EqualitySet {
    fn project(&self, _z: &[f64], out: &mut [f64]) {
        out.fill(0.0);
    }

    fn active_set(&self, _z: &[f64], mask: &mut [bool]) {
        mask.fill(true);
    }
}

/// The negative orthant `{z : z ≤ 0}`: inequality constraints `c(x) ≤ 0`.
///
/// Projection is the componentwise minimum with zero; `Π(z) = max(z, 0)`
/// and a coordinate is active where `z_i > 0`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NegativeOrthant;

impl ConstraintSet for NegativeOrthant {
    fn project(&self, z: &[f64], out: &mut [f64]) {
        for (o, &zi) in out.iter_mut().zip(z) {
            *o = zi.min(0.0);
        }
    }

    fn active_set(&self, z: &[f64], mask: &mut [bool]) {
        for (m, &zi) in mask.iter_mut().zip(z) {
            *m = zi > 0.0;
        }
    }
}

/// The box `[lower, upper]^n`: two-sided bounds `lower ≤ c(x) ≤ upper`.
#[derive(Debug, Clone, Copy)]
pub struct BoxSet {
    /// Lower bound, applied componentwise.
    pub lower: f64,
    /// Upper bound, applied componentwise.
    pub upper: f64,
}

impl BoxSet {
    /// Box with the given componentwise bounds.
    pub fn new(lower: f64, upper: f64) -> Self {
        assert!(
            lower <= upper,
            "box lower bound {} exceeds upper bound {}",
            lower,
            upper
        );
        Self { lower, upper }
    }
}

impl ConstraintSet for BoxSet {
    fn project(&self, z: &[f64], out: &mut [f64]) {
        for (o, &zi) in out.iter_mut().zip(z) {
            *o = zi.clamp(self.lower, self.upper);
        }
    }

    fn active_set(&self, z: &[f64], mask: &mut [bool]) {
        for (m, &zi) in mask.iter_mut().zip(z) {
            *m = zi < self.lower || zi > self.upper;
        }
    }
}

/// A residual function paired with the set its values must belong to.
pub struct Constraint {
    /// Residual `c_i : M → R^nr`.
    pub func: Arc<dyn C2Function>,
    /// Set `C_i` the residual is constrained to.
    pub set: Arc<dyn ConstraintSet>,
}

impl Constraint {
    /// Constrain `func(x) ∈ set`.
    pub fn new(func: Arc<dyn C2Function>, set: Arc<dyn ConstraintSet>) -> Self {
        Self { func, set }
    }

    /// Dimension of this constraint block.
    pub fn nr(&self) -> usize {
        self.func.nr()
    }
}
