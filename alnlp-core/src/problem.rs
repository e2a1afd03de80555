//! Problem definition and multiplier layout.

use std::sync::Arc;

use crate::constraints::Constraint;
use crate::cost::CostFunction;
use crate::error::Error;
use crate::manifold::Manifold;
use crate::VectorXs;

/// An immutable constrained program: one cost, one manifold, an ordered
/// list of constraints.
///
/// The constraint order is stable and defines the layout of the multiplier
/// vector: one contiguous backing vector with an `(offset, len)` segment
/// per constraint. A `Problem` is read-only for the duration of any solve
/// referencing it and is shared across solver instances through `Arc`.
pub struct Problem {
    manifold: Arc<dyn Manifold>,
    cost: Arc<dyn CostFunction>,
    constraints: Vec<Constraint>,
    layout: Vec<(usize, usize)>,
    total_constraint_dim: usize,
}

impl Problem {
    /// Build a problem, validating every dimension against the manifold.
    pub fn new(
        manifold: Arc<dyn Manifold>,
        cost: Arc<dyn CostFunction>,
        constraints: Vec<Constraint>,
    ) -> Result<Self, Error> {
        if cost.nx() != manifold.nx() {
            return Err(Error::DimensionMismatch {
                what: "cost nx",
                expected: manifold.nx(),
                actual: cost.nx(),
            });
        }
        if cost.ndx() != manifold.ndx() {
            return Err(Error::DimensionMismatch {
                what: "cost ndx",
                expected: manifold.ndx(),
                actual: cost.ndx(),
            });
        }
        let mut layout = Vec::with_capacity(constraints.len());
        let mut offset = 0;
        for cstr in &constraints {
            if cstr.func.nx() != manifold.nx() {
                return Err(Error::DimensionMismatch {
                    what: "constraint nx",
                    expected: manifold.nx(),
                    actual: cstr.func.nx(),
                });
            }
            if cstr.func.ndx() != manifold.ndx() {
                return Err(Error::DimensionMismatch {
                    what: "constraint ndx",
                    expected: manifold.ndx(),
                    actual: cstr.func.ndx(),
                });
            }
            layout.push((offset, cstr.nr()));
            offset += cstr.nr();
        }
        Ok(Self {
            manifold,
            cost,
            constraints,
            layout,
            total_constraint_dim: offset,
        })
    }

    /// The manifold the decision variable lives on.
    pub fn manifold(&self) -> &Arc<dyn Manifold> {
        &self.manifold
    }

    /// The cost functional.
    pub fn cost(&self) -> &Arc<dyn CostFunction> {
        &self.cost
    }

    /// The ordered constraints.
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Point dimension.
    pub fn nx(&self) -> usize {
        self.manifold.nx()
    }

    /// Tangent dimension.
    pub fn ndx(&self) -> usize {
        self.manifold.ndx()
    }

    /// Number of constraint blocks.
    pub fn num_constraint_blocks(&self) -> usize {
        self.constraints.len()
    }

    /// Sum of per-constraint residual dimensions.
    pub fn total_constraint_dim(&self) -> usize {
        self.total_constraint_dim
    }

    /// `(offset, len)` of each constraint's segment in the multiplier
    /// arena.
    pub fn multiplier_layout(&self) -> &[(usize, usize)] {
        &self.layout
    }

    /// Allocate a zeroed, correctly-sized multiplier vector.
    pub fn allocate_multipliers(&self) -> VectorXs {
        VectorXs::zeros(self.total_constraint_dim)
    }

    /// Slice constraint `i`'s segment out of a stacked multiplier or
    /// residual vector.
    ///
    /// Fails on problems with no constraints; panics with a size message if
    /// the backing vector does not match the problem layout.
    pub fn segment<'a>(&self, stacked: &'a VectorXs, i: usize) -> Result<&'a [f64], Error> {
        if self.constraints.is_empty() {
            return Err(Error::EmptyProblem);
        }
        assert_eq!(
            stacked.len(),
            self.total_constraint_dim,
            "stacked vector has length {}, expected {}",
            stacked.len(),
            self.total_constraint_dim
        );
        let (offset, len) = self.layout[i];
        Ok(&stacked.as_slice()[offset..offset + len])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::{EqualitySet, NegativeOrthant};
    use crate::cost::QuadraticDistanceCost;
    use crate::func::LinearFunction;
    use crate::manifold::VectorSpace;
    use crate::MatrixXs;

    fn linear_constraint(nr: usize, n: usize, set_eq: bool) -> Constraint {
        let func = Arc::new(LinearFunction::new(
            MatrixXs::zeros(nr, n),
            VectorXs::zeros(nr),
        ));
        if set_eq {
            Constraint::new(func, Arc::new(EqualitySet))
        } else {
            Constraint::new(func, Arc::new(NegativeOrthant))
        }
    }

    #[test]
    fn multiplier_layout_follows_constraint_order() {
        let space = Arc::new(VectorSpace::new(4));
        let cost = Arc::new(QuadraticDistanceCost::to_neutral(space.clone()));
        let problem = Problem::new(
            space,
            cost,
            vec![
                linear_constraint(2, 4, true),
                linear_constraint(3, 4, false),
                linear_constraint(1, 4, true),
            ],
        )
        .unwrap();

        assert_eq!(problem.total_constraint_dim(), 6);
        assert_eq!(problem.multiplier_layout(), &[(0, 2), (2, 3), (5, 1)]);

        let lams = problem.allocate_multipliers();
        assert_eq!(lams.len(), 6);
        assert_eq!(problem.segment(&lams, 1).unwrap().len(), 3);
    }

    #[test]
    fn segment_access_fails_on_unconstrained_problem() {
        let space = Arc::new(VectorSpace::new(2));
        let cost = Arc::new(QuadraticDistanceCost::to_neutral(space.clone()));
        let problem = Problem::new(space, cost, vec![]).unwrap();
        let lams = problem.allocate_multipliers();
        assert!(matches!(
            problem.segment(&lams, 0),
            Err(Error::EmptyProblem)
        ));
    }

    #[test]
    fn mismatched_constraint_dimension_is_rejected() {
        let space = Arc::new(VectorSpace::new(4));
        let cost = Arc::new(QuadraticDistanceCost::to_neutral(space.clone()));
        let bad = linear_constraint(2, 3, true);
        assert!(matches!(
            Problem::new(space, cost, vec![bad]),
            Err(Error::DimensionMismatch { .. })
        ));
    }
}
