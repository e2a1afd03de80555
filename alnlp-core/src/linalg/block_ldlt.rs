//! Block factorization exploiting the KKT structure.

use nalgebra::linalg::Cholesky;
use nalgebra::Dyn;

use super::{BackendError, KktBackend};
use crate::{MatrixXs, VectorXs};

/// Structured factorization of KKT matrices of the form
///
/// ```text
/// [ H   Jᵀ ]      H: nd × nd (regularized cost block)
/// [ J  -Σ  ]      Σ: nc × nc positive diagonal (dual block)
/// ```
///
/// Eliminating the dual block condenses the system to the Schur complement
/// `H + Jᵀ Σ⁻¹ J`, which is positive definite exactly when the KKT matrix
/// has the correct saddle-point inertia, so a Cholesky factorization both
/// solves the system and certifies the inertia. The borders are read off
/// the assembled matrix; solves back-substitute the dual block.
pub struct BlockLdlt {
    nd: usize,
    nc: usize,
    chol: Option<Cholesky<f64, Dyn>>,
    jac: MatrixXs,
    sigma: VectorXs,
}

impl BlockLdlt {
    /// Backend for a `nd`-dimensional primal block bordered by `nc`
    /// constraint rows.
    pub fn new(nd: usize, nc: usize) -> Self {
        Self {
            nd,
            nc,
            chol: None,
            jac: MatrixXs::zeros(nc, nd),
            sigma: VectorXs::zeros(nc),
        }
    }
}

impl KktBackend for BlockLdlt {
    fn dim(&self) -> usize {
        self.nd + self.nc
    }

    fn compute(&mut self, kkt: &MatrixXs) -> Result<(), BackendError> {
        let dim = self.dim();
        if kkt.nrows() != dim || kkt.ncols() != dim {
            return Err(BackendError::WrongShape {
                dim,
                rows: kkt.nrows(),
                cols: kkt.ncols(),
            });
        }
        self.chol = None;

        let (nd, nc) = (self.nd, self.nc);
        self.jac.copy_from(&kkt.view((nd, 0), (nc, nd)));
        for i in 0..nc {
            let sig = -kkt[(nd + i, nd + i)];
            if sig <= 0.0 {
                return Err(BackendError::NotPositiveDefinite);
            }
            self.sigma[i] = sig;
        }

        let mut schur = kkt.view((0, 0), (nd, nd)).clone_owned();
        // schur += J^T Sigma^{-1} J, accumulated row by row of J.
        for i in 0..nc {
            let row = self.jac.row(i);
            let w = 1.0 / self.sigma[i];
            schur.ger(w, &row.transpose(), &row.transpose(), 1.0);
        }
        self.chol = Some(Cholesky::new(schur).ok_or(BackendError::NotPositiveDefinite)?);
        Ok(())
    }

    fn solve_in_place(&self, rhs: &mut VectorXs) -> Result<(), BackendError> {
        let chol = self.chol.as_ref().ok_or(BackendError::NotFactorized)?;
        let dim = self.dim();
        if rhs.len() != dim {
            return Err(BackendError::RhsDimension {
                expected: dim,
                actual: rhs.len(),
            });
        }
        let (nd, nc) = (self.nd, self.nc);
        let b2 = rhs.rows(nd, nc).clone_owned();

        // Condensed primal solve: x = S^{-1} (b1 + J^T Sigma^{-1} b2)
        let mut w = rhs.rows(0, nd).clone_owned();
        let b2_scaled = b2.component_div(&self.sigma);
        w.gemv_tr(1.0, &self.jac, &b2_scaled, 1.0);
        chol.solve_mut(&mut w);

        // Dual back-substitution: y = Sigma^{-1} (J x - b2)
        let mut y = &self.jac * &w;
        y -= &b2;
        let y = y.component_div(&self.sigma);

        rhs.rows_mut(0, nd).copy_from(&w);
        rhs.rows_mut(nd, nc).copy_from(&y);
        Ok(())
    }

    fn inertia(&self) -> Option<(usize, usize, usize)> {
        // Cholesky success certifies the saddle-point inertia.
        self.chol.as_ref().map(|_| (self.nd, self.nc, 0))
    }
}
