//! Dense regularized LDLᵀ factorization.

use super::{BackendError, KktBackend};
use crate::{MatrixXs, VectorXs};

/// Unpivoted dense LDLᵀ with static and dynamic diagonal regularization.
///
/// Suitable for quasi-definite matrices (the KKT systems assembled by the
/// solver, whose dual block carries `−μI` with `μ > 0`), for which the
/// factorization exists without pivoting. Two safeguards keep it alive near
/// rank deficiency:
///
/// - *static* regularization adds `static_reg` to every diagonal entry,
///   with the entry's own sign, before elimination;
/// - *dynamic* regularization bumps any pivot whose magnitude falls below
///   `min_pivot` up to that threshold, preserving its sign and counting
///   the bump.
pub struct DenseLdlt {
    n: usize,
    static_reg: f64,
    min_pivot: f64,
    // Unit lower triangle of L in the strict lower part; D is kept apart.
    ld: MatrixXs,
    d: VectorXs,
    factorized: bool,
    bumps: u64,
}

impl DenseLdlt {
    /// Backend for systems of dimension `n`.
    pub fn new(n: usize, static_reg: f64, min_pivot: f64) -> Self {
        assert!(
            static_reg >= 0.0,
            "static regularization must be non-negative"
        );
        assert!(
            min_pivot > 0.0,
            "dynamic regularization threshold must be positive"
        );
        Self {
            n,
            static_reg,
            min_pivot,
            ld: MatrixXs::zeros(n, n),
            d: VectorXs::zeros(n),
            factorized: false,
            bumps: 0,
        }
    }

    /// The pivot diagonal `D` of the current factorization.
    pub fn pivots(&self) -> &VectorXs {
        &self.d
    }
}

impl KktBackend for DenseLdlt {
    fn dim(&self) -> usize {
        self.n
    }

    fn compute(&mut self, kkt: &MatrixXs) -> Result<(), BackendError> {
        let n = self.n;
        if kkt.nrows() != n || kkt.ncols() != n {
            return Err(BackendError::WrongShape {
                dim: n,
                rows: kkt.nrows(),
                cols: kkt.ncols(),
            });
        }
        self.factorized = false;
        self.ld.copy_from(kkt);

        for j in 0..n {
            // Pivot: A[j,j] - sum_k L[j,k]^2 D[k], statically regularized.
            let mut dj = self.ld[(j, j)];
            dj += self.static_reg * if dj < 0.0 { -1.0 } else { 1.0 };
            for k in 0..j {
                let ljk = self.ld[(j, k)];
                dj -= ljk * ljk * self.d[k];
            }
            // Bumped pivots end at magnitude >= min_pivot; zero maps to +.
            if dj.abs() < self.min_pivot {
                dj = self.min_pivot * if dj < 0.0 { -1.0 } else { 1.0 };
                self.bumps += 1;
            }
            self.d[j] = dj;

            for i in (j + 1)..n {
                let mut lij = self.ld[(i, j)];
                for k in 0..j {
                    lij -= self.ld[(i, k)] * self.ld[(j, k)] * self.d[k];
                }
                self.ld[(i, j)] = lij / dj;
            }
        }
        self.factorized = true;
        Ok(())
    }

    fn solve_in_place(&self, rhs: &mut VectorXs) -> Result<(), BackendError> {
        if !self.factorized {
            return Err(BackendError::NotFactorized);
        }
        let n = self.n;
        if rhs.len() != n {
            return Err(BackendError::RhsDimension {
                expected: n,
                actual: rhs.len(),
            });
        }
        // L y = b
        for i in 0..n {
            let mut acc = rhs[i];
            for k in 0..i {
                acc -= self.ld[(i, k)] * rhs[k];
            }
            rhs[i] = acc;
        }
        // D w = y
        for i in 0..n {
            rhs[i] /= self.d[i];
        }
        // L^T x = w
        for i in (0..n).rev() {
            let mut acc = rhs[i];
            for k in (i + 1)..n {
                acc -= self.ld[(k, i)] * rhs[k];
            }
            rhs[i] = acc;
        }
        Ok(())
    }

    fn inertia(&self) -> Option<(usize, usize, usize)> {
        if !self.factorized {
            return None;
        }
        let pos = self.d.iter().filter(|&&v| v > 0.0).count();
        let neg = self.d.iter().filter(|&&v| v < 0.0).count();
        Some((pos, neg, self.n - pos - neg))
    }

    fn dynamic_bumps(&self) -> u64 {
        self.bumps
    }
}
