//! The Schur-complement solver for the saddle-point system
//!
//! ```text
//! [ K   C ] [u]   [f]
//! [ Cᵗ  0 ] [λ] = [g]
//! ```
//!
//! K is factorized directly once; the Schur complement S = Cᵗ K⁻¹ C is never
//! materialized. Applying S costs one sparse multiply by C, one triangular
//! solve through the factorization and one sparse multiply by Cᵗ.
use log::{debug, info};
use nalgebra::{DMatrix, DVector};
use nalgebra_sparse::factorization::CscCholesky;
use nalgebra_sparse::{CscMatrix, CsrMatrix};
use serde::Deserialize;

use crate::error::LinearSolveError;

/// Stopping criteria for the iterative Schur-complement solve.
///
/// The iteration stops successfully once the residual norm drops below
/// `max(tolerance, reduction * initial residual norm)`, and fails after
/// `max_steps` iterations.
#[derive(Debug, Copy, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SolverControl {
    pub max_steps: usize,
    pub reduction: f64,
    pub tolerance: f64,
}

impl Default for SolverControl {
    fn default() -> Self {
        Self {
            max_steps: 1000,
            reduction: 1e-12,
            tolerance: 1e-12,
        }
    }
}

/// A linear map applied matrix-free.
pub trait LinearOperator {
    fn apply(&self, v: &DVector<f64>) -> DVector<f64>;
}

/// Sparse matrix-vector product `y = A x`.
pub fn spmv(matrix: &CsrMatrix<f64>, x: &DVector<f64>) -> DVector<f64> {
    assert_eq!(matrix.ncols(), x.len());
    let mut y = DVector::zeros(matrix.nrows());
    for (i, j, value) in matrix.triplet_iter() {
        y[i] += value * x[j];
    }
    y
}

/// A direct Cholesky factorization of the stiffness operator, exposed as the
/// operator K⁻¹.
pub struct FactorizedStiffness {
    factorization: CscCholesky<f64>,
    dim: usize,
}

impl FactorizedStiffness {
    /// Factorizes the (symmetric positive definite) stiffness operator.
    pub fn factor(stiffness: &CsrMatrix<f64>) -> Result<Self, LinearSolveError> {
        assert_eq!(stiffness.nrows(), stiffness.ncols());
        let csc = CscMatrix::from(stiffness);
        let factorization = CscCholesky::factor(&csc).map_err(|_| LinearSolveError::FactorizationFailed)?;
        Ok(Self {
            factorization,
            dim: stiffness.nrows(),
        })
    }

    /// Solves `K x = b` through the triangular factors.
    pub fn solve(&self, b: &DVector<f64>) -> DVector<f64> {
        assert_eq!(b.len(), self.dim);
        let rhs = DMatrix::from_column_slice(self.dim, 1, b.as_slice());
        let solution = self.factorization.solve(&rhs);
        DVector::from_column_slice(solution.as_slice())
    }
}

impl LinearOperator for FactorizedStiffness {
    fn apply(&self, v: &DVector<f64>) -> DVector<f64> {
        self.solve(v)
    }
}

/// The Schur complement S = Cᵗ K⁻¹ C, composed matrix-free from the coupling
/// operator and the factorized stiffness operator.
pub struct SchurComplement<'a> {
    coupling: &'a CsrMatrix<f64>,
    coupling_transpose: CsrMatrix<f64>,
    stiffness_inverse: &'a FactorizedStiffness,
}

impl<'a> SchurComplement<'a> {
    pub fn new(coupling: &'a CsrMatrix<f64>, stiffness_inverse: &'a FactorizedStiffness) -> Self {
        Self {
            coupling,
            coupling_transpose: coupling.transpose(),
            stiffness_inverse,
        }
    }
}

impl LinearOperator for SchurComplement<'_> {
    fn apply(&self, v: &DVector<f64>) -> DVector<f64> {
        let coupled = spmv(self.coupling, v);
        let lifted = self.stiffness_inverse.solve(&coupled);
        spmv(&self.coupling_transpose, &lifted)
    }
}

/// Result of a converged conjugate-gradient solve.
#[derive(Debug, Clone)]
pub struct CgResult {
    pub solution: DVector<f64>,
    pub iterations: usize,
}

/// Solves `A x = b` with conjugate gradients and identity preconditioning.
///
/// Identity preconditioning is a deliberate simplification: composed with
/// the direct factorization of K, the Schur complement is well conditioned
/// relative to K itself.
pub fn solve_cg(
    operator: &dyn LinearOperator,
    rhs: &DVector<f64>,
    control: &SolverControl,
) -> Result<CgResult, LinearSolveError> {
    let mut x = DVector::zeros(rhs.len());
    let mut residual = rhs.clone();
    let mut direction = residual.clone();
    let mut residual_norm2 = residual.norm_squared();

    let threshold = control.tolerance.max(control.reduction * residual_norm2.sqrt());

    let mut iterations = 0;
    while residual_norm2.sqrt() > threshold {
        if iterations >= control.max_steps {
            return Err(LinearSolveError::MaxIterationsReached {
                iterations: control.max_steps,
            });
        }

        let applied = operator.apply(&direction);
        let alpha = residual_norm2 / direction.dot(&applied);
        x.axpy(alpha, &direction, 1.0);
        residual.axpy(-alpha, &applied, 1.0);

        let residual_norm2_next = residual.norm_squared();
        let beta = residual_norm2_next / residual_norm2;
        direction = &residual + beta * &direction;
        residual_norm2 = residual_norm2_next;
        iterations += 1;

        debug!("cg iteration {}: residual norm {:.3e}", iterations, residual_norm2.sqrt());
    }

    info!(
        "cg converged after {} iterations, residual norm {:.3e}",
        iterations,
        residual_norm2.sqrt()
    );
    Ok(CgResult { solution: x, iterations })
}
