//! Sparse Cholesky solver backed by `faer`.
//!
//! Implements the [`SparseSolver`] trait using faer's supernodal LLᵀ
//! factorization.
//!
//! ## Workflow
//! 1. `factorize(matrix)` — converts CSR→CSC, computes symbolic + numeric LLᵀ
//! 2. `solve_many(rhs, solutions)` — one multi-column substitution for x, y, z
//! 3. Repeat solves with different RHS without re-factorizing

use faer::Side;
use faer::linalg::solvers::Solve;
use faer::sparse::SparseColMat;
use faer::sparse::Triplet;
use faer::sparse::linalg::solvers::{Llt, SymbolicLlt};

use crate::sparse::{CsrMatrix, SparseSolver};

/// Sparse Cholesky (LLᵀ) solver using `faer`.
///
/// The system matrix only depends on constraint topology, weights and
/// (in dynamic mode) masses and timestep, so one factorization serves
/// every solve until the next init.
pub struct FaerSolver {
    /// Cached LLᵀ factorization.
    factorization: Option<Llt<usize, f64>>,
    /// Matrix dimension (N×N).
    dimension: usize,
}

impl FaerSolver {
    /// Creates a new solver (unfactorized).
    pub fn new() -> Self {
        Self {
            factorization: None,
            dimension: 0,
        }
    }

    /// Returns the dimension of the factorized matrix.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    fn csr_to_csc(matrix: &CsrMatrix) -> Result<SparseColMat<usize, f64>, String> {
        let mut triplets: Vec<Triplet<usize, usize, f64>> = Vec::with_capacity(matrix.nnz());
        for row in 0..matrix.rows {
            for (col, val) in matrix.row(row) {
                triplets.push(Triplet { row, col, val });
            }
        }

        SparseColMat::try_new_from_triplets(matrix.rows, matrix.cols, &triplets)
            .map_err(|e| format!("Failed to construct faer CSC matrix: {e:?}"))
    }

    fn llt(&self) -> Result<&Llt<usize, f64>, String> {
        self.factorization
            .as_ref()
            .ok_or_else(|| "Solver not factorized. Call factorize() first.".to_string())
    }
}

impl Default for FaerSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl SparseSolver for FaerSolver {
    fn factorize(&mut self, matrix: &CsrMatrix) -> Result<(), String> {
        if matrix.rows != matrix.cols {
            return Err(format!(
                "Matrix must be square, got {}×{}",
                matrix.rows, matrix.cols
            ));
        }
        if matrix.rows == 0 {
            return Err("Cannot factorize empty matrix".into());
        }

        // A failed refactorization must not leave the old factor in place
        self.factorization = None;
        self.dimension = matrix.rows;

        let csc = Self::csr_to_csc(matrix)?;

        // Symbolic analysis (ordering, fill-in prediction)
        let symbolic = SymbolicLlt::try_new(csc.symbolic().as_ref(), Side::Upper)
            .map_err(|e| format!("Symbolic analysis failed: {e:?}"))?;

        // Numeric factorization (using the symbolic structure)
        let llt = Llt::try_new_with_symbolic(symbolic, csc.as_ref(), Side::Upper)
            .map_err(|e| format!("Cholesky factorization failed: {e:?}"))?;

        self.factorization = Some(llt);
        Ok(())
    }

    fn solve(&self, rhs: &[f64], solution: &mut [f64]) -> Result<(), String> {
        self.solve_many(&[rhs], &mut [solution])
    }

    fn solve_many(&self, rhs: &[&[f64]], solutions: &mut [&mut [f64]]) -> Result<(), String> {
        let llt = self.llt()?;

        if rhs.len() != solutions.len() {
            return Err(format!(
                "RHS count ({}) != solution count ({})",
                rhs.len(),
                solutions.len()
            ));
        }
        for (b, x) in rhs.iter().zip(solutions.iter()) {
            if b.len() != self.dimension || x.len() != self.dimension {
                return Err(format!(
                    "RHS/solution length ({}/{}) != matrix dimension ({})",
                    b.len(),
                    x.len(),
                    self.dimension
                ));
            }
        }

        // One dense column per right-hand side
        let rhs_mat: faer::Mat<f64> = faer::Mat::from_fn(self.dimension, rhs.len(), |i, j| rhs[j][i]);

        // L Lᵀ X = B
        let sol = llt.solve(&rhs_mat);

        for (j, x) in solutions.iter_mut().enumerate() {
            for (i, xi) in x.iter_mut().enumerate() {
                *xi = sol[(i, j)];
            }
        }

        Ok(())
    }

    fn is_factorized(&self) -> bool {
        self.factorization.is_some()
    }
}
