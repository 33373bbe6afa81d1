//! Sparse matrix representation and solver interface.
//!
//! Provides a CSR (Compressed Sparse Row) matrix and a trait
//! for sparse Cholesky solvers. The solver stacks every constraint's
//! selection rows into one CSR operator `S` and factorizes `SᵀWS`.

use serde::{Deserialize, Serialize};

/// Compressed Sparse Row (CSR) matrix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsrMatrix {
    /// Number of rows.
    pub rows: usize,
    /// Number of columns.
    pub cols: usize,
    /// Row pointer array (length = rows + 1).
    /// `row_ptr[i]..row_ptr[i+1]` are the indices into `col_idx` and `values`
    /// for non-zeros in row `i`.
    pub row_ptr: Vec<usize>,
    /// Column indices of non-zero entries.
    pub col_idx: Vec<usize>,
    /// Non-zero values.
    pub values: Vec<f64>,
}

impl CsrMatrix {
    /// Creates an empty CSR matrix with the given dimensions.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            row_ptr: vec![0; rows + 1],
            col_idx: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Returns the number of stored entries.
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Creates a CSR matrix from triplets (row, col, value).
    ///
    /// Duplicate entries are summed. Columns within a row come out sorted.
    pub fn from_triplets(rows: usize, cols: usize, triplets: &[(usize, usize, f64)]) -> Self {
        // Count entries per row
        let mut row_counts = vec![0usize; rows];
        for &(r, _, _) in triplets {
            row_counts[r] += 1;
        }

        let mut row_start = vec![0usize; rows + 1];
        for i in 0..rows {
            row_start[i + 1] = row_start[i] + row_counts[i];
        }

        let total = row_start[rows];
        let mut raw_cols = vec![0usize; total];
        let mut raw_vals = vec![0.0f64; total];

        // Scatter, using a per-row write cursor
        let mut cursor = row_start[..rows].to_vec();
        for &(r, c, v) in triplets {
            let pos = cursor[r];
            raw_cols[pos] = c;
            raw_vals[pos] = v;
            cursor[r] += 1;
        }

        // Sort each row by column and merge duplicates
        let mut row_ptr = Vec::with_capacity(rows + 1);
        let mut col_idx = Vec::with_capacity(total);
        let mut values = Vec::with_capacity(total);
        row_ptr.push(0);

        let mut order: Vec<usize> = Vec::new();
        for i in 0..rows {
            order.clear();
            order.extend(row_start[i]..row_start[i + 1]);
            order.sort_by_key(|&k| raw_cols[k]);

            let mut last: Option<usize> = None;
            for &k in &order {
                if last == Some(raw_cols[k]) {
                    if let Some(v) = values.last_mut() {
                        *v += raw_vals[k];
                    }
                } else {
                    col_idx.push(raw_cols[k]);
                    values.push(raw_vals[k]);
                    last = Some(raw_cols[k]);
                }
            }
            row_ptr.push(col_idx.len());
        }

        Self {
            rows,
            cols,
            row_ptr,
            col_idx,
            values,
        }
    }

    /// Iterate the `(col, value)` entries of one row.
    pub fn row(&self, r: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let range = self.row_ptr[r]..self.row_ptr[r + 1];
        self.col_idx[range.clone()]
            .iter()
            .copied()
            .zip(self.values[range].iter().copied())
    }

    /// Dense value lookup (zero if not stored).
    pub fn get(&self, r: usize, c: usize) -> f64 {
        self.row(r).find(|&(col, _)| col == c).map_or(0.0, |(_, v)| v)
    }

    /// Matrix-vector product `y = M x`.
    pub fn mul_vec(&self, x: &[f64]) -> Vec<f64> {
        (0..self.rows)
            .map(|r| self.row(r).map(|(c, v)| v * x[c]).sum())
            .collect()
    }

    /// Transposed product `y = Mᵀ x` with per-row weights: `y = Mᵀ W x`.
    pub fn transpose_mul_weighted(&self, x: &[f64], row_weights: &[f64]) -> Vec<f64> {
        let mut y = vec![0.0; self.cols];
        for r in 0..self.rows {
            let wx = row_weights[r] * x[r];
            if wx == 0.0 {
                continue;
            }
            for (c, v) in self.row(r) {
                y[c] += v * wx;
            }
        }
        y
    }

    /// Triplets of the weighted Gram matrix `Mᵀ W M`.
    ///
    /// Each row contributes the outer product of its entries, so the
    /// result is symmetric by construction. Zero-weight rows are skipped.
    pub fn weighted_gram_triplets(&self, row_weights: &[f64]) -> Vec<(usize, usize, f64)> {
        let mut triplets = Vec::with_capacity(self.nnz() * 2);
        for r in 0..self.rows {
            let w = row_weights[r];
            if w == 0.0 {
                continue;
            }
            let range = self.row_ptr[r]..self.row_ptr[r + 1];
            for a in range.clone() {
                for b in range.clone() {
                    let val = w * self.values[a] * self.values[b];
                    if val != 0.0 {
                        triplets.push((self.col_idx[a], self.col_idx[b], val));
                    }
                }
            }
        }
        triplets
    }
}

/// Trait for sparse symmetric positive-definite solvers.
pub trait SparseSolver {
    /// Factorize the matrix. Call once (or after topology change).
    fn factorize(&mut self, matrix: &CsrMatrix) -> Result<(), String>;

    /// Solve Ax = b using the pre-computed factorization.
    /// Returns x in the provided output buffer.
    fn solve(&self, rhs: &[f64], solution: &mut [f64]) -> Result<(), String>;

    /// Solve for several right-hand sides against the same factorization.
    fn solve_many(&self, rhs: &[&[f64]], solutions: &mut [&mut [f64]]) -> Result<(), String> {
        if rhs.len() != solutions.len() {
            return Err(format!(
                "RHS count ({}) != solution count ({})",
                rhs.len(),
                solutions.len()
            ));
        }
        for (b, x) in rhs.iter().zip(solutions.iter_mut()) {
            self.solve(b, x)?;
        }
        Ok(())
    }

    /// Returns true if the solver holds a valid factorization.
    fn is_factorized(&self) -> bool;
}
