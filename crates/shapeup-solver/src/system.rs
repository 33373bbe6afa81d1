//! Global linear system of the local/global solver.
//!
//! Stacks every constraint's rows into one selection operator `S`
//! (rows = Σ constraint rows, cols = N) and factorizes
//!
//! ```text
//! A = Sᵀ W S            (static)
//! A = Sᵀ W S + M / h²   (dynamic)
//! ```
//!
//! once per initialization. `A` is shared by the x, y and z channels, so
//! every global step is three back-substitutions against the same factor.

use shapeup_math::faer_solver::FaerSolver;
use shapeup_math::sparse::{CsrMatrix, SparseSolver};
use shapeup_math::DVec3;
use shapeup_types::{ShapeError, ShapeResult};
use tracing::debug;

use crate::constraint::Constraint;
use crate::field::VectorField;

/// Assembled and factorized system. Immutable between initializations,
/// except for a timestep change in dynamic mode.
pub struct LinearSystem {
    /// Number of points (matrix dimension).
    n: usize,
    /// Stacked selection operator `S`.
    selection: CsrMatrix,
    /// Per-row weights captured at assembly.
    row_weights: Vec<f64>,
    /// First row of each constraint, plus the total row count.
    row_offsets: Vec<usize>,
    /// Diagonal inertia term `mᵢ / h²` (dynamic mode only).
    inertia: Option<Vec<f64>>,
    /// Sparse Cholesky factor of `A`.
    solver: FaerSolver,
}

impl LinearSystem {
    /// Builds `S`, captures weights, forms `A` and factorizes it.
    ///
    /// `dynamic` carries per-point masses and the timestep. In static mode
    /// with `check_anchors` set, a structural check rejects point groups
    /// that no closeness constraint holds in place before any numeric work.
    pub fn assemble(
        n: usize,
        constraints: &[Box<dyn Constraint>],
        dynamic: Option<(&[f64], f64)>,
        check_anchors: bool,
    ) -> ShapeResult<Self> {
        if constraints.is_empty() {
            return Err(ShapeError::EmptyConstraintSet);
        }
        if let Some((masses, _)) = dynamic {
            if masses.len() != n {
                return Err(ShapeError::Dimension {
                    expected: n,
                    actual: masses.len(),
                });
            }
        }

        let mut triplets = Vec::new();
        let mut row_weights = Vec::new();
        let mut row_offsets = Vec::with_capacity(constraints.len() + 1);
        let mut row = 0;
        for c in constraints {
            row_offsets.push(row);
            c.add_to_system(&mut triplets, row);
            row_weights.extend(std::iter::repeat(c.weight()).take(c.rows()));
            row += c.rows();
        }
        row_offsets.push(row);

        let selection = CsrMatrix::from_triplets(row, n, &triplets);

        if dynamic.is_none() && check_anchors {
            check_anchored(&selection, &row_weights, n)?;
        }

        let inertia = dynamic.map(|(masses, h)| inertia_diagonal(masses, h));
        let solver = factorize(&selection, &row_weights, inertia.as_deref())?;

        debug!(
            points = n,
            constraints = constraints.len(),
            rows = row,
            nnz = selection.nnz(),
            dynamic = dynamic.is_some(),
            "Linear system factorized"
        );

        Ok(Self {
            n,
            selection,
            row_weights,
            row_offsets,
            inertia,
            solver,
        })
    }

    /// Refactorizes with a new inertia term, keeping `S` and the captured
    /// weights. On failure the previous factorization is kept.
    pub fn refactor_inertia(&mut self, masses: &[f64], timestep: f64) -> ShapeResult<()> {
        if masses.len() != self.n {
            return Err(ShapeError::Dimension {
                expected: self.n,
                actual: masses.len(),
            });
        }
        let inertia = inertia_diagonal(masses, timestep);
        let solver = factorize(&self.selection, &self.row_weights, Some(&inertia))?;
        self.inertia = Some(inertia);
        self.solver = solver;
        Ok(())
    }

    /// Global step: solves `A x = Sᵀ W P (+ M/h² x̃)` for all three channels.
    ///
    /// `projections` holds one target per row; `predicted` is the inertial
    /// target `x̃` and is required in dynamic mode.
    pub fn solve(
        &self,
        projections: &[DVec3],
        predicted: Option<&VectorField>,
        out: &mut VectorField,
    ) -> ShapeResult<()> {
        if projections.len() != self.row_count() {
            return Err(ShapeError::Dimension {
                expected: self.row_count(),
                actual: projections.len(),
            });
        }

        let channel = |k: usize| -> Vec<f64> {
            let p: Vec<f64> = projections.iter().map(|v| v[k]).collect();
            self.selection.transpose_mul_weighted(&p, &self.row_weights)
        };
        let mut rhs = [channel(0), channel(1), channel(2)];

        match (&self.inertia, predicted) {
            (Some(inertia), Some(pred)) => {
                for (i, d) in inertia.iter().enumerate() {
                    rhs[0][i] += d * pred.x[i];
                    rhs[1][i] += d * pred.y[i];
                    rhs[2][i] += d * pred.z[i];
                }
            }
            (Some(_), None) => {
                return Err(ShapeError::NumericalFailure(
                    "dynamic system solved without an inertial target".into(),
                ));
            }
            _ => {}
        }

        if out.len() != self.n {
            *out = VectorField::zeros(self.n);
        }
        let VectorField { x, y, z } = out;
        self.solver
            .solve_many(
                &[rhs[0].as_slice(), rhs[1].as_slice(), rhs[2].as_slice()],
                &mut [x.as_mut_slice(), y.as_mut_slice(), z.as_mut_slice()],
            )
            .map_err(ShapeError::NumericalFailure)
    }

    /// Matrix dimension (number of points).
    pub fn dimension(&self) -> usize {
        self.n
    }

    /// Total number of rows of `S`.
    pub fn row_count(&self) -> usize {
        self.row_offsets.last().copied().unwrap_or(0)
    }

    /// First row of each constraint, followed by the total row count.
    pub fn row_offsets(&self) -> &[usize] {
        &self.row_offsets
    }

    /// Number of constraints captured at assembly.
    pub fn constraint_count(&self) -> usize {
        self.row_offsets.len().saturating_sub(1)
    }

    /// Weights captured at assembly, one per row.
    pub fn row_weights(&self) -> &[f64] {
        &self.row_weights
    }

    /// The stacked selection operator.
    pub fn selection(&self) -> &CsrMatrix {
        &self.selection
    }

    /// Returns true if the system carries an inertia term.
    pub fn is_dynamic(&self) -> bool {
        self.inertia.is_some()
    }
}

fn inertia_diagonal(masses: &[f64], timestep: f64) -> Vec<f64> {
    let inv_h2 = 1.0 / (timestep * timestep);
    masses.iter().map(|m| m * inv_h2).collect()
}

fn factorize(
    selection: &CsrMatrix,
    row_weights: &[f64],
    inertia: Option<&[f64]>,
) -> ShapeResult<FaerSolver> {
    let n = selection.cols;
    let mut gram = selection.weighted_gram_triplets(row_weights);
    if let Some(inertia) = inertia {
        gram.extend(inertia.iter().enumerate().map(|(i, &d)| (i, i, d)));
    }
    let a = CsrMatrix::from_triplets(n, n, &gram);

    let mut solver = FaerSolver::new();
    solver
        .factorize(&a)
        .map_err(ShapeError::SingularSystem)?;
    Ok(solver)
}

/// Union-find over the points coupled by positive-weight rows. Every
/// connected group must contain a row whose coefficients do not sum to
/// zero (a closeness row); otherwise `A` is singular along that group's
/// translation.
fn check_anchored(selection: &CsrMatrix, row_weights: &[f64], n: usize) -> ShapeResult<()> {
    let mut parent: Vec<usize> = (0..n).collect();
    let mut anchors = Vec::new();

    for (r, &w) in row_weights.iter().enumerate() {
        if w <= 0.0 {
            continue;
        }
        let mut first = None;
        let mut sum = 0.0;
        let mut scale: f64 = 0.0;
        for (c, v) in selection.row(r) {
            if v == 0.0 {
                continue;
            }
            sum += v;
            scale = scale.max(v.abs());
            match first {
                None => first = Some(c),
                Some(f) => union(&mut parent, f, c),
            }
        }
        if let Some(f) = first {
            if sum.abs() > 1e-9 * scale {
                anchors.push(f);
            }
        }
    }

    let mut anchored = vec![false; n];
    for a in anchors {
        let root = find(&mut parent, a);
        anchored[root] = true;
    }
    for i in 0..n {
        let root = find(&mut parent, i);
        if !anchored[root] {
            return Err(ShapeError::SingularSystem(format!(
                "point {i} is not anchored: no positive-weight closeness constraint reaches it"
            )));
        }
    }
    Ok(())
}

fn find(parent: &mut [usize], mut i: usize) -> usize {
    while parent[i] != i {
        parent[i] = parent[parent[i]];
        i = parent[i];
    }
    i
}

fn union(parent: &mut [usize], a: usize, b: usize) {
    let ra = find(parent, a);
    let rb = find(parent, b);
    if ra != rb {
        parent[ra] = rb;
    }
}
