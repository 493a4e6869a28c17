//! Reproducible SPD test problems.
//!
//! [`random_spd`] draws `R` with i.i.d. standard normal entries from a seeded
//! [`StdRng`] and forms `A = R^T R + 0.1 I`, which is symmetric positive
//! definite. With `density < 1`, off-diagonal entries whose magnitude falls
//! below the `(1 - density)` quantile of `|A|` are dropped. The diagonal is
//! always kept; heavy sparsification can still cost definiteness.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use tracing::debug;

use crate::error::ValidationError;
use crate::matrix::SparseMatrix;
use crate::vector::DenseVector;

/// Largest dimension [`random_spd`] will generate (it works on dense
/// `n x n` buffers).
pub const MAX_GENERATED_DIM: usize = 4096;

/// Diagonal shift added to `R^T R`.
pub const DIAGONAL_SHIFT: f64 = 0.1;

/// Coordinate-form matrix with `i32` indices, as accepted by
/// [`SparseMatrix::from_triplets`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Triplets {
    /// Matrix dimension.
    pub n: usize,
    /// Row index per entry.
    pub rows: Vec<i32>,
    /// Column index per entry.
    pub cols: Vec<i32>,
    /// Value per entry.
    pub vals: Vec<f64>,
}

impl Triplets {
    /// Empty triplet set for an `n x n` matrix.
    pub fn new(n: usize) -> Self {
        Self {
            n,
            ..Self::default()
        }
    }

    /// Append one entry.
    pub fn push(&mut self, row: i32, col: i32, val: f64) {
        self.rows.push(row);
        self.cols.push(col);
        self.vals.push(val);
    }

    /// Number of entries (before duplicate merging).
    pub fn len(&self) -> usize {
        self.vals.len()
    }

    /// `true` if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.vals.is_empty()
    }

    /// Non-zero entries of a row-major dense `n x n` buffer, in row-major
    /// order.
    pub fn from_dense(n: usize, dense: &[f64]) -> Result<Self, ValidationError> {
        if i32::try_from(n).is_err() {
            return Err(ValidationError::MatrixTooLarge {
                rows: n,
                cols: n,
                max_dim: i32::MAX as usize,
            });
        }
        let expected = n.checked_mul(n).ok_or(ValidationError::MatrixTooLarge {
            rows: n,
            cols: n,
            max_dim: i32::MAX as usize,
        })?;
        if dense.len() != expected {
            return Err(ValidationError::DimensionMismatch(format!(
                "dense buffer length {} does not equal n^2 = {expected}",
                dense.len(),
            )));
        }

        let mut triplets = Self::new(n);
        for (idx, &v) in dense.iter().enumerate() {
            if v != 0.0 {
                triplets.push((idx / n) as i32, (idx % n) as i32, v);
            }
        }
        Ok(triplets)
    }

    /// Build the CSR matrix.
    pub fn to_matrix(&self) -> Result<SparseMatrix, ValidationError> {
        SparseMatrix::from_triplets(self.n, &self.rows, &self.cols, &self.vals)
    }
}

/// A linear system `A x = b` with an initial guess.
#[derive(Debug, Clone)]
pub struct Problem {
    /// Coefficient matrix.
    pub matrix: SparseMatrix,
    /// Right-hand side.
    pub b: DenseVector,
    /// Initial guess.
    pub x0: DenseVector,
}

impl Problem {
    /// `b = 1`, `x0 = 0` for the given matrix.
    pub fn with_unit_rhs(matrix: SparseMatrix) -> Self {
        let n = matrix.n();
        Self {
            matrix,
            b: DenseVector::filled(n, 1.0),
            x0: DenseVector::zeros(n),
        }
    }

    /// Random SPD matrix from [`random_spd`] with `b = 1`, `x0 = 0`.
    pub fn random_spd(n: usize, seed: u64, density: f64) -> Result<Self, ValidationError> {
        let matrix = random_spd(n, seed, density)?.to_matrix()?;
        Ok(Self::with_unit_rhs(matrix))
    }
}

/// Dense row-major `R^T R + 0.1 I` for a seeded standard normal `R`.
pub fn random_spd_dense(n: usize, seed: u64) -> Result<Vec<f64>, ValidationError> {
    if n > MAX_GENERATED_DIM {
        return Err(ValidationError::MatrixTooLarge {
            rows: n,
            cols: n,
            max_dim: MAX_GENERATED_DIM,
        });
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let r: Vec<f64> = (0..n * n).map(|_| rng.sample(StandardNormal)).collect();

    // a[i][j] = sum_k r[k][i] * r[k][j]; fill the upper triangle and mirror.
    let mut a = vec![0.0f64; n * n];
    for i in 0..n {
        for j in i..n {
            let mut sum = 0.0;
            for k in 0..n {
                sum += r[k * n + i] * r[k * n + j];
            }
            a[i * n + j] = sum;
            a[j * n + i] = sum;
        }
        a[i * n + i] += DIAGONAL_SHIFT;
    }
    Ok(a)
}

/// Random SPD matrix in triplet form.
///
/// # Errors
///
/// [`ValidationError::ParameterOutOfRange`] unless `0 < density <= 1`;
/// [`ValidationError::MatrixTooLarge`] above [`MAX_GENERATED_DIM`].
pub fn random_spd(n: usize, seed: u64, density: f64) -> Result<Triplets, ValidationError> {
    if !(density > 0.0 && density <= 1.0) {
        return Err(ValidationError::ParameterOutOfRange {
            name: "density".into(),
            value: density.to_string(),
            expected: "(0.0, 1.0]".into(),
        });
    }

    let mut a = random_spd_dense(n, seed)?;

    if density < 1.0 && n > 0 {
        let threshold = quantile(a.iter().map(|v| v.abs()).collect(), 1.0 - density);
        for i in 0..n {
            for j in 0..n {
                if i != j && a[i * n + j].abs() < threshold {
                    a[i * n + j] = 0.0;
                }
            }
        }
        debug!(n, density, threshold, "sparsified SPD matrix");
    }

    Triplets::from_dense(n, &a)
}

/// Linear-interpolation quantile of `values` at `q` in `[0, 1]`.
fn quantile(mut values: Vec<f64>, q: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(f64::total_cmp);
    let pos = q.clamp(0.0, 1.0) * (values.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    values[lo] + (values[hi] - values[lo]) * (pos - lo as f64)
}
