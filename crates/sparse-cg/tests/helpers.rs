//! Shared test helpers for the sparse-cg integration test suite.
//!
//! Provides deterministic matrix generators, a dense reference solver, and
//! floating-point comparison utilities used across the test modules.

#![allow(dead_code)]

use sparse_cg::{BackendConfig, ParallelBackend, SparseMatrix};

// ---------------------------------------------------------------------------
// Random number generator (simple LCG for deterministic reproducibility)
// ---------------------------------------------------------------------------

/// A minimal linear congruential generator for deterministic test data.
pub struct Lcg {
    state: u64,
}

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    pub fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.state
    }

    /// Uniform f64 in [0, 1).
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Uniform f64 in [lo, hi).
    pub fn next_f64_range(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_f64()
    }
}

// ---------------------------------------------------------------------------
// Matrix generators
// ---------------------------------------------------------------------------

/// The 4x4 system used throughout the docs:
///
/// ```text
/// [4 1 0 0]
/// [1 3 1 0]
/// [0 1 2 1]
/// [0 0 1 3]
/// ```
pub fn small_spd() -> SparseMatrix {
    SparseMatrix::from_triplets(
        4,
        &[0, 0, 1, 1, 1, 2, 2, 2, 3, 3],
        &[0, 1, 0, 1, 2, 1, 2, 3, 2, 3],
        &[4.0, 1.0, 1.0, 3.0, 1.0, 1.0, 2.0, 1.0, 1.0, 3.0],
    )
    .unwrap()
}

/// 1-D Laplacian `tridiag(-1, 2, -1)` plus `shift * I`.
pub fn shifted_laplacian(n: usize, shift: f64) -> SparseMatrix {
    let mut entries = Vec::with_capacity(3 * n);
    for i in 0..n {
        entries.push((i, i, 2.0 + shift));
        if i + 1 < n {
            entries.push((i, i + 1, -1.0));
            entries.push((i + 1, i, -1.0));
        }
    }
    SparseMatrix::from_coo(n, entries).unwrap()
}

/// Random strictly diagonally dominant symmetric matrix (hence SPD).
pub fn random_diag_dominant_spd(n: usize, density: f64, seed: u64) -> SparseMatrix {
    let mut rng = Lcg::new(seed);
    let mut off_diag_sum = vec![0.0f64; n];
    let mut entries = Vec::new();

    for i in 0..n {
        for j in (i + 1)..n {
            if rng.next_f64() < density {
                let val = rng.next_f64_range(-1.0, 1.0);
                entries.push((i, j, val));
                entries.push((j, i, val));
                off_diag_sum[i] += val.abs();
                off_diag_sum[j] += val.abs();
            }
        }
    }
    for (i, sum) in off_diag_sum.iter().enumerate() {
        entries.push((i, i, sum + 1.0 + rng.next_f64()));
    }

    SparseMatrix::from_coo(n, entries).unwrap()
}

/// Deterministic random vector of length `n`.
pub fn random_vector(n: usize, seed: u64) -> Vec<f64> {
    let mut rng = Lcg::new(seed);
    (0..n).map(|_| rng.next_f64_range(-1.0, 1.0)).collect()
}

/// A parallel backend that always dispatches to its pool.
pub fn pooled(threads: usize) -> ParallelBackend {
    ParallelBackend::new(&BackendConfig::with_threads(threads).sequential_cutoff(0)).unwrap()
}

// ---------------------------------------------------------------------------
// Dense reference solver
// ---------------------------------------------------------------------------

/// Solve `A x = b` with dense Gaussian elimination and partial pivoting.
///
/// # Panics
///
/// Panics if the matrix is singular or dimensions are inconsistent.
pub fn dense_solve(matrix: &SparseMatrix, rhs: &[f64]) -> Vec<f64> {
    let n = matrix.n();
    assert_eq!(rhs.len(), n, "rhs length must match matrix dimension");

    let mut aug = vec![vec![0.0f64; n + 1]; n];
    for i in 0..n {
        aug[i][n] = rhs[i];
        for (j, v) in matrix.row_entries(i) {
            aug[i][j] = v;
        }
    }

    for col in 0..n {
        let mut max_row = col;
        let mut max_val = aug[col][col].abs();
        for row in (col + 1)..n {
            if aug[row][col].abs() > max_val {
                max_val = aug[row][col].abs();
                max_row = row;
            }
        }
        assert!(max_val > 1e-15, "matrix is singular or near-singular");
        aug.swap(col, max_row);

        let pivot = aug[col][col];
        for row in (col + 1)..n {
            let factor = aug[row][col] / pivot;
            for j in col..=n {
                aug[row][j] -= factor * aug[col][j];
            }
        }
    }

    let mut x = vec![0.0f64; n];
    for i in (0..n).rev() {
        let mut sum = aug[i][n];
        for j in (i + 1)..n {
            sum -= aug[i][j] * x[j];
        }
        x[i] = sum / aug[i][i];
    }
    x
}

// ---------------------------------------------------------------------------
// Floating-point comparison utilities
// ---------------------------------------------------------------------------

pub fn l2_norm(v: &[f64]) -> f64 {
    v.iter().map(|&x| x * x).sum::<f64>().sqrt()
}

pub fn l2_distance(a: &[f64], b: &[f64]) -> f64 {
    assert_eq!(a.len(), b.len(), "vectors must have same length");
    a.iter()
        .zip(b.iter())
        .map(|(&ai, &bi)| (ai - bi) * (ai - bi))
        .sum::<f64>()
        .sqrt()
}

/// `||approx - exact|| / ||exact||`, or the absolute error when `exact` is
/// zero.
pub fn relative_error(approx: &[f64], exact: &[f64]) -> f64 {
    let exact_norm = l2_norm(exact);
    let error = l2_distance(approx, exact);
    if exact_norm > 1e-15 {
        error / exact_norm
    } else {
        error
    }
}

/// The true residual `b - A x`.
pub fn compute_residual(matrix: &SparseMatrix, x: &[f64], rhs: &[f64]) -> Vec<f64> {
    let mut ax = vec![0.0f64; matrix.n()];
    matrix.spmv(x, &mut ax);
    rhs.iter().zip(&ax).map(|(b, ax)| b - ax).collect()
}
