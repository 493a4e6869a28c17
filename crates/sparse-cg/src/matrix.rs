//! Square sparse matrices in Compressed Sparse Row (CSR) form.
//!
//! [`SparseMatrix`] is built once from unordered coordinate (COO) triplets
//! and is immutable afterwards.
//!
//! # Layout
//!
//! For an `n x n` matrix with `nnz` stored entries:
//! - `row_ptr` has length `n + 1`, starts at 0 and ends at `nnz`
//! - `col_indices` and `values` each have length `nnz`
//! - Row `i` spans `row_ptr[i]..row_ptr[i + 1]`, with strictly increasing
//!   column indices
//!
//! # Construction
//!
//! Triplets are bucketed by row with a counting sort (O(nnz + n)), then each
//! row is stably sorted by column and duplicate `(row, col)` pairs are summed
//! in input order. The result therefore depends only on the input sequence,
//! never on hashing or unstable sorting.

use std::ops::Range;

use crate::error::ValidationError;
use crate::validation::{
    validate_csr_parts, validate_dimension, validate_entry_count, validate_triplets,
};
use crate::vector::DenseVector;

/// Immutable square CSR matrix of `f64` values.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseMatrix {
    n: usize,
    row_ptr: Vec<usize>,
    col_indices: Vec<usize>,
    values: Vec<f64>,
}

impl SparseMatrix {
    /// Build an `n x n` matrix from parallel triplet sequences.
    ///
    /// Duplicate `(row, col)` pairs are summed, not rejected.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::DimensionMismatch`] if the sequences differ in
    ///   length.
    /// - [`ValidationError::InvalidIndex`] if any row or column lies outside
    ///   `[0, n)`. No partial matrix is produced.
    /// - [`ValidationError::NonFiniteValue`] for NaN or infinite values.
    pub fn from_triplets(
        n: usize,
        rows: &[i32],
        cols: &[i32],
        vals: &[f64],
    ) -> Result<Self, ValidationError> {
        validate_dimension(n)?;
        validate_triplets(rows, cols, vals)?;

        let mut entries = Vec::with_capacity(vals.len());
        for (position, ((&r, &c), &v)) in rows.iter().zip(cols).zip(vals).enumerate() {
            let in_range = |i: i32| i >= 0 && (i as usize) < n;
            if !in_range(r) || !in_range(c) {
                return Err(ValidationError::InvalidIndex {
                    position,
                    row: r as i64,
                    col: c as i64,
                    n,
                });
            }
            entries.push((r as usize, c as usize, v));
        }

        Ok(Self::assemble(n, &entries))
    }

    /// Build an `n x n` matrix from `(row, col, value)` triplets.
    ///
    /// Same semantics as [`from_triplets`](Self::from_triplets), for callers
    /// that already hold `usize` indices.
    ///
    /// # Example
    ///
    /// ```
    /// use sparse_cg::SparseMatrix;
    ///
    /// let a = SparseMatrix::from_coo(2, vec![(0, 0, 2.0), (1, 1, 3.0), (0, 0, 1.0)]).unwrap();
    /// assert_eq!(a.nnz(), 2);
    /// assert_eq!(a.get(0, 0), 3.0);
    /// ```
    pub fn from_coo(
        n: usize,
        entries: impl IntoIterator<Item = (usize, usize, f64)>,
    ) -> Result<Self, ValidationError> {
        validate_dimension(n)?;
        let entries: Vec<(usize, usize, f64)> = entries.into_iter().collect();
        validate_entry_count(entries.len())?;

        for (position, &(r, c, v)) in entries.iter().enumerate() {
            if r >= n || c >= n {
                return Err(ValidationError::InvalidIndex {
                    position,
                    row: r as i64,
                    col: c as i64,
                    n,
                });
            }
            if !v.is_finite() {
                return Err(ValidationError::NonFiniteValue(format!(
                    "triplet {} ({}, {}) = {}",
                    position, r, c, v,
                )));
            }
        }

        Ok(Self::assemble(n, &entries))
    }

    /// Adopt already-compressed CSR arrays after validating every invariant.
    pub fn from_raw_parts(
        n: usize,
        row_ptr: Vec<usize>,
        col_indices: Vec<usize>,
        values: Vec<f64>,
    ) -> Result<Self, ValidationError> {
        validate_csr_parts(n, &row_ptr, &col_indices, &values)?;
        Ok(Self {
            n,
            row_ptr,
            col_indices,
            values,
        })
    }

    /// The `n x n` identity matrix.
    pub fn identity(n: usize) -> Self {
        Self {
            n,
            row_ptr: (0..=n).collect(),
            col_indices: (0..n).collect(),
            values: vec![1.0; n],
        }
    }

    /// Counting-sort assembly of pre-validated triplets.
    fn assemble(n: usize, entries: &[(usize, usize, f64)]) -> Self {
        let m = entries.len();

        // Pass 1: bucket sizes, then prefix sums into bucket starts.
        let mut bucket = vec![0usize; n + 1];
        for &(r, _, _) in entries {
            bucket[r + 1] += 1;
        }
        for i in 1..=n {
            bucket[i] += bucket[i - 1];
        }

        // Pass 2: stable scatter into row buckets.
        let mut cursor = bucket.clone();
        let mut scattered: Vec<(usize, f64)> = vec![(0, 0.0); m];
        for &(r, c, v) in entries {
            scattered[cursor[r]] = (c, v);
            cursor[r] += 1;
        }

        // Pass 3: per-row stable column sort and duplicate merge.
        let mut row_ptr = vec![0usize; n + 1];
        let mut col_indices = Vec::with_capacity(m);
        let mut values = Vec::with_capacity(m);
        for row in 0..n {
            let slot = &mut scattered[bucket[row]..bucket[row + 1]];
            slot.sort_by_key(|&(c, _)| c);

            let row_start = col_indices.len();
            for &(c, v) in slot.iter() {
                let repeated = col_indices.len() > row_start && col_indices.last() == Some(&c);
                if repeated {
                    if let Some(last) = values.last_mut() {
                        *last += v;
                    }
                } else {
                    col_indices.push(c);
                    values.push(v);
                }
            }
            row_ptr[row + 1] = col_indices.len();
        }

        Self {
            n,
            row_ptr,
            col_indices,
            values,
        }
    }

    /// Matrix dimension (rows = cols).
    #[inline]
    pub fn n(&self) -> usize {
        self.n
    }

    /// Number of stored entries.
    #[inline]
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Fraction of stored entries, `nnz / n^2` (0 for the empty matrix).
    pub fn density(&self) -> f64 {
        if self.n == 0 {
            0.0
        } else {
            self.nnz() as f64 / (self.n as f64 * self.n as f64)
        }
    }

    /// Row pointer array (length `n + 1`).
    #[inline]
    pub fn row_ptr(&self) -> &[usize] {
        &self.row_ptr
    }

    /// Column index of each stored entry.
    #[inline]
    pub fn col_indices(&self) -> &[usize] {
        &self.col_indices
    }

    /// Value of each stored entry.
    #[inline]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Storage range of `row` in `col_indices`/`values`.
    #[inline]
    pub fn row_range(&self, row: usize) -> Range<usize> {
        self.row_ptr[row]..self.row_ptr[row + 1]
    }

    /// Number of stored entries in `row`, in O(1).
    #[inline]
    pub fn row_degree(&self, row: usize) -> usize {
        self.row_ptr[row + 1] - self.row_ptr[row]
    }

    /// Iterate over `(col, value)` pairs of `row` in column order.
    pub fn row_entries(&self, row: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let range = self.row_range(row);
        self.col_indices[range.clone()]
            .iter()
            .copied()
            .zip(self.values[range].iter().copied())
    }

    /// Iterate over every stored `(row, col, value)` in row-major order.
    pub fn entries(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        (0..self.n).flat_map(move |row| self.row_entries(row).map(move |(c, v)| (row, c, v)))
    }

    /// Stored value at `(row, col)`, or 0 if absent.
    pub fn get(&self, row: usize, col: usize) -> f64 {
        let range = self.row_range(row);
        match self.col_indices[range.clone()].binary_search(&col) {
            Ok(offset) => self.values[range.start + offset],
            Err(_) => 0.0,
        }
    }

    /// The main diagonal as a dense vector.
    pub fn diagonal(&self) -> DenseVector {
        DenseVector::from_vec((0..self.n).map(|i| self.get(i, i)).collect())
    }

    /// `true` if `|a_ij - a_ji| <= tol * max(|a_ij|, |a_ji|)` for every
    /// stored entry.
    pub fn is_symmetric(&self, tol: f64) -> bool {
        self.entries().all(|(i, j, v)| {
            let t = self.get(j, i);
            (v - t).abs() <= tol * v.abs().max(t.abs())
        })
    }

    /// Sparse matrix-vector multiply `y = A x`.
    ///
    /// # Panics
    ///
    /// Debug-asserts that `x.len() == n` and `y.len() == n`.
    #[inline]
    pub fn spmv(&self, x: &[f64], y: &mut [f64]) {
        self.spmv_rows(0..self.n, x, y);
    }

    /// Multiply only `rows` of `A` by `x`, writing row `rows.start + k` into
    /// `y[k]`.
    ///
    /// Each output row reads only its own stored entries and the full `x`,
    /// so disjoint row ranges can be computed concurrently without
    /// synchronisation.
    #[inline]
    pub fn spmv_rows(&self, rows: Range<usize>, x: &[f64], y: &mut [f64]) {
        debug_assert_eq!(x.len(), self.n, "spmv: x.len()={} != n={}", x.len(), self.n);
        debug_assert_eq!(
            y.len(),
            rows.len(),
            "spmv: y.len()={} != row count {}",
            y.len(),
            rows.len(),
        );

        for (out, row) in y.iter_mut().zip(rows) {
            let mut sum = 0.0f64;
            for idx in self.row_ptr[row]..self.row_ptr[row + 1] {
                sum += self.values[idx] * x[self.col_indices[idx]];
            }
            *out = sum;
        }
    }
}
