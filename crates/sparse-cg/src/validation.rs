//! Input validation for matrix construction and solver calls.
//!
//! All checks run eagerly, before any matrix is produced or any iteration
//! starts. Every function returns [`ValidationError`], which converts into
//! [`SolverError::InvalidInput`](crate::error::SolverError::InvalidInput)
//! via `From`.
//!
//! # Limits
//!
//! | Resource      | Limit                  | Constant          |
//! |---------------|------------------------|-------------------|
//! | Dimension     | 10,000,000             | [`MAX_NODES`]     |
//! | Stored nnz    | 100,000,000            | [`MAX_EDGES`]     |
//! | Iterations    | 1,000,000              | [`MAX_ITERATIONS`]|

use crate::error::ValidationError;

/// Maximum matrix dimension.
pub const MAX_NODES: usize = 10_000_000;

/// Maximum number of stored entries (triplets before merging).
pub const MAX_EDGES: usize = 100_000_000;

/// Maximum solver iterations to prevent runaway computation.
pub const MAX_ITERATIONS: usize = 1_000_000;

/// Check that `n` is within [`MAX_NODES`].
pub fn validate_dimension(n: usize) -> Result<(), ValidationError> {
    if n > MAX_NODES {
        return Err(ValidationError::MatrixTooLarge {
            rows: n,
            cols: n,
            max_dim: MAX_NODES,
        });
    }
    Ok(())
}

/// Check that `count` stored entries stay within [`MAX_EDGES`].
pub fn validate_entry_count(count: usize) -> Result<(), ValidationError> {
    if count > MAX_EDGES {
        return Err(ValidationError::TooManyEntries {
            count,
            max: MAX_EDGES,
        });
    }
    Ok(())
}

/// Check that the three triplet sequences have equal length within
/// [`MAX_EDGES`], and that every value is finite.
pub fn validate_triplets(rows: &[i32], cols: &[i32], vals: &[f64]) -> Result<(), ValidationError> {
    if rows.len() != cols.len() || rows.len() != vals.len() {
        return Err(ValidationError::DimensionMismatch(format!(
            "triplet sequences differ in length: rows={}, cols={}, vals={}",
            rows.len(),
            cols.len(),
            vals.len(),
        )));
    }
    validate_entry_count(vals.len())?;
    for (i, v) in vals.iter().enumerate() {
        if !v.is_finite() {
            return Err(ValidationError::NonFiniteValue(format!(
                "triplet {} ({}, {}) = {}",
                i, rows[i], cols[i], v,
            )));
        }
    }
    Ok(())
}

/// Validate the structural integrity of raw CSR parts for an `n x n` matrix.
///
/// Checks, in order:
///
/// 1. `n` is within [`MAX_NODES`].
/// 2. `row_ptr.len() == n + 1`, `row_ptr[0] == 0`, `row_ptr[n] == nnz`.
/// 3. `row_ptr` is non-decreasing.
/// 4. `col_indices.len() == values.len()`.
/// 5. Column indices are in `[0, n)` and strictly increasing within a row.
/// 6. No `NaN` or `Inf` in `values`.
///
/// # Errors
///
/// Returns [`ValidationError`] describing the first violation found.
pub fn validate_csr_parts(
    n: usize,
    row_ptr: &[usize],
    col_indices: &[usize],
    values: &[f64],
) -> Result<(), ValidationError> {
    validate_dimension(n)?;

    if row_ptr.len() != n + 1 {
        return Err(ValidationError::DimensionMismatch(format!(
            "row_ptr length {} does not equal n + 1 = {}",
            row_ptr.len(),
            n + 1,
        )));
    }
    if row_ptr[0] != 0 {
        return Err(ValidationError::DimensionMismatch(format!(
            "row_ptr[0] = {} (expected 0)",
            row_ptr[0],
        )));
    }
    for i in 1..row_ptr.len() {
        if row_ptr[i] < row_ptr[i - 1] {
            return Err(ValidationError::NonMonotonicRowPtrs { position: i });
        }
    }

    let nnz = values.len();
    if col_indices.len() != nnz {
        return Err(ValidationError::DimensionMismatch(format!(
            "col_indices length {} does not match values length {}",
            col_indices.len(),
            nnz,
        )));
    }
    if row_ptr[n] != nnz {
        return Err(ValidationError::DimensionMismatch(format!(
            "values length {} does not match row_ptr[n] = {}",
            nnz, row_ptr[n],
        )));
    }

    for row in 0..n {
        let mut prev: Option<usize> = None;
        for idx in row_ptr[row]..row_ptr[row + 1] {
            let col = col_indices[idx];
            if col >= n {
                return Err(ValidationError::InvalidIndex {
                    position: idx,
                    row: row as i64,
                    col: col as i64,
                    n,
                });
            }
            if prev.map_or(false, |p| col <= p) {
                return Err(ValidationError::UnsortedColumns { row, position: idx });
            }
            prev = Some(col);

            let val = values[idx];
            if !val.is_finite() {
                return Err(ValidationError::NonFiniteValue(format!(
                    "matrix[{}, {}] = {}",
                    row, col, val,
                )));
            }
        }
    }

    Ok(())
}

/// Check that a vector named `name` has the expected length.
pub fn validate_length(name: &str, len: usize, expected: usize) -> Result<(), ValidationError> {
    if len != expected {
        return Err(ValidationError::DimensionMismatch(format!(
            "{name} length {len} does not match matrix dimension {expected}",
        )));
    }
    Ok(())
}

/// Check that a vector has the expected length and only finite entries.
///
/// An all-zero vector is valid but emits a [`tracing::debug`] event, since
/// the solve is then trivial.
pub fn validate_vector(name: &str, v: &[f64], expected: usize) -> Result<(), ValidationError> {
    validate_length(name, v.len(), expected)?;
    let mut all_zero = true;
    for (i, &x) in v.iter().enumerate() {
        if !x.is_finite() {
            return Err(ValidationError::NonFiniteValue(format!("{name}[{i}] = {x}")));
        }
        if x != 0.0 {
            all_zero = false;
        }
    }
    if all_zero && !v.is_empty() {
        tracing::debug!(vector = name, "vector is all zeros");
    }
    Ok(())
}

/// Validate solver convergence parameters.
///
/// - `tolerance` must be finite and in `(0.0, 1.0]`.
/// - `max_iterations` must be in `[1, MAX_ITERATIONS]`.
pub fn validate_params(tolerance: f64, max_iterations: usize) -> Result<(), ValidationError> {
    if !tolerance.is_finite() || tolerance <= 0.0 || tolerance > 1.0 {
        return Err(ValidationError::ParameterOutOfRange {
            name: "tolerance".into(),
            value: format!("{tolerance:.2e}"),
            expected: "(0.0, 1.0]".into(),
        });
    }

    if max_iterations == 0 || max_iterations > MAX_ITERATIONS {
        return Err(ValidationError::ParameterOutOfRange {
            name: "max_iterations".into(),
            value: max_iterations.to_string(),
            expected: format!("[1, {}]", MAX_ITERATIONS),
        });
    }

    Ok(())
}
