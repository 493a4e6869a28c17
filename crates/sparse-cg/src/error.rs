//! Error types for the solver crate.
//!
//! Construction and configuration problems ([`ValidationError`],
//! [`ConfigError`]) are raised before any iteration starts. Numerical
//! failures ([`SolverError::Breakdown`], [`SolverError::Unstable`]) abort a
//! solve mid-iteration and carry the partial iteration count and the last
//! finite residual for diagnostics (NaN if the starting residual overflowed).
//! Running out of iterations is *not* an error; see
//! [`SolveStatus`](crate::types::SolveStatus).

/// Primary error type for solver operations.
#[derive(Debug, thiserror::Error)]
pub enum SolverError {
    /// The caller supplied invalid input (indices, dimensions, parameters).
    #[error("invalid input: {0}")]
    InvalidInput(#[from] ValidationError),

    /// Backend selection or construction failed.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The CG curvature `u . A u` was non-positive or negligible.
    ///
    /// Signals that the matrix is not SPD, or is numerically singular along
    /// the current search direction.
    #[error(
        "CG breakdown at iteration {iteration}: u.Au = {denominator:.6e} \
         (residual={residual:.6e}); matrix may not be SPD"
    )]
    Breakdown {
        /// Iterations completed before the breakdown was detected.
        iteration: usize,
        /// The offending curvature value `dot(u, A u)`.
        denominator: f64,
        /// Last finite residual norm.
        residual: f64,
    },

    /// A NaN or infinity appeared in the residual.
    #[error("numerical instability at iteration {iteration} (last finite residual={residual:.6e})")]
    Unstable {
        /// Iterations completed before the instability was detected.
        iteration: usize,
        /// Last finite residual norm, or NaN when the initial residual
        /// `b - A x0` was already non-finite.
        residual: f64,
    },
}

impl SolverError {
    /// Iteration count carried by mid-solve failures, `None` otherwise.
    pub fn iteration(&self) -> Option<usize> {
        match self {
            SolverError::Breakdown { iteration, .. } | SolverError::Unstable { iteration, .. } => {
                Some(*iteration)
            }
            _ => None,
        }
    }
}

/// Validation errors for solver inputs.
///
/// These are raised eagerly so that callers get clear diagnostics rather
/// than mysterious numerical failures.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// A coordinate triplet addresses a row or column outside `[0, n)`.
    #[error("triplet {position}: index ({row}, {col}) out of bounds for dimension {n}")]
    InvalidIndex {
        /// Position of the offending triplet in the input sequence.
        position: usize,
        /// Row index as supplied.
        row: i64,
        /// Column index as supplied.
        col: i64,
        /// Matrix dimension.
        n: usize,
    },

    /// Lengths are inconsistent (vector vs matrix, triplet arrays, CSR parts).
    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// A value is NaN or infinite where a finite number is required.
    #[error("non-finite value detected: {0}")]
    NonFiniteValue(String),

    /// The `row_ptr` array is not monotonically non-decreasing.
    #[error("row_ptr is not monotonically non-decreasing at position {position}")]
    NonMonotonicRowPtrs {
        /// Position in `row_ptr` where the violation was detected.
        position: usize,
    },

    /// Column indices within a row are not strictly increasing.
    #[error("column indices of row {row} are unsorted or repeated at position {position}")]
    UnsortedColumns {
        /// Offending row.
        row: usize,
        /// Position in `col_indices` where the violation was detected.
        position: usize,
    },

    /// A parameter is outside its valid range.
    #[error("parameter out of range: {name} = {value} (expected {expected})")]
    ParameterOutOfRange {
        /// Name of the parameter.
        name: String,
        /// The invalid value, formatted.
        value: String,
        /// Human-readable description of the valid range.
        expected: String,
    },

    /// Matrix size exceeds the implementation limit.
    #[error("matrix size {rows}x{cols} exceeds maximum supported {max_dim}x{max_dim}")]
    MatrixTooLarge {
        /// Number of rows.
        rows: usize,
        /// Number of columns.
        cols: usize,
        /// Maximum supported dimension.
        max_dim: usize,
    },

    /// More stored entries than the implementation limit.
    #[error("{count} entries exceed maximum supported {max}")]
    TooManyEntries {
        /// Number of entries supplied.
        count: usize,
        /// Maximum supported entry count.
        max: usize,
    },
}

/// Errors from the backend registry and backend construction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// No backend is registered under the requested name.
    #[error("unknown backend '{name}' (available: {available})")]
    UnknownBackend {
        /// Requested name.
        name: String,
        /// Comma-separated list of registered names.
        available: String,
    },

    /// A factory was registered twice under the same name.
    #[error("backend '{0}' is already registered")]
    DuplicateBackend(String),

    /// The process-wide registry was already initialised.
    #[error("backend registry is already initialised")]
    AlreadyInitialized,

    /// The worker pool could not be created.
    #[error("failed to build worker pool: {0}")]
    ThreadPool(String),

    /// A backend setting is invalid.
    #[error("invalid backend setting: {0}")]
    InvalidSetting(String),
}

/// Errors raised while reading Matrix Market files.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The banner or size line is malformed or unsupported.
    #[error("line {line}: bad header: {detail}")]
    Header {
        /// 1-based line number.
        line: usize,
        /// What went wrong.
        detail: String,
    },

    /// A coordinate entry is malformed.
    #[error("line {line}: bad entry: {detail}")]
    Entry {
        /// 1-based line number.
        line: usize,
        /// What went wrong.
        detail: String,
    },

    /// The parsed entries do not form a valid matrix.
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}
