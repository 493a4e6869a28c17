//! Execution backends for the vector and matrix primitives used by CG.
//!
//! A [`Backend`] decides *how* each primitive runs; the arithmetic itself
//! lives in the slice kernels of [`crate::vector`] and in
//! [`SparseMatrix::spmv_rows`]. Two backends ship with the crate:
//!
//! | Name           | Type                   | Reduction order                      |
//! |----------------|------------------------|--------------------------------------|
//! | `"sequential"` | [`SequentialBackend`]  | strictly left to right               |
//! | `"parallel"`   | [`ParallelBackend`]    | per-chunk left to right, then a fixed pairwise tree |
//!
//! Backends are looked up by name through [`crate::registry`].

mod parallel;
mod sequential;

pub use parallel::ParallelBackend;
pub use sequential::SequentialBackend;

use std::ops::Range;

use crate::error::{ConfigError, ValidationError};
use crate::matrix::SparseMatrix;
use crate::validation::validate_length;

/// Upper bound on explicitly requested worker threads.
pub const MAX_THREADS: usize = 1024;

/// Default vector length below which [`ParallelBackend`] evaluates its
/// chunks inline on the calling thread. Zero sends every call to the pool;
/// raise it to skip dispatch overhead on short vectors.
pub const DEFAULT_SEQUENTIAL_CUTOFF: usize = 0;

// ---------------------------------------------------------------------------
// Backend trait
// ---------------------------------------------------------------------------

/// Strategy for executing the CG primitives.
///
/// Implementations hold no matrix or vector data between calls. Every call
/// is synchronous: when it returns, all output has been written.
///
/// # Errors
///
/// Primitives with more than one operand return
/// [`ValidationError::DimensionMismatch`] when lengths disagree, before
/// touching any output.
pub trait Backend: Send + Sync {
    /// Registry name of this backend.
    fn name(&self) -> &str;

    /// Number of workers a primitive may be split across.
    fn workers(&self) -> usize;

    /// `y <- A x`.
    fn matvec(&self, a: &SparseMatrix, x: &[f64], y: &mut [f64]) -> Result<(), ValidationError>;

    /// `x . y`.
    fn dot(&self, x: &[f64], y: &[f64]) -> Result<f64, ValidationError>;

    /// `y <- y + alpha x`.
    fn axpy(&self, alpha: f64, x: &[f64], y: &mut [f64]) -> Result<(), ValidationError>;

    /// `y <- x + beta y`.
    fn xpby(&self, x: &[f64], beta: f64, y: &mut [f64]) -> Result<(), ValidationError>;

    /// `x <- alpha x`.
    fn scale(&self, alpha: f64, x: &mut [f64]);

    /// `dst <- src`.
    fn copy(&self, src: &[f64], dst: &mut [f64]) -> Result<(), ValidationError>;

    /// `sqrt(x . x)`, reduced in the same order as [`Backend::dot`].
    fn norm2(&self, x: &[f64]) -> f64 {
        self.dot(x, x).map(f64::sqrt).unwrap_or(f64::NAN)
    }
}

impl std::fmt::Debug for dyn Backend + '_ {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backend")
            .field("name", &self.name())
            .field("workers", &self.workers())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// BackendConfig
// ---------------------------------------------------------------------------

/// Construction parameters handed to backend factories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    /// Worker threads for parallel backends; `0` selects the number of
    /// logical CPUs.
    pub threads: usize,
    /// Vectors shorter than this are processed inline by parallel backends.
    pub sequential_cutoff: usize,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            threads: 0,
            sequential_cutoff: DEFAULT_SEQUENTIAL_CUTOFF,
        }
    }
}

impl BackendConfig {
    /// Config with an explicit thread count and the default cutoff.
    pub fn with_threads(threads: usize) -> Self {
        Self {
            threads,
            ..Self::default()
        }
    }

    /// Builder-style setter for `sequential_cutoff`.
    pub fn sequential_cutoff(mut self, cutoff: usize) -> Self {
        self.sequential_cutoff = cutoff;
        self
    }

    /// Effective worker count.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidSetting`] if `threads` exceeds [`MAX_THREADS`].
    pub fn resolved_threads(&self) -> Result<usize, ConfigError> {
        match self.threads {
            0 => Ok(num_cpus::get().max(1)),
            t if t > MAX_THREADS => Err(ConfigError::InvalidSetting(format!(
                "threads = {t} exceeds maximum {MAX_THREADS}"
            ))),
            t => Ok(t),
        }
    }
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Split `0..n` into at most `parts` contiguous, near-equal ranges.
///
/// The first `n % parts` ranges hold one extra element. At least one range
/// is always returned, so `n == 0` yields `[0..0]`.
pub fn partition(n: usize, parts: usize) -> Vec<Range<usize>> {
    let parts = parts.clamp(1, n.max(1));
    let base = n / parts;
    let extra = n % parts;

    let mut ranges = Vec::with_capacity(parts);
    let mut start = 0;
    for i in 0..parts {
        let len = base + usize::from(i < extra);
        ranges.push(start..start + len);
        start += len;
    }
    ranges
}

/// Sum `values` by recursive halving.
///
/// The tree shape depends only on `values.len()`, so equal inputs always
/// produce equal bits.
pub fn pairwise_sum(values: &[f64]) -> f64 {
    match values.len() {
        0 => 0.0,
        1 => values[0],
        len => {
            let (left, right) = values.split_at(len / 2);
            pairwise_sum(left) + pairwise_sum(right)
        }
    }
}

pub(crate) fn check_pair(op: &str, x: &[f64], y: &[f64]) -> Result<(), ValidationError> {
    if x.len() != y.len() {
        return Err(ValidationError::DimensionMismatch(format!(
            "{op}: operand lengths {} and {} differ",
            x.len(),
            y.len(),
        )));
    }
    Ok(())
}

pub(crate) fn check_matvec(a: &SparseMatrix, x: &[f64], y: &[f64]) -> Result<(), ValidationError> {
    validate_length("x", x.len(), a.n())?;
    validate_length("y", y.len(), a.n())
}
