//! Single-threaded backend.

use super::{check_matvec, check_pair, Backend};
use crate::error::ValidationError;
use crate::matrix::SparseMatrix;
use crate::vector;

/// Runs every primitive on the calling thread, summing left to right.
///
/// Results are bit-reproducible across calls and processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequentialBackend;

impl SequentialBackend {
    /// Registry name.
    pub const NAME: &'static str = "sequential";

    /// Create the backend.
    pub fn new() -> Self {
        Self
    }
}

impl Backend for SequentialBackend {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn workers(&self) -> usize {
        1
    }

    fn matvec(&self, a: &SparseMatrix, x: &[f64], y: &mut [f64]) -> Result<(), ValidationError> {
        check_matvec(a, x, y)?;
        a.spmv(x, y);
        Ok(())
    }

    fn dot(&self, x: &[f64], y: &[f64]) -> Result<f64, ValidationError> {
        check_pair("dot", x, y)?;
        Ok(vector::dot(x, y))
    }

    fn axpy(&self, alpha: f64, x: &[f64], y: &mut [f64]) -> Result<(), ValidationError> {
        check_pair("axpy", x, y)?;
        vector::axpy(alpha, x, y);
        Ok(())
    }

    fn xpby(&self, x: &[f64], beta: f64, y: &mut [f64]) -> Result<(), ValidationError> {
        check_pair("xpby", x, y)?;
        vector::xpby(x, beta, y);
        Ok(())
    }

    fn scale(&self, alpha: f64, x: &mut [f64]) {
        vector::scale(alpha, x);
    }

    fn copy(&self, src: &[f64], dst: &mut [f64]) -> Result<(), ValidationError> {
        check_pair("copy", src, dst)?;
        dst.copy_from_slice(src);
        Ok(())
    }

    fn norm2(&self, x: &[f64]) -> f64 {
        vector::norm2(x)
    }
}
