//! Dense `f64` vectors and the slice kernels behind every backend.
//!
//! The free functions in this module operate on plain slices and are the
//! single source of truth for the arithmetic: the sequential backend calls
//! them on whole vectors, the parallel backend calls them on contiguous
//! chunks. All reductions sum strictly left to right, so a given slice always
//! produces the same bits.

use std::ops::{Deref, DerefMut};

// ---------------------------------------------------------------------------
// Slice kernels
// ---------------------------------------------------------------------------

/// Dot product `sum_i x[i] * y[i]`, accumulated left to right.
///
/// # Panics
///
/// Debug-asserts that `x.len() == y.len()`.
#[inline]
pub fn dot(x: &[f64], y: &[f64]) -> f64 {
    debug_assert_eq!(x.len(), y.len(), "dot: length mismatch");
    let mut sum = 0.0f64;
    for (xi, yi) in x.iter().zip(y.iter()) {
        sum += xi * yi;
    }
    sum
}

/// `y[i] += alpha * x[i]`.
#[inline]
pub fn axpy(alpha: f64, x: &[f64], y: &mut [f64]) {
    debug_assert_eq!(x.len(), y.len(), "axpy: length mismatch");
    for (xi, yi) in x.iter().zip(y.iter_mut()) {
        *yi += alpha * xi;
    }
}

/// `y[i] = x[i] + beta * y[i]`.
#[inline]
pub fn xpby(x: &[f64], beta: f64, y: &mut [f64]) {
    debug_assert_eq!(x.len(), y.len(), "xpby: length mismatch");
    for (xi, yi) in x.iter().zip(y.iter_mut()) {
        *yi = xi + beta * *yi;
    }
}

/// `x[i] *= alpha`.
#[inline]
pub fn scale(alpha: f64, x: &mut [f64]) {
    for xi in x.iter_mut() {
        *xi *= alpha;
    }
}

/// Euclidean norm `sqrt(dot(x, x))`.
#[inline]
pub fn norm2(x: &[f64]) -> f64 {
    dot(x, x).sqrt()
}

// ---------------------------------------------------------------------------
// DenseVector
// ---------------------------------------------------------------------------

/// A fixed-length, contiguous `f64` buffer.
///
/// The length is fixed at construction; backend primitives mutate the
/// contents in place. `DenseVector` derefs to `[f64]` so the slice kernels
/// above and standard slice methods apply directly.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DenseVector {
    data: Vec<f64>,
}

impl DenseVector {
    /// A zero vector of length `n`.
    pub fn zeros(n: usize) -> Self {
        Self { data: vec![0.0; n] }
    }

    /// A vector of length `n` with every entry set to `value`.
    pub fn filled(n: usize, value: f64) -> Self {
        Self {
            data: vec![value; n],
        }
    }

    /// Wrap an existing buffer without copying.
    pub fn from_vec(data: Vec<f64>) -> Self {
        Self { data }
    }

    /// Number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// `true` for the zero-length vector.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Borrow the entries.
    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Borrow the entries mutably.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// Unwrap into the underlying buffer.
    pub fn into_vec(self) -> Vec<f64> {
        self.data
    }

    /// Set every entry to `value`.
    pub fn fill(&mut self, value: f64) {
        self.data.fill(value);
    }

    /// Sequential dot product with `other`.
    pub fn dot(&self, other: &DenseVector) -> f64 {
        dot(&self.data, &other.data)
    }

    /// Sequential Euclidean norm.
    pub fn norm2(&self) -> f64 {
        norm2(&self.data)
    }

    /// `true` if every entry is finite.
    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|v| v.is_finite())
    }
}

impl From<Vec<f64>> for DenseVector {
    fn from(data: Vec<f64>) -> Self {
        Self::from_vec(data)
    }
}

impl From<&[f64]> for DenseVector {
    fn from(data: &[f64]) -> Self {
        Self {
            data: data.to_vec(),
        }
    }
}

impl Deref for DenseVector {
    type Target = [f64];

    fn deref(&self) -> &[f64] {
        &self.data
    }
}

impl DerefMut for DenseVector {
    fn deref_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }
}
