//! Multi-threaded backend over a dedicated rayon pool.
//!
//! Every primitive splits `0..n` with [`partition`] into one contiguous
//! chunk per worker and spawns one task per chunk inside
//! [`rayon::ThreadPool::scope`]. The scope returns only after every task
//! has finished, which is the barrier between consecutive primitives.
//!
//! Element-wise primitives write disjoint output chunks obtained with
//! `split_at_mut`. Reductions store one partial per chunk in a fixed slot
//! and combine the partials with [`pairwise_sum`], so for a given
//! `(n, workers)` the result bits never depend on thread scheduling.

use std::ops::Range;

use tracing::debug;

use super::{check_matvec, check_pair, pairwise_sum, partition, Backend, BackendConfig};
use crate::error::{ConfigError, ValidationError};
use crate::matrix::SparseMatrix;
use crate::vector;

/// Chunked data-parallel backend owning its worker pool.
///
/// The pool is created once in [`ParallelBackend::new`] and reused by every
/// call; independent instances never share threads.
pub struct ParallelBackend {
    pool: rayon::ThreadPool,
    workers: usize,
    sequential_cutoff: usize,
}

impl std::fmt::Debug for ParallelBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParallelBackend")
            .field("workers", &self.workers)
            .field("sequential_cutoff", &self.sequential_cutoff)
            .finish()
    }
}

impl ParallelBackend {
    /// Registry name.
    pub const NAME: &'static str = "parallel";

    /// Build a backend with its own pool.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidSetting`] for an out-of-range thread count,
    /// [`ConfigError::ThreadPool`] if the OS refuses to spawn the workers.
    pub fn new(config: &BackendConfig) -> Result<Self, ConfigError> {
        let workers = config.resolved_threads()?;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("sparse-cg-worker-{i}"))
            .build()
            .map_err(|e| ConfigError::ThreadPool(e.to_string()))?;

        debug!(
            workers,
            sequential_cutoff = config.sequential_cutoff,
            "parallel backend: worker pool ready"
        );

        Ok(Self {
            pool,
            workers,
            sequential_cutoff: config.sequential_cutoff,
        })
    }

    /// Shorthand for a pool of `threads` workers with the default cutoff.
    pub fn with_threads(threads: usize) -> Result<Self, ConfigError> {
        Self::new(&BackendConfig::with_threads(threads))
    }

    /// Vector length below which chunks run inline.
    pub fn sequential_cutoff(&self) -> usize {
        self.sequential_cutoff
    }

    #[inline]
    fn inline(&self, n: usize) -> bool {
        self.workers == 1 || n < self.sequential_cutoff
    }

    /// Apply `f(range, out_chunk)` to each chunk of `out`.
    fn for_each_chunk<F>(&self, out: &mut [f64], f: F)
    where
        F: Fn(Range<usize>, &mut [f64]) + Sync,
    {
        let ranges = partition(out.len(), self.workers);

        if self.inline(out.len()) {
            for range in ranges {
                let chunk = &mut out[range.clone()];
                f(range, chunk);
            }
            return;
        }

        let f = &f;
        self.pool.scope(|s| {
            let mut rest: &mut [f64] = out;
            for range in ranges {
                let (chunk, tail) = std::mem::take(&mut rest).split_at_mut(range.len());
                rest = tail;
                s.spawn(move |_| f(range, chunk));
            }
        });
    }

    /// Evaluate `f(range)` per chunk of `0..n` and combine the partials.
    fn reduce_chunks<F>(&self, n: usize, f: F) -> f64
    where
        F: Fn(Range<usize>) -> f64 + Sync,
    {
        let ranges = partition(n, self.workers);
        let mut partials = vec![0.0f64; ranges.len()];

        if self.inline(n) {
            for (slot, range) in partials.iter_mut().zip(ranges) {
                *slot = f(range);
            }
        } else {
            let f = &f;
            self.pool.scope(|s| {
                for (slot, range) in partials.iter_mut().zip(ranges) {
                    s.spawn(move |_| *slot = f(range));
                }
            });
        }

        pairwise_sum(&partials)
    }
}

impl Backend for ParallelBackend {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn workers(&self) -> usize {
        self.workers
    }

    fn matvec(&self, a: &SparseMatrix, x: &[f64], y: &mut [f64]) -> Result<(), ValidationError> {
        check_matvec(a, x, y)?;
        self.for_each_chunk(y, |rows, chunk| a.spmv_rows(rows, x, chunk));
        Ok(())
    }

    fn dot(&self, x: &[f64], y: &[f64]) -> Result<f64, ValidationError> {
        check_pair("dot", x, y)?;
        Ok(self.reduce_chunks(x.len(), |r| vector::dot(&x[r.clone()], &y[r])))
    }

    fn axpy(&self, alpha: f64, x: &[f64], y: &mut [f64]) -> Result<(), ValidationError> {
        check_pair("axpy", x, y)?;
        self.for_each_chunk(y, |r, chunk| vector::axpy(alpha, &x[r], chunk));
        Ok(())
    }

    fn xpby(&self, x: &[f64], beta: f64, y: &mut [f64]) -> Result<(), ValidationError> {
        check_pair("xpby", x, y)?;
        self.for_each_chunk(y, |r, chunk| vector::xpby(&x[r], beta, chunk));
        Ok(())
    }

    fn scale(&self, alpha: f64, x: &mut [f64]) {
        self.for_each_chunk(x, |_, chunk| vector::scale(alpha, chunk));
    }

    fn copy(&self, src: &[f64], dst: &mut [f64]) -> Result<(), ValidationError> {
        check_pair("copy", src, dst)?;
        self.for_each_chunk(dst, |r, chunk| chunk.copy_from_slice(&src[r]));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SequentialBackend;

    fn pooled(threads: usize) -> ParallelBackend {
        ParallelBackend::new(&BackendConfig::with_threads(threads).sequential_cutoff(0)).unwrap()
    }

    fn ramp(n: usize) -> Vec<f64> {
        (0..n).map(|i| (i as f64 * 0.37).sin()).collect()
    }

    #[test]
    fn owns_requested_workers() {
        let be = pooled(3);
        assert_eq!(be.workers(), 3);
        assert_eq!(be.name(), "parallel");
        assert_eq!(be.sequential_cutoff(), 0);
    }

    #[test]
    fn elementwise_matches_sequential_exactly() {
        let be = pooled(4);
        let seq = SequentialBackend::new();
        let x = ramp(103);

        let mut y_par = ramp(103);
        let mut y_seq = y_par.clone();
        be.axpy(0.25, &x, &mut y_par).unwrap();
        seq.axpy(0.25, &x, &mut y_seq).unwrap();
        assert_eq!(y_par, y_seq);

        be.xpby(&x, 1.5, &mut y_par).unwrap();
        seq.xpby(&x, 1.5, &mut y_seq).unwrap();
        assert_eq!(y_par, y_seq);

        be.scale(-2.0, &mut y_par);
        seq.scale(-2.0, &mut y_seq);
        assert_eq!(y_par, y_seq);

        let mut dst = vec![0.0; 103];
        be.copy(&x, &mut dst).unwrap();
        assert_eq!(dst, x);
    }

    #[test]
    fn matvec_matches_sequential_exactly() {
        let n = 50;
        let mut entries = Vec::new();
        for i in 0..n {
            entries.push((i, i, 4.0));
            if i + 1 < n {
                entries.push((i, i + 1, -1.0));
                entries.push((i + 1, i, -1.0));
            }
        }
        let a = SparseMatrix::from_coo(n, entries).unwrap();
        let x = ramp(n);

        let mut y_par = vec![0.0; n];
        let mut y_seq = vec![0.0; n];
        pooled(3).matvec(&a, &x, &mut y_par).unwrap();
        SequentialBackend::new().matvec(&a, &x, &mut y_seq).unwrap();
        assert_eq!(y_par, y_seq);
    }

    #[test]
    fn dot_is_reproducible_for_fixed_workers() {
        let be = pooled(4);
        let x = ramp(1000);
        let y: Vec<f64> = x.iter().map(|v| v * 1.1 + 0.3).collect();
        let first = be.dot(&x, &y).unwrap();
        for _ in 0..20 {
            assert_eq!(be.dot(&x, &y).unwrap().to_bits(), first.to_bits());
        }
        let seq = SequentialBackend::new().dot(&x, &y).unwrap();
        assert!((first - seq).abs() <= 1e-12 * seq.abs().max(1.0));
    }

    #[test]
    fn default_config_dispatches_short_vectors_to_pool() {
        let be = ParallelBackend::new(&BackendConfig::with_threads(2)).unwrap();
        let mut out = vec![0.0; 64];
        be.for_each_chunk(&mut out, |_, chunk| {
            let on_pool = rayon::current_thread_index().is_some();
            chunk.fill(if on_pool { 1.0 } else { -1.0 });
        });
        assert!(out.iter().all(|&v| v == 1.0), "{out:?}");

        let inline = ParallelBackend::new(&BackendConfig::with_threads(2).sequential_cutoff(65)).unwrap();
        inline.for_each_chunk(&mut out, |_, chunk| {
            let on_pool = rayon::current_thread_index().is_some();
            chunk.fill(if on_pool { 1.0 } else { -1.0 });
        });
        assert!(out.iter().all(|&v| v == -1.0), "{out:?}");
    }

    #[test]
    fn inline_and_pooled_paths_agree_bitwise() {
        let x = ramp(257);
        let pool_path = pooled(4).dot(&x, &x).unwrap();
        let inline_path = ParallelBackend::new(&BackendConfig::with_threads(4).sequential_cutoff(10_000))
            .unwrap()
            .dot(&x, &x)
            .unwrap();
        assert_eq!(pool_path.to_bits(), inline_path.to_bits());
    }

    #[test]
    fn single_worker_equals_sequential_bits() {
        let x = ramp(64);
        let par = pooled(1).dot(&x, &x).unwrap();
        let seq = SequentialBackend::new().dot(&x, &x).unwrap();
        assert_eq!(par.to_bits(), seq.to_bits());
    }

    #[test]
    fn fewer_elements_than_workers() {
        let be = pooled(8);
        assert_eq!(be.dot(&[1.0, 2.0], &[3.0, 4.0]).unwrap(), 11.0);
        assert_eq!(be.dot(&[], &[]).unwrap(), 0.0);
        let mut y = [1.0];
        be.axpy(2.0, &[1.0], &mut y).unwrap();
        assert_eq!(y, [3.0]);
    }

    #[test]
    fn mismatch_is_rejected() {
        let be = pooled(2);
        let mut y = vec![0.0; 4];
        assert!(matches!(
            be.copy(&[1.0; 5], &mut y),
            Err(ValidationError::DimensionMismatch(_))
        ));
    }
}
