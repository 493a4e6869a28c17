//! Conjugate Gradient solver for symmetric positive-definite systems.
//!
//! Solves `A x = b` for a sparse SPD matrix `A`, starting from the caller's
//! `x` and running every vector and matrix primitive through a
//! [`Backend`]. The solver itself is a single-threaded orchestrator: it
//! issues one primitive at a time, and any parallelism lives inside the
//! backend call.
//!
//! # Algorithm
//!
//! ```text
//! r = b - A x
//! u = r
//! rr = r . r
//!
//! for k in 0..max_iterations:
//!     tmp = A u
//!     denom = u . tmp            (breakdown if denom <= eps * rr)
//!     alpha = rr / denom
//!     x = x + alpha u
//!     r = r - alpha tmp
//!     rr_new = r . r             (unstable if NaN or Inf)
//!     if sqrt(rr_new) <= tol * ||b||: converged
//!     beta = rr_new / rr
//!     u = r + beta u
//!     rr = rr_new
//! ```
//!
//! # Terminal states
//!
//! | Outcome                 | Returned as                             |
//! |-------------------------|-----------------------------------------|
//! | residual below target   | `Ok`, [`SolveStatus::Converged`]        |
//! | iterations exhausted    | `Ok`, [`SolveStatus::MaxIterReached`]   |
//! | cancel token triggered  | `Ok`, [`SolveStatus::Cancelled`]        |
//! | deadline elapsed        | `Ok`, [`SolveStatus::DeadlineExceeded`] |
//! | `denom <= eps * rr`     | `Err`, [`SolverError::Breakdown`]       |
//! | NaN or Inf residual     | `Err`, [`SolverError::Unstable`]        |
//!
//! Cancellation and the deadline are checked only at the start of an
//! iteration, never inside a primitive.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, trace, warn};

use crate::backend::Backend;
use crate::error::SolverError;
use crate::matrix::SparseMatrix;
use crate::types::{ConvergenceInfo, SolveOptions, SolveStatus, SolverResult};
use crate::validation::{validate_length, validate_params, validate_vector};
use crate::vector::DenseVector;

// ---------------------------------------------------------------------------
// CancelToken
// ---------------------------------------------------------------------------

/// Shared flag that asks a running solve to stop at its next iteration.
///
/// Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// A token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// `true` once [`cancel`](Self::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Clear the flag so the token can be reused.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::Release);
    }
}

// ---------------------------------------------------------------------------
// CgWorkspace
// ---------------------------------------------------------------------------

/// Working buffers for one solve: residual `r`, search direction `u` and
/// the matvec scratch `tmp`.
///
/// Taken by `&mut` in [`CgSolver::solve`], so a workspace can never back
/// two solves at once. It can be reused across solves of the same size.
#[derive(Debug, Clone)]
pub struct CgWorkspace {
    r: DenseVector,
    u: DenseVector,
    tmp: DenseVector,
}

impl CgWorkspace {
    /// Zeroed buffers of length `n`.
    pub fn new(n: usize) -> Self {
        Self {
            r: DenseVector::zeros(n),
            u: DenseVector::zeros(n),
            tmp: DenseVector::zeros(n),
        }
    }

    /// Buffer length.
    pub fn len(&self) -> usize {
        self.r.len()
    }

    /// `true` for a zero-length workspace.
    pub fn is_empty(&self) -> bool {
        self.r.is_empty()
    }

    /// Residual left by the last solve.
    pub fn residual(&self) -> &[f64] {
        &self.r
    }

    /// Search direction left by the last solve.
    pub fn direction(&self) -> &[f64] {
        &self.u
    }
}

// ---------------------------------------------------------------------------
// CgSolver
// ---------------------------------------------------------------------------

/// Conjugate Gradient driver bound to a backend.
#[derive(Debug, Clone)]
pub struct CgSolver<'a> {
    backend: &'a dyn Backend,
    cancel: Option<CancelToken>,
}

impl<'a> CgSolver<'a> {
    /// Create a solver that runs its primitives on `backend`.
    pub fn new(backend: &'a dyn Backend) -> Self {
        Self {
            backend,
            cancel: None,
        }
    }

    /// Attach a cancellation token checked at the start of each iteration.
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// The backend executing the primitives.
    pub fn backend(&self) -> &'a dyn Backend {
        self.backend
    }

    /// Solve `A x = b` starting from `x0 = 0`, allocating the solution and
    /// workspace.
    ///
    /// # Errors
    ///
    /// Same as [`solve`](Self::solve).
    pub fn solve_from(
        &self,
        a: &SparseMatrix,
        b: &[f64],
        options: &SolveOptions,
    ) -> Result<(DenseVector, SolverResult), SolverError> {
        let mut x = DenseVector::zeros(a.n());
        let mut workspace = CgWorkspace::new(a.n());
        let result = self.solve(a, b, &mut x, &mut workspace, options)?;
        Ok((x, result))
    }

    /// Solve `A x = b`, using the incoming `x` as the initial guess and
    /// overwriting it with the final iterate.
    ///
    /// # Errors
    ///
    /// - [`SolverError::InvalidInput`] for mismatched lengths, non-finite
    ///   inputs, or out-of-range options. Nothing is modified.
    /// - [`SolverError::Breakdown`] when the curvature `u . A u` is
    ///   non-positive or negligible (the matrix is not SPD).
    /// - [`SolverError::Unstable`] when the residual becomes NaN or infinite.
    ///
    /// On either numerical error, `x` holds the last iterate.
    pub fn solve(
        &self,
        a: &SparseMatrix,
        b: &[f64],
        x: &mut [f64],
        workspace: &mut CgWorkspace,
        options: &SolveOptions,
    ) -> Result<SolverResult, SolverError> {
        let start = Instant::now();
        let n = a.n();

        validate_params(options.tolerance, options.max_iterations)?;
        validate_vector("b", b, n)?;
        validate_vector("x", x, n)?;
        validate_length("workspace", workspace.len(), n)?;

        let backend = self.backend;
        let CgWorkspace { r, u, tmp } = workspace;

        // --- r = b - A x ---
        backend.matvec(a, x, tmp)?;
        backend.copy(b, r)?;
        backend.axpy(-1.0, tmp, r)?;

        // --- u = r ---
        backend.copy(r, u)?;

        let mut rr = backend.dot(r, r)?;
        let mut b_norm = backend.norm2(b);
        if b_norm < f64::EPSILON {
            b_norm = 1.0;
        }
        let threshold = options.tolerance * b_norm;

        debug!(
            backend = backend.name(),
            workers = backend.workers(),
            n,
            nnz = a.nnz(),
            tol = options.tolerance,
            max_iter = options.max_iterations,
            "CG: starting solve"
        );

        if !rr.is_finite() {
            warn!(rr, "CG: initial residual is not finite");
            return Err(SolverError::Unstable {
                iteration: 0,
                residual: f64::NAN,
            });
        }

        let mut history = Vec::new();
        let mut residual = rr.sqrt();

        if residual <= threshold {
            debug!(residual, "CG: initial guess already satisfies tolerance");
            return Ok(self.finish(0, residual, SolveStatus::Converged, history, options, start));
        }

        for k in 0..options.max_iterations {
            if let Some(status) = self.interrupted(options, start) {
                return Ok(self.finish(k, residual, status, history, options, start));
            }

            // --- tmp = A u ---
            backend.matvec(a, u, tmp)?;

            // --- denom = u . A u ---
            let denom = backend.dot(u, tmp)?;
            if denom.is_nan() || denom <= f64::EPSILON * rr {
                warn!(
                    iteration = k,
                    denom,
                    rr,
                    "CG: breakdown, u.Au is non-positive or negligible"
                );
                return Err(SolverError::Breakdown {
                    iteration: k,
                    denominator: denom,
                    residual,
                });
            }

            let alpha = rr / denom;

            // --- x = x + alpha u, r = r - alpha A u ---
            backend.axpy(alpha, u, x)?;
            backend.axpy(-alpha, tmp, r)?;

            let rr_new = backend.dot(r, r)?;
            if !rr_new.is_finite() {
                warn!(iteration = k, rr_new, "CG: residual is not finite");
                return Err(SolverError::Unstable {
                    iteration: k,
                    residual,
                });
            }

            residual = rr_new.sqrt();
            let iteration = k + 1;
            if options.record_history {
                history.push(ConvergenceInfo {
                    iteration,
                    residual_norm: residual,
                });
            }

            if options.verbose >= 2 {
                info!(iteration, residual, rel = residual / b_norm, "CG iteration");
            } else {
                trace!(iteration, residual, rel = residual / b_norm, "CG iteration");
            }

            if residual <= threshold {
                return Ok(self.finish(
                    iteration,
                    residual,
                    SolveStatus::Converged,
                    history,
                    options,
                    start,
                ));
            }

            // --- u = r + beta u ---
            let beta = rr_new / rr;
            backend.xpby(r, beta, u)?;
            rr = rr_new;
        }

        Ok(self.finish(
            options.max_iterations,
            residual,
            SolveStatus::MaxIterReached,
            history,
            options,
            start,
        ))
    }

    /// Cancellation or deadline status, if either applies.
    fn interrupted(&self, options: &SolveOptions, start: Instant) -> Option<SolveStatus> {
        if self.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
            return Some(SolveStatus::Cancelled);
        }
        match options.deadline {
            Some(limit) if start.elapsed() >= limit => Some(SolveStatus::DeadlineExceeded),
            _ => None,
        }
    }

    fn finish(
        &self,
        iterations: usize,
        residual: f64,
        status: SolveStatus,
        history: Vec<ConvergenceInfo>,
        options: &SolveOptions,
        start: Instant,
    ) -> SolverResult {
        let elapsed_ms = start.elapsed().as_secs_f64() * 1e3;
        if options.verbose >= 1 {
            info!(%status, iterations, residual, elapsed_ms, "CG finished");
        } else {
            debug!(%status, iterations, residual, elapsed_ms, "CG finished");
        }
        if status == SolveStatus::MaxIterReached {
            warn!(iterations, residual, "CG: iteration limit reached before convergence");
        }

        SolverResult {
            iterations,
            residual,
            converged: status.is_converged(),
            status,
            history,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SequentialBackend;
    use crate::error::ValidationError;
    use approx::assert_relative_eq;
    use std::time::Duration;

    fn diag(values: &[f64]) -> SparseMatrix {
        SparseMatrix::from_coo(
            values.len(),
            values.iter().enumerate().map(|(i, &v)| (i, i, v)),
        )
        .unwrap()
    }

    fn laplacian_1d(n: usize) -> SparseMatrix {
        let mut entries = Vec::new();
        for i in 0..n {
            entries.push((i, i, 2.0));
            if i + 1 < n {
                entries.push((i, i + 1, -1.0));
                entries.push((i + 1, i, -1.0));
            }
        }
        SparseMatrix::from_coo(n, entries).unwrap()
    }

    #[test]
    fn diagonal_converges_in_one_step_per_distinct_eigenvalue() {
        let a = diag(&[2.0, 2.0, 2.0]);
        let be = SequentialBackend::new();
        let (x, result) = CgSolver::new(&be)
            .solve_from(&a, &[2.0, 4.0, 6.0], &SolveOptions::with_tolerance(1e-12))
            .unwrap();
        assert_eq!(result.iterations, 1);
        assert!(result.converged);
        assert_relative_eq!(x[0], 1.0, epsilon = 1e-14);
        assert_relative_eq!(x[2], 3.0, epsilon = 1e-14);
    }

    #[test]
    fn zero_rhs_converges_immediately() {
        let a = laplacian_1d(5);
        let be = SequentialBackend::new();
        let (x, result) = CgSolver::new(&be)
            .solve_from(&a, &[0.0; 5], &SolveOptions::default())
            .unwrap();
        assert_eq!(result.iterations, 0);
        assert_eq!(result.status, SolveStatus::Converged);
        assert!(x.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn exact_initial_guess_takes_zero_iterations() {
        let a = diag(&[4.0, 5.0]);
        let be = SequentialBackend::new();
        let mut x = vec![0.25, 0.2];
        let mut ws = CgWorkspace::new(2);
        let result = CgSolver::new(&be)
            .solve(&a, &[1.0, 1.0], &mut x, &mut ws, &SolveOptions::default())
            .unwrap();
        assert_eq!(result.iterations, 0);
        assert!(result.converged);
    }

    #[test]
    fn max_iterations_is_not_an_error() {
        let a = laplacian_1d(50);
        let be = SequentialBackend::new();
        let opts = SolveOptions::with_tolerance(1e-12).max_iterations(3);
        let (_, result) = CgSolver::new(&be).solve_from(&a, &vec![1.0; 50], &opts).unwrap();
        assert_eq!(result.iterations, 3);
        assert_eq!(result.status, SolveStatus::MaxIterReached);
        assert!(!result.converged);
    }

    #[test]
    fn negative_definite_breaks_down() {
        let a = diag(&[-1.0, -2.0]);
        let be = SequentialBackend::new();
        let err = CgSolver::new(&be)
            .solve_from(&a, &[1.0, 1.0], &SolveOptions::default())
            .unwrap_err();
        match err {
            SolverError::Breakdown {
                iteration,
                denominator,
                ..
            } => {
                assert_eq!(iteration, 0);
                assert!(denominator < 0.0);
            }
            other => panic!("expected Breakdown, got {other:?}"),
        }
    }

    #[test]
    fn non_finite_initial_residual_is_unstable() {
        let a = diag(&[1e-300, 1.0]);
        let be = SequentialBackend::new();
        let err = CgSolver::new(&be)
            .solve_from(&a, &[1e300, 1e-300], &SolveOptions::default())
            .unwrap_err();
        match err {
            SolverError::Unstable {
                iteration,
                residual,
            } => {
                assert_eq!(iteration, 0);
                assert!(residual.is_nan());
            }
            other => panic!("expected Unstable, got {other:?}"),
        }
    }

    #[test]
    fn residual_overflow_mid_iteration_is_unstable() {
        // r.r is 1 at start; the first step sends r[1] to about -1e155.
        let a = diag(&[1e-300, 1e300]);
        let be = SequentialBackend::new();
        let err = CgSolver::new(&be)
            .solve_from(&a, &[1.0, 1e-155], &SolveOptions::default())
            .unwrap_err();
        match err {
            SolverError::Unstable {
                iteration,
                residual,
            } => {
                assert_eq!(iteration, 0);
                assert!(residual.is_finite());
                assert_eq!(residual, 1.0);
            }
            other => panic!("expected Unstable, got {other:?}"),
        }
    }

    #[test]
    fn cancelled_before_first_iteration() {
        let a = laplacian_1d(10);
        let be = SequentialBackend::new();
        let token = CancelToken::new();
        token.cancel();
        let (_, result) = CgSolver::new(&be)
            .with_cancel(token.clone())
            .solve_from(&a, &[1.0; 10], &SolveOptions::default())
            .unwrap();
        assert_eq!(result.status, SolveStatus::Cancelled);
        assert_eq!(result.iterations, 0);

        token.reset();
        assert!(!token.is_cancelled());
    }

    #[test]
    fn zero_deadline_stops_at_first_check() {
        let a = laplacian_1d(10);
        let be = SequentialBackend::new();
        let opts = SolveOptions::default().deadline(Duration::ZERO);
        let (_, result) = CgSolver::new(&be).solve_from(&a, &[1.0; 10], &opts).unwrap();
        assert_eq!(result.status, SolveStatus::DeadlineExceeded);
        assert_eq!(result.iterations, 0);
    }

    #[test]
    fn history_recorded_on_request() {
        let a = laplacian_1d(8);
        let be = SequentialBackend::new();
        let opts = SolveOptions::with_tolerance(1e-10).record_history(true);
        let (_, result) = CgSolver::new(&be).solve_from(&a, &[1.0; 8], &opts).unwrap();
        assert_eq!(result.history.len(), result.iterations);
        assert_eq!(result.history[0].iteration, 1);
        assert_eq!(result.history.last().map(|h| h.residual_norm), Some(result.residual));
    }

    #[test]
    fn invalid_inputs_rejected_before_iterating() {
        let a = laplacian_1d(4);
        let be = SequentialBackend::new();
        let solver = CgSolver::new(&be);

        let err = solver.solve_from(&a, &[1.0; 3], &SolveOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            SolverError::InvalidInput(ValidationError::DimensionMismatch(_))
        ));

        let mut x = vec![0.0; 4];
        let mut small = CgWorkspace::new(2);
        assert!(solver
            .solve(&a, &[1.0; 4], &mut x, &mut small, &SolveOptions::default())
            .is_err());

        let err = solver
            .solve_from(&a, &[1.0; 4], &SolveOptions::with_tolerance(0.0))
            .unwrap_err();
        assert!(matches!(
            err,
            SolverError::InvalidInput(ValidationError::ParameterOutOfRange { .. })
        ));
    }

    #[test]
    fn empty_system() {
        let a = SparseMatrix::from_coo(0, Vec::new()).unwrap();
        let be = SequentialBackend::new();
        let (x, result) = CgSolver::new(&be)
            .solve_from(&a, &[], &SolveOptions::default())
            .unwrap();
        assert!(x.is_empty());
        assert!(result.converged);
        assert_eq!(result.iterations, 0);
    }
}
