//! Options and result types for Conjugate Gradient solves.

use std::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// SolveOptions
// ---------------------------------------------------------------------------

/// Per-solve parameters.
///
/// The tolerance is supplied with every solve and is never bound to a
/// backend.
#[derive(Debug, Clone, PartialEq)]
pub struct SolveOptions {
    /// Relative residual target: stop once `||r|| <= tolerance * ||b||`.
    pub tolerance: f64,
    /// Maximum number of CG iterations.
    pub max_iterations: usize,
    /// Diagnostic verbosity. `0` logs only at debug/trace, `1` adds a
    /// summary at info, `2` and above log every iteration at info.
    pub verbose: u8,
    /// Wall-clock budget, measured from the start of the solve and checked
    /// at the start of each iteration.
    pub deadline: Option<Duration>,
    /// Record a [`ConvergenceInfo`] per iteration in the result.
    pub record_history: bool,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            tolerance: 1e-8,
            max_iterations: 2000,
            verbose: 0,
            deadline: None,
            record_history: false,
        }
    }
}

impl SolveOptions {
    /// Default options with the given tolerance.
    pub fn with_tolerance(tolerance: f64) -> Self {
        Self {
            tolerance,
            ..Self::default()
        }
    }

    /// Builder-style setter for `max_iterations`.
    pub fn max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Builder-style setter for `verbose`.
    pub fn verbose(mut self, verbose: u8) -> Self {
        self.verbose = verbose;
        self
    }

    /// Builder-style setter for `deadline`.
    pub fn deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Builder-style setter for `record_history`.
    pub fn record_history(mut self, record: bool) -> Self {
        self.record_history = record;
        self
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// How a solve that did not fail came to an end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolveStatus {
    /// The residual reached `tolerance * ||b||`.
    Converged,
    /// `max_iterations` ran out first.
    MaxIterReached,
    /// A [`CancelToken`](crate::cg::CancelToken) was triggered.
    Cancelled,
    /// [`SolveOptions::deadline`] elapsed.
    DeadlineExceeded,
}

impl SolveStatus {
    /// `true` only for [`SolveStatus::Converged`].
    #[inline]
    pub fn is_converged(self) -> bool {
        matches!(self, SolveStatus::Converged)
    }
}

impl std::fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SolveStatus::Converged => "converged",
            SolveStatus::MaxIterReached => "max-iter",
            SolveStatus::Cancelled => "cancelled",
            SolveStatus::DeadlineExceeded => "deadline",
        };
        f.write_str(s)
    }
}

/// Per-iteration convergence snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceInfo {
    /// Iteration index (1-based; entry `k` describes the state after `k`
    /// updates).
    pub iteration: usize,
    /// Residual L2 norm after this iteration.
    pub residual_norm: f64,
}

/// Outcome of a solve that did not fail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverResult {
    /// Number of completed iterations.
    pub iterations: usize,
    /// Final residual L2 norm `||b - A x||` as tracked by the recurrence.
    pub residual: f64,
    /// `true` iff `status` is [`SolveStatus::Converged`].
    pub converged: bool,
    /// Terminal state.
    pub status: SolveStatus,
    /// Per-iteration history, empty unless
    /// [`SolveOptions::record_history`] was set.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<ConvergenceInfo>,
}
