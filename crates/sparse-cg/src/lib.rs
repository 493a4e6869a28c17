//! Conjugate Gradient for sparse symmetric positive-definite systems.
//!
//! This crate solves `A x = b` with an immutable CSR [`SparseMatrix`], dense
//! `f64` vectors, and an interchangeable execution [`Backend`] selected by
//! name from a process-wide [`registry`].
//!
//! # Modules
//!
//! | Module         | Contents                                             |
//! |----------------|------------------------------------------------------|
//! | [`matrix`]     | CSR construction from COO triplets, multiply         |
//! | [`vector`]     | [`DenseVector`] and the slice kernels                |
//! | [`backend`]    | [`Backend`] trait, sequential and parallel backends  |
//! | [`registry`]   | name -> backend factory lookup                       |
//! | [`cg`]         | [`CgSolver`] state machine                           |
//! | [`problem`]    | seeded random SPD systems                            |
//! | [`io`]         | Matrix Market reader                                 |
//!
//! # Example
//!
//! ```rust
//! use sparse_cg::{registry, BackendConfig, CgSolver, SolveOptions, SparseMatrix};
//!
//! let a = SparseMatrix::from_triplets(
//!     2,
//!     &[0, 0, 1, 1],
//!     &[0, 1, 0, 1],
//!     &[4.0, 1.0, 1.0, 3.0],
//! )
//! .unwrap();
//! let backend = registry::create_backend("sequential", &BackendConfig::default()).unwrap();
//!
//! let (x, result) = CgSolver::new(backend.as_ref())
//!     .solve_from(&a, &[1.0, 2.0], &SolveOptions::with_tolerance(1e-10))
//!     .unwrap();
//! assert!(result.converged);
//! assert!((4.0 * x[0] + x[1] - 1.0).abs() < 1e-9);
//! ```

pub mod backend;
pub mod cg;
pub mod error;
pub mod io;
pub mod matrix;
pub mod problem;
pub mod registry;
pub mod types;
pub mod validation;
pub mod vector;

pub use backend::{Backend, BackendConfig, ParallelBackend, SequentialBackend};
pub use cg::{CancelToken, CgSolver, CgWorkspace};
pub use error::{ConfigError, ParseError, SolverError, ValidationError};
pub use matrix::SparseMatrix;
pub use problem::{Problem, Triplets};
pub use registry::BackendRegistry;
pub use types::{ConvergenceInfo, SolveOptions, SolveStatus, SolverResult};
pub use vector::DenseVector;
