//! Run configuration: JSON file values, overridden by command-line flags.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// Everything one invocation needs to build the problem and run the sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BenchConfig {
    /// Dimension of the generated SPD matrix.
    pub n: usize,
    /// Target density of the generated matrix, in (0, 1].
    pub density: f64,
    /// Tolerances to sweep.
    pub tol: Vec<f64>,
    /// Backend names to try for each tolerance.
    pub backends: Vec<String>,
    /// Iteration cap per solve.
    pub max_iters: usize,
    /// Solver diagnostic verbosity.
    pub verbose: u8,
    /// Seed for the matrix generator.
    pub seed: u64,
    /// Worker threads for parallel backends (0 = all logical CPUs).
    pub threads: usize,
    /// Vector length below which parallel backends run inline.
    pub sequential_cutoff: usize,
    /// Matrix Market file to solve instead of a generated matrix.
    pub matrix: Option<PathBuf>,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            n: 64,
            density: 1.0,
            tol: vec![1e-8],
            backends: vec!["sequential".into(), "parallel".into()],
            max_iters: 2000,
            verbose: 0,
            seed: 42,
            threads: 0,
            sequential_cutoff: sparse_cg::backend::DEFAULT_SEQUENTIAL_CUTOFF,
            matrix: None,
        }
    }
}

impl BenchConfig {
    /// Read a JSON config file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("failed to open config file {}", path.display()))?;
        serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    /// Reject settings no run could succeed with.
    pub fn validate(&self) -> Result<()> {
        if self.tol.is_empty() {
            bail!("at least one tolerance is required");
        }
        if self.backends.is_empty() {
            bail!("at least one backend is required");
        }
        if self.matrix.is_none() {
            if self.n == 0 {
                bail!("n must be positive");
            }
            if !(self.density > 0.0 && self.density <= 1.0) {
                bail!("density must be in (0, 1], got {}", self.density);
            }
        }
        Ok(())
    }
}
