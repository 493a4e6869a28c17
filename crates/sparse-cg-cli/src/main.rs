//! sparse-cg - compare Conjugate Gradient backends on SPD systems
//!
//! Builds one SPD system (a seeded random `R^T R + 0.1 I`, or a Matrix
//! Market file), then solves it with `b = 1`, `x0 = 0` for every
//! `(tolerance, backend)` pair, printing iterations, final residual and
//! wall time per run.
//!
//! ```text
//! sparse-cg --n 256 --tol 1e-8 --tol 1e-10 --backends sequential --backends parallel
//! sparse-cg --matrix bcsstk01.mtx --json
//! sparse-cg --config bench.json --threads 8 -vv
//! ```
//!
//! The process exits with a non-zero code when any run failed.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sparse_cg::io::load_matrix_market;
use sparse_cg::{
    registry, Backend, BackendConfig, CgSolver, CgWorkspace, ConfigError, Problem, SolveOptions,
};

mod config;
mod report;

use config::BenchConfig;
use report::{ProblemSummary, Reporter, RunRecord};

/// Solve a sparse SPD system with each backend and tolerance
#[derive(Parser, Debug)]
#[command(name = "sparse-cg")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Problem size (n x n)
    #[arg(long)]
    n: Option<usize>,

    /// Target density of the generated matrix (0..1]
    #[arg(long)]
    density: Option<f64>,

    /// Tolerance to run (repeatable)
    #[arg(long, num_args = 1..)]
    tol: Vec<f64>,

    /// Backend name to try (repeatable)
    #[arg(long, num_args = 1..)]
    backends: Vec<String>,

    /// Iteration cap per solve
    #[arg(long, alias = "maxiters")]
    max_iters: Option<usize>,

    /// Increase verbosity (-v: debug logs and a solve summary, -vv: every iteration)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Seed for the generated matrix
    #[arg(long)]
    seed: Option<u64>,

    /// Worker threads for parallel backends (0 = all logical CPUs)
    #[arg(long, env = "SPARSE_CG_THREADS")]
    threads: Option<usize>,

    /// Vector length below which parallel backends stay on the calling thread
    #[arg(long)]
    sequential_cutoff: Option<usize>,

    /// Solve this Matrix Market file instead of a generated matrix
    #[arg(long)]
    matrix: Option<PathBuf>,

    /// JSON file with default settings; flags override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Emit one JSON object per line instead of a table
    #[arg(long)]
    json: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,
}

impl Cli {
    /// Start from the config file (or defaults) and apply explicit flags.
    fn resolve(&self) -> Result<BenchConfig> {
        let mut cfg = match &self.config {
            Some(path) => BenchConfig::load(path)?,
            None => BenchConfig::default(),
        };

        if let Some(n) = self.n {
            cfg.n = n;
        }
        if let Some(density) = self.density {
            cfg.density = density;
        }
        if !self.tol.is_empty() {
            cfg.tol = self.tol.clone();
        }
        if !self.backends.is_empty() {
            cfg.backends = self.backends.clone();
        }
        if let Some(max_iters) = self.max_iters {
            cfg.max_iters = max_iters;
        }
        if self.verbose > 0 {
            cfg.verbose = self.verbose;
        }
        if let Some(seed) = self.seed {
            cfg.seed = seed;
        }
        if let Some(threads) = self.threads {
            cfg.threads = threads;
        }
        if let Some(cutoff) = self.sequential_cutoff {
            cfg.sequential_cutoff = cutoff;
        }
        if self.matrix.is_some() {
            cfg.matrix = self.matrix.clone();
        }

        cfg.validate()?;
        Ok(cfg)
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let log_level = if cli.verbose > 0 { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    if cli.no_color || cli.json {
        colored::control::set_override(false);
    }

    let cfg = cli.resolve()?;
    debug!(?cfg, "resolved configuration");

    let failures = run(&cfg, &Reporter::new(cli.json))?;
    if failures > 0 {
        info!(failures, "some runs failed");
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

/// Build the problem and run the sweep. Returns the number of failed runs.
fn run(cfg: &BenchConfig, reporter: &Reporter) -> Result<usize> {
    let (problem, source) = match &cfg.matrix {
        Some(path) => {
            let matrix = load_matrix_market(path)
                .with_context(|| format!("failed to load {}", path.display()))?;
            (Problem::with_unit_rhs(matrix), path.display().to_string())
        }
        None => {
            let problem = Problem::random_spd(cfg.n, cfg.seed, cfg.density)
                .context("failed to generate SPD problem")?;
            (problem, format!("random SPD (seed {})", cfg.seed))
        }
    };

    reporter.header(&ProblemSummary {
        source,
        n: problem.matrix.n(),
        nnz: problem.matrix.nnz(),
        density: problem.matrix.density(),
    });

    // One instance per name, reused across tolerances so pools are built once.
    let backend_config = BackendConfig {
        threads: cfg.threads,
        sequential_cutoff: cfg.sequential_cutoff,
    };
    let backends: Vec<(&str, Result<Box<dyn Backend>, ConfigError>)> = cfg
        .backends
        .iter()
        .map(|name| (name.as_str(), registry::create_backend(name, &backend_config)))
        .collect();

    let n = problem.matrix.n();
    let mut workspace = CgWorkspace::new(n);
    let mut failures = 0;

    for &tol in &cfg.tol {
        let options = SolveOptions {
            tolerance: tol,
            max_iterations: cfg.max_iters,
            verbose: cfg.verbose,
            ..SolveOptions::default()
        };

        for (name, backend) in &backends {
            let record = match backend {
                Ok(backend) => {
                    let mut x = problem.x0.clone();
                    let solver = CgSolver::new(backend.as_ref());
                    let start = Instant::now();
                    let outcome = solver.solve(
                        &problem.matrix,
                        &problem.b,
                        &mut x,
                        &mut workspace,
                        &options,
                    );
                    let elapsed_ms = start.elapsed().as_secs_f64() * 1e3;
                    match outcome {
                        Ok(result) => RunRecord::solved(name, tol, &result, elapsed_ms),
                        Err(e) => RunRecord::failed(name, tol, e),
                    }
                }
                Err(e) => RunRecord::failed(name, tol, e),
            };

            if record.is_error() {
                failures += 1;
            }
            reporter.row(&record);
        }
    }

    Ok(failures)
}
