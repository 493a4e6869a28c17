//! Result rows and their text/JSON rendering.

use colored::Colorize;
use serde::Serialize;
use sparse_cg::{SolveStatus, SolverResult};

/// Outcome of one `(tolerance, backend)` run.
#[derive(Debug, Clone, Serialize)]
pub struct RunRecord {
    pub backend: String,
    pub tol: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iterations: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub residual: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<SolveStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunRecord {
    pub fn solved(backend: &str, tol: f64, result: &SolverResult, time_ms: f64) -> Self {
        Self {
            backend: backend.to_string(),
            tol,
            iterations: Some(result.iterations),
            residual: Some(result.residual),
            status: Some(result.status),
            time_ms: Some(time_ms),
            error: None,
        }
    }

    pub fn failed(backend: &str, tol: f64, error: impl std::fmt::Display) -> Self {
        Self {
            backend: backend.to_string(),
            tol,
            iterations: None,
            residual: None,
            status: None,
            time_ms: None,
            error: Some(error.to_string()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Problem summary printed before the rows.
#[derive(Debug, Clone, Serialize)]
pub struct ProblemSummary {
    pub source: String,
    pub n: usize,
    pub nnz: usize,
    pub density: f64,
}

/// Renders rows either as an aligned table or as JSON lines.
pub struct Reporter {
    json: bool,
}

impl Reporter {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    pub fn header(&self, summary: &ProblemSummary) {
        if self.json {
            println!("{}", json_line(summary));
            return;
        }
        println!(
            "Problem: {} n={}, nnz={}, density~{:.3}",
            summary.source, summary.n, summary.nnz, summary.density
        );
        println!(
            "{:<12}  {:>8}  {:>5}  {:>10}  {:>10}  {}",
            "backend", "tol", "its", "residual", "time [ms]", "status"
        );
        println!("{}", "-".repeat(64).dimmed());
    }

    pub fn row(&self, record: &RunRecord) {
        if self.json {
            println!("{}", json_line(record));
            return;
        }
        println!("{}", format_row(record));
    }
}

/// One table line for `record`, without trailing newline.
pub fn format_row(record: &RunRecord) -> String {
    match (&record.error, record.iterations, record.residual, record.status, record.time_ms) {
        (None, Some(its), Some(res), Some(status), Some(ms)) => {
            let status_text = match status {
                SolveStatus::Converged => status.to_string().green(),
                _ => status.to_string().yellow(),
            };
            format!(
                "{:<12}  {:>8.1e}  {:>5}  {:>10.3e}  {:>10.1}  {}",
                record.backend, record.tol, its, res, ms, status_text
            )
        }
        (error, ..) => format!(
            "{:<12}  {:>8.1e}  {:>5}  {:>10}  {:>10}  {}",
            record.backend,
            record.tol,
            "fail".red(),
            "--",
            "--",
            format!("({})", error.as_deref().unwrap_or("incomplete result")).red()
        ),
    }
}

fn json_line<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| format!(r#"{{"error":"{e}"}}"#))
}
