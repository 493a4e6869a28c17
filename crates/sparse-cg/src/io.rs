//! Matrix Market (`.mtx`) coordinate reader.
//!
//! Supported banner: `%%MatrixMarket matrix coordinate <field> <symmetry>`
//! with `field` in `real | integer | pattern` and `symmetry` in
//! `general | symmetric`. Indices are 1-based. Symmetric files store one
//! triangle; off-diagonal entries are mirrored on load. Pattern entries get
//! the value 1.0.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::debug;

use crate::error::ParseError;
use crate::matrix::SparseMatrix;
use crate::validation::MAX_EDGES;

/// Upper bound on entries reserved up front; larger files grow as they are read.
const MAX_PREALLOCATED_ENTRIES: usize = 1 << 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Real,
    Integer,
    Pattern,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Symmetry {
    General,
    Symmetric,
}

/// Open and parse a Matrix Market file.
pub fn load_matrix_market(path: impl AsRef<Path>) -> Result<SparseMatrix, ParseError> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let matrix = read_matrix_market(BufReader::new(file))?;
    debug!(path = %path.display(), n = matrix.n(), nnz = matrix.nnz(), "loaded Matrix Market file");
    Ok(matrix)
}

/// Parse a Matrix Market stream into a square [`SparseMatrix`].
///
/// # Errors
///
/// - [`ParseError::Header`] for a missing or unsupported banner, a bad size
///   line, a non-square matrix, or more declared entries than `n * n`.
/// - [`ParseError::Entry`] for malformed entries, out-of-range indices, or
///   an entry count different from the size line.
/// - [`ParseError::Io`] for read failures.
pub fn read_matrix_market<R: BufRead>(reader: R) -> Result<SparseMatrix, ParseError> {
    let mut lines = reader.lines().enumerate().map(|(i, line)| (i + 1, line));

    // --- banner ---
    let (field, symmetry) = match lines.next() {
        Some((line_no, line)) => parse_banner(line_no, &line?)?,
        None => {
            return Err(ParseError::Header {
                line: 1,
                detail: "empty input".into(),
            })
        }
    };

    // --- size line (after comments) ---
    let mut last_line = 1;
    let mut size = None;
    for (line_no, line) in lines.by_ref() {
        last_line = line_no;
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('%') {
            continue;
        }
        size = Some(parse_size(line_no, trimmed)?);
        break;
    }
    let (n, declared) = size.ok_or_else(|| ParseError::Header {
        line: last_line,
        detail: "missing size line".into(),
    })?;

    let max_entries = n.saturating_mul(n).min(MAX_EDGES);
    if declared > max_entries {
        return Err(ParseError::Header {
            line: last_line,
            detail: format!("{declared} entries declared, at most {max_entries} allowed for a {n}x{n} matrix"),
        });
    }

    // --- entries ---
    let capacity = match symmetry {
        Symmetry::General => declared,
        Symmetry::Symmetric => declared.saturating_mul(2),
    };
    let mut entries = Vec::with_capacity(capacity.min(MAX_PREALLOCATED_ENTRIES));
    let mut seen = 0usize;
    for (line_no, line) in lines {
        last_line = line_no;
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('%') {
            continue;
        }
        let (row, col, val) = parse_entry(line_no, trimmed, n, field)?;
        seen += 1;
        if seen > declared {
            return Err(ParseError::Entry {
                line: line_no,
                detail: format!("more entries than the {declared} declared"),
            });
        }
        entries.push((row, col, val));
        if symmetry == Symmetry::Symmetric && row != col {
            entries.push((col, row, val));
        }
    }
    if seen != declared {
        return Err(ParseError::Entry {
            line: last_line,
            detail: format!("expected {declared} entries, found {seen}"),
        });
    }

    Ok(SparseMatrix::from_coo(n, entries)?)
}

fn parse_banner(line_no: usize, line: &str) -> Result<(Field, Symmetry), ParseError> {
    let header = |detail: String| ParseError::Header {
        line: line_no,
        detail,
    };

    let tokens: Vec<String> = line.split_whitespace().map(str::to_ascii_lowercase).collect();
    if tokens.len() != 5 || tokens[0] != "%%matrixmarket" {
        return Err(header(format!("expected '%%MatrixMarket' banner, got '{line}'")));
    }
    if tokens[1] != "matrix" || tokens[2] != "coordinate" {
        return Err(header(format!(
            "only 'matrix coordinate' is supported, got '{} {}'",
            tokens[1], tokens[2]
        )));
    }
    let field = match tokens[3].as_str() {
        "real" | "double" => Field::Real,
        "integer" => Field::Integer,
        "pattern" => Field::Pattern,
        other => return Err(header(format!("unsupported field '{other}'"))),
    };
    let symmetry = match tokens[4].as_str() {
        "general" => Symmetry::General,
        "symmetric" => Symmetry::Symmetric,
        other => return Err(header(format!("unsupported symmetry '{other}'"))),
    };
    Ok((field, symmetry))
}

fn parse_size(line_no: usize, line: &str) -> Result<(usize, usize), ParseError> {
    let header = |detail: String| ParseError::Header {
        line: line_no,
        detail,
    };

    let nums = line
        .split_whitespace()
        .map(|t| t.parse::<usize>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| header(format!("bad size line '{line}': {e}")))?;
    match nums.as_slice() {
        [rows, cols, nnz] if rows == cols => Ok((*rows, *nnz)),
        [rows, cols, _] => Err(header(format!("matrix must be square, got {rows}x{cols}"))),
        _ => Err(header(format!("size line needs 'rows cols nnz', got '{line}'"))),
    }
}

fn parse_entry(
    line_no: usize,
    line: &str,
    n: usize,
    field: Field,
) -> Result<(usize, usize, f64), ParseError> {
    let entry = |detail: String| ParseError::Entry {
        line: line_no,
        detail,
    };

    let mut tokens = line.split_whitespace();
    let mut index = |what: &str| -> Result<usize, ParseError> {
        let token = tokens
            .next()
            .ok_or_else(|| entry(format!("missing {what} index")))?;
        let one_based: usize = token
            .parse()
            .map_err(|e| entry(format!("bad {what} index '{token}': {e}")))?;
        if one_based == 0 || one_based > n {
            return Err(entry(format!("{what} index {one_based} outside 1..={n}")));
        }
        Ok(one_based - 1)
    };
    let row = index("row")?;
    let col = index("column")?;

    let val = match field {
        Field::Pattern => 1.0,
        Field::Real | Field::Integer => {
            let token = tokens
                .next()
                .ok_or_else(|| entry("missing value".into()))?;
            let v: f64 = token
                .parse()
                .map_err(|e| entry(format!("bad value '{token}': {e}")))?;
            if field == Field::Integer && v.fract() != 0.0 {
                return Err(entry(format!("non-integer value '{token}' in integer matrix")));
            }
            v
        }
    };
    Ok((row, col, val))
}
