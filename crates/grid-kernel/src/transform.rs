//! Restricted evaluator for model-authored grid transformations.
//!
//! The program-aided prompt asks the model for a transformation program in
//! a fenced code block: one allow-listed operation per line, applied top to
//! bottom. Parsing the program into a closed set of operations replaces
//! arbitrary code execution; there is no way to reach the filesystem,
//! network, or anything outside the input grid. This is a best-effort
//! evaluator for cooperative output, not a security boundary against an
//! adversarial model.

use anyhow::{bail, Context, Result};
use regex::Regex;
use tracing::warn;

use crate::grid::Grid;

/// Upper bound on cells a `tile` expansion may produce.
const MAX_CELLS: usize = 10_000;

/// Operations the evaluator is willing to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Identity,
    Transpose,
    FlipHorizontal,
    FlipVertical,
    RotateCw,
    RotateCcw,
    Rotate180,
    Replace { from: i64, to: i64 },
    Tile { rows: usize, cols: usize },
}

/// Extract the transformation program from a fenced code block.
///
/// A ```transform block is preferred; any fenced block is accepted as a
/// fallback, since models often tag the fence with the wrong language.
pub fn extract_program(text: &str) -> Option<String> {
    for pattern in [r"(?s)```transform\s*\n(.*?)```", r"(?s)```[a-zA-Z]*\s*\n(.*?)```"] {
        let re = Regex::new(pattern).ok()?;
        if let Some(captures) = re.captures(text) {
            let body = captures[1].trim().to_string();
            if !body.is_empty() {
                return Some(body);
            }
        }
    }
    None
}

/// Evaluate a model reply containing a transformation program.
///
/// Every fault — missing fence, unknown operation, malformed arguments,
/// ragged input where a rotation needs rectangularity, or a structurally
/// invalid result — is logged and converted to an empty prediction. The
/// function never panics and never returns an error.
pub fn run_transform(code_text: &str, input: &Grid) -> Option<Grid> {
    match evaluate(code_text, input) {
        Ok(grid) => Some(grid),
        Err(err) => {
            warn!(error = %err, "transform evaluation failed");
            None
        }
    }
}

fn evaluate(code_text: &str, input: &Grid) -> Result<Grid> {
    let program = extract_program(code_text).context("no fenced program block in reply")?;
    let ops = parse_program(&program)?;

    let mut rows = input.rows().to_vec();
    for op in &ops {
        rows = apply(*op, rows)?;
    }

    if rows.is_empty() || rows.iter().any(Vec::is_empty) {
        bail!("program produced a structurally invalid grid");
    }

    Ok(Grid::new(rows))
}

fn parse_program(source: &str) -> Result<Vec<Op>> {
    let mut ops = Vec::new();

    for line in source.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut parts = line.split_whitespace();
        let name = parts.next().unwrap_or_default();
        let args: Vec<&str> = parts.collect();

        let op = match (name, args.as_slice()) {
            ("identity", []) => Op::Identity,
            ("transpose", []) => Op::Transpose,
            ("flip_horizontal", []) => Op::FlipHorizontal,
            ("flip_vertical", []) => Op::FlipVertical,
            ("rotate_cw", []) => Op::RotateCw,
            ("rotate_ccw", []) => Op::RotateCcw,
            ("rotate_180", []) => Op::Rotate180,
            ("replace", [from, to]) => Op::Replace {
                from: parse_int(from)?,
                to: parse_int(to)?,
            },
            ("tile", [rows, cols]) => Op::Tile {
                rows: parse_count(rows)?,
                cols: parse_count(cols)?,
            },
            _ => bail!("operation not allowed: {line:?}"),
        };

        ops.push(op);
    }

    if ops.is_empty() {
        bail!("program defines no operations");
    }

    Ok(ops)
}

fn parse_int(s: &str) -> Result<i64> {
    s.parse().with_context(|| format!("invalid integer argument: {s:?}"))
}

fn parse_count(s: &str) -> Result<usize> {
    let n: usize = s
        .parse()
        .with_context(|| format!("invalid count argument: {s:?}"))?;
    if n == 0 {
        bail!("count argument must be positive");
    }
    Ok(n)
}

fn apply(op: Op, rows: Vec<Vec<i64>>) -> Result<Vec<Vec<i64>>> {
    match op {
        Op::Identity => Ok(rows),
        Op::Transpose => transpose(rows),
        Op::FlipHorizontal => Ok(rows
            .into_iter()
            .map(|mut row| {
                row.reverse();
                row
            })
            .collect()),
        Op::FlipVertical => {
            let mut rows = rows;
            rows.reverse();
            Ok(rows)
        }
        Op::RotateCw => {
            let mut rows = transpose(rows)?;
            for row in &mut rows {
                row.reverse();
            }
            Ok(rows)
        }
        Op::RotateCcw => {
            let mut rows = transpose(rows)?;
            rows.reverse();
            Ok(rows)
        }
        Op::Rotate180 => {
            let mut rows = rows;
            rows.reverse();
            for row in &mut rows {
                row.reverse();
            }
            Ok(rows)
        }
        Op::Replace { from, to } => Ok(rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|cell| if cell == from { to } else { cell })
                    .collect()
            })
            .collect()),
        Op::Tile { rows: vr, cols: hc } => tile(rows, vr, hc),
    }
}

/// Transpose, requiring rectangular input.
fn transpose(rows: Vec<Vec<i64>>) -> Result<Vec<Vec<i64>>> {
    let height = rows.len();
    let width = rows.first().map(Vec::len).unwrap_or(0);
    if rows.iter().any(|row| row.len() != width) {
        bail!("transpose requires a rectangular grid");
    }
    if height == 0 || width == 0 {
        bail!("transpose requires a non-empty grid");
    }

    Ok((0..width)
        .map(|col| (0..height).map(|row| rows[row][col]).collect())
        .collect())
}

/// Repeat the grid `vr` times vertically and `hc` times horizontally.
fn tile(rows: Vec<Vec<i64>>, vr: usize, hc: usize) -> Result<Vec<Vec<i64>>> {
    let cells: usize = rows.iter().map(Vec::len).sum();
    if cells.saturating_mul(vr).saturating_mul(hc) > MAX_CELLS {
        bail!("tile expansion exceeds {MAX_CELLS} cells");
    }

    let tiled_rows: Vec<Vec<i64>> = rows
        .iter()
        .map(|row| {
            let mut wide = Vec::with_capacity(row.len() * hc);
            for _ in 0..hc {
                wide.extend_from_slice(row);
            }
            wide
        })
        .collect();

    let mut out = Vec::with_capacity(tiled_rows.len() * vr);
    for _ in 0..vr {
        out.extend(tiled_rows.iter().cloned());
    }
    Ok(out)
}
