//! Grid model and structural validation.
//!
//! A grid is a non-empty list of non-empty integer rows. Validation is
//! structural only: rows are not required to share a length, since a ragged
//! prediction can never match a rectangular ground truth anyway.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A grid of small integers.
///
/// ARC cells are colors 0-9, but the model is free to emit any integer;
/// correctness against the ground truth is decided by equality, not range.
/// Equality is structural and grids are never mutated after construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Grid(Vec<Vec<i64>>);

impl Grid {
    /// Wrap rows without validation. Callers that handle untrusted input
    /// should go through [`Grid::from_value`] instead.
    pub fn new(rows: Vec<Vec<i64>>) -> Self {
        Self(rows)
    }

    /// Convert a decoded JSON value into a grid, if it is structurally valid.
    pub fn from_value(value: &Value) -> Option<Self> {
        if !is_valid_grid(value) {
            return None;
        }

        let rows = value
            .as_array()?
            .iter()
            .map(|row| {
                row.as_array()
                    .map(|cells| cells.iter().filter_map(Value::as_i64).collect())
            })
            .collect::<Option<Vec<Vec<i64>>>>()?;

        Some(Self(rows))
    }

    /// The rows of this grid.
    pub fn rows(&self) -> &[Vec<i64>] {
        &self.0
    }

    /// Number of rows.
    pub fn row_count(&self) -> usize {
        self.0.len()
    }

    /// Total cell count across all rows.
    pub fn cell_count(&self) -> usize {
        self.0.iter().map(Vec::len).sum()
    }

    /// Render the minimal one-line JSON literal, e.g. `[[1,2],[3,4]]`.
    ///
    /// This is the exact form the prompts show the model, so
    /// `extract_grid(&g.to_literal()) == Some(g)` for any grid.
    pub fn to_literal(&self) -> String {
        serde_json::to_string(&self.0).unwrap_or_default()
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, row) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            let cells: Vec<String> = row.iter().map(|c| c.to_string()).collect();
            write!(f, "{}", cells.join(" "))?;
        }
        Ok(())
    }
}

/// Structural predicate: is this JSON value a valid grid?
///
/// Valid means a non-empty array of non-empty arrays of integers. Booleans
/// and floats are rejected (JSON keeps them distinct from integers), and so
/// is anything that is not an array at either level. Ragged row lengths are
/// tolerated.
pub fn is_valid_grid(value: &Value) -> bool {
    let Some(rows) = value.as_array() else {
        return false;
    };

    if rows.is_empty() {
        return false;
    }

    rows.iter().all(|row| match row.as_array() {
        Some(cells) => !cells.is_empty() && cells.iter().all(is_integer),
        None => false,
    })
}

fn is_integer(value: &Value) -> bool {
    match value {
        Value::Number(n) => n.as_i64().is_some(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_valid_rectangular_grid() {
        assert!(is_valid_grid(&json!([[0, 1], [2, 3]])));
        assert!(is_valid_grid(&json!([[7]])));
    }

    #[test]
    fn test_rejects_non_array_values() {
        assert!(!is_valid_grid(&json!("[[1,2]]")));
        assert!(!is_valid_grid(&json!(42)));
        assert!(!is_valid_grid(&json!(null)));
        assert!(!is_valid_grid(&json!({"rows": [[1]]})));
    }

    #[test]
    fn test_rejects_empty_outer_and_empty_rows() {
        assert!(!is_valid_grid(&json!([])));
        assert!(!is_valid_grid(&json!([[]])));
        assert!(!is_valid_grid(&json!([[1, 2], []])));
    }

    #[test]
    fn test_rejects_non_integer_cells() {
        assert!(!is_valid_grid(&json!([[1, "a"], [2, 3]])));
        assert!(!is_valid_grid(&json!([[1.5, 2]])));
        assert!(!is_valid_grid(&json!([[1, null]])));
        assert!(!is_valid_grid(&json!([[1, [2]]])));
    }

    #[test]
    fn test_rejects_booleans() {
        // JSON booleans must not pass for integers.
        assert!(!is_valid_grid(&json!([[true, false]])));
        assert!(!is_valid_grid(&json!([[1, true]])));
    }

    #[test]
    fn ragged_grid_is_accepted() {
        // Pinned policy: row lengths need not match.
        assert!(is_valid_grid(&json!([[1, 2], [3]])));
    }

    #[test]
    fn test_from_value_round_trip() {
        let value = json!([[0, 1], [2, 3]]);
        let grid = Grid::from_value(&value).unwrap();
        assert_eq!(grid.rows(), &[vec![0, 1], vec![2, 3]]);
        assert_eq!(grid.row_count(), 2);
        assert_eq!(grid.cell_count(), 4);
    }

    #[test]
    fn test_from_value_rejects_invalid() {
        assert!(Grid::from_value(&json!([])).is_none());
        assert!(Grid::from_value(&json!([[1, "x"]])).is_none());
    }

    #[test]
    fn test_to_literal() {
        let grid = Grid::new(vec![vec![1, 2], vec![3, 4]]);
        assert_eq!(grid.to_literal(), "[[1,2],[3,4]]");
    }

    #[test]
    fn test_display() {
        let grid = Grid::new(vec![vec![0, 1], vec![2, 3]]);
        assert_eq!(grid.to_string(), "0 1\n2 3");
    }

    #[test]
    fn test_structural_equality() {
        let a = Grid::new(vec![vec![1, 2]]);
        let b = Grid::new(vec![vec![1, 2]]);
        let c = Grid::new(vec![vec![2, 1]]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_serde_transparent() {
        let grid = Grid::new(vec![vec![1, 2], vec![3, 4]]);
        let encoded = serde_json::to_string(&grid).unwrap();
        assert_eq!(encoded, "[[1,2],[3,4]]");
        let decoded: Grid = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, grid);
    }
}
