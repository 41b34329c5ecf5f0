//! Grid extraction from free-form model output.
//!
//! Model replies are unconstrained text: reasoning prose, several candidate
//! arrays, broken brackets, or nothing usable at all. Extraction layers two
//! scanning strategies and accepts the first candidate that decodes to a
//! structurally valid grid; when both fail, the reply counts as an empty
//! prediction rather than an error.

use regex::Regex;
use serde_json::Value;

use crate::grid::Grid;

/// Regex for a bracketed candidate: an outer pair containing at least one
/// inner pair. DOTALL so literals split across lines still match; non-greedy
/// so back-to-back candidates are not merged into one giant match.
const CANDIDATE_PATTERN: &str = r"(?s)\[\s*\[.*?\]\s*\]";

/// Extract the most plausible grid literal from a model reply.
///
/// Tier 1 decodes regex candidates left to right. Tier 2 walks bracket depth
/// from each `[[` occurrence, which recovers literals the non-greedy regex
/// truncates (rows spread over many lines, or deeply spaced nesting).
/// Returns `None` when the text holds no valid grid.
pub fn extract_grid(text: &str) -> Option<Grid> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    regex_scan(text).or_else(|| bracket_scan(text))
}

/// Decode one candidate substring as a JSON grid literal.
fn parse_candidate(candidate: &str) -> Option<Grid> {
    let value: Value = serde_json::from_str(candidate).ok()?;
    Grid::from_value(&value)
}

fn regex_scan(text: &str) -> Option<Grid> {
    let re = Regex::new(CANDIDATE_PATTERN).ok()?;
    let found = re.find_iter(text).find_map(|m| parse_candidate(m.as_str()));
    found
}

/// Manual bracket matching from each `[[` occurrence.
///
/// The depth counter runs to zero to delimit the outermost pair. If that
/// span fails to decode, scanning resumes at the next `[[` instead of
/// giving up after the first span.
fn bracket_scan(text: &str) -> Option<Grid> {
    let bytes = text.as_bytes();
    let mut search_from = 0;

    while let Some(rel) = text[search_from..].find("[[") {
        let start = search_from + rel;
        let mut depth = 0usize;
        let mut end = None;

        for (i, &b) in bytes.iter().enumerate().skip(start) {
            match b {
                b'[' => depth += 1,
                b']' => {
                    depth -= 1;
                    if depth == 0 {
                        end = Some(i);
                        break;
                    }
                }
                _ => {}
            }
        }

        let Some(end) = end else {
            // Outermost pair never closes; nothing further can balance.
            return None;
        };

        if let Some(grid) = parse_candidate(&text[start..=end]) {
            return Some(grid);
        }

        search_from = start + 2;
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: &[&[i64]]) -> Grid {
        Grid::new(rows.iter().map(|r| r.to_vec()).collect())
    }

    #[test]
    fn test_clean_literal() {
        assert_eq!(
            extract_grid("[[0, 1], [2, 3]]"),
            Some(grid(&[&[0, 1], &[2, 3]]))
        );
    }

    #[test]
    fn test_literal_buried_in_prose() {
        let text = "The rule duplicates each cell.\nSo the answer is [[5,5],[6,6]] here.";
        assert_eq!(extract_grid(text), Some(grid(&[&[5, 5], &[6, 6]])));
    }

    #[test]
    fn test_irregular_whitespace() {
        assert_eq!(
            extract_grid("[ [ 1 , 2 ] , [ 3 , 4 ] ]"),
            Some(grid(&[&[1, 2], &[3, 4]]))
        );
    }

    #[test]
    fn test_multiline_literal() {
        let text = "[[0, 1, 0],\n [1, 0, 1],\n [0, 1, 0]]";
        assert_eq!(
            extract_grid(text),
            Some(grid(&[&[0, 1, 0], &[1, 0, 1], &[0, 1, 0]]))
        );
    }

    #[test]
    fn test_first_valid_candidate_wins() {
        let text = "Maybe [[1, 2], [3, 4]] or perhaps [[9, 9], [8, 8]].";
        assert_eq!(extract_grid(text), Some(grid(&[&[1, 2], &[3, 4]])));
    }

    #[test]
    fn test_skips_invalid_candidates() {
        // First bracketed span holds strings; the second is the real grid.
        let text = r#"Columns: [["a", "b"]] and cells: [[4, 5], [6, 7]]"#;
        assert_eq!(extract_grid(text), Some(grid(&[&[4, 5], &[6, 7]])));
    }

    #[test]
    fn test_no_grid() {
        assert_eq!(extract_grid("No grid here"), None);
        assert_eq!(extract_grid(""), None);
        assert_eq!(extract_grid("   \n\t  "), None);
        assert_eq!(extract_grid("[1, 2, 3]"), None);
    }

    #[test]
    fn test_unbalanced_brackets() {
        assert_eq!(extract_grid("[[1, 2], [3, 4"), None);
    }

    #[test]
    fn test_bracket_scan_handles_regex_hostile_nesting() {
        // The non-greedy regex stops at the first `]...]` sequence, which
        // truncates a three-row literal whose rows sit on separate lines
        // with trailing commentary brackets. The depth counter recovers it.
        let text = "result:\n[[1, 2],\n [3, 4],\n [5, 6]]";
        assert_eq!(
            bracket_scan(text),
            Some(grid(&[&[1, 2], &[3, 4], &[5, 6]]))
        );
    }

    #[test]
    fn bracket_scan_retries_later_occurrences() {
        // Pinned policy: a completed-but-invalid outer pair does not end the
        // scan; the next `[[` occurrence is tried.
        let text = r#"[["x"]] then the fix: [[7, 8], [9, 0]]"#;
        assert_eq!(bracket_scan(text), Some(grid(&[&[7, 8], &[9, 0]])));
    }

    #[test]
    fn test_literal_round_trip() {
        let g = grid(&[&[0, 1, 2], &[3, 4, 5], &[6, 7, 8]]);
        assert_eq!(extract_grid(&g.to_literal()), Some(g));
    }
}
