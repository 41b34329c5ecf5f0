//! Marker-aware output location.
//!
//! Prompts instruct the model to prefix its final answer with `OUTPUT:`.
//! Scanning the marker suffix first avoids picking up bracketed noise from
//! the reasoning trace; the whole-text fallback keeps recall when the model
//! deviates from the requested format.

use crate::extract::extract_grid;
use crate::grid::Grid;

/// The literal token prompts use as the answer boundary. Case-sensitive;
/// only the first occurrence in a reply is honored.
pub const OUTPUT_MARKER: &str = "OUTPUT:";

/// Extract a grid, preferring the region after the first `marker` occurrence.
///
/// If the marker is present but nothing valid follows it (the model repeated
/// the marker in its reasoning, or put the answer before it), extraction
/// falls back to the entire reply.
pub fn locate_and_extract(text: &str, marker: &str) -> Option<Grid> {
    if let Some(idx) = text.find(marker) {
        let suffix = &text[idx + marker.len()..];
        if let Some(grid) = extract_grid(suffix) {
            return Some(grid);
        }
    }

    extract_grid(text)
}

/// Parse a model prediction using the standard [`OUTPUT_MARKER`].
pub fn parse_prediction(text: &str) -> Option<Grid> {
    locate_and_extract(text, OUTPUT_MARKER)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: &[&[i64]]) -> Grid {
        Grid::new(rows.iter().map(|r| r.to_vec()).collect())
    }

    #[test]
    fn test_plain_marker() {
        assert_eq!(
            parse_prediction("OUTPUT: [[0, 1], [2, 3]]"),
            Some(grid(&[&[0, 1], &[2, 3]]))
        );
    }

    #[test]
    fn test_marker_after_reasoning_prose() {
        let text = "\nOBSERVATIONS: the pattern alternates\nPATTERN RULE: checkerboard\nOUTPUT: [[0, 1, 0], [1, 0, 1], [0, 1, 0]]";
        assert_eq!(
            parse_prediction(text),
            Some(grid(&[&[0, 1, 0], &[1, 0, 1], &[0, 1, 0]]))
        );
    }

    #[test]
    fn test_marker_suffix_beats_earlier_candidate() {
        // Bracketed noise before the marker must lose to the marked answer.
        let text = "First try: [[1,2],[3,4]]\nFINAL OUTPUT: [[0,1],[2,3]]";
        assert_eq!(parse_prediction(text), Some(grid(&[&[0, 1], &[2, 3]])));
    }

    #[test]
    fn test_fallback_to_whole_text() {
        // Marker present but followed by garbage; the only valid grid sits
        // earlier in the reply.
        let text = "My answer is [[4, 4], [5, 5]].\nOUTPUT: not a grid, sorry";
        assert_eq!(parse_prediction(text), Some(grid(&[&[4, 4], &[5, 5]])));
    }

    #[test]
    fn test_no_marker_scans_whole_text() {
        let text = "I believe the result is [[2, 2]] here";
        assert_eq!(parse_prediction(text), Some(grid(&[&[2, 2]])));
    }

    #[test]
    fn test_first_marker_occurrence_wins() {
        let text = "OUTPUT: [[1]]\nOUTPUT: [[2]]";
        assert_eq!(parse_prediction(text), Some(grid(&[&[1]])));
    }

    #[test]
    fn test_nothing_to_find() {
        assert_eq!(parse_prediction("No grid here"), None);
        assert_eq!(parse_prediction(""), None);
        assert_eq!(parse_prediction("OUTPUT:"), None);
    }

    #[test]
    fn test_custom_marker() {
        let text = "ANSWER: [[9]]";
        assert_eq!(
            locate_and_extract(text, "ANSWER:"),
            Some(grid(&[&[9]]))
        );
    }

    #[test]
    fn test_irregular_spacing_after_marker() {
        assert_eq!(
            parse_prediction("OUTPUT: [ [ 1 , 2 ] , [ 3 , 4 ] ]"),
            Some(grid(&[&[1, 2], &[3, 4]]))
        );
    }
}
