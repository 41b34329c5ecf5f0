//! End-to-end extraction and voting scenarios over realistic model replies.

use grid_kernel::{aggregate, parse_prediction, Grid};

fn grid(rows: &[&[i64]]) -> Grid {
    Grid::new(rows.iter().map(|r| r.to_vec()).collect())
}

#[test]
fn clean_marked_answer() {
    assert_eq!(
        parse_prediction("OUTPUT: [[0, 1], [2, 3]]"),
        Some(grid(&[&[0, 1], &[2, 3]]))
    );
}

#[test]
fn chain_of_thought_reply() {
    let reply = "\
OBSERVATIONS: The grid is a checkerboard whose phase flips each row.
PATTERN RULE: Invert every cell.
REASONING: Applying the inversion to the 3x3 test input cell by cell.
OUTPUT: [[0,1,0],[1,0,1],[0,1,0]]";
    assert_eq!(
        parse_prediction(reply),
        Some(grid(&[&[0, 1, 0], &[1, 0, 1], &[0, 1, 0]]))
    );
}

#[test]
fn marked_answer_beats_earlier_draft() {
    let reply = "First try: [[1,2],[3,4]]\nFINAL OUTPUT: [[0,1],[2,3]]";
    assert_eq!(parse_prediction(reply), Some(grid(&[&[0, 1], &[2, 3]])));
}

#[test]
fn reply_without_any_grid() {
    assert_eq!(parse_prediction("No grid here"), None);
}

#[test]
fn heavily_spaced_literal() {
    assert_eq!(
        parse_prediction("OUTPUT: [ [ 1 , 2 ] , [ 3 , 4 ] ]"),
        Some(grid(&[&[1, 2], &[3, 4]]))
    );
}

#[test]
fn literal_rendering_round_trips() {
    let grids = [
        grid(&[&[0]]),
        grid(&[&[1, 2], &[3, 4]]),
        grid(&[&[9, 8, 7], &[6, 5, 4], &[3, 2, 1]]),
    ];
    for g in grids {
        assert_eq!(parse_prediction(&g.to_literal()), Some(g));
    }
}

#[test]
fn sampled_replies_feed_the_vote() {
    // Five replies of varying quality for the same task: two agree, one
    // dissents, one is prose, one is truncated mid-literal.
    let replies = [
        "OUTPUT: [[0, 1], [2, 3]]",
        "The rule swaps quadrants.\nOUTPUT: [[0,1],[2,3]]",
        "OUTPUT: [[3, 2], [1, 0]]",
        "I could not determine the transformation.",
        "OUTPUT: [[0, 1], [2,",
    ];

    let outcomes: Vec<Option<Grid>> = replies.iter().map(|r| parse_prediction(r)).collect();
    let result = aggregate(&outcomes);

    assert_eq!(result.total_samples, 5);
    assert_eq!(result.valid_samples, 3);
    assert_eq!(result.winning_grid, Some(grid(&[&[0, 1], &[2, 3]])));
    assert_eq!(result.winning_count, 2);
    assert!((result.confidence - 2.0 / 3.0).abs() < 1e-9);
}

#[test]
fn unanimous_failure_yields_zero_confidence() {
    let replies = ["no idea", "still no idea", "[[", ""];
    let outcomes: Vec<Option<Grid>> = replies.iter().map(|r| parse_prediction(r)).collect();
    let result = aggregate(&outcomes);

    assert_eq!(result.total_samples, 4);
    assert_eq!(result.valid_samples, 0);
    assert_eq!(result.winning_grid, None);
    assert_eq!(result.confidence, 0.0);
}
