//! Self-consistency voting across independent samples.
//!
//! Several replies for the same task are parsed independently; identical
//! grids are tallied and the plurality winner becomes the answer, with
//! `winning_count / valid_samples` as the confidence. Empty predictions are
//! excluded from the tally but still counted for observability.

use serde::{Deserialize, Serialize};

use crate::grid::Grid;

/// Outcome of a consensus vote over one task's samples.
///
/// Constructed once per task by [`aggregate`] and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusResult {
    /// Samples submitted to the vote, empty predictions included.
    pub total_samples: usize,
    /// Samples that yielded a valid grid.
    pub valid_samples: usize,
    /// The plurality grid, or `None` when every sample was empty.
    pub winning_grid: Option<Grid>,
    /// Occurrences of the winning grid.
    pub winning_count: usize,
    /// `winning_count / valid_samples`, or 0.0 with no valid samples.
    pub confidence: f64,
}

/// Tally extraction outcomes and pick the plurality grid.
///
/// Ties break to the FIRST-SEEN grid: the tally preserves insertion order
/// and a later grid must be strictly more frequent to displace the current
/// winner, so results are reproducible for a fixed sample order.
pub fn aggregate(outcomes: &[Option<Grid>]) -> ConsensusResult {
    let total_samples = outcomes.len();

    let mut tally: Vec<(&Grid, usize)> = Vec::new();
    let mut valid_samples = 0;
    for grid in outcomes.iter().flatten() {
        valid_samples += 1;
        match tally.iter_mut().find(|(seen, _)| *seen == grid) {
            Some((_, count)) => *count += 1,
            None => tally.push((grid, 1)),
        }
    }

    if valid_samples == 0 {
        return ConsensusResult {
            total_samples,
            valid_samples: 0,
            winning_grid: None,
            winning_count: 0,
            confidence: 0.0,
        };
    }

    let mut winner = tally[0].0;
    let mut winning_count = tally[0].1;
    for (grid, count) in tally.iter().skip(1) {
        if *count > winning_count {
            winner = grid;
            winning_count = *count;
        }
    }

    ConsensusResult {
        total_samples,
        valid_samples,
        winning_grid: Some(winner.clone()),
        winning_count,
        confidence: winning_count as f64 / valid_samples as f64,
    }
}
