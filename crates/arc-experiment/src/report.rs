//! Markdown rendering of evaluation results and datasets.
//!
//! Produces a per-task comparison report (expected vs. predicted, with
//! mismatched cells emphasized) and a dataset visualization showing each
//! task's training pairs and test input.

use grid_kernel::Grid;

use crate::dataset::TaskRecord;
use crate::results::EvalReport;

/// Format a grid as rows of a markdown table, emphasizing cells that differ
/// from `expected` as `***value***`.
pub fn format_grid_markdown(grid: &Grid, expected: Option<&Grid>) -> String {
    let mut lines = Vec::new();
    for (i, row) in grid.rows().iter().enumerate() {
        let mut line = String::from("| ");
        for (j, cell) in row.iter().enumerate() {
            let expected_cell =
                expected.and_then(|e| e.rows().get(i)).and_then(|r| r.get(j));
            match expected_cell {
                Some(want) if want != cell => {
                    line.push_str(&format!("***{}*** | ", cell));
                }
                _ => {
                    line.push_str(&format!("{} | ", cell));
                }
            }
        }
        lines.push(line);
    }
    lines.join("\n")
}

/// Render a full markdown comparison report for a run.
pub fn render_report(report: &EvalReport) -> String {
    let summary = &report.summary;
    let mut out = String::new();

    out.push_str(&format!("# ARC Task Results - {}\n\n", report.prompt_version));
    out.push_str(&format!("**Model:** {}\n", report.model));
    out.push_str(&format!("**Run:** {}\n\n", report.run_id));
    out.push_str(&format!("Total Tasks: {}\n", summary.tasks));
    out.push_str(&format!("Correct: {}\n", summary.correct));
    out.push_str(&format!(
        "Accuracy: {:.2}% (95% CI {:.2}%-{:.2}%)\n",
        summary.accuracy * 100.0,
        summary.accuracy_ci.0 * 100.0,
        summary.accuracy_ci.1 * 100.0
    ));
    out.push_str(&format!(
        "Empty predictions: {} ({:.2}%)\n",
        summary.empty_predictions,
        summary.empty_rate * 100.0
    ));
    if let Some(avg) = summary.avg_confidence {
        out.push_str(&format!("Average vote confidence: {:.2}\n", avg));
    }
    out.push_str("\n---\n\n");

    for outcome in &report.outcomes {
        let status = if outcome.correct {
            "CORRECT"
        } else {
            "INCORRECT"
        };
        out.push_str(&format!("## Task {} {}\n\n", outcome.task_index + 1, status));

        out.push_str("### Expected Output\n\n");
        out.push_str(&format_grid_markdown(&outcome.expected, None));
        out.push_str("\n\n### Predicted Output\n\n");
        match &outcome.predicted {
            Some(predicted) => {
                out.push_str(&format_grid_markdown(predicted, Some(&outcome.expected)));
            }
            None => out.push_str("*No grid could be extracted from the model output.*"),
        }
        out.push('\n');

        if let Some(consensus) = &outcome.consensus {
            out.push_str(&format!(
                "\nVotes: {}/{} valid, winner x{}, confidence {:.2}\n",
                consensus.valid_samples,
                consensus.total_samples,
                consensus.winning_count,
                consensus.confidence
            ));
        }

        out.push_str("\n---\n\n");
    }

    out
}

/// Render a dataset visualization: every task's training pairs and test input.
pub fn render_dataset(tasks: &[TaskRecord]) -> String {
    let mut out = String::new();
    out.push_str("# ARC Training Examples Visualization\n\n");
    out.push_str(&format!("Total Tasks: {}\n\n---\n\n", tasks.len()));

    for (task_idx, task) in tasks.iter().enumerate() {
        out.push_str(&format!("## Task {}\n\n", task_idx + 1));
        out.push_str(&format!(
            "**Number of Training Examples: {}**\n\n",
            task.train.len()
        ));

        for (ex_idx, pair) in task.train.iter().enumerate() {
            out.push_str(&format!("### Example {}\n\n", ex_idx + 1));
            out.push_str("#### Input\n\n");
            out.push_str(&format_grid_markdown(&pair.input, None));
            out.push_str("\n\n#### Output\n\n");
            out.push_str(&format_grid_markdown(&pair.output, None));
            out.push_str("\n\n");
        }

        if let Some(test_input) = task.test_input() {
            out.push_str("### Test Input (No Output)\n\n");
            out.push_str(&format_grid_markdown(test_input, None));
            out.push_str("\n\n");
        }

        out.push_str("---\n\n");
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::GridPair;
    use crate::results::{Summary, TaskOutcome};
    use chrono::Utc;
    use uuid::Uuid;

    fn grid(rows: &[&[i64]]) -> Grid {
        Grid::new(rows.iter().map(|r| r.to_vec()).collect())
    }

    #[test]
    fn test_format_grid_markdown_plain() {
        let g = grid(&[&[1, 2], &[3, 4]]);
        assert_eq!(format_grid_markdown(&g, None), "| 1 | 2 | \n| 3 | 4 | ");
    }

    #[test]
    fn test_format_grid_markdown_marks_differences() {
        let predicted = grid(&[&[1, 9]]);
        let expected = grid(&[&[1, 2]]);
        let rendered = format_grid_markdown(&predicted, Some(&expected));
        assert!(rendered.contains("***9***"));
        assert!(!rendered.contains("***1***"));
    }

    #[test]
    fn test_format_grid_markdown_shape_mismatch() {
        // Cells beyond the expected grid's bounds render unmarked.
        let predicted = grid(&[&[1, 2, 3], &[4, 5, 6]]);
        let expected = grid(&[&[1]]);
        let rendered = format_grid_markdown(&predicted, Some(&expected));
        assert!(rendered.contains("| 6 | "));
        assert!(!rendered.contains("***6***"));
    }

    #[test]
    fn test_render_report_sections() {
        let outcomes = vec![
            TaskOutcome {
                task_index: 0,
                predicted: Some(grid(&[&[1]])),
                expected: grid(&[&[1]]),
                correct: true,
                consensus: None,
                duration_ms: 5,
            },
            TaskOutcome {
                task_index: 1,
                predicted: None,
                expected: grid(&[&[2]]),
                correct: false,
                consensus: None,
                duration_ms: 5,
            },
        ];
        let report = EvalReport {
            run_id: Uuid::new_v4(),
            model: "test-model".to_string(),
            prompt_version: "fewshot_cot".to_string(),
            samples_per_task: 1,
            started_at: Utc::now(),
            ended_at: Utc::now(),
            summary: Summary::from_outcomes(&outcomes),
            outcomes,
        };

        let md = render_report(&report);
        assert!(md.contains("# ARC Task Results - fewshot_cot"));
        assert!(md.contains("## Task 1 CORRECT"));
        assert!(md.contains("## Task 2 INCORRECT"));
        assert!(md.contains("No grid could be extracted"));
        assert!(md.contains("Accuracy: 50.00%"));
    }

    #[test]
    fn test_render_dataset() {
        let tasks = vec![TaskRecord {
            train: vec![GridPair {
                input: grid(&[&[0]]),
                output: grid(&[&[1]]),
            }],
            test: vec![GridPair {
                input: grid(&[&[2]]),
                output: grid(&[&[3]]),
            }],
        }];

        let md = render_dataset(&tasks);
        assert!(md.contains("## Task 1"));
        assert!(md.contains("### Example 1"));
        assert!(md.contains("### Test Input (No Output)"));
        assert!(md.contains("| 2 | "));
    }
}
