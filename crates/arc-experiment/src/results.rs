//! Results collection and summary statistics for evaluation runs.
//!
//! Captures per-task outcomes plus run-level metrics:
//! - Exact-match accuracy with standard error and a 95% CI
//! - Empty-prediction rate (extraction failures are a metric, not a crash)
//! - Average vote confidence for self-consistency runs

use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use grid_kernel::{ConsensusResult, Grid};

/// Outcome of evaluating a single task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskOutcome {
    /// Index of the task in the dataset
    pub task_index: usize,
    /// The model's prediction, or `None` when no grid could be extracted
    pub predicted: Option<Grid>,
    /// Ground-truth output grid
    pub expected: Grid,
    /// Exact structural match
    pub correct: bool,
    /// Voting statistics (self-consistency runs only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consensus: Option<ConsensusResult>,
    /// Wall-clock duration of this task's evaluation
    pub duration_ms: u64,
}

impl TaskOutcome {
    /// Whether extraction failed to produce any grid.
    pub fn is_empty_prediction(&self) -> bool {
        self.predicted.is_none()
    }
}

/// Run-level summary statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    pub tasks: usize,
    pub correct: usize,
    /// Exact-match rate over all tasks
    pub accuracy: f64,
    /// Standard error of accuracy: sqrt(p(1-p)/n)
    pub accuracy_se: f64,
    /// 95% confidence interval for accuracy: (lower, upper)
    pub accuracy_ci: (f64, f64),
    pub empty_predictions: usize,
    pub empty_rate: f64,
    /// Mean vote confidence across tasks (self-consistency runs only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_confidence: Option<f64>,
}

impl Summary {
    /// Compute summary statistics from task outcomes.
    pub fn from_outcomes(outcomes: &[TaskOutcome]) -> Self {
        let tasks = outcomes.len();
        let n = tasks as f64;
        let correct = outcomes.iter().filter(|o| o.correct).count();
        let empty_predictions = outcomes.iter().filter(|o| o.is_empty_prediction()).count();

        if tasks == 0 {
            return Self {
                tasks: 0,
                correct: 0,
                accuracy: 0.0,
                accuracy_se: 0.0,
                accuracy_ci: (0.0, 0.0),
                empty_predictions: 0,
                empty_rate: 0.0,
                avg_confidence: None,
            };
        }

        let accuracy = correct as f64 / n;

        // Standard error for a proportion: SE = sqrt(p(1-p)/n)
        let accuracy_se = if tasks > 1 {
            (accuracy * (1.0 - accuracy) / n).sqrt()
        } else {
            0.0
        };

        // 95% CI: p ± 1.96 * SE, clamped to [0, 1]
        let z = 1.96;
        let accuracy_ci = (
            (accuracy - z * accuracy_se).max(0.0),
            (accuracy + z * accuracy_se).min(1.0),
        );

        let confidences: Vec<f64> = outcomes
            .iter()
            .filter_map(|o| o.consensus.as_ref())
            .map(|c| c.confidence)
            .collect();
        let avg_confidence = if confidences.is_empty() {
            None
        } else {
            Some(confidences.iter().sum::<f64>() / confidences.len() as f64)
        };

        Self {
            tasks,
            correct,
            accuracy,
            accuracy_se,
            accuracy_ci,
            empty_predictions,
            empty_rate: empty_predictions as f64 / n,
            avg_confidence,
        }
    }
}

/// Complete results of one evaluation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalReport {
    /// Unique identifier for this run
    pub run_id: Uuid,
    /// Model that was evaluated
    pub model: String,
    /// Prompt strategy name
    pub prompt_version: String,
    /// Samples per task (1 except for self-consistency)
    pub samples_per_task: usize,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub outcomes: Vec<TaskOutcome>,
    pub summary: Summary,
}

impl EvalReport {
    /// Save the report to a pretty-printed JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load a report from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let report = serde_json::from_str(&json)?;
        Ok(report)
    }
}

/// Generate a timestamped output path from the given path.
/// e.g., "results.json" -> "results-20260830-010530.json"
pub fn timestamped_path(path: &Path) -> PathBuf {
    let timestamp = Local::now().format("%Y%m%d-%H%M%S");
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("results");
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("json");
    let parent = path.parent().unwrap_or(Path::new("."));
    parent.join(format!("{}-{}.{}", stem, timestamp, ext))
}
