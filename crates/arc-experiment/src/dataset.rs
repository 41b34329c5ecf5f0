//! JSONL dataset loading for ARC tasks.
//!
//! Each line of the dataset is one task: a handful of train input/output
//! pairs demonstrating a transformation, plus at least one test pair the
//! model is evaluated on.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use grid_kernel::Grid;

/// One demonstrated input/output grid pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridPair {
    pub input: Grid,
    pub output: Grid,
}

/// A single ARC task record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    /// Few-shot demonstrations of the transformation rule.
    pub train: Vec<GridPair>,
    /// Held-out pairs; the harness evaluates the first entry.
    pub test: Vec<GridPair>,
}

impl TaskRecord {
    /// The test input presented to the model.
    pub fn test_input(&self) -> Option<&Grid> {
        self.test.first().map(|pair| &pair.input)
    }

    /// The ground-truth output for the evaluated test entry.
    pub fn ground_truth(&self) -> Option<&Grid> {
        self.test.first().map(|pair| &pair.output)
    }
}

/// Load all tasks from a JSONL file, skipping blank lines.
pub fn load_jsonl(path: impl AsRef<Path>) -> Result<Vec<TaskRecord>> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read dataset {}", path.display()))?;

    let mut tasks = Vec::new();
    for (lineno, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let task: TaskRecord = serde_json::from_str(line).with_context(|| {
            format!("invalid task record at {}:{}", path.display(), lineno + 1)
        })?;
        tasks.push(task);
    }

    Ok(tasks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_dataset(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_jsonl() {
        let file = write_dataset(concat!(
            r#"{"train":[{"input":[[0]],"output":[[1]]}],"test":[{"input":[[2]],"output":[[3]]}]}"#,
            "\n\n",
            r#"{"train":[],"test":[{"input":[[4,5]],"output":[[5,4]]}]}"#,
            "\n",
        ));

        let tasks = load_jsonl(file.path()).unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].train.len(), 1);
        assert_eq!(
            tasks[0].test_input().unwrap(),
            &Grid::new(vec![vec![2]])
        );
        assert_eq!(
            tasks[1].ground_truth().unwrap(),
            &Grid::new(vec![vec![5, 4]])
        );
    }

    #[test]
    fn test_load_jsonl_bad_line_reports_position() {
        let file = write_dataset("{\"train\":[],\"test\":[]}\nnot json\n");
        let err = load_jsonl(file.path()).unwrap_err();
        assert!(err.to_string().contains(":2"));
    }

    #[test]
    fn test_load_jsonl_missing_file() {
        assert!(load_jsonl("/nonexistent/data.jsonl").is_err());
    }

    #[test]
    fn test_empty_test_list() {
        let task = TaskRecord {
            train: vec![],
            test: vec![],
        };
        assert!(task.test_input().is_none());
        assert!(task.ground_truth().is_none());
    }
}
