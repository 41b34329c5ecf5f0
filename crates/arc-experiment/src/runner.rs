//! Evaluation runner: drives the full pipeline per task.
//!
//! For each task: build the prompt, query the model, parse the reply into a
//! grid (or run the consensus vote / transform program / reflexion chain,
//! depending on the strategy), and compare against the ground truth. A
//! failing task never aborts the run; it is recorded as an empty, incorrect
//! prediction.

use std::time::Instant;

use anyhow::{Context, Result};
use chrono::Utc;
use regex::Regex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use grid_kernel::{aggregate, parse_prediction, run_transform, ConsensusResult, Grid};

use crate::dataset::TaskRecord;
use crate::llm_client::{LlmClient, SamplingConfig};
use crate::prompt::{construct_prompt, predict_prompt, verify_prompt, PromptVersion};
use crate::results::{EvalReport, Summary, TaskOutcome};

/// Configuration for an evaluation run.
#[derive(Debug, Clone)]
pub struct EvalRunnerConfig {
    /// Backend base URL
    pub base_url: String,
    /// Bearer token, if the backend requires one
    pub api_key: Option<String>,
    /// Model name
    pub model: String,
    /// Prompt strategy
    pub version: PromptVersion,
    /// Samples per task (self-consistency only; others use 1)
    pub samples: usize,
    /// Maximum concurrent requests when sampling
    pub max_concurrent_llm: usize,
    /// Sampling parameters for single-shot calls
    pub sampling: SamplingConfig,
}

impl Default for EvalRunnerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            api_key: None,
            model: "Qwen/Qwen2.5-7B-Instruct".to_string(),
            version: PromptVersion::FewShotCot,
            samples: 5,
            max_concurrent_llm: 4,
            sampling: SamplingConfig::greedy(),
        }
    }
}

/// The evaluation runner.
pub struct EvalRunner {
    config: EvalRunnerConfig,
    client: LlmClient,
}

impl EvalRunner {
    /// Create a runner from a configuration.
    pub fn new(config: EvalRunnerConfig) -> Self {
        let client = LlmClient::new(&config.base_url, config.api_key.clone());
        Self { config, client }
    }

    /// Evaluate every task and collect a report.
    pub async fn run(&self, tasks: &[TaskRecord]) -> Result<EvalReport> {
        let started_at = Utc::now();
        let mut outcomes = Vec::with_capacity(tasks.len());

        info!(
            model = %self.config.model,
            version = self.config.version.name(),
            tasks = tasks.len(),
            "Starting evaluation"
        );

        for (idx, task) in tasks.iter().enumerate() {
            let outcome = self.evaluate_task(idx, task).await;
            info!(
                task = idx,
                correct = outcome.correct,
                empty = outcome.is_empty_prediction(),
                duration_ms = outcome.duration_ms,
                "Task evaluated"
            );
            outcomes.push(outcome);
        }

        let summary = Summary::from_outcomes(&outcomes);
        Ok(EvalReport {
            run_id: Uuid::new_v4(),
            model: self.config.model.clone(),
            prompt_version: self.config.version.name().to_string(),
            samples_per_task: match self.config.version {
                PromptVersion::SelfConsistency => self.config.samples,
                _ => 1,
            },
            started_at,
            ended_at: Utc::now(),
            outcomes,
            summary,
        })
    }

    /// Evaluate one task; faults become empty predictions, never errors.
    async fn evaluate_task(&self, idx: usize, task: &TaskRecord) -> TaskOutcome {
        let start = Instant::now();

        let Some(expected) = task.ground_truth().cloned() else {
            warn!(task = idx, "task has no test entry, counting as incorrect");
            return TaskOutcome {
                task_index: idx,
                predicted: None,
                expected: Grid::new(vec![vec![0]]),
                correct: false,
                consensus: None,
                duration_ms: start.elapsed().as_millis() as u64,
            };
        };

        let (predicted, consensus) = match self.predict(task).await {
            Ok(result) => result,
            Err(err) => {
                warn!(task = idx, error = %err, "prediction failed, counting as empty");
                (None, None)
            }
        };

        let correct = predicted.as_ref() == Some(&expected);
        TaskOutcome {
            task_index: idx,
            predicted,
            expected,
            correct,
            consensus,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    /// Run the strategy-specific prediction pipeline for one task.
    async fn predict(&self, task: &TaskRecord) -> Result<(Option<Grid>, Option<ConsensusResult>)> {
        match self.config.version {
            PromptVersion::Simple | PromptVersion::FewShotCot => {
                let messages = construct_prompt(task, self.config.version);
                let reply = self
                    .client
                    .chat(&self.config.model, &messages, self.config.sampling)
                    .await?;
                Ok((parse_prediction(&reply), None))
            }

            PromptVersion::SelfConsistency => {
                let messages = construct_prompt(task, self.config.version);
                let replies = self
                    .client
                    .sample_many(
                        &self.config.model,
                        &messages,
                        SamplingConfig::consistency(),
                        self.config.samples,
                        self.config.max_concurrent_llm,
                    )
                    .await;

                let samples: Vec<Option<Grid>> =
                    replies.iter().map(|r| parse_prediction(r)).collect();
                let consensus = aggregate(&samples);
                debug!(
                    valid = consensus.valid_samples,
                    total = consensus.total_samples,
                    confidence = consensus.confidence,
                    "Consensus vote complete"
                );
                Ok((consensus.winning_grid.clone(), Some(consensus)))
            }

            PromptVersion::ProgramAided => {
                let input = task
                    .test_input()
                    .context("task has no test input for transform evaluation")?;
                let messages = construct_prompt(task, self.config.version);
                let reply = self
                    .client
                    .chat(&self.config.model, &messages, self.config.sampling)
                    .await?;
                Ok((run_transform(&reply, input), None))
            }

            PromptVersion::Reflexion => {
                let prediction = self.run_reflexion_chain(task).await?;
                Ok((prediction, None))
            }
        }
    }

    /// The V5 chain: hypothesize, verify against the train pairs, predict.
    async fn run_reflexion_chain(&self, task: &TaskRecord) -> Result<Option<Grid>> {
        let messages = construct_prompt(task, PromptVersion::Reflexion);
        let reply = self
            .client
            .chat(&self.config.model, &messages, self.config.sampling)
            .await?;
        let hypothesis = extract_hypothesis(&reply);
        debug!(hypothesis = %hypothesis, "Hypothesis proposed");

        let messages = verify_prompt(task, &hypothesis);
        let verdict = self
            .client
            .chat(&self.config.model, &messages, self.config.sampling)
            .await?;

        let final_hypothesis = if verification_passed(&verdict) {
            hypothesis
        } else {
            match extract_correction(&verdict) {
                Some(corrected) => {
                    debug!(corrected = %corrected, "Hypothesis corrected after verification");
                    corrected
                }
                None => hypothesis,
            }
        };

        let messages = predict_prompt(task, &final_hypothesis);
        let reply = self
            .client
            .chat(&self.config.model, &messages, self.config.sampling)
            .await?;
        Ok(parse_prediction(&reply))
    }
}

// Reflexion reply parsing

/// Extract the text after a `HYPOTHESIS:` tag, up to a blank line or the end
/// of the reply. Falls back to the whole (trimmed) reply when the tag is
/// missing, since an untagged hypothesis is still usable downstream.
pub fn extract_hypothesis(text: &str) -> String {
    if let Some(found) = capture_tagged_section(text, "HYPOTHESIS:") {
        return found;
    }
    text.trim().to_string()
}

/// Whether the verification reply declares the hypothesis sound.
pub fn verification_passed(text: &str) -> bool {
    text.contains("VERIFICATION: PASSED")
}

/// Extract a corrected hypothesis from a failed verification reply.
///
/// Prefers an explicit `CORRECTED HYPOTHESIS:` section; falls back to the
/// `ERROR ANALYSIS:` section, which at least tells the prediction step what
/// went wrong with the original rule.
pub fn extract_correction(text: &str) -> Option<String> {
    capture_tagged_section(text, "CORRECTED HYPOTHESIS:")
        .or_else(|| capture_tagged_section(text, "ERROR ANALYSIS:"))
}

fn capture_tagged_section(text: &str, tag: &str) -> Option<String> {
    let pattern = format!(r"(?s){}\s*(.*?)(?:\n\n|$)", regex::escape(tag));
    let re = Regex::new(&pattern).ok()?;
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}
