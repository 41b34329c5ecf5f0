//! ARC Experiment: evaluating grid-transformation reasoning in language models.
//!
//! This crate wraps the pure `grid-kernel` core with everything a benchmark
//! run needs: JSONL dataset loading, five prompt strategies, an
//! OpenAI-compatible chat client, the evaluation runner (including
//! self-consistency sampling and the reflexion chain), results collection,
//! and markdown reporting.

pub mod dataset;
pub mod llm_client;
pub mod prompt;
pub mod report;
pub mod results;
pub mod runner;
