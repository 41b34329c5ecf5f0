//! ARC Grid Experiment CLI.
//!
//! Commands:
//! - eval: Run an evaluation against a model backend
//! - report: Render a saved results file as markdown
//! - show: Render a dataset as a markdown visualization
//! - parse: Extract a grid from a free-text file (extraction debugging)

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use arc_experiment::dataset::load_jsonl;
use arc_experiment::llm_client::SamplingConfig;
use arc_experiment::prompt::PromptVersion;
use arc_experiment::report::{render_dataset, render_report};
use arc_experiment::results::{timestamped_path, EvalReport};
use arc_experiment::runner::{EvalRunner, EvalRunnerConfig};

#[derive(Parser)]
#[command(name = "arc-experiment")]
#[command(version)]
#[command(about = "ARC grid-reasoning evaluation experiments")]
struct Cli {
    /// Model backend base URL (any OpenAI-compatible server)
    #[arg(long = "base-url", env = "LLM_BASE_URL", default_value = "http://localhost:8000")]
    base_url: String,

    /// Bearer token for the backend, if it requires one
    #[arg(long = "api-key", env = "LLM_API_KEY")]
    api_key: Option<String>,

    /// Model name
    #[arg(long, default_value = "Qwen/Qwen2.5-7B-Instruct")]
    model: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an evaluation over a JSONL dataset
    Eval {
        /// Dataset file (one task per line)
        #[arg(long)]
        data: PathBuf,

        /// Prompt strategy: simple, cot, consistency, program, reflexion (or v1-v5)
        #[arg(long, default_value = "cot")]
        version: String,

        /// Samples per task (self-consistency only)
        #[arg(long, default_value = "5")]
        samples: usize,

        /// Evaluate only the first N tasks
        #[arg(long)]
        limit: Option<usize>,

        /// Maximum concurrent requests when sampling
        #[arg(long, default_value = "4")]
        concurrency: usize,

        /// Maximum tokens per completion
        #[arg(long, default_value = "1000")]
        max_tokens: u32,

        /// Decoding temperature for single-shot strategies
        #[arg(long, default_value = "0.0")]
        temperature: f32,

        /// Output file for results
        #[arg(long, default_value = "results.json")]
        output: PathBuf,
    },

    /// Render a saved results file as a markdown comparison report
    Report {
        /// Results file produced by `eval`
        #[arg(long)]
        results: PathBuf,

        /// Output markdown file (stdout when omitted)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Render a dataset as a markdown visualization
    Show {
        /// Dataset file (one task per line)
        #[arg(long)]
        data: PathBuf,

        /// Output markdown file (stdout when omitted)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Extract a grid from a free-text file
    Parse {
        /// File containing a model reply (or any text)
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .compact()
        .init();

    match cli.command {
        Commands::Eval {
            data,
            version,
            samples,
            limit,
            concurrency,
            max_tokens,
            temperature,
            output,
        } => {
            let version = PromptVersion::parse(&version)?;
            let mut tasks = load_jsonl(&data)?;
            if let Some(limit) = limit {
                tasks.truncate(limit);
            }

            info!(
                tasks = tasks.len(),
                version = version.name(),
                model = %cli.model,
                "Starting evaluation"
            );

            let config = EvalRunnerConfig {
                base_url: cli.base_url,
                api_key: cli.api_key,
                model: cli.model,
                version,
                samples,
                max_concurrent_llm: concurrency,
                sampling: SamplingConfig {
                    temperature,
                    max_tokens,
                    ..SamplingConfig::greedy()
                },
            };

            let runner = EvalRunner::new(config);
            let report = runner.run(&tasks).await?;

            let output_path = timestamped_path(&output);
            report.save(&output_path)?;

            let summary = &report.summary;
            println!("\n=== Evaluation Complete ===");
            println!("Model: {}", report.model);
            println!("Strategy: {}", report.prompt_version);
            println!("Tasks: {}", summary.tasks);
            println!("Correct: {}", summary.correct);
            println!(
                "Accuracy: {:.1}% (95% CI {:.1}%-{:.1}%)",
                summary.accuracy * 100.0,
                summary.accuracy_ci.0 * 100.0,
                summary.accuracy_ci.1 * 100.0
            );
            println!(
                "Empty predictions: {} ({:.1}%)",
                summary.empty_predictions,
                summary.empty_rate * 100.0
            );
            if let Some(avg) = summary.avg_confidence {
                println!("Avg vote confidence: {:.2}", avg);
            }
            println!("Results saved to: {}", output_path.display());
        }

        Commands::Report { results, output } => {
            let report = EvalReport::load(&results)
                .with_context(|| format!("failed to load results {}", results.display()))?;
            let markdown = render_report(&report);
            write_or_print(output, &markdown)?;
        }

        Commands::Show { data, output } => {
            let tasks = load_jsonl(&data)?;
            let markdown = render_dataset(&tasks);
            write_or_print(output, &markdown)?;
        }

        Commands::Parse { file } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            match grid_kernel::parse_prediction(&text) {
                Some(grid) => println!("{}", grid.to_literal()),
                None => {
                    println!("No grid found");
                }
            }
        }
    }

    Ok(())
}

fn write_or_print(output: Option<PathBuf>, markdown: &str) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(&path, markdown)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Written to: {}", path.display());
        }
        None => print!("{}", markdown),
    }
    Ok(())
}
