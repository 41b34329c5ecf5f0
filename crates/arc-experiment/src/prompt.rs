//! Prompt construction strategies.
//!
//! Five strategies of increasing sophistication, mirroring the benchmark's
//! ladder: plain prediction, few-shot chain-of-thought, self-consistency
//! (same prompt, many samples), program-aided (the model writes a
//! transformation program the kernel evaluates), and a two-chain
//! reflexion flow (hypothesize, verify, predict).

use anyhow::Result;

use grid_kernel::Grid;

use crate::dataset::TaskRecord;
use crate::llm_client::ChatMessage;

/// Which prompt strategy to use for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptVersion {
    /// V1: direct prediction from examples
    Simple,
    /// V2: few-shot with chain-of-thought and a marked OUTPUT line
    FewShotCot,
    /// V3: the V2 prompt sampled many times and settled by voting
    SelfConsistency,
    /// V4: the model writes a transformation program instead of a grid
    ProgramAided,
    /// V5: hypothesis, verification against train pairs, then prediction
    Reflexion,
}

impl PromptVersion {
    /// All versions, for sweep runs.
    pub fn all() -> Vec<Self> {
        vec![
            Self::Simple,
            Self::FewShotCot,
            Self::SelfConsistency,
            Self::ProgramAided,
            Self::Reflexion,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::FewShotCot => "fewshot_cot",
            Self::SelfConsistency => "self_consistency",
            Self::ProgramAided => "program_aided",
            Self::Reflexion => "reflexion",
        }
    }

    /// Parse a version from a CLI string.
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "v1" | "simple" => Ok(Self::Simple),
            "v2" | "cot" | "fewshot_cot" | "fewshot-cot" => Ok(Self::FewShotCot),
            "v3" | "consistency" | "self_consistency" | "self-consistency" => {
                Ok(Self::SelfConsistency)
            }
            "v4" | "program" | "program_aided" | "program-aided" | "pal" => Ok(Self::ProgramAided),
            "v5" | "reflexion" => Ok(Self::Reflexion),
            _ => anyhow::bail!(
                "unknown prompt version: {}. Valid: simple, cot, consistency, program, reflexion",
                s
            ),
        }
    }
}

/// Build the messages for a task under the given strategy.
///
/// `Reflexion` returns its first chain (the hypothesis prompt); the runner
/// drives the rest of the chain with [`verify_prompt`] and
/// [`predict_prompt`].
pub fn construct_prompt(task: &TaskRecord, version: PromptVersion) -> Vec<ChatMessage> {
    match version {
        PromptVersion::Simple => simple_prompt(task),
        PromptVersion::FewShotCot | PromptVersion::SelfConsistency => cot_prompt(task),
        PromptVersion::ProgramAided => program_prompt(task),
        PromptVersion::Reflexion => hypothesis_prompt(task),
    }
}

fn shape_of(grid: &Grid) -> String {
    let cols = grid.rows().first().map(Vec::len).unwrap_or(0);
    format!("{}x{}", grid.row_count(), cols)
}

/// Render the training pairs as numbered literal blocks.
fn render_train_pairs(task: &TaskRecord, with_shapes: bool) -> String {
    let mut out = String::new();
    for (i, pair) in task.train.iter().enumerate() {
        if with_shapes {
            out.push_str(&format!(
                "Training Example {}:\nInput (shape {}):\n{}\nOutput (shape {}):\n{}\n\n",
                i + 1,
                shape_of(&pair.input),
                pair.input.to_literal(),
                shape_of(&pair.output),
                pair.output.to_literal()
            ));
        } else {
            out.push_str(&format!(
                "Example {}:\nInput:\n{}\nOutput:\n{}\n\n",
                i + 1,
                pair.input.to_literal(),
                pair.output.to_literal()
            ));
        }
    }
    out
}

fn test_input_literal(task: &TaskRecord) -> String {
    task.test_input().map(Grid::to_literal).unwrap_or_default()
}

/// V1: direct prediction.
fn simple_prompt(task: &TaskRecord) -> Vec<ChatMessage> {
    let system = "You are an expert at solving visual reasoning tasks. Given input and \
        output grid examples, identify the transformation rule and apply it to predict \
        the output for new inputs.";

    let user = format!(
        "Here are training examples:\n\n{}Now predict the output for this test input:\nInput:\n{}\nOutput (as a 2D list):\n",
        render_train_pairs(task, false),
        test_input_literal(task)
    );

    vec![ChatMessage::system(system), ChatMessage::user(user)]
}

/// V2/V3: few-shot chain-of-thought ending in a marked OUTPUT line.
fn cot_prompt(task: &TaskRecord) -> Vec<ChatMessage> {
    let system = "You are an expert at visual reasoning and pattern analysis.\n\
        Your task is to:\n\
        1. Analyze the training examples carefully\n\
        2. Identify the transformation rule by comparing inputs and outputs\n\
        3. Write down your observations and reasoning in natural language\n\
        4. Then apply the rule to predict the test output\n\n\
        IMPORTANT: Your OUTPUT must be ONLY a valid 2D list of integers, nothing else after the final ]]\n\
        Example format: [[0,1,2],[3,4,5],[6,7,8]]";

    let test_input = task.test_input();
    let test_shape = test_input.map(shape_of).unwrap_or_default();

    let user = format!(
        "Analyze these training examples to identify the transformation pattern:\n\n\
        {}Test Input (shape {}):\n{}\n\n\
        TASK: Analyze step by step and provide your final answer.\n\n\
        Step 1: OBSERVATIONS\nWhat patterns do you notice? How does each input transform to output?\n\n\
        Step 2: PATTERN RULE\nState the exact transformation rule clearly and concisely.\n\n\
        Step 3: REASONING\nHow does this rule apply to the test input? Show your work.\n\n\
        Step 4: OUTPUT (REQUIRED - Last line must be the 2D list only)\n\
        Compute the predicted output grid.\n\
        Your final output MUST be exactly in this format (no other text after this):\n\
        OUTPUT: [[...],[...],...]\n\n\
        CRITICAL: After \"OUTPUT:\", immediately provide ONLY the 2D list of integers with no additional text.",
        render_train_pairs(task, true),
        test_shape,
        test_input_literal(task)
    );

    vec![ChatMessage::system(system), ChatMessage::user(user)]
}

/// V4: ask for a transformation program in the kernel's restricted language.
fn program_prompt(task: &TaskRecord) -> Vec<ChatMessage> {
    let system = "You are an expert at grid transformations and pattern analysis.\n\
        Instead of predicting the output grid directly, you will write a small \
        transformation program.\n\n\
        The program is a list of operations, one per line, applied top to bottom. \
        Allowed operations:\n\
        - identity\n\
        - transpose\n\
        - flip_horizontal (mirror each row left-right)\n\
        - flip_vertical (reverse the row order)\n\
        - rotate_cw / rotate_ccw / rotate_180\n\
        - replace OLD NEW (substitute one cell value for another)\n\
        - tile ROWS COLS (repeat the grid in a ROWS x COLS block)\n\n\
        Output ONLY the program, wrapped in a fenced code block:\n\
        ```transform\n\
        <one operation per line>\n\
        ```";

    let user = format!(
        "Analyze these training examples and write a transformation program:\n\n\
        {}Test Input:\n{}\n\n\
        Instructions:\n\
        1. Work out which sequence of allowed operations maps each training input to its output\n\
        2. Check the sequence against every training example\n\
        3. Output the program in a ```transform code block, nothing else",
        render_train_pairs(task, false),
        test_input_literal(task)
    );

    vec![ChatMessage::system(system), ChatMessage::user(user)]
}

/// V5 chain 1: propose a hypothesis from the training pairs.
pub fn hypothesis_prompt(task: &TaskRecord) -> Vec<ChatMessage> {
    let system = "You are an expert at analyzing patterns and transformation rules in \
        visual puzzles.\n\
        Your task is to examine the training examples and propose a clear hypothesis \
        about the transformation rule. Focus on being precise and testable.";

    let user = format!(
        "Analyze these training examples and propose a transformation rule:\n\n\
        {}Based on these examples, propose your hypothesis:\n\n\
        1. OBSERVATIONS: What patterns do you notice?\n\
        2. HYPOTHESIS: State your hypothesis about the transformation rule clearly and precisely.\n\n\
        Format your answer as:\n\
        OBSERVATIONS: [your observations]\n\
        HYPOTHESIS: [the transformation rule hypothesis]",
        render_train_pairs(task, false)
    );

    vec![ChatMessage::system(system), ChatMessage::user(user)]
}

/// V5 reflexion: verify the hypothesis against the training pairs.
pub fn verify_prompt(task: &TaskRecord, hypothesis: &str) -> Vec<ChatMessage> {
    let system = "You are an expert at validating hypotheses about transformation rules.\n\
        Your task is to:\n\
        1. Apply the given hypothesis to each training input\n\
        2. Check if the result matches the expected training output\n\
        3. If there's a mismatch, identify the error and suggest a correction";

    let user = format!(
        "Given this hypothesis:\n{}\n\nVerify it against the training examples:\n\n\
        {}Now verify the hypothesis:\n\n\
        For each example:\n\
        1. Apply the hypothesis to the input\n\
        2. Compare with the expected output\n\n\
        After checking all examples:\n\
        - If all match, respond: \"VERIFICATION: PASSED\"\n\
        - If any don't match, respond:\n\
          \"VERIFICATION: FAILED - ERROR ANALYSIS: [what's wrong] - CORRECTED HYPOTHESIS: [new hypothesis]\"",
        hypothesis,
        render_train_pairs(task, false)
    );

    vec![ChatMessage::system(system), ChatMessage::user(user)]
}

/// V5 chain 2: apply the (possibly corrected) hypothesis to the test input.
pub fn predict_prompt(task: &TaskRecord, hypothesis: &str) -> Vec<ChatMessage> {
    let system = "You are an expert at applying validated transformation rules to new \
        inputs. Apply the given rule precisely to generate the output.";

    let user = format!(
        "Using this validated transformation rule:\n{}\n\n\
        Apply it to the test input:\n\nTest Input:\n{}\n\n\
        Generate the output:\n\n\
        Apply the rule step by step and provide:\n\
        OUTPUT: [the predicted output as a 2D list]",
        hypothesis,
        test_input_literal(task)
    );

    vec![ChatMessage::system(system), ChatMessage::user(user)]
}
