//! Grid Kernel: answer extraction and consensus for ARC-style model output.
//!
//! This crate implements the pure core of the evaluation harness:
//! - Structural grid validation
//! - Layered extraction of a grid literal from free-form model text
//! - Marker-aware output location (`OUTPUT:` suffix first, whole text second)
//! - Self-consistency voting across independent samples
//! - A restricted evaluator for model-authored transformation programs
//!
//! Every function here is synchronous, side-effect-free, and total: a reply
//! that contains no usable answer is an outcome (`None`), never an error.

pub mod consensus;
pub mod extract;
pub mod grid;
pub mod locate;
pub mod transform;

pub use consensus::{aggregate, ConsensusResult};
pub use extract::extract_grid;
pub use grid::{is_valid_grid, Grid};
pub use locate::{locate_and_extract, parse_prediction, OUTPUT_MARKER};
pub use transform::{extract_program, run_transform};
