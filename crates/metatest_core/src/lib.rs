//! Provide the pure, deterministic pieces of the metatest harness.
//!
//! Everything here is shared between the process-driving harness and its tests:
//! - how run options become command-line flags,
//! - the shape of the JSON report the external runner writes, and how it is flattened,
//! - how outcome counters are scraped from captured output,
//! - small text transforms (escape-sequence stripping, stack-frame lookup).
//!
//! ## Notes
//!
//! - This is a "core" crate: **no IO**, no global mutable state, no process handling.
//! - The harness crate owns subprocesses, files and configuration; it calls into these helpers.

pub mod metrics;
pub mod options;
pub mod report;
pub mod text;

pub use metrics::{OutcomeCounts, extract_counts};
pub use options::{OptionKind, RunOption, RunOptions};
pub use report::{JsonReport, JsonRun, JsonSpec, JsonSuite, JsonTest, flatten_runs};
pub use text::{first_stack_frame, marker_lines, strip_ansi};
