#![forbid(unsafe_code)]
//! Metatest: a harness for testing a test runner.
//!
//! The harness drives an external test runner as a subprocess, captures what it prints, and
//! reduces the JSON report it writes into a flat, typed [`RunResult`]. Tests can run fixtures
//! that already exist on disk or compose small test projects in memory.
//!
//! Pure pieces (run options, the report model, counter extraction, text helpers) live in
//! `metatest_core` and are re-exported here.
//!
//! ## Panic Policy
//!
//! This codebase follows explicit error handling:
//!
//! - **Production code**: Use `Result` or `Option` with `?` / `ok_or` / `map_err`. The `cli` module enforces
//!   `#![deny(clippy::unwrap_used)]`.
//!
//! - **Test code**: `.unwrap()` and `.expect()` are acceptable in tests.
//!
//! - **True invariants**: If a panic represents a harness bug (logic error), use `.expect("INVARIANT: reason")` with a
//!   clear explanation.

pub mod capture;
pub mod cli;
pub mod compose;
pub mod config;
pub mod error;
pub mod harness;
pub mod result;
pub mod runner;
pub mod scope;

pub use metatest_core::{
    JsonReport, JsonRun, JsonSpec, JsonSuite, JsonTest, OptionKind, OutcomeCounts, RunOption, RunOptions,
    extract_counts, first_stack_frame, flatten_runs, marker_lines, strip_ansi,
};

pub use compose::{FileContent, InlineFiles};
pub use config::{HarnessConfig, RunnerCommand};
pub use error::{HarnessError, HarnessResult, ReportError};
pub use harness::Harness;
pub use result::RunResult;
pub use runner::{Invocation, RunArgs};
pub use scope::{TestScope, TestStatus};
