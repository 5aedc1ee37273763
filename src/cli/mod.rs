//! CLI module for the metatest harness
//!
//! ## Commands
//!
//! - `run <NAME>` - Run a test file or directory under the assets root
//! - `inline <PATH=SOURCE>...` - Compose a throwaway test project and run it
//! - `strip-ansi [FILE]` - Remove terminal escape sequences from a file or stdin
//!
//! ## Design
//!
//! The CLI uses clap for argument parsing with derive macros.
//! Command functions return `CliResult<T>` instead of calling `process::exit`.
//! Only the top-level `run()` function handles errors and exits.
//! A finished runner invocation exits with the runner's own exit code.

// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod commands;

use std::fmt;
use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand};

use crate::error::HarnessError;

// ============================================================================
// CLI Error handling
// ============================================================================

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    pub const FAILURE: ExitCode = ExitCode(1);
}

/// Error type for CLI operations.
///
/// Contains a user-facing message and an exit code. The CLI entry point
/// catches these errors, prints the message, and exits with the code.
#[derive(Debug)]
pub struct CliError {
    /// User-facing error message (already formatted for display)
    pub message: String,
    /// Exit code to return to the shell
    pub exit_code: ExitCode,
}

impl CliError {
    /// Create a new CLI error with a message and exit code.
    pub fn new(message: impl Into<String>, exit_code: ExitCode) -> Self {
        Self {
            message: message.into(),
            exit_code,
        }
    }

    /// Create a failure error (exit code 1).
    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::FAILURE)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

impl From<HarnessError> for CliError {
    fn from(err: HarnessError) -> Self {
        // Render through miette so codes and help text reach the terminal.
        CliError::failure(format!("{:?}", miette::Report::new(err)))
    }
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// Clap CLI definition
// ============================================================================

/// Drive an external test runner and report what it did
#[derive(Parser, Debug)]
#[command(name = "metatest")]
#[command(version = VERSION)]
#[command(about = "Drive an external test runner and report what it did", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Options shared by the commands that start the runner.
#[derive(Args, Debug, Clone, Default)]
pub struct RunFlags {
    /// Runner option, rendered as `--KEY=VALUE` (or `--KEY` without a value); repeat a key to repeat the flag
    #[arg(short = 'o', long = "option", value_name = "KEY[=VALUE]")]
    pub options: Vec<String>,

    /// Raw argument appended after the options
    #[arg(short = 'a', long = "arg", value_name = "ARG", allow_hyphen_values = true)]
    pub args: Vec<String>,

    /// Variable added to the runner's environment
    #[arg(short = 'e', long = "env", value_name = "KEY=VALUE")]
    pub env: Vec<String>,

    /// Runner command, overriding METATEST_RUNNER
    #[arg(long, value_name = "COMMAND")]
    pub runner: Option<String>,

    /// Mirror runner output while it runs
    #[arg(long)]
    pub debug: bool,

    /// Print the full result as JSON instead of a summary
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a test file or directory under the assets root
    Run {
        /// File or directory name, relative to the assets root
        #[arg(value_name = "NAME")]
        name: String,
        /// Assets root, overriding METATEST_ASSETS
        #[arg(long, value_name = "DIR")]
        assets: Option<PathBuf>,
        #[command(flatten)]
        flags: RunFlags,
    },

    /// Compose a test project from inline files and run it
    Inline {
        /// File as PATH=SOURCE, or PATH=@FILE to copy FILE's content
        #[arg(value_name = "PATH=SOURCE", required = true)]
        files: Vec<String>,
        /// Use the fixture-composition header instead of the test header
        #[arg(long)]
        fixtures: bool,
        #[command(flatten)]
        flags: RunFlags,
    },

    /// Remove terminal escape sequences from a file or stdin
    StripAnsi {
        /// Input file (default: stdin)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
        /// Print only the first stack frame of the stripped text
        #[arg(long)]
        first_frame: bool,
    },
}

// ============================================================================
// CLI entry point
// ============================================================================

/// Main CLI entry point.
///
/// This is the only place where `process::exit` is called. All command
/// implementations return `CliResult` and errors are handled here.
pub fn run() {
    let cli = Cli::parse();

    match execute(cli) {
        Ok(exit_code) => {
            if exit_code.0 != 0 {
                process::exit(exit_code.0);
            }
        }
        Err(e) => {
            if !e.message.is_empty() {
                eprintln!("{}", e.message);
            }
            process::exit(e.exit_code.0);
        }
    }
}

/// Execute the CLI command and return result.
fn execute(cli: Cli) -> CliResult<ExitCode> {
    match cli.command {
        Command::Run { name, assets, flags } => commands::run_from_disk(&name, assets, &flags),
        Command::Inline { files, fixtures, flags } => commands::run_inline_files(&files, fixtures, &flags),
        Command::StripAnsi { file, first_frame } => commands::strip_ansi_file(file.as_deref(), first_frame),
    }
}

// ============================================================================
// Tests
// ============================================================================
