//! Process runner: builds the runner command line, spawns it, captures its output and reduces the
//! report it leaves behind.
//!
//! ## Command line
//!
//! ```text
//! <program> <runner args...> <target> --output=<dir> --reporter=dot,json --workers=2 [options...] [extra args...]
//! ```
//!
//! The child inherits this process's environment plus the configured extra variables, the
//! per-invocation variables, and finally the report variable (which always wins).

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};

use metatest_core::{JsonReport, RunOptions};
use tokio::process::Command;

use crate::capture::OutputCapture;
use crate::config::HarnessConfig;
use crate::error::ReportError;
use crate::result::RunResult;

/// Exit code reported when the runner could not be started at all.
pub const SPAWN_FAILURE_EXIT_CODE: i32 = -1;

/// Target meaning "everything under the working directory".
pub const CWD_TARGET: &str = ".";

/// Per-invocation arguments: run options plus raw extras.
#[derive(Debug, Clone, Default)]
pub struct RunArgs {
    pub options: RunOptions,
    /// Raw arguments appended after the rendered options
    pub additional_args: Vec<String>,
    /// Variables added to this invocation's child environment
    pub env: Vec<(String, String)>,
}

impl RunArgs {
    pub fn new(options: RunOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.additional_args.push(arg.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }
}

impl From<RunOptions> for RunArgs {
    fn from(options: RunOptions) -> Self {
        Self::new(options)
    }
}

/// One execution of the runner.
#[derive(Debug, Clone)]
pub struct Invocation {
    /// Working directory of the child
    pub cwd: PathBuf,
    /// Test file or directory, relative to `cwd` (`.` for all of it)
    pub target: String,
    /// Directory the runner writes artifacts into; the report lands inside it
    pub output_dir: PathBuf,
    pub args: RunArgs,
}

impl Invocation {
    /// Path of the JSON report for this invocation.
    pub fn report_path(&self, config: &HarnessConfig) -> PathBuf {
        self.output_dir.join(&config.report_file_name)
    }
}

/// A fully built command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: PathBuf,
    pub args: Vec<OsString>,
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Build the command line for `invocation`.
pub fn build_command_line(config: &HarnessConfig, invocation: &Invocation) -> CommandLine {
    let mut args: Vec<OsString> = config.runner.args.iter().map(OsString::from).collect();
    args.push(OsString::from(&invocation.target));

    let mut output_arg = OsString::from("--output=");
    output_arg.push(invocation.output_dir.as_os_str());
    args.push(output_arg);

    args.push(config.reporter_arg().into());
    args.push(config.workers_arg().into());
    args.extend(invocation.args.options.to_args().into_iter().map(OsString::from));
    args.extend(invocation.args.additional_args.iter().map(OsString::from));

    CommandLine {
        program: config.runner.program.clone(),
        args,
    }
}

/// Run the external runner once and reduce its output and report.
///
/// Never fails: a runner that cannot be started yields [`SPAWN_FAILURE_EXIT_CODE`] with the spawn
/// error in `output`, and an unusable report leaves `report` empty with the reason appended to
/// `output`.
#[tracing::instrument(skip_all, fields(cwd = %invocation.cwd.display(), target = %invocation.target))]
pub async fn run_runner(config: &HarnessConfig, invocation: &Invocation) -> RunResult {
    let command_line = build_command_line(config, invocation);
    let report_path = invocation.report_path(config);

    let mut command = Command::new(&command_line.program);
    command
        .args(&command_line.args)
        .current_dir(&invocation.cwd)
        .envs(config.extra_env.iter().map(|(k, v)| (k, v)))
        .envs(invocation.args.env.iter().map(|(k, v)| (k, v)))
        .env(&config.report_env_var, &report_path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    tracing::debug!(command = %command_line, report = %report_path.display(), "spawning runner");

    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(e) => {
            tracing::warn!(program = %command_line.program.display(), error = %e, "failed to spawn runner");
            let output = format!("failed to spawn `{}`: {}", command_line, e);
            let report = load_report(&report_path).await;
            return RunResult::assemble(invocation, SPAWN_FAILURE_EXIT_CODE, output, report);
        }
    };

    let capture = OutputCapture::new(config.debug);
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let (status, output) = tokio::join!(child.wait(), capture.drain(stdout, stderr));

    let (exit_code, output) = match status {
        Ok(status) => (status_code(status), output),
        Err(e) => (SPAWN_FAILURE_EXIT_CODE, format!("{}\nfailed to wait for runner: {}", output, e)),
    };
    tracing::debug!(exit_code, output_len = output.len(), "runner exited");

    let report = load_report(&report_path).await;
    RunResult::assemble(invocation, exit_code, output, report)
}

/// Read and parse the JSON report at `path`.
pub async fn load_report(path: &Path) -> Result<JsonReport, ReportError> {
    let bytes = tokio::fs::read(path).await.map_err(|source| ReportError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    JsonReport::from_slice(&bytes).map_err(|source| ReportError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn status_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    SPAWN_FAILURE_EXIT_CODE
}
