//! Harness configuration.
//!
//! Defaults describe the runner this harness was written against: a Node entry point invoked as
//! `node <cli.js> test`, a `dot,json` reporter pair, two workers, and the JSON reporter's output
//! path passed through `PLAYWRIGHT_JSON_OUTPUT_NAME`. Every value can be overridden with the
//! `with_*` builders or, for the common cases, through environment variables (see [`HarnessConfig::from_env`]).

use std::fmt;
use std::path::{Path, PathBuf};

/// Environment variable naming the runner command (whitespace separated program and arguments).
pub const RUNNER_ENV_VAR: &str = "METATEST_RUNNER";
/// Environment variable naming the run-from-disk assets root.
pub const ASSETS_ENV_VAR: &str = "METATEST_ASSETS";
/// Environment variable that mirrors child output to this process when set.
pub const DEBUG_ENV_VAR: &str = "METATEST_DEBUG";
/// Variable the runner's JSON reporter reads its destination file from.
pub const DEFAULT_REPORT_ENV_VAR: &str = "PLAYWRIGHT_JSON_OUTPUT_NAME";

const DEFAULT_RUNNER_PROGRAM: &str = "node";
const DEFAULT_RUNNER_SCRIPT: &str = "node_modules/@playwright/test/cli.js";
const DEFAULT_ASSETS_DIR: &str = "tests/assets";

/// The fixed entry point of the external runner: a program plus the arguments that precede the
/// test target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl RunnerCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append a leading argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Parse a whitespace-separated command such as `node ./cli.js test`.
    ///
    /// Returns `None` for a blank string.
    pub fn parse(command: &str) -> Option<Self> {
        let mut parts = command.split_whitespace();
        let program = parts.next()?;
        Some(Self {
            program: PathBuf::from(program),
            args: parts.map(str::to_string).collect(),
        })
    }
}

impl Default for RunnerCommand {
    fn default() -> Self {
        Self::new(DEFAULT_RUNNER_PROGRAM).arg(DEFAULT_RUNNER_SCRIPT).arg("test")
    }
}

impl fmt::Display for RunnerCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Configuration shared by every invocation of a [`crate::Harness`].
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Runner entry point
    pub runner: RunnerCommand,
    /// Root that run-from-disk names are resolved against
    pub assets_dir: PathBuf,
    /// Name of the variable carrying the report destination to the child
    pub report_env_var: String,
    /// File name of the JSON report inside the output directory
    pub report_file_name: String,
    /// Reporters requested from the runner (`--reporter=a,b`)
    pub reporters: Vec<String>,
    /// Runner worker count (`--workers=N`)
    pub workers: usize,
    /// Mirror child stdout/stderr to this process while capturing
    pub debug: bool,
    /// Variables added to every child's environment
    pub extra_env: Vec<(String, String)>,
    /// Header prepended to source files by the inline-test entry point
    pub test_header: String,
    /// Header prepended to source files by the inline-fixtures-test entry point
    pub fixtures_header: String,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            runner: RunnerCommand::default(),
            assets_dir: PathBuf::from(DEFAULT_ASSETS_DIR),
            report_env_var: DEFAULT_REPORT_ENV_VAR.to_string(),
            report_file_name: "report.json".to_string(),
            reporters: vec!["dot".to_string(), "json".to_string()],
            workers: 2,
            debug: false,
            extra_env: Vec::new(),
            test_header: crate::harness::TEST_HEADER.to_string(),
            fixtures_header: crate::harness::FIXTURES_HEADER.to_string(),
        }
    }
}

impl HarnessConfig {
    /// Create a new config with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a config from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable lookup.
    ///
    /// Recognized variables: [`RUNNER_ENV_VAR`], [`ASSETS_ENV_VAR`], [`DEBUG_ENV_VAR`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(runner) = lookup(RUNNER_ENV_VAR).as_deref().and_then(RunnerCommand::parse) {
            config.runner = runner;
        }
        if let Some(assets) = lookup(ASSETS_ENV_VAR).filter(|v| !v.is_empty()) {
            config.assets_dir = PathBuf::from(assets);
        }
        config.debug = lookup(DEBUG_ENV_VAR).is_some_and(|v| is_truthy(&v));
        config
    }

    pub fn with_runner(mut self, runner: RunnerCommand) -> Self {
        self.runner = runner;
        self
    }

    pub fn with_assets_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.assets_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn with_report_env_var(mut self, name: impl Into<String>) -> Self {
        self.report_env_var = name.into();
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Add a variable to every child's environment.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_env.push((key.into(), value.into()));
        self
    }

    pub fn with_test_header(mut self, header: impl Into<String>) -> Self {
        self.test_header = header.into();
        self
    }

    pub fn with_fixtures_header(mut self, header: impl Into<String>) -> Self {
        self.fixtures_header = header.into();
        self
    }

    /// The `--reporter=...` argument.
    pub fn reporter_arg(&self) -> String {
        format!("--reporter={}", self.reporters.join(","))
    }

    /// The `--workers=...` argument.
    pub fn workers_arg(&self) -> String {
        format!("--workers={}", self.workers)
    }
}

fn is_truthy(value: &str) -> bool {
    !matches!(value.trim(), "" | "0" | "false" | "FALSE" | "False")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_fixed_arguments() {
        let config = HarnessConfig::default();
        assert_eq!(config.reporter_arg(), "--reporter=dot,json");
        assert_eq!(config.workers_arg(), "--workers=2");
        assert_eq!(config.report_env_var, "PLAYWRIGHT_JSON_OUTPUT_NAME");
        assert!(!config.debug);
    }

    #[test]
    fn test_default_runner_command() {
        assert_eq!(
            RunnerCommand::default().to_string(),
            "node node_modules/@playwright/test/cli.js test"
        );
    }

    #[test]
    fn test_runner_parse() {
        let runner = RunnerCommand::parse("  sh ./fake-runner.sh  --flag ").unwrap();
        assert_eq!(runner.program, PathBuf::from("sh"));
        assert_eq!(runner.args, vec!["./fake-runner.sh", "--flag"]);
        assert!(RunnerCommand::parse("   ").is_none());
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = HarnessConfig::from_lookup(lookup(&[
            (RUNNER_ENV_VAR, "deno run cli.ts"),
            (ASSETS_ENV_VAR, "/srv/assets"),
            (DEBUG_ENV_VAR, "1"),
        ]));
        assert_eq!(config.runner.to_string(), "deno run cli.ts");
        assert_eq!(config.assets_dir, PathBuf::from("/srv/assets"));
        assert!(config.debug);
    }

    #[test]
    fn test_debug_falsy_values() {
        for value in ["", "0", "false"] {
            let config = HarnessConfig::from_lookup(lookup(&[(DEBUG_ENV_VAR, value)]));
            assert!(!config.debug, "{value:?} should not enable debug");
        }
    }

    #[test]
    fn test_blank_runner_keeps_default() {
        let config = HarnessConfig::from_lookup(lookup(&[(RUNNER_ENV_VAR, " ")]));
        assert_eq!(config.runner, RunnerCommand::default());
    }
}
