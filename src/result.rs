//! The normalized outcome of one runner invocation.

use std::path::PathBuf;

use metatest_core::{JsonReport, JsonRun, OutcomeCounts, extract_counts, flatten_runs, marker_lines, strip_ansi};
use serde::Serialize;
use serde_json::Value;

use crate::error::ReportError;
use crate::runner::Invocation;

/// Everything a meta test needs to know about one runner execution.
///
/// The four counters come from the runner's text summary and the `results` come from its JSON
/// report. The two sources are independent and are not cross-checked.
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub exit_code: i32,
    /// Combined stderr and stdout, in arrival order, plus any report breadcrumb
    pub output: String,
    pub passed: usize,
    pub failed: usize,
    pub flaky: usize,
    pub skipped: usize,
    /// The parsed report, or `None` when it could not be read or parsed
    pub report: Option<JsonReport>,
    /// Every run in the report, flattened depth-first
    pub results: Vec<JsonRun>,
    /// `%%` marker lines from `output`, marker removed
    pub output_lines: Vec<String>,
    /// Working directory the runner ran in
    pub cwd: PathBuf,
    /// Directory the runner wrote its artifacts into
    pub output_dir: PathBuf,
}

impl RunResult {
    /// Combine exit code, captured text and the report load outcome.
    ///
    /// A report error is appended to `output` on its own line before the counters are scraped.
    pub fn assemble(
        invocation: &Invocation,
        exit_code: i32,
        mut output: String,
        report: Result<JsonReport, ReportError>,
    ) -> Self {
        let report = match report {
            Ok(report) => Some(report),
            Err(e) => {
                tracing::warn!(error = %e, "runner report unavailable");
                output.push('\n');
                output.push_str(&e.to_string());
                None
            }
        };

        let OutcomeCounts {
            passed,
            failed,
            flaky,
            skipped,
        } = extract_counts(&output);
        let results = report.as_ref().map(flatten_runs).unwrap_or_default();
        let output_lines = marker_lines(&output);

        Self {
            exit_code,
            output,
            passed,
            failed,
            flaky,
            skipped,
            report,
            results,
            output_lines,
            cwd: invocation.cwd.clone(),
            output_dir: invocation.output_dir.clone(),
        }
    }

    pub fn counts(&self) -> OutcomeCounts {
        OutcomeCounts {
            passed: self.passed,
            failed: self.failed,
            flaky: self.flaky,
            skipped: self.skipped,
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Runs whose status equals `status`.
    pub fn runs_with_status<'a>(&'a self, status: &'a str) -> impl Iterator<Item = &'a JsonRun> + 'a {
        self.results.iter().filter(move |run| run.status.as_deref() == Some(status))
    }

    /// Top-level errors from the report; empty when there is no report.
    pub fn report_errors(&self) -> &[Value] {
        self.report.as_ref().map(|r| r.errors.as_slice()).unwrap_or(&[])
    }

    /// `output` with terminal escape sequences removed.
    pub fn stripped_output(&self) -> String {
        strip_ansi(&self.output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::RunArgs;
    use std::io;

    fn invocation() -> Invocation {
        Invocation {
            cwd: PathBuf::from("/work"),
            target: ".".to_string(),
            output_dir: PathBuf::from("/work/test-results"),
            args: RunArgs::default(),
        }
    }

    fn report(json: &str) -> Result<JsonReport, ReportError> {
        Ok(JsonReport::from_slice(json.as_bytes()).unwrap())
    }

    #[test]
    fn test_assemble_with_report() {
        let json = r#"{ "suites": [ { "specs": [ { "tests": [ { "runs": [ { "status": "failed" }, { "status": "passed" } ] } ] } ] } ], "errors": [ { "message": "x" } ] }"#;
        let result = RunResult::assemble(&invocation(), 1, "  1 flaky\n%%done\n".to_string(), report(json));
        assert_eq!(result.flaky, 1);
        assert_eq!(result.passed, 0);
        assert_eq!(result.results.len(), 2);
        assert_eq!(result.runs_with_status("passed").count(), 1);
        assert_eq!(result.report_errors().len(), 1);
        assert_eq!(result.output_lines, vec!["done"]);
        assert!(!result.success());
        assert_eq!(result.cwd, PathBuf::from("/work"));
    }

    #[test]
    fn test_assemble_without_report_keeps_counters() {
        let err = ReportError::Read {
            path: PathBuf::from("out/report.json"),
            source: io::Error::new(io::ErrorKind::NotFound, "gone"),
        };
        let result = RunResult::assemble(&invocation(), 0, "3 passed, 1 failed".to_string(), Err(err));
        assert!(result.report.is_none());
        assert!(result.results.is_empty());
        assert!(result.report_errors().is_empty());
        assert_eq!(
            result.counts(),
            OutcomeCounts {
                passed: 3,
                failed: 1,
                flaky: 0,
                skipped: 0
            }
        );
        assert!(result.output.starts_with("3 passed, 1 failed\nfailed to read report"));
        assert_eq!(result.exit_code, 0);
    }

    #[test]
    fn test_stripped_output() {
        let result = RunResult::assemble(&invocation(), 0, "\x1b[32m2 passed\x1b[39m".to_string(), report(r#"{ "suites": [] }"#));
        assert_eq!(result.stripped_output(), "2 passed");
        assert_eq!(result.passed, 2);
    }
}
