//! Model the JSON report written by the external runner, and flatten it into run records.
//!
//! The report is a tree: `suites → specs → tests → runs`, where a suite may also hold nested
//! `suites`. A run is one execution attempt of a test; retries produce several runs.
//!
//! ## Notes
//! - The harness only reads this tree. Fields it does not name are preserved in `extra` so a
//!   caller can still inspect them (and so `--json` output round-trips them).
//! - Only the root `suites` array is required. Every nested collection defaults to empty.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Root of the runner's JSON report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonReport {
    pub suites: Vec<JsonSuite>,
    /// Errors the runner reported outside any test (e.g. a file that failed to load).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A group of specs, usually one per file or describe block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonSuite {
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default)]
    pub specs: Vec<JsonSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suites: Vec<JsonSuite>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One test declaration at a source location.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonSpec {
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ok: Option<bool>,
    #[serde(default)]
    pub tests: Vec<JsonTest>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A spec instantiated for one project/configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonTest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, alias = "results")]
    pub runs: Vec<JsonRun>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One execution attempt of a test.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonRun {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default)]
    pub retry: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_index: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stdout: Vec<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stderr: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl JsonRun {
    /// Build a run with only a status set.
    pub fn with_status(status: impl Into<String>) -> Self {
        Self {
            status: Some(status.into()),
            ..Self::default()
        }
    }

    /// Return the error message, if the runner reported one.
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_ref()?.get("message")?.as_str()
    }
}

impl JsonReport {
    /// Parse a report from raw JSON bytes.
    pub fn from_slice(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }

    /// Count every run reachable from the root.
    pub fn run_count(&self) -> usize {
        fn count(suite: &JsonSuite) -> usize {
            let own: usize = suite
                .specs
                .iter()
                .flat_map(|spec| &spec.tests)
                .map(|test| test.runs.len())
                .sum();
            own + suite.suites.iter().map(count).sum::<usize>()
        }
        self.suites.iter().map(count).sum()
    }
}

/// Append every run under `suite` to `out`, depth-first.
///
/// ## Notes
/// - A suite's own specs are visited before its nested suites.
/// - Within a spec, tests are visited in order and each test's runs are appended in order.
pub fn collect_runs<'a>(suite: &'a JsonSuite, out: &mut Vec<&'a JsonRun>) {
    for spec in &suite.specs {
        for test in &spec.tests {
            out.extend(test.runs.iter());
        }
    }
    for child in &suite.suites {
        collect_runs(child, out);
    }
}

/// Flatten all runs in the report into one ordered sequence.
///
/// ## Parameters
/// - `report`: the parsed report tree.
///
/// ## Returns
/// - (`Vec<JsonRun>`): owned copies of every run, in traversal order.
pub fn flatten_runs(report: &JsonReport) -> Vec<JsonRun> {
    let mut refs = Vec::new();
    for suite in &report.suites {
        collect_runs(suite, &mut refs);
    }
    refs.into_iter().cloned().collect()
}
