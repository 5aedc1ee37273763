//! Per-test scope for meta tests.
//!
//! A `TestScope` is created at the top of a test that drives the runner. It provides the unique
//! scratch directory each invocation writes into, and remembers the output of the last inline run.
//! When the scope is dropped it compares how the enclosing test ended (a panic in progress means
//! failed) with how it was expected to end; on a mismatch the remembered output is printed to
//! stderr.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use tempfile::TempDir;

use crate::error::{HarnessError, HarnessResult};

/// Outcome of the enclosing test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TestStatus {
    #[default]
    Passed,
    Failed,
}

/// Scratch directory, expectations and captured output for one enclosing test.
#[derive(Debug)]
pub struct TestScope {
    title: String,
    dir: TempDir,
    expected: TestStatus,
    runs: AtomicUsize,
    last_output: Mutex<Option<String>>,
}

impl TestScope {
    /// Create a scope with a fresh directory under the system temp dir.
    pub fn new(title: impl Into<String>) -> HarnessResult<Self> {
        let dir = tempfile::Builder::new()
            .prefix("metatest-")
            .tempdir()
            .map_err(HarnessError::ScratchDir)?;
        Ok(Self::with_dir(title, dir))
    }

    /// Create a scope with a fresh directory under `parent`.
    pub fn new_in(title: impl Into<String>, parent: impl AsRef<Path>) -> HarnessResult<Self> {
        let dir = tempfile::Builder::new()
            .prefix("metatest-")
            .tempdir_in(parent)
            .map_err(HarnessError::ScratchDir)?;
        Ok(Self::with_dir(title, dir))
    }

    fn with_dir(title: impl Into<String>, dir: TempDir) -> Self {
        Self {
            title: title.into(),
            dir,
            expected: TestStatus::Passed,
            runs: AtomicUsize::new(0),
            last_output: Mutex::new(None),
        }
    }

    /// Mark the enclosing test as expected to fail.
    pub fn expect_failure(mut self) -> Self {
        self.expected = TestStatus::Failed;
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn expected_status(&self) -> TestStatus {
        self.expected
    }

    /// Status of the enclosing test as seen from the current thread.
    pub fn observed_status(&self) -> TestStatus {
        if std::thread::panicking() {
            TestStatus::Failed
        } else {
            TestStatus::Passed
        }
    }

    /// Root of the scope's scratch directory.
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Path inside the scratch directory.
    pub fn output_path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.dir.path().join(relative)
    }

    /// Allocate a fresh directory path (`run-0`, `run-1`, ...) for one runner invocation.
    ///
    /// The directory itself is not created.
    pub fn next_run_dir(&self) -> PathBuf {
        let index = self.runs.fetch_add(1, Ordering::Relaxed);
        self.output_path(format!("run-{}", index))
    }

    /// Remember `output` for the mismatch report.
    pub fn record_output(&self, output: &str) {
        if let Ok(mut slot) = self.last_output.lock() {
            *slot = Some(output.to_string());
        }
    }

    /// The recorded output, if `observed` differs from the expected status.
    pub fn mismatch_output(&self, observed: TestStatus) -> Option<String> {
        if observed == self.expected {
            return None;
        }
        self.last_output.lock().ok().and_then(|slot| slot.clone())
    }
}

impl Drop for TestScope {
    fn drop(&mut self) {
        if let Some(output) = self.mismatch_output(self.observed_status()) {
            tracing::debug!(title = %self.title, "status mismatch; dumping runner output");
            eprintln!("================= {} =================", self.title);
            eprintln!("{}", output);
            eprintln!("=================================================");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scopes_get_distinct_directories() {
        let a = TestScope::new("a").unwrap();
        let b = TestScope::new("b").unwrap();
        assert_ne!(a.root(), b.root());
        assert!(a.root().is_dir());
        assert_eq!(a.output_path("x/y"), a.root().join("x/y"));
    }

    #[test]
    fn test_run_dirs_are_unique_within_a_scope() {
        let scope = TestScope::new("runs").unwrap();
        let first = scope.next_run_dir();
        let second = scope.next_run_dir();
        assert_ne!(first, second);
        assert_eq!(first, scope.root().join("run-0"));
        assert!(!first.exists());
    }

    #[test]
    fn test_directory_removed_on_drop() {
        let scope = TestScope::new("gone").unwrap();
        let root = scope.root().to_path_buf();
        drop(scope);
        assert!(!root.exists());
    }

    #[test]
    fn test_mismatch_output() {
        let scope = TestScope::new("mismatch").unwrap();
        assert_eq!(scope.mismatch_output(TestStatus::Failed), None);

        scope.record_output("1 failed");
        assert_eq!(scope.mismatch_output(TestStatus::Passed), None);
        assert_eq!(scope.mismatch_output(TestStatus::Failed).as_deref(), Some("1 failed"));

        let expecting_failure = TestScope::new("xfail").unwrap().expect_failure();
        expecting_failure.record_output("1 passed");
        assert_eq!(expecting_failure.mismatch_output(TestStatus::Passed).as_deref(), Some("1 passed"));
        assert_eq!(expecting_failure.observed_status(), TestStatus::Passed);
    }

    #[test]
    fn test_new_in_parent() {
        let parent = tempfile::tempdir().unwrap();
        let scope = TestScope::new_in("nested", parent.path()).unwrap();
        assert!(scope.root().starts_with(parent.path()));
    }
}
