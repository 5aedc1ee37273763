//! Harness entry points.
//!
//! Three ways to drive the runner:
//! - [`Harness::run_test`]: run a file or directory that already exists under the assets root.
//! - [`Harness::run_inline_test`]: write an in-memory file set with the test-authoring header.
//! - [`Harness::run_inline_fixtures_test`]: same, with the fixture-composition header.
//!
//! All three take the enclosing [`TestScope`] explicitly. It supplies the per-invocation
//! directory, and the inline entry points record their output in it so a failing meta test
//! prints what the runner said.

use std::path::{Path, PathBuf};

use crate::compose::{InlineFiles, OUTPUT_SUBDIR, run_inline};
use crate::config::HarnessConfig;
use crate::error::HarnessResult;
use crate::result::RunResult;
use crate::runner::{CWD_TARGET, Invocation, RunArgs, run_runner};
use crate::scope::TestScope;

/// Header binding the primary test-authoring API.
pub const TEST_HEADER: &str = "const { test, expect } = require('@playwright/test'); \
const { describe, beforeEach, afterEach, beforeAll, afterAll } = test;\n";

/// Header binding the lower-level fixture-composition API.
pub const FIXTURES_HEADER: &str = "const { extend, init, build, expect } = require('@playwright/test/lib/fixtures');\n";

/// Which header an inline run writes in front of its source files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InlineMode {
    Test,
    Fixtures,
}

impl InlineMode {
    pub fn header(self, config: &HarnessConfig) -> &str {
        match self {
            InlineMode::Test => &config.test_header,
            InlineMode::Fixtures => &config.fixtures_header,
        }
    }
}

/// Drives the external runner with a fixed configuration.
#[derive(Debug, Clone, Default)]
pub struct Harness {
    config: HarnessConfig,
}

impl Harness {
    pub fn new(config: HarnessConfig) -> Self {
        Self { config }
    }

    /// Harness configured from the process environment.
    pub fn from_env() -> Self {
        Self::new(HarnessConfig::from_env())
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Run a file or directory under the assets root.
    ///
    /// A directory runs with itself as working directory and `.` as target; anything else runs
    /// from the assets root with `name` as target.
    pub async fn run_test(&self, scope: &TestScope, name: &str, args: impl Into<RunArgs>) -> RunResult {
        let (cwd, target) = resolve_disk_target(&self.config.assets_dir, name).await;
        let invocation = Invocation {
            cwd,
            target,
            output_dir: scope.next_run_dir().join(OUTPUT_SUBDIR),
            args: args.into(),
        };
        run_runner(&self.config, &invocation).await
    }

    /// Write `files` with the test-authoring header and run them.
    pub async fn run_inline_test(
        &self,
        scope: &TestScope,
        files: &InlineFiles,
        args: impl Into<RunArgs>,
    ) -> HarnessResult<RunResult> {
        self.run_inline_mode(scope, files, InlineMode::Test, args.into()).await
    }

    /// Write `files` with the fixture-composition header and run them.
    pub async fn run_inline_fixtures_test(
        &self,
        scope: &TestScope,
        files: &InlineFiles,
        args: impl Into<RunArgs>,
    ) -> HarnessResult<RunResult> {
        self.run_inline_mode(scope, files, InlineMode::Fixtures, args.into()).await
    }

    #[tracing::instrument(skip_all, fields(scope = %scope.title(), mode = ?mode, files = files.len()))]
    async fn run_inline_mode(
        &self,
        scope: &TestScope,
        files: &InlineFiles,
        mode: InlineMode,
        args: RunArgs,
    ) -> HarnessResult<RunResult> {
        let root = scope.next_run_dir();
        let result = run_inline(&self.config, &root, files, mode.header(&self.config), args).await?;
        scope.record_output(&result.output);
        Ok(result)
    }
}

/// Resolve a run-from-disk name into a working directory and a target.
///
/// Errors from the directory check (including a missing path) mean "not a directory".
pub async fn resolve_disk_target(assets_dir: &Path, name: &str) -> (PathBuf, String) {
    let candidate = assets_dir.join(name);
    let is_dir = match tokio::fs::metadata(&candidate).await {
        Ok(metadata) => metadata.is_dir(),
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::debug!(path = %candidate.display(), error = %e, "treating unreadable target as a file");
            }
            false
        }
    };

    if is_dir {
        (candidate, CWD_TARGET.to_string())
    } else {
        (assets_dir.to_path_buf(), name.to_string())
    }
}
