//! Error types for the harness.
//!
//! Only failures that make a run meaningless are errors here: a requested test file that could
//! not be written, or a path that would land outside the destination root. Everything that merely
//! degrades diagnostics (an unreadable report, a runner that failed to start) is folded into the
//! returned `RunResult` instead.

use std::io;
use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Errors that abort a harness invocation.
#[derive(Debug, Error, Diagnostic)]
pub enum HarnessError {
    #[error("inline file path '{path}' escapes the destination root")]
    #[diagnostic(
        code(metatest::path_escape),
        help("inline file paths must be relative and must not contain `..` components")
    )]
    PathEscape { path: String },

    #[error("inline file path '{path}' names the same file as '{first}'")]
    #[diagnostic(
        code(metatest::duplicate_path),
        help("each inline file must map to a distinct path once `.` components are removed")
    )]
    DuplicatePath { path: String, first: String },

    #[error("failed to create directory {}: {source}", .path.display())]
    #[diagnostic(code(metatest::create_dir))]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write test file {}: {source}", .path.display())]
    #[diagnostic(code(metatest::write_file))]
    WriteFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read {}: {source}", .path.display())]
    #[diagnostic(code(metatest::read_file))]
    ReadFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to create a scratch directory: {0}")]
    #[diagnostic(code(metatest::scratch_dir), help("check that the system temp directory is writable"))]
    ScratchDir(#[source] io::Error),

    #[error("file write task failed: {0}")]
    #[diagnostic(code(metatest::task))]
    Task(#[from] tokio::task::JoinError),
}

/// Result type for harness operations.
pub type HarnessResult<T> = Result<T, HarnessError>;

/// Why the runner's JSON report could not be used.
///
/// Never returned to callers as an error: its text is appended to the captured output.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to read report {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse report {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_escape_message() {
        let err = HarnessError::PathEscape {
            path: "../x.spec.js".to_string(),
        };
        assert_eq!(err.to_string(), "inline file path '../x.spec.js' escapes the destination root");
        assert_eq!(err.code().map(|c| c.to_string()).as_deref(), Some("metatest::path_escape"));
    }

    #[test]
    fn test_report_error_names_path() {
        let err = ReportError::Read {
            path: PathBuf::from("/tmp/out/report.json"),
            source: io::Error::new(io::ErrorKind::NotFound, "missing"),
        };
        assert!(err.to_string().starts_with("failed to read report /tmp/out/report.json"));
    }
}
