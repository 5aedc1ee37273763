//! CLI command implementations
//!
//! All command functions return `CliResult<ExitCode>` instead of calling
//! `process::exit`. Error handling and exits happen in the top-level `run()`.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use metatest_core::{RunOptions, first_stack_frame, strip_ansi};

use crate::compose::{FileContent, InlineFiles, validate_relative};
use crate::config::{HarnessConfig, RunnerCommand};
use crate::error::HarnessError;
use crate::harness::Harness;
use crate::result::RunResult;
use crate::runner::RunArgs;
use crate::scope::TestScope;

use super::{CliError, CliResult, ExitCode, RunFlags};

/// Maximum size of a file pulled in with `PATH=@FILE` (100 MB)
const MAX_INLINE_FILE_SIZE: u64 = 100 * 1024 * 1024;

// ============================================================================
// Commands
// ============================================================================

/// `metatest run <NAME>`
pub fn run_from_disk(name: &str, assets: Option<PathBuf>, flags: &RunFlags) -> CliResult<ExitCode> {
    let mut config = build_config(flags)?;
    if let Some(assets) = assets {
        config = config.with_assets_dir(assets);
    }
    let args = build_run_args(flags)?;
    let harness = Harness::new(config);
    let scope = TestScope::new(format!("run {}", name))?;

    let result = runtime()?.block_on(harness.run_test(&scope, name, args));
    report_result(&result, flags.json)
}

/// `metatest inline <PATH=SOURCE>...`
pub fn run_inline_files(specs: &[String], fixtures: bool, flags: &RunFlags) -> CliResult<ExitCode> {
    let files = specs
        .iter()
        .map(|spec| parse_inline_file(spec))
        .collect::<CliResult<InlineFiles>>()?;
    let harness = Harness::new(build_config(flags)?);
    let args = build_run_args(flags)?;
    let scope = TestScope::new("inline")?;

    let rt = runtime()?;
    let result = if fixtures {
        rt.block_on(harness.run_inline_fixtures_test(&scope, &files, args))?
    } else {
        rt.block_on(harness.run_inline_test(&scope, &files, args))?
    };
    report_result(&result, flags.json)
}

/// `metatest strip-ansi [FILE]`
pub fn strip_ansi_file(file: Option<&Path>, first_frame: bool) -> CliResult<ExitCode> {
    let text = match file {
        Some(path) => fs::read_to_string(path).map_err(|source| HarnessError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?,
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .map_err(|e| CliError::failure(format!("Error reading stdin: {}", e)))?;
            buf
        }
    };

    let stripped = strip_ansi(&text);
    if first_frame {
        match first_stack_frame(&stripped) {
            Some(frame) => println!("{}", frame),
            None => return Ok(ExitCode::FAILURE),
        }
    } else {
        print!("{}", stripped);
    }
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// Helpers
// ============================================================================

/// Configuration from the environment, with command-line overrides applied.
fn build_config(flags: &RunFlags) -> CliResult<HarnessConfig> {
    let mut config = HarnessConfig::from_env();
    if let Some(runner) = &flags.runner {
        let runner = RunnerCommand::parse(runner).ok_or_else(|| CliError::failure("Error: --runner must not be blank"))?;
        config = config.with_runner(runner);
    }
    if flags.debug {
        config = config.with_debug(true);
    }
    Ok(config)
}

/// Per-invocation arguments from `-o`, `-a` and `-e`.
fn build_run_args(flags: &RunFlags) -> CliResult<RunArgs> {
    let mut options = RunOptions::new();
    for assignment in &flags.options {
        if assignment.trim_start_matches('-').is_empty() {
            return Err(CliError::failure(format!("Error: invalid option '{}'", assignment)));
        }
        options.push_assignment(assignment);
    }

    let mut args = RunArgs::new(options);
    args.additional_args = flags.args.clone();
    for pair in &flags.env {
        let Some((key, value)) = pair.split_once('=') else {
            return Err(CliError::failure(format!(
                "Error: environment entry '{}' must look like KEY=VALUE",
                pair
            )));
        };
        if key.is_empty() {
            return Err(CliError::failure(format!("Error: environment entry '{}' has no name", pair)));
        }
        args = args.env(key, value);
    }
    Ok(args)
}

/// Parse `PATH=SOURCE` or `PATH=@FILE` into an inline file.
fn parse_inline_file(spec: &str) -> CliResult<(String, FileContent)> {
    let Some((path, source)) = spec.split_once('=') else {
        return Err(CliError::failure(format!(
            "Error: inline file '{}' must look like PATH=SOURCE",
            spec
        )));
    };
    // Reject escaping paths here so the error names the argument, not the scratch dir.
    validate_relative(path)?;

    let content = match source.strip_prefix('@') {
        Some(file) => read_inline_source(Path::new(file))?,
        None => FileContent::from(source),
    };
    Ok((path.to_string(), content))
}

/// Read a file's bytes; UTF-8 content stays text so it still gets the header.
fn read_inline_source(path: &Path) -> CliResult<FileContent> {
    let read_error = |source| HarnessError::ReadFile {
        path: path.to_path_buf(),
        source,
    };
    let metadata = fs::metadata(path).map_err(read_error)?;
    if metadata.len() > MAX_INLINE_FILE_SIZE {
        return Err(CliError::failure(format!(
            "Inline source '{}' is too large ({} bytes, max {} bytes)",
            path.display(),
            metadata.len(),
            MAX_INLINE_FILE_SIZE
        )));
    }

    let bytes = fs::read(path).map_err(read_error)?;
    Ok(match String::from_utf8(bytes) {
        Ok(text) => FileContent::Text(text),
        Err(e) => FileContent::Binary(e.into_bytes()),
    })
}

fn runtime() -> CliResult<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::failure(format!("Error starting async runtime: {}", e)))
}

/// Print the result and map it to the process exit code.
fn report_result(result: &RunResult, json: bool) -> CliResult<ExitCode> {
    if json {
        let text = serde_json::to_string_pretty(result)
            .map_err(|e| CliError::failure(format!("Error serializing result: {}", e)))?;
        println!("{}", text);
    } else {
        print!("{}", result.output);
        if !result.output.ends_with('\n') {
            println!();
        }
        eprintln!("{}", format_summary(result));
    }
    Ok(ExitCode(result.exit_code))
}

/// One-line summary of a run.
pub fn format_summary(result: &RunResult) -> String {
    let report = match &result.report {
        Some(_) => format!("{} runs in report", result.results.len()),
        None => "no report".to_string(),
    };
    format!(
        "exit code {}: {} passed, {} failed, {} flaky, {} skipped ({})",
        result.exit_code, result.passed, result.failed, result.flaky, result.skipped, report
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::runner::Invocation;
    use metatest_core::JsonReport;

    fn flags() -> RunFlags {
        RunFlags::default()
    }

    #[test]
    fn test_build_run_args() {
        let mut f = flags();
        f.options = vec!["headed".into(), "grep=login".into(), "retries=1".into(), "retries=2".into()];
        f.args = vec!["--list".into()];
        f.env = vec!["CI=1".into(), "EMPTY=".into()];

        let args = build_run_args(&f).unwrap();
        assert_eq!(
            args.options.to_args(),
            vec!["--headed", "--grep=login", "--retries=1", "--retries=2"]
        );
        assert_eq!(args.additional_args, vec!["--list"]);
        assert_eq!(
            args.env,
            vec![("CI".to_string(), "1".to_string()), ("EMPTY".to_string(), String::new())]
        );
    }

    #[test]
    fn test_build_run_args_rejects_bad_env() {
        let mut f = flags();
        f.env = vec!["NOVALUE".into()];
        assert!(build_run_args(&f).is_err());

        f.env = vec!["=1".into()];
        assert!(build_run_args(&f).is_err());
    }

    #[test]
    fn test_build_config_runner_override() {
        let mut f = flags();
        f.runner = Some("sh fake.sh".into());
        f.debug = true;
        let config = build_config(&f).unwrap();
        assert_eq!(config.runner.to_string(), "sh fake.sh");
        assert!(config.debug);

        f.runner = Some("  ".into());
        assert!(build_config(&f).is_err());
    }

    #[test]
    fn test_parse_inline_file() {
        let (path, content) = parse_inline_file("a.spec.js=test('x', () => { a = 1 })").unwrap();
        assert_eq!(path, "a.spec.js");
        assert_eq!(content, FileContent::from("test('x', () => { a = 1 })"));

        assert!(parse_inline_file("no-separator").is_err());
        assert!(parse_inline_file("../up.spec.js=x").is_err());
    }

    #[test]
    fn test_parse_inline_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let text = dir.path().join("src.js");
        fs::write(&text, "test('y', () => {});").unwrap();
        let binary = dir.path().join("img.png");
        fs::write(&binary, [0xff, 0xfe, 0x00]).unwrap();

        let (_, content) = parse_inline_file(&format!("y.spec.js=@{}", text.display())).unwrap();
        assert_eq!(content, FileContent::from("test('y', () => {});"));
        let (_, content) = parse_inline_file(&format!("img.png=@{}", binary.display())).unwrap();
        assert_eq!(content, FileContent::Binary(vec![0xff, 0xfe, 0x00]));

        let err = parse_inline_file("z.spec.js=@/definitely/missing.js").unwrap_err();
        assert!(err.message.contains("metatest::read_file"));
    }

    #[test]
    fn test_format_summary() {
        let invocation = Invocation {
            cwd: PathBuf::from("/work"),
            target: ".".into(),
            output_dir: PathBuf::from("/work/test-results"),
            args: RunArgs::default(),
        };
        let report = JsonReport::from_slice(br#"{ "suites": [] }"#).unwrap();
        let result = RunResult::assemble(&invocation, 1, "  2 passed\n  1 failed\n".into(), Ok(report));
        insta::assert_snapshot!(
            format_summary(&result),
            @"exit code 1: 2 passed, 1 failed, 0 flaky, 0 skipped (0 runs in report)"
        );
    }
}
