//! Scrape outcome counters from captured runner output.
//!
//! The runner's human-readable reporter ends with a summary such as `3 passed`, `1 failed`,
//! `2 flaky`, `1 skipped`. The first occurrence of each phrase is taken; a missing phrase counts
//! as zero.
//!
//! ## Notes
//! - These counters are never reconciled with the structured report. Callers that want per-run
//!   outcomes read the flattened report instead.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static PASSED: LazyLock<Regex> = LazyLock::new(|| counter_pattern("passed"));
static FAILED: LazyLock<Regex> = LazyLock::new(|| counter_pattern("failed"));
static FLAKY: LazyLock<Regex> = LazyLock::new(|| counter_pattern("flaky"));
static SKIPPED: LazyLock<Regex> = LazyLock::new(|| counter_pattern("skipped"));

#[allow(clippy::expect_used)]
fn counter_pattern(word: &str) -> Regex {
    Regex::new(&format!(r"(\d+) {}", word)).expect("INVARIANT: counter pattern is a valid regex")
}

/// The four outcome counters scraped from output text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeCounts {
    pub passed: usize,
    pub failed: usize,
    pub flaky: usize,
    pub skipped: usize,
}

/// Extract the four counters from `output`.
///
/// ## Parameters
/// - `output`: combined stderr/stdout text of one runner invocation.
///
/// ## Returns
/// - (`OutcomeCounts`): each counter from its first matching phrase, or 0.
pub fn extract_counts(output: &str) -> OutcomeCounts {
    OutcomeCounts {
        passed: first_count(&PASSED, output),
        failed: first_count(&FAILED, output),
        flaky: first_count(&FLAKY, output),
        skipped: first_count(&SKIPPED, output),
    }
}

fn first_count(pattern: &Regex, output: &str) -> usize {
    pattern
        .captures(output)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passed_and_failed() {
        let counts = extract_counts("3 passed, 1 failed");
        assert_eq!(
            counts,
            OutcomeCounts {
                passed: 3,
                failed: 1,
                flaky: 0,
                skipped: 0
            }
        );
    }

    #[test]
    fn test_first_occurrence_wins() {
        let counts = extract_counts("  2 skipped\n  5 flaky\nlater: 9 skipped");
        assert_eq!(counts.skipped, 2);
        assert_eq!(counts.flaky, 5);
    }

    #[test]
    fn test_phrase_is_case_sensitive() {
        assert_eq!(extract_counts("4 Passed").passed, 0);
    }

    #[test]
    fn test_no_word_boundary_required() {
        // Substring semantics: "12 passedX" still counts.
        assert_eq!(extract_counts("x12 passedX").passed, 12);
    }

    #[test]
    fn test_empty_output_is_all_zero() {
        assert_eq!(extract_counts(""), OutcomeCounts::default());
    }

    #[test]
    fn test_overflowing_count_falls_back_to_zero() {
        let huge = format!("{}0 passed", usize::MAX);
        assert_eq!(extract_counts(&huge).passed, 0);
    }
}
