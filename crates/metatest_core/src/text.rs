//! Small text transforms over captured runner output.

use std::sync::LazyLock;

use regex::Regex;

/// Prefix a test writes to stdout to leave an ordered breadcrumb in the captured output.
pub const MARKER_PREFIX: &str = "%%";

/// CSI/OSC escape sequences: ESC or the 8-bit CSI byte, optional intermediates, then either an
/// OSC body terminated by BEL or numeric parameters followed by a final byte.
static ANSI_ESCAPE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(concat!(
        r"[\x1B\x{9B}][\[\]()#;?]*",
        r"(?:(?:(?:[a-zA-Z\d]*(?:;[-a-zA-Z\d/#&.:=?%@~_]*)*)?\x07)",
        r"|(?:(?:\d{1,4}(?:;\d{0,4})*)?[\dA-PR-TZcf-ntqry=><~]))",
    ))
    .expect("INVARIANT: escape pattern is a valid regex")
});

/// Remove terminal escape sequences (colors, cursor movement, hyperlinks) from `text`.
///
/// ## Notes
/// - Pattern based; malformed sequences the pattern does not recognize are left in place.
/// - Text without escape sequences is returned unchanged.
pub fn strip_ansi(text: &str) -> String {
    ANSI_ESCAPE.replace_all(text, "").into_owned()
}

/// Return the first line of `stack` whose trimmed text starts with `at`.
///
/// The line is returned as it appears in `stack`, including leading indentation.
pub fn first_stack_frame(stack: &str) -> Option<&str> {
    stack.lines().find(|line| line.trim().starts_with("at"))
}

/// Collect the marker lines (`%%...`) from `output`, with the marker and surrounding whitespace
/// removed, in order.
pub fn marker_lines(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| line.strip_prefix(MARKER_PREFIX))
        .map(|rest| rest.trim().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_colors() {
        assert_eq!(strip_ansi("\x1b[31mred\x1b[39m plain \x1b[1;32mbold\x1b[0m"), "red plain bold");
    }

    #[test]
    fn test_strip_cursor_and_erase_sequences() {
        assert_eq!(strip_ansi("\x1b[2K\x1b[1Aline\x1b[?25h"), "line");
    }

    #[test]
    fn test_strip_osc_hyperlink() {
        let text = "\x1b]8;;https://example.com\x07link\x1b]8;;\x07";
        assert_eq!(strip_ansi(text), "link");
    }

    #[test]
    fn test_strip_eight_bit_csi() {
        assert_eq!(strip_ansi("\u{9b}31mred"), "red");
    }

    #[test]
    fn test_strip_is_noop_without_escapes() {
        let text = "  1 passed (2s)\n[chromium] › a.spec.ts:3:1";
        assert_eq!(strip_ansi(text), text);
    }

    #[test]
    fn test_first_stack_frame() {
        let stack = "Error: boom\n    at foo (a.spec.ts:3:9)\n    at bar (b.ts:1:1)";
        assert_eq!(first_stack_frame(stack), Some("    at foo (a.spec.ts:3:9)"));
    }

    #[test]
    fn test_first_stack_frame_absent() {
        assert_eq!(first_stack_frame("Error: boom\nno frames here"), None);
        assert_eq!(first_stack_frame(""), None);
    }

    #[test]
    fn test_first_stack_frame_prefix_only() {
        // Only the trimmed prefix matters, so "attempt" counts as well.
        assert_eq!(first_stack_frame("x\nattempt 2\n at y"), Some("attempt 2"));
    }

    #[test]
    fn test_marker_lines() {
        let output = "noise\n%%beforeAll\n%% test 1 \n  %%indented\n%%afterAll";
        assert_eq!(marker_lines(output), vec!["beforeAll", "test 1", "afterAll"]);
    }
}
