//! Property-based tests for the inline composer
//!
//! Path validation and header rendering are checked against randomly generated paths and
//! contents.

use std::path::{Component, Path};

use metatest::compose::{FileContent, InlineFiles, is_source_path, render_content, validate_relative, write_files};
use metatest::{HarnessError, harness::TEST_HEADER};
use proptest::prelude::*;

// =============================================================================
// Path strategies
// =============================================================================

fn segment_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,6}"
}

fn file_name_strategy() -> impl Strategy<Value = String> {
    (segment_strategy(), prop::sample::select(vec!["js", "ts", "mjs", "d.ts", "json", "png", "txt"]))
        .prop_map(|(stem, ext)| format!("{stem}.{ext}"))
}

fn relative_path_strategy() -> impl Strategy<Value = String> {
    (prop::collection::vec(segment_strategy(), 0..3), file_name_strategy()).prop_map(|(dirs, file)| {
        let mut parts = dirs;
        parts.push(file);
        parts.join("/")
    })
}

// =============================================================================
// Path Properties
// =============================================================================

proptest! {
    /// Property: plain relative paths validate to themselves and stay under the root
    #[test]
    fn relative_paths_validate(path in relative_path_strategy()) {
        let clean = validate_relative(&path).unwrap();
        prop_assert_eq!(clean.to_str(), Some(path.as_str()));
        prop_assert!(clean.components().all(|c| matches!(c, Component::Normal(_))));
    }

    /// Property: `.` segments are dropped, so `./x` and `x` validate to the same path
    #[test]
    fn current_dir_segments_are_dropped(path in relative_path_strategy()) {
        let dotted = format!("./{}", path.replace('/', "/./"));
        prop_assert_eq!(validate_relative(&dotted).unwrap(), validate_relative(&path).unwrap());
    }

    /// Property: any `..` segment is rejected, wherever it sits
    #[test]
    fn parent_segments_are_rejected(
        before in prop::collection::vec(segment_strategy(), 0..3),
        after in relative_path_strategy(),
    ) {
        let mut parts = before;
        parts.push("..".to_string());
        parts.push(after);
        let escaping = parts.join("/");
        let rejected = matches!(validate_relative(&escaping), Err(HarnessError::PathEscape { .. }));
        prop_assert!(rejected);
    }

    /// Property: absolute paths are rejected
    #[test]
    fn absolute_paths_are_rejected(path in relative_path_strategy()) {
        let rejected = matches!(validate_relative(&format!("/{path}")), Err(HarnessError::PathEscape { .. }));
        prop_assert!(rejected);
    }
}

// =============================================================================
// Rendering Properties
// =============================================================================

proptest! {
    /// Property: sources read back as header + text, everything else byte-identical
    #[test]
    fn header_only_on_text_sources(path in relative_path_strategy(), text in "[ -~\n]{0,60}") {
        let content = FileContent::from(text.as_str());
        let rendered = render_content(&path, &content, TEST_HEADER);
        let opted_out = text.lines().next().is_some_and(|l| l.trim() == "//@no-header");
        if is_source_path(&path) && !opted_out {
            prop_assert_eq!(rendered.into_owned(), format!("{TEST_HEADER}{text}").into_bytes());
        } else {
            prop_assert_eq!(rendered.into_owned(), text.into_bytes());
        }
    }

    /// Property: binary content is never touched, whatever the extension
    #[test]
    fn binary_is_verbatim(path in relative_path_strategy(), bytes in prop::collection::vec(any::<u8>(), 0..64)) {
        let content = FileContent::from(bytes.clone());
        prop_assert_eq!(render_content(&path, &content, TEST_HEADER).into_owned(), bytes);
    }

    /// Property: every distinct file written reads back with exactly its rendered content
    #[test]
    fn written_files_read_back(paths in prop::collection::btree_set(relative_path_strategy(), 1..6)) {
        let files: InlineFiles = paths.iter().map(|p| (p.clone(), format!("// {p}"))).collect();
        let dir = tempfile::tempdir().unwrap();
        let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();

        rt.block_on(write_files(dir.path(), &files, TEST_HEADER)).unwrap();
        for (path, content) in files.iter() {
            let on_disk = std::fs::read(dir.path().join(Path::new(path))).unwrap();
            prop_assert_eq!(on_disk, render_content(path, content, TEST_HEADER).into_owned());
        }
    }
}
