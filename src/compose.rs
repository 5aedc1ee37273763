//! Inline test composer - materializes an in-memory file set and runs it
//!
//! Writes:
//! - every file of an [`InlineFiles`] set under a destination root, creating parent directories
//! - a header in front of each text source file (unless its first line is `//@no-header`)
//!
//! then hands the root to the process runner with `.` as the target.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::path::{Component, Path, PathBuf};

use tokio::task::JoinSet;

use crate::config::HarnessConfig;
use crate::error::{HarnessError, HarnessResult};
use crate::result::RunResult;
use crate::runner::{CWD_TARGET, Invocation, RunArgs, run_runner};

/// Extensions whose text content gets the header.
pub const SOURCE_EXTENSIONS: &[&str] = &["js", "ts", "mjs"];

/// A source file whose first line is this marker is written without the header.
pub const NO_HEADER_MARKER: &str = "//@no-header";

/// Subdirectory of the destination root the runner writes its artifacts and report into.
pub const OUTPUT_SUBDIR: &str = "test-results";

/// Content of one inline file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileContent {
    Text(String),
    Binary(Vec<u8>),
}

impl From<&str> for FileContent {
    fn from(text: &str) -> Self {
        FileContent::Text(text.to_string())
    }
}

impl From<String> for FileContent {
    fn from(text: String) -> Self {
        FileContent::Text(text)
    }
}

impl From<Vec<u8>> for FileContent {
    fn from(bytes: Vec<u8>) -> Self {
        FileContent::Binary(bytes)
    }
}

impl From<&[u8]> for FileContent {
    fn from(bytes: &[u8]) -> Self {
        FileContent::Binary(bytes.to_vec())
    }
}

/// Relative path → content. Iteration is in path order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InlineFiles {
    files: BTreeMap<String, FileContent>,
}

impl InlineFiles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file, builder style.
    pub fn file(mut self, path: impl Into<String>, content: impl Into<FileContent>) -> Self {
        self.insert(path, content);
        self
    }

    pub fn insert(&mut self, path: impl Into<String>, content: impl Into<FileContent>) {
        self.files.insert(path.into(), content.into());
    }

    pub fn get(&self, path: &str) -> Option<&FileContent> {
        self.files.get(path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FileContent)> {
        self.files.iter().map(|(path, content)| (path.as_str(), content))
    }
}

impl<P: Into<String>, C: Into<FileContent>> FromIterator<(P, C)> for InlineFiles {
    fn from_iter<T: IntoIterator<Item = (P, C)>>(iter: T) -> Self {
        let mut files = InlineFiles::new();
        for (path, content) in iter {
            files.insert(path, content);
        }
        files
    }
}

/// Whether `path` names a source file that receives the header.
pub fn is_source_path(path: &str) -> bool {
    Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext))
}

/// The bytes written for `path`: header plus text for sources, verbatim otherwise.
pub fn render_content<'a>(path: &str, content: &'a FileContent, header: &str) -> Cow<'a, [u8]> {
    match content {
        FileContent::Binary(bytes) => Cow::Borrowed(bytes),
        FileContent::Text(text) if is_source_path(path) && !opts_out_of_header(text) => {
            let mut out = String::with_capacity(header.len() + text.len());
            out.push_str(header);
            out.push_str(text);
            Cow::Owned(out.into_bytes())
        }
        FileContent::Text(text) => Cow::Borrowed(text.as_bytes()),
    }
}

fn opts_out_of_header(text: &str) -> bool {
    text.lines().next().is_some_and(|first| first.trim() == NO_HEADER_MARKER)
}

/// Validate an inline path and return it as a relative `PathBuf`.
///
/// Rejects empty paths, absolute paths, and any `..` component.
pub fn validate_relative(path: &str) -> HarnessResult<PathBuf> {
    let candidate = Path::new(path);
    let mut clean = PathBuf::new();
    for component in candidate.components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(HarnessError::PathEscape { path: path.to_string() });
            }
        }
    }
    if clean.as_os_str().is_empty() {
        return Err(HarnessError::PathEscape { path: path.to_string() });
    }
    Ok(clean)
}

/// Write every file of `files` under `root`, concurrently.
///
/// All paths are validated before anything is written; two keys naming the same file (such as
/// `a.js` and `./a.js`) are rejected. The first failing write aborts the rest.
#[tracing::instrument(skip_all, fields(root = %root.display(), files = files.len()))]
pub async fn write_files(root: &Path, files: &InlineFiles, header: &str) -> HarnessResult<()> {
    let mut planned: BTreeMap<PathBuf, (&str, Vec<u8>)> = BTreeMap::new();
    for (path, content) in files.iter() {
        match planned.entry(validate_relative(path)?) {
            Entry::Occupied(existing) => {
                return Err(HarnessError::DuplicatePath {
                    path: path.to_string(),
                    first: existing.get().0.to_string(),
                });
            }
            Entry::Vacant(slot) => {
                slot.insert((path, render_content(path, content, header).into_owned()));
            }
        }
    }

    let mut writes = JoinSet::new();
    for (relative, (_, bytes)) in planned {
        let full = root.join(relative);
        writes.spawn(async move {
            if let Some(parent) = full.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|source| HarnessError::CreateDir {
                        path: parent.to_path_buf(),
                        source,
                    })?;
            }
            tokio::fs::write(&full, bytes)
                .await
                .map_err(|source| HarnessError::WriteFile { path: full, source })
        });
    }

    while let Some(joined) = writes.join_next().await {
        joined??;
    }
    Ok(())
}

/// Write `files` under `root` and run the runner against all of it.
pub async fn run_inline(
    config: &HarnessConfig,
    root: &Path,
    files: &InlineFiles,
    header: &str,
    args: RunArgs,
) -> HarnessResult<RunResult> {
    write_files(root, files, header).await?;
    tracing::debug!(root = %root.display(), "inline files written");

    let invocation = Invocation {
        cwd: root.to_path_buf(),
        target: CWD_TARGET.to_string(),
        output_dir: root.join(OUTPUT_SUBDIR),
        args,
    };
    Ok(run_runner(config, &invocation).await)
}
