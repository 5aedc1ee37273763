//! Define run options and their rendering into runner command-line flags.
//!
//! Options are an ordered list of tagged entries rather than a loosely typed map:
//! - `Flag`: rendered as a bare `--name`.
//! - `Value`: rendered as `--name=value`.
//! - `Repeated`: rendered as one `--name=value` per element, in element order.
//!
//! ## Notes
//! - Insertion order is the rendered argument order.
//! - Names that do not already start with `-` get a `--` prefix when rendered.

use std::fmt;

/// Describe the shape of a single option value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionKind {
    /// Presence-only boolean flag.
    Flag,
    /// Single `--name=value` occurrence.
    Value(String),
    /// One `--name=value` occurrence per element.
    Repeated(Vec<String>),
}

/// Represent one named option passed through to the external runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOption {
    pub name: String,
    pub kind: OptionKind,
}

impl RunOption {
    /// Return the option name with a flag marker, leaving already-marked names alone.
    ///
    /// ## Returns
    /// - (`String`): `name` when it starts with `-`, otherwise `--name`.
    pub fn flag_name(&self) -> String {
        normalize_flag_name(&self.name)
    }

    /// Append the rendered arguments for this option to `out`.
    pub fn render_into(&self, out: &mut Vec<String>) {
        let flag = self.flag_name();
        match &self.kind {
            OptionKind::Flag => out.push(flag),
            OptionKind::Value(value) => out.push(format!("{}={}", flag, value)),
            OptionKind::Repeated(values) => {
                for value in values {
                    out.push(format!("{}={}", flag, value));
                }
            }
        }
    }
}

/// Prefix a bare option name with `--`.
///
/// ## Parameters
/// - `name`: option name as supplied by the caller (`headed`, `--headed`, `-j`).
///
/// ## Returns
/// - (`String`): the name in flag form.
pub fn normalize_flag_name(name: &str) -> String {
    if name.starts_with('-') {
        name.to_string()
    } else {
        format!("--{}", name)
    }
}

/// Ordered set of options forwarded to the runner after the fixed arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    entries: Vec<RunOption>,
}

impl RunOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a presence-only flag.
    pub fn flag(mut self, name: impl Into<String>) -> Self {
        self.push(name, OptionKind::Flag);
        self
    }

    /// Add a single-valued option.
    pub fn value(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.push(name, OptionKind::Value(value.to_string()));
        self
    }

    /// Add an option repeated once per element.
    pub fn repeated<I, V>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: ToString,
    {
        let values = values.into_iter().map(|v| v.to_string()).collect();
        self.push(name, OptionKind::Repeated(values));
        self
    }

    /// Append an entry in place.
    pub fn push(&mut self, name: impl Into<String>, kind: OptionKind) {
        self.entries.push(RunOption {
            name: name.into(),
            kind,
        });
    }

    /// Parse a `KEY` or `KEY=VALUE` string as typed on a command line.
    ///
    /// A repeated key turns an existing entry into a `Repeated` entry, keeping the position of its
    /// first occurrence, so `-o retries=1 -o retries=2` renders as `--retries=1 --retries=2`.
    pub fn push_assignment(&mut self, assignment: &str) {
        let (name, kind) = match assignment.split_once('=') {
            Some((name, value)) => (name, OptionKind::Value(value.to_string())),
            None => (assignment, OptionKind::Flag),
        };

        let Some(index) = self.entries.iter().position(|e| e.name == name) else {
            self.push(name, kind);
            return;
        };

        // A repeated bare flag adds nothing.
        if let OptionKind::Value(value) = kind {
            let entry = &mut self.entries[index];
            let merged = match std::mem::replace(&mut entry.kind, OptionKind::Flag) {
                OptionKind::Value(first) => vec![first, value],
                OptionKind::Repeated(mut values) => {
                    values.push(value);
                    values
                }
                OptionKind::Flag => vec![value],
            };
            entry.kind = OptionKind::Repeated(merged);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RunOption> {
        self.entries.iter()
    }

    /// Render all entries as command-line arguments, in insertion order.
    ///
    /// ## Returns
    /// - (`Vec<String>`): one element per argument.
    pub fn to_args(&self) -> Vec<String> {
        let mut out = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            entry.render_into(&mut out);
        }
        out
    }
}

impl FromIterator<RunOption> for RunOptions {
    fn from_iter<T: IntoIterator<Item = RunOption>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a RunOptions {
    type Item = &'a RunOption;
    type IntoIter = std::slice::Iter<'a, RunOption>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl fmt::Display for RunOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_args().join(" "))
    }
}
