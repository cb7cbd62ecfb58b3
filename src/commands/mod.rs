//! Command synthesis for the external build, package, spec and git tools.
//!
//! Every function here is pure: it maps configuration and runtime parameters
//! to a [`CommandDescriptor`] without running anything.

pub mod git;
pub mod simulator;
pub mod xcode;

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Where the captured output of a command goes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OutputSink {
    /// Echo to the operator's stderr.
    #[default]
    Stderr,
    /// Write to a log artifact, overwriting previous content.
    File(PathBuf),
    /// Keep the output in memory only.
    Quiet,
}

/// A synthesized external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandDescriptor {
    /// Executable name or path.
    pub program: String,
    /// Arguments, passed without shell interpretation.
    pub args: Vec<String>,
    /// Environment variables added to the child's environment.
    pub env: BTreeMap<String, String>,
    /// Working directory of the child.
    pub current_dir: Option<PathBuf>,
    /// Destination of the captured output.
    pub sink: OutputSink,
    /// Output lines containing any of these are dropped before the sink.
    pub suppressed_lines: Vec<String>,
}

impl CommandDescriptor {
    /// Creates a descriptor for `program` with no arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
            current_dir: None,
            sink: OutputSink::default(),
            suppressed_lines: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Persists the captured output to `path` instead of echoing it.
    pub fn log_to(mut self, path: impl Into<PathBuf>) -> Self {
        self.sink = OutputSink::File(path.into());
        self
    }

    /// Keeps the captured output in memory only.
    pub fn quiet(mut self) -> Self {
        self.sink = OutputSink::Quiet;
        self
    }

    /// Drops output lines containing `pattern`.
    pub fn suppress_lines_containing(mut self, pattern: impl Into<String>) -> Self {
        self.suppressed_lines.push(pattern.into());
        self
    }

    /// Returns the log artifact path, if output is persisted.
    pub fn log_file(&self) -> Option<&Path> {
        match &self.sink {
            OutputSink::File(path) => Some(path),
            _ => None,
        }
    }

    /// Applies the line suppression rules to captured output.
    pub fn filter_output(&self, output: &str) -> String {
        if self.suppressed_lines.is_empty() {
            return output.to_string();
        }

        output
            .split_inclusive('\n')
            .filter(|line| {
                !self
                    .suppressed_lines
                    .iter()
                    .any(|pattern| line.contains(pattern.as_str()))
            })
            .collect()
    }
}

impl fmt::Display for CommandDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", shell_quote(&self.program))?;
        for arg in &self.args {
            write!(f, " {}", shell_quote(arg))?;
        }
        Ok(())
    }
}

fn shell_quote(word: &str) -> String {
    let plain = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:,+@%".contains(c));
    if plain {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    }
}
