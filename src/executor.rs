//! Synchronous execution of synthesized commands.
//!
//! A command runs to completion before the next one is issued. Stdout and
//! stderr are captured into a single buffer through one shared pipe, so the
//! buffer preserves the interleaving the tool produced.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use serde::Serialize;

use crate::commands::{CommandDescriptor, OutputSink};
use crate::error::{Error, Result};

/// Raw result of running a process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code, `None` when terminated by a signal.
    pub code: Option<i32>,
    /// Combined stdout and stderr.
    pub output: String,
}

/// Trait for process runners.
///
/// The system implementation spawns real processes; tests substitute a
/// scripted runner.
pub trait CommandRunner {
    /// Runs the command to completion and returns its combined output.
    fn run(&self, descriptor: &CommandDescriptor) -> Result<ProcessOutput>;
}

/// Runner backed by `std::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, descriptor: &CommandDescriptor) -> Result<ProcessOutput> {
        let (mut reader, writer) = std::io::pipe()?;

        let mut command = Command::new(&descriptor.program);
        command
            .args(&descriptor.args)
            .envs(&descriptor.env)
            .stdin(Stdio::null())
            .stdout(writer.try_clone()?)
            .stderr(writer);
        if let Some(dir) = &descriptor.current_dir {
            command.current_dir(dir);
        }

        let mut child = command.spawn().map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("failed to run {}: {}", descriptor.program, e),
            ))
        })?;
        // The command still holds the pipe's write ends; reading would never
        // see EOF while they stay open.
        drop(command);

        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        let status = child.wait()?;

        Ok(ProcessOutput {
            code: status.code(),
            output: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }
}

/// Captured output of an executed command after filtering and persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandOutput {
    /// Exit code, `None` when terminated by a signal.
    pub code: Option<i32>,
    /// Combined output with suppressed lines removed.
    pub output: String,
    /// Log artifact the output was written to.
    pub artifact: Option<PathBuf>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Appends text to the output and to the log artifact, if any.
    pub fn append(&mut self, text: &str) -> Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        if let Some(path) = &self.artifact {
            let mut file = std::fs::OpenOptions::new().append(true).open(path)?;
            file.write_all(text.as_bytes())?;
        }
        self.output.push_str(text);
        Ok(())
    }
}

/// Runs descriptors and routes their output to the requested sink.
#[derive(Debug, Clone, Default)]
pub struct Executor<R = SystemRunner> {
    runner: R,
}

impl<R: CommandRunner> Executor<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Runs the command and returns its output regardless of exit code.
    pub fn capture(&self, descriptor: &CommandDescriptor) -> Result<CommandOutput> {
        tracing::info!(command = %descriptor, "Executing");

        let raw = self.runner.run(descriptor)?;
        let output = descriptor.filter_output(&raw.output);

        let artifact = match &descriptor.sink {
            OutputSink::File(path) => {
                write_artifact(path, &output)?;
                tracing::info!(path = %path.display(), "Output");
                Some(path.clone())
            }
            OutputSink::Stderr => {
                std::io::stderr().write_all(output.as_bytes())?;
                None
            }
            OutputSink::Quiet => {
                tracing::debug!(command = %descriptor, output = %output.trim_end(), "captured");
                None
            }
        };

        Ok(CommandOutput {
            code: raw.code,
            output,
            artifact,
        })
    }

    /// Runs the command and fails with [`Error::ExternalCommandFailed`] on a non-zero exit.
    pub fn run_checked(&self, descriptor: &CommandDescriptor) -> Result<CommandOutput> {
        let output = self.capture(descriptor)?;
        if !output.success() {
            if descriptor.sink == OutputSink::Quiet && !output.output.trim().is_empty() {
                tracing::error!(command = %descriptor, output = %output.output.trim_end(), "command failed");
            }
            return Err(Error::ExternalCommandFailed {
                command: descriptor.to_string(),
                code: output.code,
            });
        }
        Ok(output)
    }

    /// Runs the command ignoring its exit status.
    pub fn run_unchecked(&self, descriptor: &CommandDescriptor) -> Result<()> {
        let output = self.capture(descriptor)?;
        if !output.success() {
            tracing::debug!(command = %descriptor, code = ?output.code, "ignoring exit status");
        }
        Ok(())
    }
}

fn write_artifact(path: &Path, output: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, output)?;
    Ok(())
}
