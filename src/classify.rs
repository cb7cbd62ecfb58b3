//! Success/failure classification of spec-run output.
//!
//! The verdict is a plain substring heuristic over the whole captured buffer.
//! It is known to be fragile: an unrelated log line mentioning `FAILURE`
//! fails the run, and a `Finished` printed by some other tool passes it.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::executor::CommandOutput;

/// Marker the spec runner prints when it completes.
pub const FINISH_MARKER: &str = "Finished";

/// Markers that fail a run wherever they appear.
pub const FAILURE_MARKERS: &[&str] = &["FAILURE", "EXCEPTION"];

/// Binary outcome of a classified run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Success,
    Failure,
}

/// Classifies captured output.
///
/// Success requires the finish marker and the absence of every failure
/// marker. Checks are case-sensitive and not line-anchored.
pub fn classify(output: &str) -> Outcome {
    let finished = output.contains(FINISH_MARKER);
    let failed = FAILURE_MARKERS.iter().any(|marker| output.contains(marker));

    if finished && !failed {
        Outcome::Success
    } else {
        Outcome::Failure
    }
}

/// Classifies captured output, forcing failure when an expected report is missing.
pub fn classify_with_report(output: &str, report: Option<&Path>) -> Outcome {
    match report {
        Some(path) if !path.exists() => {
            tracing::warn!(report = %path.display(), "expected spec report was not written");
            Outcome::Failure
        }
        _ => classify(output),
    }
}

/// Classified outcome of a spec run.
///
/// Only constructed through [`ExecutionResult::classify`].
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    outcome: Outcome,
    captured_output: String,
    artifact_path: Option<PathBuf>,
    report_path: Option<PathBuf>,
}

impl ExecutionResult {
    /// Classifies the output of a finished run.
    pub fn classify(output: CommandOutput, report: Option<&Path>) -> Self {
        let outcome = classify_with_report(&output.output, report);
        Self {
            outcome,
            captured_output: output.output,
            artifact_path: output.artifact,
            report_path: report.map(Path::to_path_buf),
        }
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn is_success(&self) -> bool {
        self.outcome == Outcome::Success
    }

    pub fn captured_output(&self) -> &str {
        &self.captured_output
    }

    /// Log artifact holding the captured output.
    pub fn artifact_path(&self) -> Option<&Path> {
        self.artifact_path.as_deref()
    }

    /// JUnit report the run was expected to write.
    pub fn report_path(&self) -> Option<&Path> {
        self.report_path.as_deref()
    }
}
