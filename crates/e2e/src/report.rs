//! Reporting layer: the stdout transcript and the structured run report

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::assertion::AssertionResult;
use crate::config::TranscriptEncoding;
use crate::error::E2eResult;
use crate::spec::StepKind;

/// Status marker leading each transcript line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Ok,
    Info,
    Warn,
    Saved,
    Fatal,
    Success,
    Failed,
}

impl Marker {
    pub fn as_str(&self) -> &'static str {
        match self {
            Marker::Ok => "[OK]",
            Marker::Info => "[INFO]",
            Marker::Warn => "[WARN]",
            Marker::Saved => "[SAVED]",
            Marker::Fatal => "[FATAL]",
            Marker::Success => "[SUCCESS]",
            Marker::Failed => "[FAILED]",
        }
    }
}

/// Append-only, ordered transcript.
///
/// Lines are kept in memory and, when echoing, written to stdout in the
/// configured encoding.
pub struct Reporter {
    encoding: TranscriptEncoding,
    echo: bool,
    lines: Vec<String>,
}

impl Reporter {
    /// Transcript that is also written to stdout
    pub fn stdout(encoding: TranscriptEncoding) -> Self {
        Self {
            encoding,
            echo: true,
            lines: Vec::new(),
        }
    }

    /// Transcript kept in memory only
    pub fn buffered(encoding: TranscriptEncoding) -> Self {
        Self {
            encoding,
            echo: false,
            lines: Vec::new(),
        }
    }

    pub fn report(&mut self, marker: Marker, text: &str) {
        self.push(format!("{} {}", marker.as_str(), text));
    }

    /// Unmarked line (headers, blank separators, artifact listings)
    pub fn plain(&mut self, text: &str) {
        self.push(text.to_string());
    }

    fn push(&mut self, line: String) {
        let line = self.encoding.encode(&line);
        if self.echo {
            let mut out = std::io::stdout().lock();
            let _ = writeln!(out, "{}", line);
        }
        self.lines.push(line);
    }

    pub fn transcript(&self) -> &[String] {
        &self.lines
    }

    pub fn count(&self, marker: Marker) -> usize {
        self.lines
            .iter()
            .filter(|l| l.starts_with(marker.as_str()))
            .count()
    }
}

/// How a step ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOutcome {
    /// Navigation loaded, wait satisfied or slept, capture written
    Completed,
    /// Visibility assertion held
    Passed,
    /// Visibility assertion did not hold
    Failed,
    /// Interaction carried out
    Performed,
    /// Interaction skipped because its target was absent or refused
    NotPerformed,
    /// Wait bound elapsed or awaited element never appeared
    Degraded,
    /// Step ended the scenario
    Fatal,
    /// Never executed because an earlier step was fatal
    Aborted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    /// 1-based position in the scenario
    pub index: usize,
    pub kind: StepKind,
    pub description: String,
    pub outcome: StepOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub duration_ms: u64,
}

/// A screenshot written for a checkpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub checkpoint: String,
    pub path: PathBuf,
    pub sha256: String,
    pub bytes: u64,
}

/// Result of running one scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub scenario: String,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    /// False only when a fatal error ended the run
    pub success: bool,
    pub fatal_error: Option<String>,
    pub steps: Vec<StepRecord>,
    pub assertions: Vec<AssertionResult>,
    pub artifacts: Vec<Artifact>,
}

impl RunReport {
    pub fn passed_assertions(&self) -> usize {
        self.assertions.iter().filter(|a| a.passed).count()
    }

    pub fn outcome_count(&self, outcome: StepOutcome) -> usize {
        self.steps.iter().filter(|s| s.outcome == outcome).count()
    }

    pub fn artifact_paths(&self) -> Vec<&Path> {
        self.artifacts.iter().map(|a| a.path.as_path()).collect()
    }
}

/// Result of running a set of scenarios
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteReport {
    pub total: usize,
    pub completed: usize,
    pub fatal: usize,
    pub duration_ms: u64,
    pub results: Vec<RunReport>,
}

impl SuiteReport {
    pub fn from_runs(results: Vec<RunReport>, duration_ms: u64) -> Self {
        let completed = results.iter().filter(|r| r.success).count();
        Self {
            total: results.len(),
            completed,
            fatal: results.len() - completed,
            duration_ms,
            results,
        }
    }

    /// Zero unless some scenario hit a fatal error
    pub fn exit_code(&self) -> i32 {
        if self.fatal == 0 {
            0
        } else {
            1
        }
    }

    /// Write the suite as pretty JSON
    pub fn write_json(&self, path: &Path) -> E2eResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        info!("Results written to: {}", path.display());
        Ok(())
    }
}
