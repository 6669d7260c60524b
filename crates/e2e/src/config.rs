//! Harness configuration

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::{E2eError, E2eResult};

/// Harness configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Base URL of the application under test
    pub base_url: String,

    /// Launch the browser without a window
    pub headless: bool,

    /// Directory receiving checkpoint screenshots
    pub artifact_dir: PathBuf,

    /// Where to write the JSON suite report (None = don't write)
    pub results_path: Option<PathBuf>,

    /// Browser viewport
    pub viewport: Viewport,

    /// Output encoding of the stdout transcript
    pub encoding: TranscriptEncoding,

    /// Upper bounds for every blocking operation
    pub timeouts: Timeouts,

    /// Named animation settle durations
    pub delays: DelayTable,

    /// Node.js bridge settings
    pub bridge: BridgeConfig,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            headless: true,
            artifact_dir: PathBuf::from("test-screenshots"),
            results_path: None,
            viewport: Viewport::default(),
            encoding: TranscriptEncoding::Utf8,
            timeouts: Timeouts::default(),
            delays: DelayTable::default(),
            bridge: BridgeConfig::default(),
        }
    }
}

impl HarnessConfig {
    /// Load configuration from file, falling back to defaults when absent
    pub fn load(path: &Path) -> E2eResult<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Self::from_toml(&content)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_toml(content: &str) -> E2eResult<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> E2eResult<()> {
        url::Url::parse(&self.base_url)
            .map_err(|e| E2eError::Config(format!("base_url '{}': {}", self.base_url, e)))?;
        if self.timeouts.poll_interval_ms == 0 {
            return Err(E2eError::Config("timeouts.poll_interval_ms must be > 0".into()));
        }
        if self.timeouts.run_ms == 0 {
            return Err(E2eError::Config("timeouts.run_ms must be > 0".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

/// Output encoding of the human-readable transcript
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum TranscriptEncoding {
    #[default]
    Utf8,
    /// Replace anything outside ASCII with '?', for consoles with legacy code pages
    Ascii,
}

impl TranscriptEncoding {
    pub fn encode(&self, line: &str) -> String {
        match self {
            TranscriptEncoding::Utf8 => line.to_string(),
            TranscriptEncoding::Ascii => line
                .chars()
                .map(|c| if c.is_ascii() { c } else { '?' })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    pub navigation_ms: u64,
    pub network_idle_ms: u64,
    pub element_ms: u64,
    pub poll_interval_ms: u64,
    pub bridge_response_ms: u64,
    /// Deadline for a whole scenario run
    pub run_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            navigation_ms: 30_000,
            network_idle_ms: 10_000,
            element_ms: 5_000,
            poll_interval_ms: 100,
            bridge_response_ms: 60_000,
            run_ms: 180_000,
        }
    }
}

impl Timeouts {
    pub fn network_idle(&self) -> Duration {
        Duration::from_millis(self.network_idle_ms)
    }

    pub fn element(&self) -> Duration {
        Duration::from_millis(self.element_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn run(&self) -> Duration {
        Duration::from_millis(self.run_ms)
    }
}

/// Settle durations for client-side animations that expose no completion signal.
///
/// Values are calibrated against the known animation lengths of the app.
/// Keep every sleep the scenarios rely on here so flaky timings can be tuned
/// in one place.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, u64>", into = "BTreeMap<String, u64>")]
pub struct DelayTable(BTreeMap<String, u64>);

pub const PAGE_SETTLE: &str = "page_settle";
pub const BLOOM: &str = "bloom";
pub const MESSAGE_REVEAL: &str = "message_reveal";
pub const BUTTONS_REVEAL: &str = "buttons_reveal";
pub const HINT_OVERLAY: &str = "hint_overlay";
pub const ANSWER_FEEDBACK: &str = "answer_feedback";
pub const QUESTION_TRANSITION: &str = "question_transition";

impl Default for DelayTable {
    fn default() -> Self {
        let entries = [
            (PAGE_SETTLE, 2000),
            (BLOOM, 3000),
            (MESSAGE_REVEAL, 3000),
            (BUTTONS_REVEAL, 2000),
            (HINT_OVERLAY, 500),
            (ANSWER_FEEDBACK, 1000),
            (QUESTION_TRANSITION, 1000),
        ];
        Self(entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
    }
}

// A `[delays]` table only overrides the phases it names.
impl From<BTreeMap<String, u64>> for DelayTable {
    fn from(overrides: BTreeMap<String, u64>) -> Self {
        let mut table = Self::default();
        table.0.extend(overrides);
        table
    }
}

impl From<DelayTable> for BTreeMap<String, u64> {
    fn from(table: DelayTable) -> Self {
        table.0
    }
}

impl DelayTable {
    pub fn get(&self, phase: &str) -> Option<Duration> {
        self.0.get(phase).copied().map(Duration::from_millis)
    }

    pub fn set(&mut self, phase: impl Into<String>, ms: u64) {
        self.0.insert(phase.into(), ms);
    }

    pub fn phases(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Node.js executable (auto-detected when unset)
    pub node_path: Option<PathBuf>,

    /// Working directory for the bridge process; must be able to resolve `playwright`
    pub working_dir: Option<PathBuf>,
}
