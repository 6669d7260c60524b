//! Scenario data model and declarative YAML loading

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::DelayTable;
use crate::error::{E2eError, E2eResult};

/// One complete ordered test flow against one application route
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Human-readable name, e.g. "Quiz Game"
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Route the scenario starts from (relative to the base URL)
    pub entry_url: String,

    /// Tags for filtering scenarios
    #[serde(default)]
    pub tags: Vec<String>,

    /// Prefix of screenshot file names; the slug of `name` when unset
    #[serde(default)]
    pub artifact_prefix: Option<String>,

    /// Steps to execute in order
    pub steps: Vec<Step>,
}

/// A single scripted action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Load a URL (absolute, or relative to the base URL)
    Navigate { url: String },

    /// Pause until a condition holds or a bound elapses
    Wait { strategy: WaitStrategy },

    /// Check that the first element matching `selector` is visible
    AssertVisible {
        selector: SelectorSpec,
        label: String,
    },

    /// Act on the first element matching `selector`
    Interact {
        selector: SelectorSpec,
        #[serde(default, rename = "interaction")]
        action: Interaction,
    },

    /// Save a full-page screenshot under a checkpoint name
    Capture { checkpoint: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Navigate,
    Wait,
    AssertVisible,
    Interact,
    Capture,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interaction {
    #[default]
    Click,
}

/// How long, or on what condition, to pause before the next step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WaitStrategy {
    /// No in-flight requests for the browser's quiescence window
    NetworkIdle,

    /// Unconditional sleep standing in for an animation with no completion event.
    /// The duration comes from the delay table unless `duration_ms` overrides it.
    FixedDelay {
        phase: String,
        #[serde(default)]
        duration_ms: Option<u64>,
    },

    /// Poll visibility of the first match until it shows or the timeout passes
    ElementAppears {
        selector: SelectorSpec,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },
}

/// How to locate a UI element. Only the first match is ever used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SelectorSpec {
    /// Element with an accessible role and name, e.g. a button labelled "Restart"
    Role { role: String, name: String },

    /// Element whose text contains `text`
    Text { text: String },

    /// Element whose text matches a regular expression, e.g. `\d+/\d+`
    Pattern { pattern: String },
}

impl SelectorSpec {
    pub fn text(text: impl Into<String>) -> Self {
        SelectorSpec::Text { text: text.into() }
    }

    pub fn button(name: impl Into<String>) -> Self {
        SelectorSpec::Role {
            role: "button".to_string(),
            name: name.into(),
        }
    }

    pub fn pattern(pattern: impl Into<String>) -> Self {
        SelectorSpec::Pattern {
            pattern: pattern.into(),
        }
    }
}

impl fmt::Display for SelectorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectorSpec::Role { role, name } => write!(f, "{} \"{}\"", role, name),
            SelectorSpec::Text { text } => write!(f, "text \"{}\"", text),
            SelectorSpec::Pattern { pattern } => write!(f, "pattern /{}/", pattern),
        }
    }
}

impl Step {
    pub fn kind(&self) -> StepKind {
        match self {
            Step::Navigate { .. } => StepKind::Navigate,
            Step::Wait { .. } => StepKind::Wait,
            Step::AssertVisible { .. } => StepKind::AssertVisible,
            Step::Interact { .. } => StepKind::Interact,
            Step::Capture { .. } => StepKind::Capture,
        }
    }

    /// Short description used in logs and step records
    pub fn describe(&self) -> String {
        match self {
            Step::Navigate { url } => format!("navigate:{}", url),
            Step::Wait { strategy } => match strategy {
                WaitStrategy::NetworkIdle => "wait:network-idle".to_string(),
                WaitStrategy::FixedDelay { phase, .. } => format!("wait:delay:{}", phase),
                WaitStrategy::ElementAppears { selector, .. } => {
                    format!("wait:appears:{}", selector)
                }
            },
            Step::AssertVisible { label, .. } => format!("assert:{}", label),
            Step::Interact { selector, action } => match action {
                Interaction::Click => format!("click:{}", selector),
            },
            Step::Capture { checkpoint } => format!("capture:{}", checkpoint),
        }
    }
}

impl Scenario {
    /// Parse a scenario from YAML string
    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        serde_yaml::from_str(yaml).map_err(E2eError::from)
    }

    /// Parse a scenario from a YAML file
    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content).map_err(|e| {
            E2eError::ScenarioParse(format!("{}: {}", path.display(), e))
        })
    }

    /// Load all scenarios from a directory, sorted by file path
    pub fn load_all(dir: &Path) -> E2eResult<Vec<Self>> {
        let mut scenarios = Vec::new();

        for entry in walkdir::WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
            })
        {
            scenarios.push(Self::from_file(entry.path())?);
        }

        Ok(scenarios)
    }

    /// Filter scenarios by tag
    pub fn filter_by_tag<'a>(scenarios: &'a [Self], tag: &str) -> Vec<&'a Self> {
        scenarios
            .iter()
            .filter(|s| s.tags.iter().any(|t| t == tag))
            .collect()
    }

    /// Lowercase, dash-separated form of the name
    pub fn slug(&self) -> String {
        slugify(&self.name)
    }

    pub fn artifact_prefix(&self) -> String {
        self.artifact_prefix
            .as_deref()
            .map(slugify)
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| self.slug())
    }

    /// Check structural invariants before any browser is launched
    pub fn validate(&self, delays: &DelayTable) -> E2eResult<()> {
        let invalid = |reason: String| E2eError::InvalidScenario {
            scenario: self.name.clone(),
            reason,
        };

        if self.name.trim().is_empty() {
            return Err(invalid("name is empty".into()));
        }
        if self.steps.is_empty() {
            return Err(invalid("no steps".into()));
        }

        let prefix = self.artifact_prefix();
        let mut files = HashSet::new();
        for (i, step) in self.steps.iter().enumerate() {
            // Every navigation must be followed by a wait before anything else
            if step.kind() == StepKind::Navigate {
                match self.steps.get(i + 1) {
                    Some(next) if next.kind() == StepKind::Wait => {}
                    _ => {
                        return Err(invalid(format!(
                            "step {} ({}) is not immediately followed by a wait",
                            i + 1,
                            step.describe()
                        )))
                    }
                }
            }

            match step {
                Step::Wait {
                    strategy: WaitStrategy::FixedDelay {
                        phase,
                        duration_ms: None,
                    },
                } if delays.get(phase).is_none() => {
                    return Err(invalid(format!(
                        "step {}: unknown delay phase '{}'",
                        i + 1,
                        phase
                    )));
                }
                Step::Wait {
                    strategy: WaitStrategy::ElementAppears { selector, .. },
                }
                | Step::AssertVisible { selector, .. }
                | Step::Interact { selector, .. } => {
                    check_selector(selector)
                        .map_err(|r| invalid(format!("step {}: {}", i + 1, r)))?;
                }
                Step::Capture { checkpoint } => {
                    if slugify(checkpoint).is_empty() {
                        return Err(invalid(format!("step {}: empty checkpoint name", i + 1)));
                    }
                    let file = artifact_file_name(&prefix, checkpoint);
                    if !files.insert(file.clone()) {
                        return Err(invalid(format!(
                            "step {}: duplicate checkpoint '{}' ({} already captured)",
                            i + 1,
                            checkpoint,
                            file
                        )));
                    }
                }
                _ => {}
            }
        }

        Ok(())
    }
}

fn check_selector(selector: &SelectorSpec) -> Result<(), String> {
    match selector {
        SelectorSpec::Pattern { pattern } => regex::Regex::new(pattern)
            .map(|_| ())
            .map_err(|e| format!("invalid pattern /{}/: {}", pattern, e)),
        SelectorSpec::Text { text } if text.is_empty() => Err("empty text selector".into()),
        SelectorSpec::Role { role, name } if role.is_empty() || name.is_empty() => {
            Err("role selector needs both role and name".into())
        }
        _ => Ok(()),
    }
}

/// Screenshot file name for a checkpoint: `<prefix>-<checkpoint>.png`, without
/// doubling a prefix the checkpoint already carries
pub fn artifact_file_name(prefix: &str, checkpoint: &str) -> String {
    let checkpoint = slugify(checkpoint);
    if prefix.is_empty() || checkpoint.starts_with(&format!("{}-", prefix)) {
        format!("{}.png", checkpoint)
    } else {
        format!("{}-{}.png", prefix, checkpoint)
    }
}

/// Lowercase ASCII alphanumerics, every other run of characters collapsed to one dash
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}
