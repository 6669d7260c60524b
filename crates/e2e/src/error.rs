//! Error types for the scenario harness

use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Browser environment unavailable: {0}")]
    Environment(String),

    #[error("Node.js not found. Install Node.js >= 18 or set bridge.node_path")]
    NodeNotFound,

    #[error("Playwright bridge error: {0}")]
    Bridge(String),

    #[error("Navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("Failed to write artifact {path}: {source}")]
    ArtifactWrite {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Screenshot for checkpoint '{checkpoint}' failed: {reason}")]
    Capture { checkpoint: String, reason: String },

    #[error("Run deadline of {0} ms exceeded")]
    RunDeadline(u64),

    #[error("Timeout waiting for: {0}")]
    Timeout(String),

    #[error("Scenario parse error: {0}")]
    ScenarioParse(String),

    #[error("Invalid scenario '{scenario}': {reason}")]
    InvalidScenario { scenario: String, reason: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Application at {0} did not respond within {1} s")]
    Unreachable(String, u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Screenshot decode error: {0}")]
    Decode(#[from] base64::DecodeError),
}

impl E2eError {
    /// Whether this error ends a scenario run.
    ///
    /// Session acquisition, navigation, artifact writes and the run deadline
    /// are fatal. Everything else is only ever raised below the sequencer and
    /// is folded into a degraded report entry there.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            E2eError::Environment(_)
                | E2eError::NodeNotFound
                | E2eError::Navigation { .. }
                | E2eError::ArtifactWrite { .. }
                | E2eError::Capture { .. }
                | E2eError::RunDeadline(_)
        )
    }
}

pub type E2eResult<T> = Result<T, E2eError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_taxonomy() {
        assert!(E2eError::Environment("no chromium".into()).is_fatal());
        assert!(E2eError::Navigation {
            url: "http://localhost:3000/".into(),
            reason: "HTTP 502".into(),
        }
        .is_fatal());
        assert!(E2eError::RunDeadline(1000).is_fatal());
        assert!(!E2eError::Timeout("network idle".into()).is_fatal());
        assert!(!E2eError::Bridge("element detached".into()).is_fatal());
    }

    #[test]
    fn test_artifact_write_message_names_path() {
        let err = E2eError::ArtifactWrite {
            path: "/ro/flower-loading.png".into(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.to_string().contains("/ro/flower-loading.png"));
        assert!(err.is_fatal());
    }
}
