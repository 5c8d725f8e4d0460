use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Pipeline stage an error was recorded in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Plan,
    Scrape,
    Extract,
    Score,
    Cache,
    Persist,
}

/// A non-fatal error observed during a run.
///
/// Records are additive: they accumulate on [`crate::RunMetadata`] and never
/// abort the run by themselves. Fatal classes (configuration, final commit)
/// are typed errors instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub stage: Stage,
    pub source: Option<String>,
    pub kind: String,
    pub message: String,
}

impl ErrorRecord {
    #[must_use]
    pub fn new(
        stage: Stage,
        source: Option<&str>,
        kind: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            stage,
            source: source.map(str::to_owned),
            kind: kind.into(),
            message: message.into(),
        }
    }
}

/// Configuration failures. Always fatal, always before any network activity.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required env var: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for env var {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("malformed run payload: {0}")]
    MalformedPayload(String),
}
