//! Structured error types shared across epsweep crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured payload attached to every [`SweepError`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine readable error code.
    pub code: String,
    /// Human readable diagnostic message.
    pub message: String,
    /// Contextual key value pairs (combination labels, paths, exit codes).
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Optional hint that may help the caller resolve the issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Creates a new error payload with the provided code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Adds a context entry to the payload.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Sets a human readable hint for remediation.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Canonical error type for the sweep driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum SweepError {
    /// Invalid sweep configuration (empty dimension list, malformed patterns).
    #[error("config error: {0}")]
    Config(ErrorInfo),
    /// External process spawn failures and non-zero exits.
    #[error("process error: {0}")]
    Process(ErrorInfo),
    /// Expected output artifact missing after a run.
    #[error("artifact error: {0}")]
    Artifact(ErrorInfo),
    /// Archive destination already occupied by a prior artifact.
    #[error("collision error: {0}")]
    Collision(ErrorInfo),
    /// Filesystem failures outside the artifact contract.
    #[error("io error: {0}")]
    Io(ErrorInfo),
    /// Serialization and schema errors.
    #[error("serde error: {0}")]
    Serde(ErrorInfo),
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code: {})", self.message, self.code)?;
        if !self.context.is_empty() {
            write!(f, " | context: [")?;
            for (idx, (key, value)) in self.context.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}={value}")?;
            }
            write!(f, "]")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, " | hint: {hint}")?;
        }
        Ok(())
    }
}

impl SweepError {
    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            SweepError::Config(info)
            | SweepError::Process(info)
            | SweepError::Artifact(info)
            | SweepError::Collision(info)
            | SweepError::Io(info)
            | SweepError::Serde(info) => info,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_info_renders_context_and_hint() {
        let err = SweepError::Process(
            ErrorInfo::new("spawn", "trainer exited abnormally")
                .with_context("combination", "dataset=flickr epsilon=1.0")
                .with_context("exit_code", "2")
                .with_hint("inspect the trainer log"),
        );
        let rendered = err.to_string();
        assert!(rendered.contains("trainer exited abnormally"));
        assert!(rendered.contains("combination=dataset=flickr epsilon=1.0"));
        assert!(rendered.contains("hint: inspect the trainer log"));
        assert_eq!(err.info().code, "spawn");
    }
}
