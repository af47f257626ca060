use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use epsweep_core::errors::{ErrorInfo, SweepError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::grid::render_value;
use crate::template::placeholders;

/// Named axis of the sweep with its ordered value list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridDimension {
    pub name: String,
    pub values: Vec<Value>,
}

/// External trainer invocation template. Arguments may reference dimension
/// and fixed-parameter names as `{placeholder}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

/// One expected output artifact: the fixed path the trainer writes it to and
/// the combination-parameterized destination it is moved to afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSpec {
    pub source: PathBuf,
    pub dest: String,
}

/// Behavior when a combination's trainer invocation fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Record the failure, skip archiving, proceed to the next combination.
    #[default]
    Continue,
    /// Record the failure and skip every remaining combination.
    Abort,
}

/// Bounded retry with exponential backoff for a single invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrySpec {
    #[serde(default = "RetrySpec::default_max_attempts")]
    pub max_attempts: usize,
    #[serde(default = "RetrySpec::default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "RetrySpec::default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl RetrySpec {
    const fn default_max_attempts() -> usize {
        1
    }

    const fn default_base_delay_ms() -> u64 {
        500
    }

    const fn default_max_delay_ms() -> u64 {
        30_000
    }
}

impl Default for RetrySpec {
    fn default() -> Self {
        Self {
            max_attempts: Self::default_max_attempts(),
            base_delay_ms: Self::default_base_delay_ms(),
            max_delay_ms: Self::default_max_delay_ms(),
        }
    }
}

/// Failure and retry policy block of a plan.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PolicySpec {
    #[serde(default)]
    pub on_failure: FailurePolicy,
    #[serde(default)]
    pub retry: RetrySpec,
}

/// Plan describing the sweep: the trainer command template, the dimension
/// grid, non-swept parameters, and the artifact relocation contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepPlan {
    pub name: String,
    pub command: CommandSpec,
    pub dimensions: Vec<GridDimension>,
    #[serde(default)]
    pub fixed: BTreeMap<String, Value>,
    #[serde(default)]
    pub outputs: Vec<OutputSpec>,
    #[serde(default)]
    pub policy: PolicySpec,
}

impl SweepPlan {
    /// Checks the plan before anything is spawned. Every violation is a
    /// `Config` error so a bad plan never starts a partial sweep.
    pub fn validate(&self) -> Result<(), SweepError> {
        if self.dimensions.is_empty() {
            return Err(config(
                "plan-no-dimensions",
                "a sweep plan must declare at least one dimension",
            ));
        }

        let mut names = BTreeSet::new();
        for dim in &self.dimensions {
            if !names.insert(dim.name.as_str()) {
                return Err(config(
                    "plan-duplicate-dimension",
                    format!("dimension `{}` is declared twice", dim.name),
                ));
            }
            let mut rendered = BTreeSet::new();
            for value in &dim.values {
                if !rendered.insert(render_value(value)) {
                    return Err(SweepError::Config(
                        ErrorInfo::new(
                            "dimension-duplicate-value",
                            "dimension values must render to distinct strings",
                        )
                        .with_context("dimension", dim.name.clone())
                        .with_context("value", render_value(value)),
                    ));
                }
            }
        }
        for key in self.fixed.keys() {
            if !names.insert(key.as_str()) {
                return Err(config(
                    "plan-fixed-shadows-dimension",
                    format!("fixed parameter `{key}` collides with another parameter"),
                ));
            }
        }

        for arg in &self.command.args {
            self.check_placeholders(arg, &names)?;
        }
        for output in &self.outputs {
            if output.source.as_os_str().is_empty() {
                return Err(config("output-empty-source", "output source path is empty"));
            }
            let used = self.check_placeholders(&output.dest, &names)?;
            for dim in &self.dimensions {
                if !used.contains(&dim.name) {
                    return Err(SweepError::Config(
                        ErrorInfo::new(
                            "output-missing-dimension",
                            "destination pattern must reference every dimension",
                        )
                        .with_context("dest", output.dest.clone())
                        .with_context("dimension", dim.name.clone())
                        .with_hint("without it, two combinations would archive to the same path"),
                    ));
                }
            }
        }
        Ok(())
    }

    fn check_placeholders(
        &self,
        pattern: &str,
        known: &BTreeSet<&str>,
    ) -> Result<Vec<String>, SweepError> {
        let used = placeholders(pattern)?;
        for name in &used {
            if !known.contains(name.as_str()) {
                return Err(SweepError::Config(
                    ErrorInfo::new(
                        "template-unknown-placeholder",
                        format!("`{{{name}}}` does not name a dimension or fixed parameter"),
                    )
                    .with_context("pattern", pattern.to_string()),
                ));
            }
        }
        Ok(used)
    }
}

fn config(code: &str, message: impl Into<String>) -> SweepError {
    SweepError::Config(ErrorInfo::new(code, message))
}
