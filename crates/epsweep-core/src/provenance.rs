//! Provenance descriptors attached to sweep reports and registry rows.

use std::collections::BTreeMap;
use std::process::Command;

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Provenance information recorded alongside every sweep execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RunProvenance {
    /// ISO-8601 timestamp recording when the sweep started.
    pub created_at: String,
    /// Git commit of the driving checkout, or "unknown" outside a repository.
    pub commit: String,
    /// Version map for the tools involved in the run.
    #[serde(default)]
    pub tool_versions: BTreeMap<String, String>,
}

impl RunProvenance {
    /// Captures provenance for the current process environment.
    pub fn capture() -> Self {
        let mut tool_versions = BTreeMap::new();
        tool_versions.insert("epsweep".to_string(), env!("CARGO_PKG_VERSION").to_string());
        Self {
            created_at: Utc::now().to_rfc3339(),
            commit: current_commit(),
            tool_versions,
        }
    }
}

fn current_commit() -> String {
    Command::new("git")
        .args(["rev-parse", "HEAD"])
        .output()
        .ok()
        .and_then(|out| {
            if out.status.success() {
                Some(String::from_utf8_lossy(&out.stdout).trim().to_string())
            } else {
                None
            }
        })
        .unwrap_or_else(|| "unknown".into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_fills_timestamp_and_tool_versions() {
        let prov = RunProvenance::capture();
        assert!(prov.created_at.contains('T'));
        assert!(!prov.commit.is_empty());
        assert_eq!(
            prov.tool_versions.get("epsweep").map(String::as_str),
            Some(env!("CARGO_PKG_VERSION"))
        );
    }
}
