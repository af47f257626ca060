use std::fs;
use std::path::{Path, PathBuf};

use epsweep_core::errors::{ErrorInfo, SweepError};
use tracing::info;

use crate::grid::Combination;
use crate::plan::OutputSpec;
use crate::template::substitute;

/// Moves every expected output of a finished run to its combination-derived
/// destination. Sources must exist and destinations must not: a missing
/// source means the trainer broke its contract, an occupied destination
/// means a prior result would be overwritten.
pub fn archive_outputs(
    outputs: &[OutputSpec],
    combination: &Combination,
) -> Result<Vec<PathBuf>, SweepError> {
    let mut archived = Vec::with_capacity(outputs.len());
    for output in outputs {
        let dest = PathBuf::from(substitute(&output.dest, combination)?);
        if !output.source.exists() {
            return Err(SweepError::Artifact(
                ErrorInfo::new("artifact-missing", "expected output file was not produced")
                    .with_context("source", output.source.display().to_string())
                    .with_context("combination", combination.label()),
            ));
        }
        if dest.exists() {
            return Err(SweepError::Collision(
                ErrorInfo::new("artifact-collision", "archive destination already occupied")
                    .with_context("dest", dest.display().to_string())
                    .with_context("combination", combination.label())
                    .with_hint("refusing to overwrite a prior result"),
            ));
        }
        move_artifact(&output.source, &dest)?;
        info!(
            source = %output.source.display(),
            dest = %dest.display(),
            "archived artifact"
        );
        archived.push(dest);
    }
    Ok(archived)
}

/// Two-phase move: land the file next to the destination under a `.tmp`
/// name, then rename into place, so a crash never leaves a half-written
/// archive entry at the final path.
fn move_artifact(source: &Path, dest: &Path) -> Result<(), SweepError> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|err| {
            SweepError::Io(
                ErrorInfo::new("archive-create-dir", "failed to create archive directory")
                    .with_context("path", parent.display().to_string())
                    .with_hint(err.to_string()),
            )
        })?;
    }
    let staging = staging_path(dest);
    if fs::rename(source, &staging).is_err() {
        // Source may live on another filesystem; fall back to copy + remove.
        fs::copy(source, &staging).map_err(|err| archive_io("copy", source, err))?;
        fs::remove_file(source).map_err(|err| archive_io("remove-source", source, err))?;
    }
    fs::rename(&staging, dest).map_err(|err| archive_io("rename", dest, err))
}

fn staging_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    dest.with_file_name(name)
}

fn archive_io(step: &str, path: &Path, err: std::io::Error) -> SweepError {
    SweepError::Io(
        ErrorInfo::new(format!("archive-{step}"), "artifact move failed")
            .with_context("path", path.display().to_string())
            .with_hint(err.to_string()),
    )
}
