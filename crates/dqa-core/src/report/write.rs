//! Artifact persistence: pretty JSON with a trailing newline.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::AuditError;
use crate::index::Index;
use crate::report::aggregate::AuditReport;
use crate::report::model::FlagsArtifact;

pub const INDEX_FILE: &str = "index.json";
pub const FLAGS_FILE: &str = "flags.json";
pub const SUMMARY_FILE: &str = "summary.json";

pub fn to_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let mut text = serde_json::to_string_pretty(value)?;
    text.push('\n');
    Ok(text)
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), AuditError> {
    let artifact_error = |reason: String| AuditError::Artifact {
        path: path.to_path_buf(),
        reason,
    };
    let text = to_json(value).map_err(|e| artifact_error(e.to_string()))?;
    std::fs::write(path, text).map_err(|e| artifact_error(e.to_string()))?;
    debug!(path = %path.display(), "artifact written");
    Ok(())
}

/// Read a prior-run artifact. Missing or invalid input is a usage error.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, AuditError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| AuditError::usage(format!("cannot read {}: {e}", path.display())))?;
    serde_json::from_str(&text)
        .map_err(|e| AuditError::usage(format!("invalid {}: {e}", path.display())))
}

/// Load `flags.json` from a run directory, or from the file itself.
pub fn read_flags(run: &Path) -> Result<FlagsArtifact, AuditError> {
    let path = if run.is_dir() {
        run.join(FLAGS_FILE)
    } else {
        run.to_path_buf()
    };
    read_json(&path)
}

/// Write `index.json`, `flags.json` and `summary.json` under `out_dir`.
pub fn write_run(out_dir: &Path, index: &Index, report: &AuditReport) -> Result<Vec<PathBuf>, AuditError> {
    std::fs::create_dir_all(out_dir).map_err(|e| AuditError::Artifact {
        path: out_dir.to_path_buf(),
        reason: e.to_string(),
    })?;

    let index_path = out_dir.join(INDEX_FILE);
    let flags_path = out_dir.join(FLAGS_FILE);
    let summary_path = out_dir.join(SUMMARY_FILE);
    write_json(&index_path, index)?;
    write_json(&flags_path, &report.flags)?;
    write_json(&summary_path, &report.summary)?;
    Ok(vec![index_path, flags_path, summary_path])
}
