//! Dataset quality audit engine.
//!
//! A run loads a YOLO `data.yaml`, builds an ordered [`index::Index`] of every
//! image with its parsed labels and content hashes, evaluates the enabled
//! checks against that snapshot and aggregates the findings into `flags.json`
//! and `summary.json` with a pass/fail gate.

pub mod checks;
pub mod config;
pub mod dataset;
pub mod decode;
pub mod dedup;
pub mod diff;
pub mod distribution;
pub mod error;
pub mod findings;
pub mod index;
pub mod report;
pub mod split;
pub mod util;

#[cfg(test)]
pub(crate) mod testing;

use std::path::Path;

use tracing::info;

use crate::checks::{CheckOutcome, run_checks};
use crate::config::AuditConfig;
use crate::dataset::{load_layout, scan};
use crate::decode::ImageDecoder;
use crate::error::AuditError;
use crate::index::{Index, IndexCache, IndexOptions, build_index};
use crate::report::{AuditReport, RunInfo, aggregate};
use crate::split::Split;

pub const TOOL_NAME: &str = "dqa";

pub const TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Version of the `index.json`, `flags.json` and `summary.json` layouts.
/// Bump only when an artifact changes shape or meaning.
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Inputs for one audit run.
pub struct AuditRequest<'a> {
    pub data_yaml: &'a Path,
    /// Empty means every split declared in `data.yaml`.
    pub splits: &'a [Split],
    pub config: &'a AuditConfig,
    pub options: IndexOptions,
    pub decoder: &'a dyn ImageDecoder,
    pub cache: &'a IndexCache,
}

/// Index and per-check outcomes of a completed run, before aggregation.
#[derive(Debug, Clone)]
pub struct AuditRun {
    pub index: Index,
    pub outcomes: Vec<CheckOutcome>,
}

impl AuditRun {
    pub fn report(&self, config: &AuditConfig, run: RunInfo) -> AuditReport {
        aggregate(&self.index, config, self.outcomes.clone(), run)
    }
}

/// Validate, index and check. Fails only on usage or dataset-access errors;
/// every per-image defect ends up as a finding.
pub fn audit(request: &AuditRequest<'_>) -> Result<AuditRun, AuditError> {
    request.config.validate()?;

    let layout = load_layout(request.data_yaml, request.splits)?;
    let source = scan(&layout)?;
    info!(
        root = %source.root.display(),
        splits = source.splits.len(),
        images = source.record_count(),
        "dataset scanned"
    );

    let index = build_index(
        &source,
        request.config,
        &request.options,
        request.decoder,
        request.cache,
    )?;
    let outcomes = run_checks(&index, request.config);
    Ok(AuditRun { index, outcomes })
}
