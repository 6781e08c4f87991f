//! Check pipeline.
//!
//! Each check is a pure function over the finished index. The registry is a
//! closed enum; `run_checks` evaluates every enabled variant in parallel and
//! returns one outcome per variant in registry order, whatever order the
//! workers finished in.

pub mod bbox_sanity;
pub mod class_distribution;
pub mod duplicates;
pub mod integrity;
pub mod leakage;
pub mod near_duplicates;

use std::fmt;
use std::str::FromStr;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::AuditConfig;
use crate::dedup::ClusterSet;
use crate::error::CheckError;
use crate::findings::Finding;
use crate::index::Index;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    Integrity,
    ClassDistribution,
    #[serde(rename = "bbox_sanity")]
    BBoxSanity,
    Duplicates,
    NearDuplicates,
    Leakage,
}

impl CheckKind {
    pub const ALL: [CheckKind; 6] = [
        CheckKind::Integrity,
        CheckKind::ClassDistribution,
        CheckKind::BBoxSanity,
        CheckKind::Duplicates,
        CheckKind::NearDuplicates,
        CheckKind::Leakage,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CheckKind::Integrity => "integrity",
            CheckKind::ClassDistribution => "class_distribution",
            CheckKind::BBoxSanity => "bbox_sanity",
            CheckKind::Duplicates => "duplicates",
            CheckKind::NearDuplicates => "near_duplicates",
            CheckKind::Leakage => "leakage",
        }
    }

    /// Run this check. Findings come back unsorted; the aggregator orders them.
    pub fn evaluate(self, ctx: &CheckContext<'_>) -> Result<Vec<Finding>, CheckError> {
        match self {
            CheckKind::Integrity => integrity::evaluate(ctx),
            CheckKind::ClassDistribution => class_distribution::evaluate(ctx),
            CheckKind::BBoxSanity => bbox_sanity::evaluate(ctx),
            CheckKind::Duplicates => duplicates::evaluate(ctx),
            CheckKind::NearDuplicates => near_duplicates::evaluate(ctx),
            CheckKind::Leakage => leakage::evaluate(ctx),
        }
    }

    /// Part of a completed check that could not be evaluated.
    fn coverage_gap(self, ctx: &CheckContext<'_>) -> Option<String> {
        match self {
            CheckKind::Leakage => leakage::near_coverage_gap(ctx),
            _ => None,
        }
    }
}

impl fmt::Display for CheckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for CheckKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CheckKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("unknown check '{s}'"))
    }
}

/// Read-only inputs shared by every check in a run.
pub struct CheckContext<'a> {
    pub index: &'a Index,
    pub config: &'a AuditConfig,
    pub clusters: &'a ClusterSet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Completed,
    Skipped,
    Error,
}

impl CheckStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CheckStatus::Completed => "completed",
            CheckStatus::Skipped => "skipped",
            CheckStatus::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckOutcome {
    pub kind: CheckKind,
    pub status: CheckStatus,
    pub findings: Vec<Finding>,
    pub reason: Option<String>,
}

impl CheckOutcome {
    fn from_result(kind: CheckKind, result: Result<Vec<Finding>, CheckError>) -> Self {
        match result {
            Ok(findings) => {
                debug!(check = %kind, findings = findings.len(), "check completed");
                Self {
                    kind,
                    status: CheckStatus::Completed,
                    findings,
                    reason: None,
                }
            }
            Err(CheckError::Unavailable(reason)) => {
                warn!(check = %kind, %reason, "check skipped");
                Self::skipped(kind, reason)
            }
            Err(CheckError::Failed(reason)) => {
                warn!(check = %kind, %reason, "check failed");
                Self {
                    kind,
                    status: CheckStatus::Error,
                    findings: Vec::new(),
                    reason: Some(reason),
                }
            }
        }
    }

    fn skipped(kind: CheckKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            status: CheckStatus::Skipped,
            findings: Vec::new(),
            reason: Some(reason.into()),
        }
    }
}

/// Evaluate every registered check against `index`.
///
/// Disabled checks are reported as skipped with reason `disabled`. A check
/// that completed without one of its optional parts carries a reason. Clusters
/// are computed once here and shared by duplicates, near-duplicates and
/// leakage.
pub fn run_checks(index: &Index, config: &AuditConfig) -> Vec<CheckOutcome> {
    let clusters = ClusterSet::build(index, config);
    let ctx = CheckContext {
        index,
        config,
        clusters: &clusters,
    };

    CheckKind::ALL
        .par_iter()
        .map(|&kind| {
            if config.is_enabled(kind) {
                let mut outcome = CheckOutcome::from_result(kind, kind.evaluate(&ctx));
                if outcome.status == CheckStatus::Completed {
                    outcome.reason = kind.coverage_gap(&ctx);
                }
                outcome
            } else {
                CheckOutcome::skipped(kind, "disabled")
            }
        })
        .collect()
}
