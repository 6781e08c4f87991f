//! Aggregation and gating.
//!
//! Findings from every check are merged into one sorted list, counted per
//! check and in total, and compared against `fail_on`. The gate only looks
//! at severities: check order, worker timing and check errors never affect
//! `build_failed`.

use std::collections::BTreeMap;

use tracing::info;

use crate::SCHEMA_VERSION;
use crate::checks::{CheckOutcome, CheckStatus};
use crate::config::AuditConfig;
use crate::findings::{Finding, Severity};
use crate::index::Index;
use crate::report::model::{
    CheckSummary, ClassesInfo, DatasetInfo, FlagsArtifact, RunInfo, SeverityCounts,
    SplitCounts, Summary, Totals,
};
use crate::util::deterministic::sort_findings;

/// Both per-run artifacts derived from check outcomes.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditReport {
    pub flags: FlagsArtifact,
    pub summary: Summary,
}

impl AuditReport {
    /// Process exit code for the gate: `1` when gating findings exist.
    pub fn exit_code(&self) -> i32 {
        if self.summary.totals.build_failed {
            crate::error::EXIT_GATE_FAILED
        } else {
            0
        }
    }
}

/// `true` when any finding is at or above `fail_on`.
pub fn gate(findings: &[Finding], fail_on: Severity) -> bool {
    findings.iter().any(|f| f.severity >= fail_on)
}

pub fn aggregate(
    index: &Index,
    config: &AuditConfig,
    outcomes: Vec<CheckOutcome>,
    run: RunInfo,
) -> AuditReport {
    let mut checks = BTreeMap::new();
    let mut check_errors = Vec::new();
    let mut findings = Vec::new();

    for outcome in outcomes {
        if outcome.status == CheckStatus::Error {
            check_errors.push(outcome.kind.as_str().to_string());
        }
        checks.insert(
            outcome.kind,
            CheckSummary {
                status: outcome.status,
                counts: SeverityCounts::of(&outcome.findings),
                reason: outcome.reason,
            },
        );
        findings.extend(outcome.findings);
    }
    check_errors.sort();
    sort_findings(&mut findings);

    let by_severity = SeverityCounts::of(&findings);
    let build_failed = gate(&findings, config.fail_on);
    info!(
        findings = findings.len(),
        critical = by_severity.critical,
        high = by_severity.high,
        fail_on = %config.fail_on,
        build_failed,
        "audit aggregated"
    );

    let summary = Summary {
        schema_version: SCHEMA_VERSION.to_string(),
        run,
        dataset: dataset_info(index),
        checks,
        totals: Totals {
            findings: findings.len(),
            by_severity,
            fail_threshold: config.fail_on,
            build_failed,
            check_errors,
        },
    };

    AuditReport {
        flags: FlagsArtifact::new(findings),
        summary,
    }
}

fn dataset_info(index: &Index) -> DatasetInfo {
    let splits = index
        .splits
        .iter()
        .map(|s| {
            let labeled = index
                .entries_in(s.split)
                .filter(|e| !e.labels.is_missing())
                .count();
            let counts = SplitCounts {
                images: s.image_count,
                labeled,
                unlabeled: s.image_count.saturating_sub(labeled),
            };
            (s.split, counts)
        })
        .collect();

    DatasetInfo {
        root: index.dataset_root.clone(),
        data_yaml: index.data_yaml.clone(),
        splits,
        classes: ClassesInfo {
            count: index.class_count(),
            names: index.class_names.clone(),
        },
    }
}
