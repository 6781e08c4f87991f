use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::SCHEMA_VERSION;
use crate::TOOL_VERSION;
use crate::checks::{CheckKind, CheckStatus};
use crate::config::AuditConfig;
use crate::findings::{Finding, Severity};
use crate::split::Split;

/// `flags.json`: every finding of a run in presentation order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlagsArtifact {
    pub schema_version: String,
    pub findings: Vec<Finding>,
}

impl FlagsArtifact {
    /// Wrap findings that are already sorted.
    pub fn new(findings: Vec<Finding>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            findings,
        }
    }
}

/// `summary.json`.
///
/// Everything except the `run` timing fields is a pure function of the index,
/// the config and the findings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub schema_version: String,
    pub run: RunInfo,
    pub dataset: DatasetInfo,
    pub checks: BTreeMap<CheckKind, CheckSummary>,
    pub totals: Totals,
}

/// Run metadata. Timestamps are supplied by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunInfo {
    pub run_id: String,
    pub tool_version: String,
    pub started_at: String,
    pub finished_at: String,
    pub duration_sec: f64,
    pub config: RunConfig,
}

impl RunInfo {
    pub fn new(
        run_id: impl Into<String>,
        started_at: impl Into<String>,
        finished_at: impl Into<String>,
        duration_sec: f64,
        config: &AuditConfig,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            tool_version: TOOL_VERSION.to_string(),
            started_at: started_at.into(),
            finished_at: finished_at.into(),
            duration_sec,
            config: RunConfig {
                fail_on: config.fail_on,
                enabled_checks: config
                    .enabled_checks()
                    .iter()
                    .map(|k| k.as_str().to_string())
                    .collect(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub fail_on: Severity,
    pub enabled_checks: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetInfo {
    pub root: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_yaml: Option<String>,
    pub splits: BTreeMap<Split, SplitCounts>,
    pub classes: ClassesInfo,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitCounts {
    pub images: usize,
    pub labeled: usize,
    pub unlabeled: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassesInfo {
    pub count: usize,
    pub names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckSummary {
    pub status: CheckStatus,
    pub counts: SeverityCounts,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Finding counts bucketed by severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl SeverityCounts {
    pub fn of<'a>(findings: impl IntoIterator<Item = &'a Finding>) -> Self {
        let mut counts = Self::default();
        for f in findings {
            counts.add(f.severity);
        }
        counts
    }

    pub fn add(&mut self, severity: Severity) {
        *self.slot(severity) += 1;
    }

    pub fn get(&self, severity: Severity) -> usize {
        match severity {
            Severity::Critical => self.critical,
            Severity::High => self.high,
            Severity::Medium => self.medium,
            Severity::Low => self.low,
        }
    }

    pub fn total(&self) -> usize {
        self.critical + self.high + self.medium + self.low
    }

    /// Findings at or above `threshold`.
    pub fn at_or_above(&self, threshold: Severity) -> usize {
        Severity::DESCENDING
            .into_iter()
            .filter(|s| *s >= threshold)
            .map(|s| self.get(s))
            .sum()
    }

    fn slot(&mut self, severity: Severity) -> &mut usize {
        match severity {
            Severity::Critical => &mut self.critical,
            Severity::High => &mut self.high,
            Severity::Medium => &mut self.medium,
            Severity::Low => &mut self.low,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub findings: usize,
    pub by_severity: SeverityCounts,
    pub fail_threshold: Severity,
    pub build_failed: bool,
    /// Checks that ended in `error`. Diagnostic only; never gates.
    pub check_errors: Vec<String>,
}
