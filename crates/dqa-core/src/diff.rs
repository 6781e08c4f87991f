//! Run-to-run comparison keyed by finding fingerprint.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::findings::{Finding, Severity};
use crate::report::model::SeverityCounts;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiffPartition {
    pub counts: SeverityCounts,
    /// Sorted by fingerprint.
    pub findings: Vec<Finding>,
}

impl DiffPartition {
    fn from_sorted(findings: Vec<Finding>) -> Self {
        Self {
            counts: SeverityCounts::of(&findings),
            findings,
        }
    }

    pub fn fingerprints(&self) -> Vec<&str> {
        self.findings.iter().map(|f| f.fingerprint.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffResult {
    pub regression_threshold: Severity,
    /// Some newly introduced finding is at or above the threshold.
    pub regression: bool,
    pub introduced: DiffPartition,
    pub resolved: DiffPartition,
    pub persisting: DiffPartition,
}

/// Partition `old` and `new` by fingerprint. Persisting findings are taken
/// from `new`. A fingerprint repeated within one set counts once.
pub fn diff_findings(old: &[Finding], new: &[Finding], threshold: Severity) -> DiffResult {
    let old_by_fp = by_fingerprint(old);
    let new_by_fp = by_fingerprint(new);

    let introduced: Vec<Finding> = new_by_fp
        .iter()
        .filter(|(fp, _)| !old_by_fp.contains_key(*fp))
        .map(|(_, f)| (*f).clone())
        .collect();
    let resolved: Vec<Finding> = old_by_fp
        .iter()
        .filter(|(fp, _)| !new_by_fp.contains_key(*fp))
        .map(|(_, f)| (*f).clone())
        .collect();
    let persisting: Vec<Finding> = new_by_fp
        .iter()
        .filter(|(fp, _)| old_by_fp.contains_key(*fp))
        .map(|(_, f)| (*f).clone())
        .collect();

    let introduced = DiffPartition::from_sorted(introduced);
    DiffResult {
        regression_threshold: threshold,
        regression: introduced.counts.at_or_above(threshold) > 0,
        introduced,
        resolved: DiffPartition::from_sorted(resolved),
        persisting: DiffPartition::from_sorted(persisting),
    }
}

fn by_fingerprint(findings: &[Finding]) -> BTreeMap<&str, &Finding> {
    let mut map = BTreeMap::new();
    for f in findings {
        map.entry(f.fingerprint.as_str()).or_insert(f);
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::findings::FindingId;

    fn f(id: FindingId, fp: &str) -> Finding {
        Finding::new(id, "m", fp.to_string())
    }

    #[test]
    fn partitions_by_fingerprint() {
        let a = vec![
            f(FindingId::BboxTinyBox, "f1"),
            f(FindingId::BboxTinyBox, "f2"),
        ];
        let b = vec![
            f(FindingId::BboxTinyBox, "f3"),
            f(FindingId::BboxTinyBox, "f2"),
        ];

        let diff = diff_findings(&a, &b, Severity::High);
        assert_eq!(diff.introduced.fingerprints(), vec!["f3"]);
        assert_eq!(diff.resolved.fingerprints(), vec!["f1"]);
        assert_eq!(diff.persisting.fingerprints(), vec!["f2"]);
        assert_eq!(diff.introduced.counts.medium, 1);
        assert!(!diff.regression);
    }

    #[test]
    fn new_finding_at_threshold_is_a_regression() {
        let old = vec![f(FindingId::IntegrityCorruptImage, "x")];
        let new = vec![f(FindingId::IntegrityMissingLabel, "y")];

        assert!(diff_findings(&old, &new, Severity::High).regression);
        assert!(!diff_findings(&old, &new, Severity::Critical).regression);
        // Resolved findings never count, however severe.
        assert!(!diff_findings(&old, &[], Severity::Low).regression);
    }

    #[test]
    fn partitions_are_sorted_and_deduplicated() {
        let new = vec![
            f(FindingId::BboxTinyBox, "c"),
            f(FindingId::BboxTinyBox, "a"),
            f(FindingId::BboxTinyBox, "c"),
        ];
        let diff = diff_findings(&[], &new, Severity::High);
        assert_eq!(diff.introduced.fingerprints(), vec!["a", "c"]);
    }
}
