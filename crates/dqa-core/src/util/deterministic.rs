//! Deterministic ordering helpers.
//!
//! Worker completion order and check evaluation order never reach the
//! artifacts: everything is put through one of these sorts before it is
//! serialized. The orderings are part of the `flags.json` contract and must
//! not change without a schema version bump.

use std::cmp::Ordering;

use crate::findings::Finding;

/// Presentation order: `(id, split, image, label, fingerprint)`.
///
/// The fingerprint is the final tie-break, so two findings only compare equal
/// when they describe the same defect.
pub fn compare_findings(a: &Finding, b: &Finding) -> Ordering {
    a.id.as_str()
        .cmp(b.id.as_str())
        .then_with(|| a.split.cmp(&b.split))
        .then_with(|| a.image.cmp(&b.image))
        .then_with(|| a.label.cmp(&b.label))
        .then_with(|| a.fingerprint.cmp(&b.fingerprint))
}

pub fn sort_findings(findings: &mut [Finding]) {
    findings.sort_by(compare_findings);
}
