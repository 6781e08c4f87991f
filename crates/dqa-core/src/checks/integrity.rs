//! Per-entry structural defects: missing and orphan labels, malformed rows,
//! invalid class ids, out-of-range coordinates and undecodable images.

use serde_json::json;

use crate::checks::CheckContext;
use crate::dataset::LabelState;
use crate::error::CheckError;
use crate::findings::{Finding, FindingId, fingerprint};
use crate::index::IndexEntry;

const REASON_READ_ERROR: &str = "read_error";

pub fn evaluate(ctx: &CheckContext<'_>) -> Result<Vec<Finding>, CheckError> {
    let class_count = ctx.index.class_count();
    let mut findings: Vec<Finding> = ctx
        .index
        .entries
        .iter()
        .flat_map(|e| entry_findings(e, class_count))
        .collect();

    for split in &ctx.index.splits {
        for orphan in &split.orphan_labels {
            let split_name = split.split.as_str();
            findings.push(
                Finding::new(
                    FindingId::IntegrityOrphanLabel,
                    "Label file has no matching image file.",
                    fingerprint(FindingId::IntegrityOrphanLabel, &[split_name, orphan.as_str()]),
                )
                .with_split(split.split)
                .with_label(Some(orphan)),
            );
        }
    }
    Ok(findings)
}

/// Every integrity finding for one entry. Never fails: each defect becomes
/// its own finding.
pub fn entry_findings(entry: &IndexEntry, class_count: usize) -> Vec<Finding> {
    let split = entry.split.as_str();
    let image = entry.image.as_str();
    let label = entry.label.as_deref();
    let located = |f: Finding| f.with_split(entry.split).with_image(image).with_label(label);
    let mut out = Vec::new();

    if entry.labels.is_missing() {
        out.push(located(Finding::new(
            FindingId::IntegrityMissingLabel,
            "Image has no matching label file.",
            fingerprint(FindingId::IntegrityMissingLabel, &[split, image]),
        )));
    }

    if let Some(err) = &entry.image_error {
        out.push(located(Finding::new(
            FindingId::IntegrityCorruptImage,
            format!("Image could not be read or decoded: {err}"),
            fingerprint(FindingId::IntegrityCorruptImage, &[split, image]),
        )));
    }

    if let LabelState::Unreadable { reason } = &entry.labels {
        out.push(located(
            Finding::new(
                FindingId::IntegrityMalformedRow,
                format!("Label file could not be read: {reason}"),
                fingerprint(FindingId::IntegrityMalformedRow, &[split, image, "0", REASON_READ_ERROR]),
            )
            .with_metrics(json!({ "line": 0, "reason": REASON_READ_ERROR })),
        ));
    }

    for err in entry.labels.errors() {
        let line = err.line.to_string();
        out.push(located(
            Finding::new(
                FindingId::IntegrityMalformedRow,
                format!("Malformed label row at line {}: {}", err.line, err.reason),
                fingerprint(
                    FindingId::IntegrityMalformedRow,
                    &[split, image, line.as_str(), err.reason.as_str()],
                ),
            )
            .with_metrics(json!({ "line": err.line, "reason": err.reason, "raw": err.raw })),
        ));
    }

    for row in entry.labels.rows() {
        let line = row.line.to_string();
        let in_range = usize::try_from(row.class_id).is_ok_and(|id| id < class_count);
        if !in_range {
            let class_id = row.class_id.to_string();
            out.push(located(
                Finding::new(
                    FindingId::IntegrityInvalidClassId,
                    format!(
                        "Class id {} is outside [0, {}).",
                        row.class_id, class_count
                    ),
                    fingerprint(
                        FindingId::IntegrityInvalidClassId,
                        &[split, image, line.as_str(), class_id.as_str()],
                    ),
                )
                .with_class_id(row.class_id)
                .with_metrics(json!({ "line": row.line, "class_count": class_count })),
            ));
        }

        // Negated containment also catches NaN.
        let values = row.normalized_values();
        if values.iter().any(|v| !(0.0..=1.0).contains(v)) {
            let mut finding = located(
                Finding::new(
                    FindingId::IntegrityCoordOutOfRange,
                    format!("{} values must be normalized to [0, 1].", row.kind()),
                    fingerprint(FindingId::IntegrityCoordOutOfRange, &[split, image, line.as_str()]),
                )
                .with_metrics(json!({
                    "line": row.line,
                    "annotation_type": row.kind(),
                    "values": values,
                })),
            );
            if row.class_id >= 0 {
                finding = finding.with_class_id(row.class_id);
            }
            out.push(finding);
        }
    }

    out
}
