use serde_json::json;

use crate::checks::CheckContext;
use crate::config::BBoxSanityConfig;
use crate::error::CheckError;
use crate::findings::{Finding, FindingId, fingerprint};
use crate::index::IndexEntry;

pub fn evaluate(ctx: &CheckContext<'_>) -> Result<Vec<Finding>, CheckError> {
    let cfg = &ctx.config.checks.bbox_sanity;
    Ok(ctx
        .index
        .entries
        .iter()
        .flat_map(|e| entry_findings(e, cfg))
        .collect())
}

/// Box geometry findings for one entry, measured on normalized width and
/// height.
pub fn entry_findings(entry: &IndexEntry, cfg: &BBoxSanityConfig) -> Vec<Finding> {
    let split = entry.split.as_str();
    let image = entry.image.as_str();
    let located = |f: Finding| {
        f.with_split(entry.split)
            .with_image(image)
            .with_label(entry.label.as_deref())
    };
    let rows = entry.labels.rows();
    let mut out = Vec::new();

    if rows.len() > cfg.max_boxes_per_image_warn {
        out.push(located(
            Finding::new(
                FindingId::BboxTooManyPerImage,
                format!(
                    "Image has {} annotations, above {}.",
                    rows.len(),
                    cfg.max_boxes_per_image_warn
                ),
                fingerprint(FindingId::BboxTooManyPerImage, &[split, image]),
            )
            .with_metrics(json!({
                "count": rows.len(),
                "threshold": cfg.max_boxes_per_image_warn,
            })),
        ));
    }

    for row in rows {
        let line = row.line.to_string();
        let row_finding = |id: FindingId, message: String, metrics: serde_json::Value| {
            let f = located(
                Finding::new(id, message, fingerprint(id, &[split, image, line.as_str()]))
                    .with_metrics(metrics),
            );
            if row.class_id >= 0 { f.with_class_id(row.class_id) } else { f }
        };

        let area = row.width * row.height;
        if area < cfg.min_box_area_ratio_warn {
            out.push(row_finding(
                FindingId::BboxTinyBox,
                format!("Box on line {} covers {area:.6} of the image.", row.line),
                json!({ "line": row.line, "area": area, "threshold": cfg.min_box_area_ratio_warn }),
            ));
        }
        if area > cfg.max_box_area_ratio_warn {
            out.push(row_finding(
                FindingId::BboxOversizedBox,
                format!("Box on line {} covers {area:.3} of the image.", row.line),
                json!({ "line": row.line, "area": area, "threshold": cfg.max_box_area_ratio_warn }),
            ));
        }
        if row.width > 0.0 && row.height > 0.0 {
            let aspect = (row.width / row.height).max(row.height / row.width);
            if aspect > cfg.aspect_ratio_warn {
                out.push(row_finding(
                    FindingId::BboxExtremeAspectRatio,
                    format!("Box on line {} has aspect ratio {aspect:.1}.", row.line),
                    json!({
                        "line": row.line,
                        "aspect_ratio": aspect,
                        "threshold": cfg.aspect_ratio_warn,
                    }),
                ));
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::findings::Severity;
    use crate::split::Split;
    use crate::testing::{bbox, labeled};

    fn ids(findings: &[Finding]) -> Vec<FindingId> {
        findings.iter().map(|f| f.id).collect()
    }

    #[test]
    fn well_formed_boxes_are_clean() {
        let e = labeled(
            Split::Train,
            "train/images/a.png",
            vec![bbox(1, 0, 0.5, 0.5, 0.2, 0.3)],
        );
        assert!(entry_findings(&e, &BBoxSanityConfig::default()).is_empty());
    }

    #[test]
    fn tiny_and_oversized_boxes() {
        let e = labeled(
            Split::Train,
            "train/images/a.png",
            vec![bbox(1, 0, 0.5, 0.5, 0.005, 0.005), bbox(2, 0, 0.5, 0.5, 0.99, 0.99)],
        );
        let findings = entry_findings(&e, &BBoxSanityConfig::default());
        assert_eq!(ids(&findings), vec![FindingId::BboxTinyBox, FindingId::BboxOversizedBox]);
        assert!(findings.iter().all(|f| f.severity == Severity::Medium));
    }

    #[test]
    fn extreme_aspect_ratio_in_either_direction() {
        let e = labeled(
            Split::Val,
            "val/images/a.png",
            vec![bbox(1, 0, 0.5, 0.5, 0.9, 0.03), bbox(2, 0, 0.5, 0.5, 0.03, 0.9)],
        );
        let findings = entry_findings(&e, &BBoxSanityConfig::default());
        assert_eq!(
            ids(&findings),
            vec![FindingId::BboxExtremeAspectRatio, FindingId::BboxExtremeAspectRatio]
        );
    }

    #[test]
    fn zero_sized_box_is_tiny_but_has_no_aspect_ratio() {
        let e = labeled(
            Split::Train,
            "train/images/a.png",
            vec![bbox(1, 0, 0.5, 0.5, 0.0, 0.4)],
        );
        let findings = entry_findings(&e, &BBoxSanityConfig::default());
        assert_eq!(ids(&findings), vec![FindingId::BboxTinyBox]);
    }

    #[test]
    fn too_many_boxes_is_one_finding_per_image() {
        let rows = (1..=4).map(|l| bbox(l, 0, 0.5, 0.5, 0.2, 0.2)).collect();
        let e = labeled(Split::Train, "train/images/a.png", rows);
        let cfg = BBoxSanityConfig {
            max_boxes_per_image_warn: 3,
            ..BBoxSanityConfig::default()
        };

        let findings = entry_findings(&e, &cfg);
        assert_eq!(ids(&findings), vec![FindingId::BboxTooManyPerImage]);
        assert_eq!(findings[0].metrics.as_ref().unwrap()["count"], 4);
    }
}
