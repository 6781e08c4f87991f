use serde_json::json;

use crate::checks::CheckContext;
use crate::distribution::Distribution;
use crate::error::CheckError;
use crate::findings::{Finding, FindingId, Severity, fingerprint};
use crate::split::Split;

/// Imbalance, low support and train-to-evaluation drift.
///
/// Annotation rows in a dataset that declares no classes leave nothing to
/// measure against, which fails this check rather than passing it silently.
pub fn evaluate(ctx: &CheckContext<'_>) -> Result<Vec<Finding>, CheckError> {
    let cfg = &ctx.config.checks.class_distribution;
    let index = ctx.index;
    if index.class_count() == 0 && index.entries.iter().any(|e| !e.labels.rows().is_empty()) {
        return Err(CheckError::Failed(
            "dataset declares no class names but has annotation rows".into(),
        ));
    }

    let dist = Distribution::from_index(index);
    let mut findings = Vec::new();

    let dominant = dist
        .global
        .dominant()
        .filter(|(_, share)| *share > cfg.max_class_share_warn);
    if let Some((class_id, share)) = dominant {
        let class = class_id.to_string();
        findings.push(
            Finding::new(
                FindingId::ClassImbalanceHigh,
                format!(
                    "Class {} holds {:.1}% of all instances.",
                    class_name(ctx, class_id),
                    share * 100.0
                ),
                fingerprint(FindingId::ClassImbalanceHigh, &[class]),
            )
            .with_class_id(class_id as i64)
            .with_metrics(json!({
                "dominant_share": share,
                "threshold": cfg.max_class_share_warn,
                "total_instances": dist.global.total(),
            })),
        );
    }

    for (class_id, count) in dist.global.low_support(cfg.min_instances_per_class_warn) {
        let class = class_id.to_string();
        findings.push(
            Finding::new(
                FindingId::ClassLowSupport,
                format!(
                    "Class {} has {count} instances, below {}.",
                    class_name(ctx, class_id),
                    cfg.min_instances_per_class_warn
                ),
                fingerprint(FindingId::ClassLowSupport, &[class]),
            )
            .with_class_id(class_id as i64)
            .with_metrics(json!({
                "count": count,
                "threshold": cfg.min_instances_per_class_warn,
            })),
        );
    }

    for target in Split::EVALUATION {
        let Some(jsd) = dist.drift_from_train(target) else {
            continue;
        };
        if jsd < cfg.split_drift_jsd_warn {
            continue;
        }
        let severity = if jsd >= cfg.split_drift_jsd_high {
            Severity::High
        } else {
            Severity::Medium
        };
        findings.push(
            Finding::new(
                FindingId::ClassSplitDrift,
                format!("Class distribution of {target} drifts from train (JSD {jsd:.3})."),
                fingerprint(FindingId::ClassSplitDrift, &[target.as_str()]),
            )
            .with_severity(severity)
            .with_split(target)
            .with_metrics(json!({
                "jsd": jsd,
                "warn_threshold": cfg.split_drift_jsd_warn,
                "high_threshold": cfg.split_drift_jsd_high,
                "reference_split": Split::Train,
                "target_split": target,
            })),
        );
    }

    Ok(findings)
}

fn class_name(ctx: &CheckContext<'_>, class_id: usize) -> String {
    match ctx.index.class_names.get(class_id) {
        Some(name) => format!("{class_id} ({name})"),
        None => class_id.to_string(),
    }
}
