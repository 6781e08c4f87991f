//! Train/evaluation contamination.
//!
//! Consumes the clusters already built for the duplicate checks. A cluster
//! spanning train, val and test yields one finding per split pair.

use serde_json::json;
use tracing::warn;

use crate::checks::CheckContext;
use crate::dedup::{Cluster, ClusterKind};
use crate::error::CheckError;
use crate::findings::{Finding, FindingId, fingerprint};
use crate::split::Split;

pub fn evaluate(ctx: &CheckContext<'_>) -> Result<Vec<Finding>, CheckError> {
    let mut findings: Vec<Finding> = ctx
        .clusters
        .exact
        .iter()
        .flat_map(cluster_findings)
        .collect();

    if ctx.config.checks.leakage.include_near_dup {
        match ctx.clusters.near.as_ref() {
            Some(near) => findings.extend(near.iter().flat_map(cluster_findings)),
            None => warn!("near-duplicate leakage requested but perceptual hashes are unavailable"),
        }
    }
    Ok(findings)
}

/// Reason attached to a completed leakage outcome whose near-duplicate half
/// could not run.
pub fn near_coverage_gap(ctx: &CheckContext<'_>) -> Option<String> {
    (ctx.config.checks.leakage.include_near_dup && ctx.clusters.near.is_none())
        .then(|| "near-duplicate leakage not evaluated: perceptual hashes unavailable".to_string())
}

fn pair_id(kind: ClusterKind, eval: Split) -> FindingId {
    match (kind, eval) {
        (ClusterKind::Exact, Split::Test) => FindingId::LeakageExactTrainTest,
        (ClusterKind::Exact, _) => FindingId::LeakageExactTrainVal,
        (ClusterKind::Near, Split::Test) => FindingId::LeakageNearTrainTest,
        (ClusterKind::Near, _) => FindingId::LeakageNearTrainVal,
    }
}

fn cluster_findings(cluster: &Cluster) -> Vec<Finding> {
    cluster
        .leakage_pairs()
        .into_iter()
        .filter_map(|(train, eval)| {
            let id = pair_id(cluster.kind, eval);
            let eval_member = cluster.members.iter().find(|m| m.split == eval)?;
            let train_images = cluster.images_in(train);
            let eval_images = cluster.images_in(eval);

            let mut metrics = json!({
                "train_images": train_images,
                "eval_images": eval_images,
            });
            match cluster.max_distance {
                Some(distance) => metrics["max_hamming_distance"] = json!(distance),
                None => metrics["sha256"] = json!(cluster.key),
            }

            let kind = match cluster.kind {
                ClusterKind::Exact => "Exact",
                ClusterKind::Near => "Near-duplicate",
            };
            Some(
                Finding::new(
                    id,
                    format!(
                        "{kind} {train}/{eval} leakage: {} shares content with {}.",
                        eval_images.join(", "),
                        train_images.join(", ")
                    ),
                    fingerprint(id, &cluster.identities(&[train, eval])),
                )
                .with_split(eval)
                .with_image(eval_member.image.as_str())
                .with_label(eval_member.label.as_deref())
                .with_metrics(metrics),
            )
        })
        .collect()
}
