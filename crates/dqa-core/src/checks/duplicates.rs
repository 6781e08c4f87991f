use serde_json::json;

use crate::checks::CheckContext;
use crate::dedup::{Cluster, Scope};
use crate::error::CheckError;
use crate::findings::{Finding, FindingId, fingerprint};

/// One finding per exact-duplicate cluster.
pub fn evaluate(ctx: &CheckContext<'_>) -> Result<Vec<Finding>, CheckError> {
    Ok(ctx
        .clusters
        .exact
        .iter()
        .map(|c| {
            cluster_finding(
                c,
                FindingId::DuplicateWithinSplit,
                FindingId::DuplicateAcrossSplits,
                "Exact duplicate",
            )
        })
        .collect())
}

/// Finding for a duplicate or near-duplicate cluster. The fingerprint is
/// built from the sorted member identities only.
pub(crate) fn cluster_finding(
    cluster: &Cluster,
    within: FindingId,
    across: FindingId,
    noun: &str,
) -> Finding {
    let (id, split) = match cluster.scope() {
        Scope::Within(split) => (within, Some(split)),
        Scope::Across => (across, None),
    };
    let identities = cluster.identities(&[]);
    let images: Vec<&str> = cluster.members.iter().map(|m| m.image.as_str()).collect();
    let splits: Vec<&str> = cluster.splits().into_iter().map(|s| s.as_str()).collect();
    let first = &cluster.members[0];

    let mut metrics = json!({
        "cluster_size": cluster.members.len(),
        "members": identities,
        "splits": splits,
    });
    if let Some(distance) = cluster.max_distance {
        metrics["max_hamming_distance"] = json!(distance);
    } else {
        metrics["sha256"] = json!(cluster.key);
    }

    let mut finding = Finding::new(
        id,
        format!(
            "{noun} cluster of {} images: {}.",
            cluster.members.len(),
            images.join(", ")
        ),
        fingerprint(id, &identities),
    )
    .with_image(first.image.as_str())
    .with_label(first.label.as_deref())
    .with_metrics(metrics);
    if let Some(split) = split {
        finding = finding.with_split(split);
    }
    finding
}
