use crate::checks::CheckContext;
use crate::checks::duplicates::cluster_finding;
use crate::error::CheckError;
use crate::findings::{Finding, FindingId};

/// One finding per near-duplicate cluster. Without perceptual hashes in the
/// index the check is unavailable, not failed.
pub fn evaluate(ctx: &CheckContext<'_>) -> Result<Vec<Finding>, CheckError> {
    let Some(near) = ctx.clusters.near.as_ref() else {
        return Err(CheckError::Unavailable(
            "perceptual hashing unavailable in this build".into(),
        ));
    };
    Ok(near
        .iter()
        .map(|c| {
            cluster_finding(
                c,
                FindingId::NearDuplicateWithinSplit,
                FindingId::NearDuplicateAcrossSplits,
                "Near-duplicate",
            )
        })
        .collect())
}
