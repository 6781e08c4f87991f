use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Finding severity. Declaration order is the gate order:
/// `Low < Medium < High < Critical`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Highest first, the order used for printing counts.
    pub const DESCENDING: [Severity; 4] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            "critical" => Ok(Severity::Critical),
            other => Err(format!(
                "unknown severity '{other}' (expected critical, high, medium or low)"
            )),
        }
    }
}

/// Frozen catalog of finding codes.
///
/// The serialized string is part of the `flags.json` contract and feeds into
/// every fingerprint, so variants may be added but never renamed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FindingId {
    IntegrityMissingLabel,
    IntegrityOrphanLabel,
    IntegrityMalformedRow,
    IntegrityInvalidClassId,
    IntegrityCoordOutOfRange,
    IntegrityCorruptImage,
    ClassImbalanceHigh,
    ClassLowSupport,
    ClassSplitDrift,
    BboxTinyBox,
    BboxOversizedBox,
    BboxExtremeAspectRatio,
    BboxTooManyPerImage,
    DuplicateWithinSplit,
    DuplicateAcrossSplits,
    NearDuplicateWithinSplit,
    NearDuplicateAcrossSplits,
    LeakageExactTrainVal,
    LeakageExactTrainTest,
    LeakageNearTrainVal,
    LeakageNearTrainTest,
}

/// Static metadata attached to a catalog id.
#[derive(Debug, Clone, Copy)]
pub struct CatalogEntry {
    pub id: FindingId,
    pub severity: Severity,
    pub title: &'static str,
    pub suggested_action: &'static str,
}

impl FindingId {
    pub const ALL: [FindingId; 21] = [
        FindingId::IntegrityMissingLabel,
        FindingId::IntegrityOrphanLabel,
        FindingId::IntegrityMalformedRow,
        FindingId::IntegrityInvalidClassId,
        FindingId::IntegrityCoordOutOfRange,
        FindingId::IntegrityCorruptImage,
        FindingId::ClassImbalanceHigh,
        FindingId::ClassLowSupport,
        FindingId::ClassSplitDrift,
        FindingId::BboxTinyBox,
        FindingId::BboxOversizedBox,
        FindingId::BboxExtremeAspectRatio,
        FindingId::BboxTooManyPerImage,
        FindingId::DuplicateWithinSplit,
        FindingId::DuplicateAcrossSplits,
        FindingId::NearDuplicateWithinSplit,
        FindingId::NearDuplicateAcrossSplits,
        FindingId::LeakageExactTrainVal,
        FindingId::LeakageExactTrainTest,
        FindingId::LeakageNearTrainVal,
        FindingId::LeakageNearTrainTest,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FindingId::IntegrityMissingLabel => "INTEGRITY_MISSING_LABEL",
            FindingId::IntegrityOrphanLabel => "INTEGRITY_ORPHAN_LABEL",
            FindingId::IntegrityMalformedRow => "INTEGRITY_MALFORMED_ROW",
            FindingId::IntegrityInvalidClassId => "INTEGRITY_INVALID_CLASS_ID",
            FindingId::IntegrityCoordOutOfRange => "INTEGRITY_COORD_OUT_OF_RANGE",
            FindingId::IntegrityCorruptImage => "INTEGRITY_CORRUPT_IMAGE",
            FindingId::ClassImbalanceHigh => "CLASS_IMBALANCE_HIGH",
            FindingId::ClassLowSupport => "CLASS_LOW_SUPPORT",
            FindingId::ClassSplitDrift => "CLASS_SPLIT_DRIFT",
            FindingId::BboxTinyBox => "BBOX_TINY_BOX",
            FindingId::BboxOversizedBox => "BBOX_OVERSIZED_BOX",
            FindingId::BboxExtremeAspectRatio => "BBOX_EXTREME_ASPECT_RATIO",
            FindingId::BboxTooManyPerImage => "BBOX_TOO_MANY_PER_IMAGE",
            FindingId::DuplicateWithinSplit => "DUPLICATE_WITHIN_SPLIT",
            FindingId::DuplicateAcrossSplits => "DUPLICATE_ACROSS_SPLITS",
            FindingId::NearDuplicateWithinSplit => "NEAR_DUPLICATE_WITHIN_SPLIT",
            FindingId::NearDuplicateAcrossSplits => "NEAR_DUPLICATE_ACROSS_SPLITS",
            FindingId::LeakageExactTrainVal => "LEAKAGE_EXACT_TRAIN_VAL",
            FindingId::LeakageExactTrainTest => "LEAKAGE_EXACT_TRAIN_TEST",
            FindingId::LeakageNearTrainVal => "LEAKAGE_NEAR_TRAIN_VAL",
            FindingId::LeakageNearTrainTest => "LEAKAGE_NEAR_TRAIN_TEST",
        }
    }

    pub fn entry(self) -> CatalogEntry {
        use FindingId::*;
        use Severity::*;

        let (severity, title, suggested_action) = match self {
            IntegrityMissingLabel => (
                High,
                "Image has no label file",
                "Add missing label files or move unlabeled images out of the split.",
            ),
            IntegrityOrphanLabel => (
                Medium,
                "Label file has no image",
                "Remove the stale label or restore the missing image.",
            ),
            IntegrityMalformedRow => (
                High,
                "Malformed label row",
                "Fix the row so it has a class id followed by numeric coordinates.",
            ),
            IntegrityInvalidClassId => (
                High,
                "Class id outside the class list",
                "Remap the class id or extend the class list in data.yaml.",
            ),
            IntegrityCoordOutOfRange => (
                High,
                "Coordinates not normalized",
                "Normalize coordinates to [0,1] relative to image size.",
            ),
            IntegrityCorruptImage => (
                Critical,
                "Image cannot be read or decoded",
                "Re-export or remove the corrupt image.",
            ),
            ClassImbalanceHigh => (
                Medium,
                "Dominant class share too high",
                "Rebalance sampling and collect more minority-class data.",
            ),
            ClassLowSupport => (
                Low,
                "Class has too few instances",
                "Increase labeled samples for low-support classes or merge/remove unstable classes.",
            ),
            ClassSplitDrift => (
                Medium,
                "Class distribution drifts between splits",
                "Rebuild splits to align class distributions across train/val/test.",
            ),
            BboxTinyBox => (
                Medium,
                "Box area below threshold",
                "Check whether tiny boxes are annotation mistakes.",
            ),
            BboxOversizedBox => (
                Medium,
                "Box area above threshold",
                "Check whether the box should cover nearly the whole image.",
            ),
            BboxExtremeAspectRatio => (
                Medium,
                "Box aspect ratio extreme",
                "Check for swapped or degenerate width/height values.",
            ),
            BboxTooManyPerImage => (
                Medium,
                "Too many boxes in one image",
                "Check for duplicated annotation rows.",
            ),
            DuplicateWithinSplit => (
                Medium,
                "Exact duplicate images within a split",
                "Deduplicate images within the split.",
            ),
            DuplicateAcrossSplits => (
                High,
                "Exact duplicate images across splits",
                "Deduplicate across splits before training.",
            ),
            NearDuplicateWithinSplit => (
                Low,
                "Near-duplicate images within a split",
                "Review visually similar images for redundancy.",
            ),
            NearDuplicateAcrossSplits => (
                High,
                "Near-duplicate images across splits",
                "Move visually similar images into a single split.",
            ),
            LeakageExactTrainVal => (
                Critical,
                "Identical image in train and val",
                "Re-split dataset to eliminate train/val overlap.",
            ),
            LeakageExactTrainTest => (
                Critical,
                "Identical image in train and test",
                "Re-split dataset to eliminate train/test overlap.",
            ),
            LeakageNearTrainVal => (
                High,
                "Near-identical image in train and val",
                "Re-split dataset so near-identical images share a split.",
            ),
            LeakageNearTrainTest => (
                High,
                "Near-identical image in train and test",
                "Re-split dataset so near-identical images share a split.",
            ),
        };

        CatalogEntry {
            id: self,
            severity,
            title,
            suggested_action,
        }
    }
}

impl fmt::Display for FindingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}
