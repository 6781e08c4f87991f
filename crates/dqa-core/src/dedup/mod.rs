//! Duplicate and near-duplicate clustering.
//!
//! Clusters are computed once per run from the finished index and shared by
//! the duplicates, near-duplicates and leakage checks.

pub mod exact;
pub mod near;

use std::collections::BTreeSet;

use tracing::debug;

use crate::config::AuditConfig;
use crate::index::{Index, IndexEntry};
use crate::split::Split;

pub use exact::exact_clusters;
pub use near::near_clusters;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterKind {
    Exact,
    Near,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterMember {
    pub split: Split,
    pub image: String,
    pub label: Option<String>,
}

impl ClusterMember {
    fn of(entry: &IndexEntry) -> Self {
        Self {
            split: entry.split,
            image: entry.image.clone(),
            label: entry.label.clone(),
        }
    }

    pub fn identity(&self) -> String {
        format!("{}:{}", self.split, self.image)
    }
}

/// Where a cluster's members live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Within(Split),
    Across,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    pub kind: ClusterKind,
    /// Content hash for exact clusters; first member identity for near ones.
    pub key: String,
    /// Sorted by `(split, image)`.
    pub members: Vec<ClusterMember>,
    /// Largest pairwise Hamming distance inside a near cluster.
    pub max_distance: Option<u32>,
}

impl Cluster {
    pub fn new(kind: ClusterKind, key: String, mut members: Vec<ClusterMember>) -> Self {
        members.sort_by(|a, b| (a.split, &a.image).cmp(&(b.split, &b.image)));
        members.dedup_by(|a, b| a.split == b.split && a.image == b.image);
        Self {
            kind,
            key,
            members,
            max_distance: None,
        }
    }

    pub fn splits(&self) -> BTreeSet<Split> {
        self.members.iter().map(|m| m.split).collect()
    }

    pub fn scope(&self) -> Scope {
        let splits = self.splits();
        match (splits.len(), splits.first()) {
            (1, Some(split)) => Scope::Within(*split),
            _ => Scope::Across,
        }
    }

    /// `(train, val)` and `(train, test)` pairs present in this cluster.
    pub fn leakage_pairs(&self) -> Vec<(Split, Split)> {
        let splits = self.splits();
        if !splits.contains(&Split::Train) {
            return Vec::new();
        }
        Split::EVALUATION
            .into_iter()
            .filter(|s| splits.contains(s))
            .map(|s| (Split::Train, s))
            .collect()
    }

    /// Sorted member identities, optionally restricted to `splits`.
    pub fn identities(&self, splits: &[Split]) -> Vec<String> {
        self.members
            .iter()
            .filter(|m| splits.is_empty() || splits.contains(&m.split))
            .map(ClusterMember::identity)
            .collect()
    }

    pub fn images_in(&self, split: Split) -> Vec<&str> {
        self.members
            .iter()
            .filter(|m| m.split == split)
            .map(|m| m.image.as_str())
            .collect()
    }
}

/// Clusters shared across checks. `near` is `None` when the index carries no
/// perceptual hashes or nothing asked for them.
#[derive(Debug, Clone, Default)]
pub struct ClusterSet {
    pub exact: Vec<Cluster>,
    pub near: Option<Vec<Cluster>>,
}

impl ClusterSet {
    pub fn build(index: &Index, config: &AuditConfig) -> Self {
        let checks = &config.checks;
        let exact = if checks.duplicates.enabled || checks.leakage.enabled {
            exact_clusters(index)
        } else {
            Vec::new()
        };
        let near = (index.perceptual_hashing && config.wants_perceptual_hashes())
            .then(|| near_clusters(index, checks.near_duplicates.phash_hamming_threshold));

        debug!(
            exact = exact.len(),
            near = near.as_ref().map(Vec::len),
            "duplicate clusters computed"
        );
        Self { exact, near }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(split: Split, image: &str) -> ClusterMember {
        ClusterMember {
            split,
            image: image.to_string(),
            label: None,
        }
    }

    #[test]
    fn members_are_sorted_on_construction() {
        let c = Cluster::new(
            ClusterKind::Exact,
            "h".into(),
            vec![member(Split::Val, "a"), member(Split::Train, "z")],
        );
        assert_eq!(c.identities(&[]), vec!["train:z", "val:a"]);
    }

    #[test]
    fn scope_follows_split_set() {
        let within = Cluster::new(
            ClusterKind::Exact,
            "h".into(),
            vec![member(Split::Val, "a"), member(Split::Val, "b")],
        );
        assert_eq!(within.scope(), Scope::Within(Split::Val));
        assert!(within.leakage_pairs().is_empty());

        let across = Cluster::new(
            ClusterKind::Exact,
            "h".into(),
            vec![member(Split::Val, "a"), member(Split::Test, "b")],
        );
        assert_eq!(across.scope(), Scope::Across);
        assert!(across.leakage_pairs().is_empty());
    }

    #[test]
    fn cluster_spanning_all_splits_yields_both_pairs() {
        let c = Cluster::new(
            ClusterKind::Exact,
            "h".into(),
            vec![
                member(Split::Test, "c"),
                member(Split::Train, "a"),
                member(Split::Val, "b"),
            ],
        );
        assert_eq!(
            c.leakage_pairs(),
            vec![(Split::Train, Split::Val), (Split::Train, Split::Test)]
        );
        assert_eq!(c.identities(&[Split::Train, Split::Test]), vec!["train:a", "test:c"]);
    }
}
