use std::collections::BTreeMap;

use crate::dedup::{Cluster, ClusterKind, ClusterMember};
use crate::index::Index;

/// Partition entries by content hash; every partition with two or more
/// members is a cluster. Clusters come back ordered by hash.
pub fn exact_clusters(index: &Index) -> Vec<Cluster> {
    let mut by_hash: BTreeMap<&str, Vec<ClusterMember>> = BTreeMap::new();
    for entry in &index.entries {
        if let Some(hash) = entry.content_hash.as_deref() {
            by_hash.entry(hash).or_default().push(ClusterMember::of(entry));
        }
    }

    by_hash
        .into_iter()
        .filter(|(_, members)| members.len() >= 2)
        .map(|(hash, members)| Cluster::new(ClusterKind::Exact, hash.to_string(), members))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{entry, index_of};
    use crate::split::Split;

    #[test]
    fn groups_identical_bytes_regardless_of_path() {
        let index = index_of(vec![
            entry(Split::Train, "a.png", Some("h1"), None),
            entry(Split::Train, "b.png", Some("h2"), None),
            entry(Split::Val, "c.png", Some("h1"), None),
            entry(Split::Test, "d.png", None, None),
        ]);

        let clusters = exact_clusters(&index);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].key, "h1");
        assert_eq!(clusters[0].identities(&[]), vec!["train:a.png", "val:c.png"]);
    }

    #[test]
    fn singletons_are_not_clusters() {
        let index = index_of(vec![
            entry(Split::Train, "a.png", Some("h1"), None),
            entry(Split::Train, "b.png", Some("h2"), None),
        ]);
        assert!(exact_clusters(&index).is_empty());
    }
}
