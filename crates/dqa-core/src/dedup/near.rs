//! Near-duplicate clustering over 64-bit perceptual hashes.
//!
//! Two hashes within Hamming distance `T` differ in at most `T` bits, so if
//! the hash is cut into `T + 1` disjoint bands at least one band is equal.
//! Only entries sharing a `(band, value)` bucket are compared, and
//! union-find gives the transitive closure over the matching pairs.

use std::collections::{BTreeMap, BTreeSet};

use crate::decode::hamming;
use crate::dedup::{Cluster, ClusterKind, ClusterMember};
use crate::index::Index;

const HASH_BITS: u32 = 64;

pub fn near_clusters(index: &Index, threshold: u32) -> Vec<Cluster> {
    let hashed: Vec<(usize, u64)> = index
        .entries
        .iter()
        .enumerate()
        .filter_map(|(i, e)| e.perceptual_hash.map(|h| (i, h)))
        .collect();

    let mut sets = UnionFind::new(hashed.len());
    for bucket in bucket_index(&hashed, threshold).values() {
        for (n, &a) in bucket.iter().enumerate() {
            for &b in &bucket[n + 1..] {
                if sets.find(a) == sets.find(b) {
                    continue;
                }
                if hamming(hashed[a].1, hashed[b].1) <= threshold {
                    sets.union(a, b);
                }
            }
        }
    }

    // Positions ascend with index order, so each group is already sorted and
    // groups come out ordered by their first member.
    let mut groups: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for pos in 0..hashed.len() {
        groups.entry(sets.find(pos)).or_default().push(pos);
    }
    let mut groups: Vec<Vec<usize>> = groups.into_values().filter(|g| g.len() >= 2).collect();
    groups.sort_by_key(|g| g[0]);

    groups
        .into_iter()
        .filter_map(|group| {
            let entries: Vec<_> = group.iter().map(|&p| &index.entries[hashed[p].0]).collect();
            // Byte-identical groups are already reported as exact duplicates.
            let distinct: BTreeSet<Option<&str>> =
                entries.iter().map(|e| e.content_hash.as_deref()).collect();
            if distinct.len() < 2 {
                return None;
            }

            let max_distance = group
                .iter()
                .enumerate()
                .flat_map(|(n, &a)| group[n + 1..].iter().map(move |&b| (a, b)))
                .map(|(a, b)| hamming(hashed[a].1, hashed[b].1))
                .max();

            let members: Vec<ClusterMember> = entries.iter().map(|e| ClusterMember::of(e)).collect();
            let key = members[0].identity();
            let mut cluster = Cluster::new(ClusterKind::Near, key, members);
            cluster.max_distance = max_distance;
            Some(cluster)
        })
        .collect()
}

/// Buckets keyed by `(band, band value)`. A threshold of 64 or more leaves no
/// band guaranteed equal, so everything lands in one bucket.
fn bucket_index(hashed: &[(usize, u64)], threshold: u32) -> BTreeMap<(u32, u64), Vec<usize>> {
    let mut buckets: BTreeMap<(u32, u64), Vec<usize>> = BTreeMap::new();
    if threshold >= HASH_BITS {
        buckets.insert((0, 0), (0..hashed.len()).collect());
        return buckets;
    }

    let bands = threshold + 1;
    for (pos, &(_, hash)) in hashed.iter().enumerate() {
        for band in 0..bands {
            let start = band * HASH_BITS / bands;
            let end = (band + 1) * HASH_BITS / bands;
            let width = end - start;
            let mask = if width >= HASH_BITS {
                u64::MAX
            } else {
                (1u64 << width) - 1
            };
            buckets
                .entry((band, (hash >> start) & mask))
                .or_default()
                .push(pos);
        }
    }
    buckets
}

struct UnionFind {
    parent: Vec<usize>,
    size: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            size: vec![1; n],
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return;
        }
        let (big, small) = if self.size[ra] >= self.size[rb] {
            (ra, rb)
        } else {
            (rb, ra)
        };
        self.parent[small] = big;
        self.size[big] += self.size[small];
    }
}
