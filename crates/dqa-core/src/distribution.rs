//! Class-instance histograms and split drift.

use std::collections::BTreeMap;

use crate::index::Index;
use crate::split::Split;

/// Instance counts per class id over `[0, class_count)`.
///
/// Rows with an out-of-range class id are left to the integrity check and do
/// not count here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassHistogram {
    counts: Vec<u64>,
}

impl ClassHistogram {
    pub fn new(class_count: usize) -> Self {
        Self {
            counts: vec![0; class_count],
        }
    }

    pub fn from_counts(counts: Vec<u64>) -> Self {
        Self { counts }
    }

    pub fn add(&mut self, class_id: i64) {
        if let Some(slot) = usize::try_from(class_id)
            .ok()
            .and_then(|i| self.counts.get_mut(i))
        {
            *slot += 1;
        }
    }

    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Share of each class; all zeros for an empty histogram.
    pub fn shares(&self) -> Vec<f64> {
        let total = self.total();
        if total == 0 {
            return vec![0.0; self.counts.len()];
        }
        self.counts
            .iter()
            .map(|&c| c as f64 / total as f64)
            .collect()
    }

    /// `(class_id, share)` of the largest class. Ties go to the lowest id.
    pub fn dominant(&self) -> Option<(usize, f64)> {
        let total = self.total();
        if total == 0 {
            return None;
        }
        let (id, count) = self
            .counts
            .iter()
            .enumerate()
            .fold((0, 0u64), |best, (i, &c)| if c > best.1 { (i, c) } else { best });
        Some((id, count as f64 / total as f64))
    }

    /// Classes with fewer than `min` instances, in id order.
    pub fn low_support(&self, min: u64) -> Vec<(usize, u64)> {
        self.counts
            .iter()
            .enumerate()
            .filter(|(_, c)| **c < min)
            .map(|(i, c)| (i, *c))
            .collect()
    }
}

/// Global and per-split histograms for one index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Distribution {
    pub global: ClassHistogram,
    pub per_split: BTreeMap<Split, ClassHistogram>,
}

impl Distribution {
    pub fn from_index(index: &Index) -> Self {
        let class_count = index.class_count();
        let mut global = ClassHistogram::new(class_count);
        let mut per_split: BTreeMap<Split, ClassHistogram> = BTreeMap::new();
        for entry in &index.entries {
            let hist = per_split
                .entry(entry.split)
                .or_insert_with(|| ClassHistogram::new(class_count));
            for row in entry.labels.rows() {
                global.add(row.class_id);
                hist.add(row.class_id);
            }
        }
        Self { global, per_split }
    }

    pub fn split(&self, split: Split) -> Option<&ClassHistogram> {
        self.per_split.get(&split)
    }

    /// JSD between train and `target`, or `None` when either side is empty.
    pub fn drift_from_train(&self, target: Split) -> Option<f64> {
        let train = self.split(Split::Train)?;
        let other = self.split(target)?;
        jensen_shannon(train, other)
    }
}

/// Base-2 Jensen–Shannon divergence between two histograms, zero-padded to
/// the longer class set. `None` when either histogram is empty.
pub fn jensen_shannon(p: &ClassHistogram, q: &ClassHistogram) -> Option<f64> {
    if p.is_empty() || q.is_empty() {
        return None;
    }
    let width = p.counts.len().max(q.counts.len());
    let mut ps = p.shares();
    let mut qs = q.shares();
    ps.resize(width, 0.0);
    qs.resize(width, 0.0);

    let m: Vec<f64> = ps.iter().zip(&qs).map(|(a, b)| (a + b) / 2.0).collect();
    let jsd = 0.5 * kl(&ps, &m) + 0.5 * kl(&qs, &m);
    Some(jsd.clamp(0.0, 1.0))
}

fn kl(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .filter(|(x, y)| **x > 0.0 && **y > 0.0)
        .map(|(x, y)| x * (x / y).log2())
        .sum()
}
