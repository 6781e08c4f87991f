//! Cross-run index cache.
//!
//! The cache is an explicit value handed to the indexer for one run. It is
//! usually seeded from the previous run's `index.json`; an entry is reused
//! only when the previous run was indexed under the same [`CacheBasis`] and
//! the file's `(path, size, mtime)` triple is unchanged.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::index::hash::{FileStat, sha256_hex};
use crate::index::{Index, IndexEntry};
use crate::split::Split;

/// Settings that change what the indexer computes per file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheBasis {
    pub dataset_root: String,
    pub tool_version: String,
    pub enabled_checks: Vec<String>,
    pub perceptual_hashing: bool,
    pub phash_hamming_threshold: u32,
    pub max_images: usize,
}

impl CacheBasis {
    pub fn digest(&self) -> String {
        let canonical = format!(
            "root={}\nversion={}\nchecks={}\nphash={}\nhamming={}\nmax_images={}",
            self.dataset_root,
            self.tool_version,
            self.enabled_checks.join(","),
            self.perceptual_hashing,
            self.phash_hamming_threshold,
            self.max_images,
        );
        sha256_hex(canonical.as_bytes())
    }
}

/// Digest over the basis and the ordered per-file stat snapshot.
pub fn cache_key(basis: &CacheBasis, entries: &[IndexEntry]) -> String {
    let mut lines = Vec::with_capacity(entries.len() + 1);
    lines.push(basis.digest());
    for e in entries {
        lines.push(format!("{}|{}|{}", e.identity(), e.size_bytes, e.mtime_ns));
    }
    format!("sha256:{}", sha256_hex(lines.join("\n").as_bytes()))
}

#[derive(Debug, Clone, Default)]
pub struct IndexCache {
    basis_digest: Option<String>,
    entries: HashMap<(Split, String), IndexEntry>,
}

impl IndexCache {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_index(index: &Index) -> Self {
        let entries = index
            .entries
            .iter()
            .map(|e| ((e.split, e.image.clone()), e.clone()))
            .collect();
        Self {
            basis_digest: Some(index.cache_basis.digest()),
            entries,
        }
    }

    /// Seed from a previous `index.json`. A missing or unparsable file just
    /// yields an empty cache.
    pub fn load(path: &Path) -> Self {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(_) => {
                debug!(path = %path.display(), "no previous index, starting cold");
                return Self::empty();
            }
        };
        match serde_json::from_str::<Index>(&text) {
            Ok(index) => Self::from_index(&index),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "ignoring unreadable previous index");
                Self::empty()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Previous entry for `(split, image)` if it is still valid for `basis_digest`
    /// and `stat`.
    pub fn lookup(
        &self,
        basis_digest: &str,
        split: Split,
        image: &str,
        stat: FileStat,
    ) -> Option<&IndexEntry> {
        if self.basis_digest.as_deref() != Some(basis_digest) {
            return None;
        }
        self.entries
            .get(&(split, image.to_string()))
            .filter(|e| e.size_bytes == stat.size_bytes && e.mtime_ns == stat.mtime_ns)
            .filter(|e| e.content_hash.is_some())
    }
}
