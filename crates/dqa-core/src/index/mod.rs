//! Deterministic dataset index.
//!
//! The index is the single immutable snapshot every check reads. Entries are
//! ordered by `(split, image)` and that order is the basis for all
//! downstream output.

pub mod build;
pub mod cache;
pub mod hash;

use serde::{Deserialize, Serialize};

use crate::dataset::LabelState;
use crate::split::Split;

pub use build::{IndexOptions, build_index};
pub use cache::{CacheBasis, IndexCache};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub split: Split,
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub size_bytes: u64,
    pub mtime_ns: i64,
    /// Hex SHA-256 of the raw image bytes; absent when the file was unreadable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub perceptual_hash: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_error: Option<String>,
    pub labels: LabelState,
}

impl IndexEntry {
    /// `split:image`, the identity used inside cluster fingerprints.
    pub fn identity(&self) -> String {
        format!("{}:{}", self.split, self.image)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitInfo {
    #[serde(rename = "name")]
    pub split: Split,
    pub images_dir: String,
    pub labels_dir: String,
    pub image_count: usize,
    pub orphan_labels: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Index {
    pub schema_version: String,
    pub tool_version: String,
    pub dataset_root: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_yaml: Option<String>,
    pub class_names: Vec<String>,
    pub splits: Vec<SplitInfo>,
    /// Whether entries carry perceptual hashes for near-duplicate analysis.
    pub perceptual_hashing: bool,
    pub cache_basis: CacheBasis,
    pub cache_key: String,
    pub entries: Vec<IndexEntry>,
}

impl Index {
    pub fn class_count(&self) -> usize {
        self.class_names.len()
    }

    pub fn entries_in(&self, split: Split) -> impl Iterator<Item = &IndexEntry> {
        self.entries.iter().filter(move |e| e.split == split)
    }
}
