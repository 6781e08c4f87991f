//! In-memory index fixtures shared by unit tests.

use crate::dataset::{AnnotationRow, LabelState, RowError};
use crate::index::{CacheBasis, Index, IndexEntry, SplitInfo};
use crate::split::Split;

pub fn entry(split: Split, image: &str, hash: Option<&str>, phash: Option<u64>) -> IndexEntry {
    IndexEntry {
        split,
        image: image.to_string(),
        label: None,
        size_bytes: 1,
        mtime_ns: 1,
        content_hash: hash.map(str::to_string),
        perceptual_hash: phash,
        width: None,
        height: None,
        image_error: None,
        labels: LabelState::Missing,
    }
}

/// Entry with a label file holding `rows`, hashed by its own path.
pub fn labeled(split: Split, image: &str, rows: Vec<AnnotationRow>) -> IndexEntry {
    let mut e = entry(split, image, Some(image), None);
    e.label = Some(image.replace("images", "labels").replace(".png", ".txt"));
    e.labels = LabelState::Parsed {
        rows,
        errors: Vec::<RowError>::new(),
    };
    e
}

pub fn bbox(line: u32, class_id: i64, cx: f64, cy: f64, w: f64, h: f64) -> AnnotationRow {
    AnnotationRow {
        line,
        class_id,
        x_center: cx,
        y_center: cy,
        width: w,
        height: h,
        polygon: None,
    }
}

pub fn index_of(mut entries: Vec<IndexEntry>) -> Index {
    entries.sort_by(|a, b| (a.split, &a.image).cmp(&(b.split, &b.image)));
    let splits = Split::ALL
        .into_iter()
        .filter(|s| entries.iter().any(|e| e.split == *s))
        .map(|s| SplitInfo {
            split: s,
            images_dir: format!("{s}/images"),
            labels_dir: format!("{s}/labels"),
            image_count: entries.iter().filter(|e| e.split == s).count(),
            orphan_labels: Vec::new(),
        })
        .collect();
    let perceptual_hashing = entries.iter().any(|e| e.perceptual_hash.is_some());
    Index {
        schema_version: crate::SCHEMA_VERSION.to_string(),
        tool_version: crate::TOOL_VERSION.to_string(),
        dataset_root: "/data".to_string(),
        data_yaml: None,
        class_names: vec!["a".into(), "b".into()],
        splits,
        perceptual_hashing,
        cache_basis: CacheBasis {
            dataset_root: "/data".into(),
            tool_version: crate::TOOL_VERSION.into(),
            enabled_checks: Vec::new(),
            perceptual_hashing,
            phash_hamming_threshold: 8,
            max_images: 0,
        },
        cache_key: "sha256:test".to_string(),
        entries,
    }
}
