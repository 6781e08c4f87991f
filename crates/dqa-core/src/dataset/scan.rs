//! Filesystem walk that turns a [`DatasetLayout`] into indexer input.

use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};

use anyhow::Context;
use walkdir::WalkDir;

use crate::dataset::labels::{LabelState, parse_label_text};
use crate::dataset::layout::DatasetLayout;
use crate::error::AuditError;
use crate::split::Split;

const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "bmp", "webp"];

/// Everything the indexer consumes: per-split image/label pairs with parsed
/// rows, orphan labels and the class list.
#[derive(Debug, Clone)]
pub struct DatasetSource {
    pub root: PathBuf,
    pub data_yaml: Option<PathBuf>,
    pub class_names: Vec<String>,
    pub splits: Vec<SplitSource>,
}

#[derive(Debug, Clone)]
pub struct SplitSource {
    pub split: Split,
    pub images_dir: PathBuf,
    pub labels_dir: PathBuf,
    pub records: Vec<SourceRecord>,
    /// Root-relative paths of label files with no matching image, sorted.
    pub orphan_labels: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct SourceRecord {
    pub split: Split,
    /// Root-relative, `/`-separated image path.
    pub image: String,
    /// Location on disk used for hashing and probing.
    pub image_path: PathBuf,
    pub label: Option<String>,
    pub labels: LabelState,
}

impl DatasetSource {
    pub fn record_count(&self) -> usize {
        self.splits.iter().map(|s| s.records.len()).sum()
    }
}

/// Walk every split in `layout`.
///
/// An unreadable root or images directory aborts with `DataAccess`; a
/// missing labels directory just leaves every image unlabeled.
pub fn scan(layout: &DatasetLayout) -> Result<DatasetSource, AuditError> {
    std::fs::read_dir(&layout.root).map_err(|e| AuditError::data_access(&layout.root, e))?;

    let mut splits = Vec::with_capacity(layout.splits.len());
    for split_layout in &layout.splits {
        let split = split_layout.split;
        let images_dir = &split_layout.images_dir;
        let labels_dir = &split_layout.labels_dir;

        let images = list_files(images_dir, |p| has_extension(p, &IMAGE_EXTENSIONS))?;
        let labels_present = labels_dir.is_dir();
        // Keyed by path without extension so `a.TXT` still pairs with `a.jpg`.
        let label_files: BTreeMap<PathBuf, PathBuf> = if labels_present {
            list_files(labels_dir, |p| has_extension(p, &["txt"]))?
                .into_iter()
                .map(|p| (p.with_extension(""), p))
                .collect()
        } else {
            BTreeMap::new()
        };

        let mut matched = BTreeSet::new();
        let mut records = Vec::with_capacity(images.len());
        for image_path in images {
            let stem = label_stem_for(images_dir, labels_dir, &image_path);
            let (label, labels) = match label_files.get(&stem) {
                Some(label_path) => {
                    matched.insert(label_path.clone());
                    let state = read_label(label_path);
                    (Some(relative_posix(&layout.root, label_path)), state)
                }
                None => (None, LabelState::Missing),
            };

            records.push(SourceRecord {
                split,
                image: relative_posix(&layout.root, &image_path),
                image_path,
                label,
                labels,
            });
        }

        let orphan_labels = label_files
            .values()
            .filter(|p| !matched.contains(*p))
            .map(|p| relative_posix(&layout.root, p))
            .collect();

        splits.push(SplitSource {
            split,
            images_dir: images_dir.clone(),
            labels_dir: labels_dir.clone(),
            records,
            orphan_labels,
        });
    }

    Ok(DatasetSource {
        root: layout.root.clone(),
        data_yaml: Some(layout.data_yaml.clone()),
        class_names: layout.class_names.clone(),
        splits,
    })
}

fn list_files(dir: &Path, keep: impl Fn(&Path) -> bool) -> Result<Vec<PathBuf>, AuditError> {
    if !dir.is_dir() {
        let err = io::Error::new(io::ErrorKind::NotFound, "directory does not exist");
        return Err(AuditError::data_access(dir, err));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(dir).to_path_buf();
            AuditError::data_access(path, io::Error::from(e))
        })?;
        if entry.file_type().is_file() && keep(entry.path()) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

fn has_extension(path: &Path, allowed: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| allowed.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// `images/sub/a.jpg` pairs with `labels/sub/a.<txt>`; returned without the
/// extension.
fn label_stem_for(images_dir: &Path, labels_dir: &Path, image: &Path) -> PathBuf {
    let rel = image.strip_prefix(images_dir).unwrap_or(image);
    labels_dir.join(rel).with_extension("")
}

fn read_label(path: &Path) -> LabelState {
    let bytes = std::fs::read(path).with_context(|| format!("failed to read label: {}", path.display()));
    match bytes {
        Ok(bytes) => parse_label_text(&String::from_utf8_lossy(&bytes)),
        Err(e) => LabelState::Unreadable {
            reason: format!("read_error:{e:#}"),
        },
    }
}

/// Root-relative path with `/` separators; paths outside the root are kept
/// whole.
pub fn relative_posix(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
