//! Index construction.
//!
//! The only parallel stage of an audit. Records are put in canonical
//! `(split, image)` order and capped before any work is scheduled, and the
//! worker pool's ordered `collect` keeps entry order independent of which
//! worker finishes first.

use rayon::prelude::*;
use tracing::{debug, info};

use crate::SCHEMA_VERSION;
use crate::TOOL_VERSION;
use crate::config::AuditConfig;
use crate::dataset::{DatasetSource, SourceRecord};
use crate::decode::{HashOutcome, ImageDecoder, ProbeOutcome};
use crate::error::AuditError;
use crate::index::cache::{CacheBasis, IndexCache, cache_key};
use crate::index::hash::{read_image, sha256_hex, stat_file};
use crate::index::{Index, IndexEntry, SplitInfo};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexOptions {
    /// Worker threads for hashing and probing; `0` lets the pool decide.
    pub workers: usize,
    /// Cap on indexed entries after ordering; `0` means unlimited.
    pub max_images: usize,
}

/// Build the immutable index for one run.
pub fn build_index(
    source: &DatasetSource,
    config: &AuditConfig,
    options: &IndexOptions,
    decoder: &dyn ImageDecoder,
    cache: &IndexCache,
) -> Result<Index, AuditError> {
    std::fs::metadata(&source.root).map_err(|e| AuditError::data_access(&source.root, e))?;

    let mut records: Vec<&SourceRecord> = source.splits.iter().flat_map(|s| &s.records).collect();
    records.sort_by(|a, b| (a.split, a.image.as_str()).cmp(&(b.split, b.image.as_str())));
    records.dedup_by(|a, b| a.split == b.split && a.image == b.image);
    if options.max_images > 0 {
        records.truncate(options.max_images);
    }

    let perceptual_hashing = config.wants_perceptual_hashes() && decoder.perceptual_hashing();
    let basis = CacheBasis {
        dataset_root: source.root.display().to_string(),
        tool_version: TOOL_VERSION.to_string(),
        enabled_checks: config
            .enabled_checks()
            .iter()
            .map(|k| k.as_str().to_string())
            .collect(),
        perceptual_hashing,
        phash_hamming_threshold: config.checks.near_duplicates.phash_hamming_threshold,
        max_images: options.max_images,
    };
    let basis_digest = basis.digest();

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.workers)
        .build()
        .map_err(|e| AuditError::usage(format!("cannot start worker pool: {e}")))?;

    let task = IndexTask {
        basis_digest: &basis_digest,
        perceptual_hashing,
        decoder,
        cache,
    };
    let results: Vec<(IndexEntry, bool)> =
        pool.install(|| records.par_iter().map(|r| task.index_one(r)).collect());

    let reused = results.iter().filter(|(_, hit)| *hit).count();
    let entries: Vec<IndexEntry> = results.into_iter().map(|(e, _)| e).collect();

    let mut splits: Vec<SplitInfo> = source
        .splits
        .iter()
        .map(|s| SplitInfo {
            split: s.split,
            images_dir: s.images_dir.display().to_string(),
            labels_dir: s.labels_dir.display().to_string(),
            image_count: entries.iter().filter(|e| e.split == s.split).count(),
            orphan_labels: s.orphan_labels.clone(),
        })
        .collect();
    splits.sort_by_key(|s| s.split);

    let cache_key = cache_key(&basis, &entries);
    debug!(reused, hashed = entries.len() - reused, "index cache statistics");
    info!(
        entries = entries.len(),
        splits = splits.len(),
        perceptual_hashing,
        "dataset indexed"
    );

    Ok(Index {
        schema_version: SCHEMA_VERSION.to_string(),
        tool_version: TOOL_VERSION.to_string(),
        dataset_root: source.root.display().to_string(),
        data_yaml: source.data_yaml.as_ref().map(|p| p.display().to_string()),
        class_names: source.class_names.clone(),
        splits,
        perceptual_hashing,
        cache_basis: basis,
        cache_key,
        entries,
    })
}

struct IndexTask<'a> {
    basis_digest: &'a str,
    perceptual_hashing: bool,
    decoder: &'a dyn ImageDecoder,
    cache: &'a IndexCache,
}

impl IndexTask<'_> {
    /// Index one record. Failures become `image_error` on the entry rather
    /// than aborting the pool. Returns whether the cache supplied the facts.
    fn index_one(&self, record: &SourceRecord) -> (IndexEntry, bool) {
        let mut entry = IndexEntry {
            split: record.split,
            image: record.image.clone(),
            label: record.label.clone(),
            size_bytes: 0,
            mtime_ns: -1,
            content_hash: None,
            perceptual_hash: None,
            width: None,
            height: None,
            image_error: None,
            labels: record.labels.clone(),
        };

        let stat = match stat_file(&record.image_path) {
            Ok(stat) => stat,
            Err(e) => {
                entry.image_error = Some(format!("{e:#}"));
                return (entry, false);
            }
        };
        entry.size_bytes = stat.size_bytes;
        entry.mtime_ns = stat.mtime_ns;

        if let Some(prev) =
            self.cache
                .lookup(self.basis_digest, record.split, &record.image, stat)
        {
            entry.content_hash = prev.content_hash.clone();
            entry.perceptual_hash = prev.perceptual_hash;
            entry.width = prev.width;
            entry.height = prev.height;
            entry.image_error = prev.image_error.clone();
            return (entry, true);
        }

        let bytes = match read_image(&record.image_path) {
            Ok(bytes) => bytes,
            Err(e) => {
                entry.image_error = Some(format!("{e:#}"));
                return (entry, false);
            }
        };
        entry.content_hash = Some(sha256_hex(&bytes));

        match self.decoder.probe(&bytes) {
            ProbeOutcome::Dimensions { width, height } => {
                entry.width = Some(width);
                entry.height = Some(height);
            }
            ProbeOutcome::Unknown => {}
            ProbeOutcome::Failed(reason) => entry.image_error = Some(reason),
        }

        if self.perceptual_hashing && entry.image_error.is_none() {
            match self.decoder.perceptual_hash(&bytes) {
                HashOutcome::Hashed(h) => entry.perceptual_hash = Some(h),
                HashOutcome::Unavailable => {}
                HashOutcome::Failed(reason) => entry.image_error = Some(reason),
            }
        }

        (entry, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{LabelState, SplitSource};
    use crate::split::Split;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    /// Decoder that hashes the first byte so tests control similarity.
    struct FirstByteHasher;

    impl ImageDecoder for FirstByteHasher {
        fn probe(&self, _bytes: &[u8]) -> ProbeOutcome {
            ProbeOutcome::Dimensions {
                width: 4,
                height: 4,
            }
        }

        fn perceptual_hash(&self, bytes: &[u8]) -> HashOutcome {
            match bytes.first() {
                Some(b) => HashOutcome::Hashed(u64::from(*b)),
                None => HashOutcome::Failed("empty".into()),
            }
        }

        fn perceptual_hashing(&self) -> bool {
            true
        }
    }

    fn record(root: &Path, split: Split, name: &str, bytes: &[u8]) -> SourceRecord {
        let rel = format!("{split}/images/{name}");
        let path = root.join(&rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, bytes).unwrap();
        SourceRecord {
            split,
            image: rel,
            image_path: path,
            label: None,
            labels: LabelState::Missing,
        }
    }

    fn source(root: &Path, records: Vec<SourceRecord>) -> DatasetSource {
        let mut splits = Vec::new();
        for split in [Split::Val, Split::Train] {
            let mine: Vec<SourceRecord> = records.iter().filter(|r| r.split == split).cloned().collect();
            splits.push(SplitSource {
                split,
                images_dir: root.join(format!("{split}/images")),
                labels_dir: root.join(format!("{split}/labels")),
                records: mine,
                orphan_labels: vec![],
            });
        }
        DatasetSource {
            root: root.to_path_buf(),
            data_yaml: None,
            class_names: vec!["a".into()],
            splits,
        }
    }

    fn sample(root: &Path) -> DatasetSource {
        let records = vec![
            record(root, Split::Val, "z.png", b"zz"),
            record(root, Split::Train, "b.png", b"bb"),
            record(root, Split::Train, "a.png", b"aa"),
            record(root, Split::Val, "c.png", b"aa"),
        ];
        source(root, records)
    }

    #[test]
    fn entries_are_in_canonical_order() {
        let dir = TempDir::new().unwrap();
        let src = sample(dir.path());

        let index = build_index(
            &src,
            &AuditConfig::default(),
            &IndexOptions::default(),
            &FirstByteHasher,
            &IndexCache::empty(),
        )
        .unwrap();

        let keys: Vec<String> = index.entries.iter().map(|e| e.identity()).collect();
        assert_eq!(
            keys,
            vec![
                "train:train/images/a.png",
                "train:train/images/b.png",
                "val:val/images/c.png",
                "val:val/images/z.png",
            ]
        );
        assert_eq!(index.splits[0].split, Split::Train);
        assert_eq!(index.splits[0].image_count, 2);
    }

    #[test]
    fn identical_bytes_share_content_hash() {
        let dir = TempDir::new().unwrap();
        let index = build_index(
            &sample(dir.path()),
            &AuditConfig::default(),
            &IndexOptions::default(),
            &FirstByteHasher,
            &IndexCache::empty(),
        )
        .unwrap();

        assert_eq!(index.entries[0].content_hash, index.entries[2].content_hash);
        assert_ne!(index.entries[0].content_hash, index.entries[1].content_hash);
    }

    #[test]
    fn output_is_identical_across_worker_counts() {
        let dir = TempDir::new().unwrap();
        let src = sample(dir.path());
        let cfg = AuditConfig::default();

        let one = build_index(
            &src,
            &cfg,
            &IndexOptions {
                workers: 1,
                max_images: 0,
            },
            &FirstByteHasher,
            &IndexCache::empty(),
        )
        .unwrap();
        let many = build_index(
            &src,
            &cfg,
            &IndexOptions {
                workers: 4,
                max_images: 0,
            },
            &FirstByteHasher,
            &IndexCache::empty(),
        )
        .unwrap();

        assert_eq!(
            serde_json::to_string(&one).unwrap(),
            serde_json::to_string(&many).unwrap()
        );
    }

    #[test]
    fn cap_keeps_canonical_prefix() {
        let dir = TempDir::new().unwrap();
        let index = build_index(
            &sample(dir.path()),
            &AuditConfig::default(),
            &IndexOptions {
                workers: 2,
                max_images: 3,
            },
            &FirstByteHasher,
            &IndexCache::empty(),
        )
        .unwrap();

        let images: Vec<&str> = index.entries.iter().map(|e| e.image.as_str()).collect();
        assert_eq!(
            images,
            vec!["train/images/a.png", "train/images/b.png", "val/images/c.png"]
        );
    }

    #[test]
    fn perceptual_hashes_only_when_requested() {
        let dir = TempDir::new().unwrap();
        let src = sample(dir.path());

        let plain = build_index(
            &src,
            &AuditConfig::default(),
            &IndexOptions::default(),
            &FirstByteHasher,
            &IndexCache::empty(),
        )
        .unwrap();
        assert!(!plain.perceptual_hashing);
        assert!(plain.entries.iter().all(|e| e.perceptual_hash.is_none()));

        let mut cfg = AuditConfig::default();
        cfg.checks.near_duplicates.enabled = true;
        let hashed = build_index(
            &src,
            &cfg,
            &IndexOptions::default(),
            &FirstByteHasher,
            &IndexCache::empty(),
        )
        .unwrap();
        assert!(hashed.perceptual_hashing);
        assert_eq!(hashed.entries[0].perceptual_hash, Some(u64::from(b'a')));
    }

    #[test]
    fn cached_entries_are_reused_without_rehashing() {
        let dir = TempDir::new().unwrap();
        let src = sample(dir.path());
        let cfg = AuditConfig::default();

        let first = build_index(
            &src,
            &cfg,
            &IndexOptions::default(),
            &FirstByteHasher,
            &IndexCache::empty(),
        )
        .unwrap();

        // Poison the cached hash; a reuse must carry it through untouched.
        let mut poisoned = first.clone();
        poisoned.entries[0].content_hash = Some("cached".into());
        let cache = IndexCache::from_index(&poisoned);

        let second =
            build_index(&src, &cfg, &IndexOptions::default(), &FirstByteHasher, &cache).unwrap();
        assert_eq!(second.entries[0].content_hash.as_deref(), Some("cached"));
        assert_eq!(second.cache_key, first.cache_key);
    }

    #[test]
    fn unreadable_image_becomes_entry_error() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        let mut rec = record(root, Split::Train, "gone.png", b"x");
        rec.image_path = root.join("train/images/missing.png");
        let src = source(root, vec![rec]);

        let index = build_index(
            &src,
            &AuditConfig::default(),
            &IndexOptions::default(),
            &FirstByteHasher,
            &IndexCache::empty(),
        )
        .unwrap();
        assert!(index.entries[0].image_error.is_some());
        assert!(index.entries[0].content_hash.is_none());
    }

    #[test]
    fn missing_root_is_data_access_error() {
        let src = DatasetSource {
            root: "/no/such/root".into(),
            data_yaml: None,
            class_names: vec![],
            splits: vec![],
        };
        let err = build_index(
            &src,
            &AuditConfig::default(),
            &IndexOptions::default(),
            &FirstByteHasher,
            &IndexCache::empty(),
        )
        .unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }
}
