use std::fs;
use std::path::{Path, PathBuf};

use dqa_core::config::AuditConfig;
use dqa_core::decode::HeaderProbe;
use dqa_core::findings::{FindingId, Severity};
use dqa_core::index::{IndexCache, IndexOptions};
use dqa_core::report::write::{read_flags, to_json, write_run};
use dqa_core::report::{AuditReport, RunInfo};
use dqa_core::split::Split;
use dqa_core::{AuditRequest, AuditRun, audit};
use tempfile::TempDir;

/// Minimal PNG: signature plus IHDR, enough for the header probe.
fn png(width: u32, height: u32, salt: u8) -> Vec<u8> {
    let mut bytes = b"\x89PNG\r\n\x1a\n".to_vec();
    bytes.extend_from_slice(&13u32.to_be_bytes());
    bytes.extend_from_slice(b"IHDR");
    bytes.extend_from_slice(&width.to_be_bytes());
    bytes.extend_from_slice(&height.to_be_bytes());
    bytes.extend_from_slice(&[8, 2, 0, 0, 0, salt, 0, 0, 0]);
    bytes
}

struct Dataset {
    dir: TempDir,
}

impl Dataset {
    /// Dataset declaring `splits` in `data.yaml`. Directories are created as
    /// files are added.
    fn new(splits: &[&str]) -> Self {
        let dir = TempDir::new().expect("temp dir");
        let mut yaml = String::from("path: .\nnames: [cat, dog]\n");
        for split in splits {
            yaml.push_str(&format!("{split}: {split}/images\n"));
        }
        fs::write(dir.path().join("data.yaml"), yaml).expect("write data.yaml");
        Self { dir }
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn data_yaml(&self) -> PathBuf {
        self.root().join("data.yaml")
    }

    fn image(&self, split: &str, name: &str, bytes: &[u8]) -> &Self {
        let path = self.root().join(split).join("images").join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, bytes).unwrap();
        self
    }

    fn label(&self, split: &str, name: &str, text: &str) -> &Self {
        let path = self.root().join(split).join("labels").join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, text).unwrap();
        self
    }

    /// Image with a clean, well-sized label.
    fn labeled(&self, split: &str, stem: &str, salt: u8) -> &Self {
        self.image(split, &format!("{stem}.png"), &png(64, 64, salt))
            .label(split, &format!("{stem}.txt"), "0 0.5 0.5 0.3 0.3\n1 0.4 0.4 0.2 0.2\n")
    }
}

fn quiet_config() -> AuditConfig {
    let mut config = AuditConfig::default();
    config.checks.class_distribution.min_instances_per_class_warn = 0;
    config
}

fn run_with(ds: &Dataset, config: &AuditConfig, workers: usize, cache: &IndexCache) -> AuditRun {
    let request = AuditRequest {
        data_yaml: &ds.data_yaml(),
        splits: &[],
        config,
        options: IndexOptions {
            workers,
            max_images: 0,
        },
        decoder: &HeaderProbe,
        cache,
    };
    audit(&request).expect("audit should succeed")
}

fn report(run: &AuditRun, config: &AuditConfig) -> AuditReport {
    run.report(
        config,
        RunInfo::new("20260101_000000", "2026-01-01T00:00:00Z", "2026-01-01T00:00:01Z", 1.0, config),
    )
}

fn ids(report: &AuditReport) -> Vec<FindingId> {
    report.flags.findings.iter().map(|f| f.id).collect()
}

#[test]
fn clean_dataset_passes_the_gate() {
    let ds = Dataset::new(&["train", "val"]);
    ds.labeled("train", "a", 1).labeled("train", "b", 2).labeled("val", "c", 3);
    let config = quiet_config();

    let report = report(&run_with(&ds, &config, 0, &IndexCache::empty()), &config);

    assert!(report.flags.findings.is_empty(), "{:?}", ids(&report));
    assert!(!report.summary.totals.build_failed);
    assert_eq!(report.exit_code(), 0);
}

#[test]
fn train_val_copy_is_exact_leakage() {
    let ds = Dataset::new(&["train", "val"]);
    ds.labeled("train", "a", 1)
        .labeled("train", "b", 2)
        .labeled("val", "a_copy", 1);
    let config = quiet_config();

    let first = report(&run_with(&ds, &config, 0, &IndexCache::empty()), &config);
    let leaks: Vec<_> = first
        .flags
        .findings
        .iter()
        .filter(|f| f.id == FindingId::LeakageExactTrainVal)
        .collect();
    assert_eq!(leaks.len(), 1);
    assert_eq!(leaks[0].severity, Severity::Critical);
    assert_eq!(leaks[0].image.as_deref(), Some("val/images/a_copy.png"));
    assert!(first.summary.totals.build_failed);

    let second = report(&run_with(&ds, &config, 0, &IndexCache::empty()), &config);
    let again = second
        .flags
        .findings
        .iter()
        .find(|f| f.id == FindingId::LeakageExactTrainVal)
        .unwrap();
    assert_eq!(again.fingerprint, leaks[0].fingerprint);
}

#[test]
fn artifacts_are_identical_across_worker_counts() {
    let ds = Dataset::new(&["train", "val", "test"]);
    for i in 0..12u8 {
        ds.labeled("train", &format!("img{i:02}"), i % 5);
    }
    ds.image("val", "unlabeled.png", &png(10, 10, 9))
        .label("val", "ghost.txt", "0 0.5 0.5 0.1 0.1\n")
        .image("test", "broken.png", b"\x89PNG\r\n\x1a\ntruncated");
    let config = quiet_config();

    let one = report(&run_with(&ds, &config, 1, &IndexCache::empty()), &config);
    let many_run = run_with(&ds, &config, 4, &IndexCache::empty());
    let many = report(&many_run, &config);

    assert_eq!(to_json(&one.flags).unwrap(), to_json(&many.flags).unwrap());
    assert_eq!(to_json(&one.summary).unwrap(), to_json(&many.summary).unwrap());

    let found = ids(&one);
    assert!(found.contains(&FindingId::IntegrityMissingLabel));
    assert!(found.contains(&FindingId::IntegrityOrphanLabel));
    assert!(found.contains(&FindingId::IntegrityCorruptImage));
    assert!(found.contains(&FindingId::DuplicateWithinSplit));
    assert!(!many_run.index.entries.is_empty());
}

#[test]
fn malformed_rows_do_not_abort_the_run() {
    let ds = Dataset::new(&["train"]);
    ds.image("train", "a.png", &png(8, 8, 1))
        .label("train", "a.txt", "0 0.5 0.5 0.2 0.2\nnot a row\n1 0.5 0.5 1.5 0.2\n7 0.5 0.5 0.1 0.1\n");
    let config = quiet_config();

    let report = report(&run_with(&ds, &config, 0, &IndexCache::empty()), &config);
    let found = ids(&report);
    assert!(found.contains(&FindingId::IntegrityMalformedRow));
    assert!(found.contains(&FindingId::IntegrityCoordOutOfRange));
    assert!(found.contains(&FindingId::IntegrityInvalidClassId));
    let integrity = &report.summary.checks[&dqa_core::checks::CheckKind::Integrity];
    assert_eq!(integrity.counts.high, 3);
}

#[test]
fn gate_threshold_controls_build_failed() {
    let ds = Dataset::new(&["train"]);
    // One tiny box: a single medium finding.
    ds.image("train", "a.png", &png(8, 8, 1))
        .label("train", "a.txt", "0 0.5 0.5 0.001 0.001\n1 0.5 0.5 0.2 0.2\n");

    let mut config = quiet_config();
    let run = run_with(&ds, &config, 0, &IndexCache::empty());
    let high = report(&run, &config);
    assert_eq!(ids(&high), vec![FindingId::BboxTinyBox]);
    assert!(!high.summary.totals.build_failed);

    config.fail_on = Severity::Medium;
    let medium = report(&run, &config);
    assert!(medium.summary.totals.build_failed);
}

#[test]
fn previous_index_seeds_the_cache() {
    let ds = Dataset::new(&["train", "val"]);
    ds.labeled("train", "a", 1).labeled("val", "b", 2);
    let config = quiet_config();
    let out = TempDir::new().unwrap();

    let first = run_with(&ds, &config, 0, &IndexCache::empty());
    write_run(out.path(), &first.index, &report(&first, &config)).unwrap();

    let cache = IndexCache::load(&out.path().join("index.json"));
    assert_eq!(cache.len(), 2);

    let second = run_with(&ds, &config, 0, &cache);
    assert_eq!(second.index.cache_key, first.index.cache_key);
    assert_eq!(second.index.entries, first.index.entries);

    let flags = read_flags(out.path()).unwrap();
    assert_eq!(flags, report(&second, &config).flags);
}

#[test]
fn split_selection_limits_the_index() {
    let ds = Dataset::new(&["train", "val"]);
    ds.labeled("train", "a", 1).labeled("val", "b", 2);
    let config = quiet_config();
    let request = AuditRequest {
        data_yaml: &ds.data_yaml(),
        splits: &[Split::Val],
        config: &config,
        options: IndexOptions::default(),
        decoder: &HeaderProbe,
        cache: &IndexCache::empty(),
    };

    let run = audit(&request).unwrap();
    assert!(run.index.entries.iter().all(|e| e.split == Split::Val));
    assert_eq!(run.index.splits.len(), 1);
}

#[test]
fn missing_split_directory_is_a_data_access_error() {
    let ds = Dataset::new(&["train", "val"]);
    ds.labeled("train", "a", 1);
    let config = quiet_config();
    let request = AuditRequest {
        data_yaml: &ds.data_yaml(),
        splits: &[Split::Val],
        config: &config,
        options: IndexOptions::default(),
        decoder: &HeaderProbe,
        cache: &IndexCache::empty(),
    };

    let err = audit(&request).unwrap_err();
    assert_eq!(err.exit_code(), 3);
}

#[test]
fn invalid_config_is_a_usage_error() {
    let ds = Dataset::new(&["train"]);
    ds.labeled("train", "a", 1);
    let mut config = quiet_config();
    config.checks.class_distribution.split_drift_jsd_warn = 0.5;
    config.checks.class_distribution.split_drift_jsd_high = 0.2;
    let request = AuditRequest {
        data_yaml: &ds.data_yaml(),
        splits: &[],
        config: &config,
        options: IndexOptions::default(),
        decoder: &HeaderProbe,
        cache: &IndexCache::empty(),
    };

    assert_eq!(audit(&request).unwrap_err().exit_code(), 2);
}
