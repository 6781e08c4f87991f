//! Audit configuration (`dqa.yaml`).
//!
//! Every level rejects unknown keys so a typo surfaces as a usage error
//! instead of silently running with defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::checks::CheckKind;
use crate::error::AuditError;
use crate::findings::Severity;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct AuditConfig {
    pub version: u32,
    pub fail_on: Severity,
    pub checks: ChecksConfig,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            version: 1,
            fail_on: Severity::High,
            checks: ChecksConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ChecksConfig {
    pub integrity: IntegrityConfig,
    pub class_distribution: ClassDistributionConfig,
    pub bbox_sanity: BBoxSanityConfig,
    pub duplicates: DuplicatesConfig,
    pub near_duplicates: NearDuplicatesConfig,
    pub leakage: LeakageConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct IntegrityConfig {
    pub enabled: bool,
}

impl Default for IntegrityConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ClassDistributionConfig {
    pub enabled: bool,
    pub min_instances_per_class_warn: u64,
    pub max_class_share_warn: f64,
    pub split_drift_jsd_warn: f64,
    pub split_drift_jsd_high: f64,
}

impl Default for ClassDistributionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_instances_per_class_warn: 50,
            max_class_share_warn: 0.80,
            split_drift_jsd_warn: 0.10,
            split_drift_jsd_high: 0.20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct BBoxSanityConfig {
    pub enabled: bool,
    pub min_box_area_ratio_warn: f64,
    pub max_box_area_ratio_warn: f64,
    pub max_boxes_per_image_warn: usize,
    pub aspect_ratio_warn: f64,
}

impl Default for BBoxSanityConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_box_area_ratio_warn: 0.0001,
            max_box_area_ratio_warn: 0.90,
            max_boxes_per_image_warn: 300,
            aspect_ratio_warn: 20.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct DuplicatesConfig {
    pub enabled: bool,
}

impl Default for DuplicatesConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct NearDuplicatesConfig {
    pub enabled: bool,
    pub phash_hamming_threshold: u32,
}

impl Default for NearDuplicatesConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            phash_hamming_threshold: 8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct LeakageConfig {
    pub enabled: bool,
    pub include_near_dup: bool,
}

impl Default for LeakageConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            include_near_dup: false,
        }
    }
}

impl AuditConfig {
    /// Parse and validate a YAML document. An empty document yields defaults.
    pub fn from_yaml_str(text: &str) -> Result<Self, AuditError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: AuditConfig = serde_yaml::from_str(text)
            .map_err(|e| AuditError::usage(format!("invalid config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, AuditError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            AuditError::usage(format!("cannot read config {}: {e}", path.display()))
        })?;
        Self::from_yaml_str(&text)
    }

    /// Reject threshold combinations no check can interpret.
    pub fn validate(&self) -> Result<(), AuditError> {
        let cd = &self.checks.class_distribution;
        let bb = &self.checks.bbox_sanity;
        let nd = &self.checks.near_duplicates;

        if self.version != 1 {
            return Err(AuditError::usage(format!(
                "unsupported config version {}",
                self.version
            )));
        }
        ensure_unit("checks.class_distribution.max_class_share_warn", cd.max_class_share_warn)?;
        ensure_unit("checks.class_distribution.split_drift_jsd_warn", cd.split_drift_jsd_warn)?;
        ensure_unit("checks.class_distribution.split_drift_jsd_high", cd.split_drift_jsd_high)?;
        if cd.split_drift_jsd_warn > cd.split_drift_jsd_high {
            return Err(AuditError::usage(
                "checks.class_distribution.split_drift_jsd_warn must not exceed split_drift_jsd_high",
            ));
        }

        ensure_unit("checks.bbox_sanity.min_box_area_ratio_warn", bb.min_box_area_ratio_warn)?;
        ensure_unit("checks.bbox_sanity.max_box_area_ratio_warn", bb.max_box_area_ratio_warn)?;
        if bb.min_box_area_ratio_warn >= bb.max_box_area_ratio_warn {
            return Err(AuditError::usage(
                "checks.bbox_sanity.min_box_area_ratio_warn must be below max_box_area_ratio_warn",
            ));
        }
        if !(bb.aspect_ratio_warn >= 1.0) {
            return Err(AuditError::usage(
                "checks.bbox_sanity.aspect_ratio_warn must be at least 1.0",
            ));
        }

        if nd.phash_hamming_threshold > 64 {
            return Err(AuditError::usage(
                "checks.near_duplicates.phash_hamming_threshold must be within [0, 64]",
            ));
        }
        Ok(())
    }

    /// Names of enabled checks in registry order.
    pub fn enabled_checks(&self) -> Vec<CheckKind> {
        CheckKind::ALL
            .into_iter()
            .filter(|kind| self.is_enabled(*kind))
            .collect()
    }

    pub fn is_enabled(&self, kind: CheckKind) -> bool {
        let c = &self.checks;
        match kind {
            CheckKind::Integrity => c.integrity.enabled,
            CheckKind::ClassDistribution => c.class_distribution.enabled,
            CheckKind::BBoxSanity => c.bbox_sanity.enabled,
            CheckKind::Duplicates => c.duplicates.enabled,
            CheckKind::NearDuplicates => c.near_duplicates.enabled,
            CheckKind::Leakage => c.leakage.enabled,
        }
    }

    /// Whether the run needs perceptual hashes at all.
    pub fn wants_perceptual_hashes(&self) -> bool {
        self.checks.near_duplicates.enabled
            || (self.checks.leakage.enabled && self.checks.leakage.include_near_dup)
    }
}

fn ensure_unit(name: &str, value: f64) -> Result<(), AuditError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(AuditError::usage(format!("{name} must be within [0, 1], got {value}")))
    }
}
