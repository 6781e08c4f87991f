use serde::{Deserialize, Serialize};

use crate::findings::catalog::{FindingId, Severity};
use crate::split::Split;

/// One atomic, severity-tagged quality defect.
///
/// Built once through the consuming `with_*` methods and never mutated
/// afterwards. Optional fields are omitted from JSON rather than written as
/// `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub id: FindingId,
    pub severity: Severity,
    pub message: String,
    pub fingerprint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub split: Option<Split>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<String>,
}

impl Finding {
    /// New finding with the catalog's default severity and suggested action.
    pub fn new(id: FindingId, message: impl Into<String>, fingerprint: String) -> Self {
        let entry = id.entry();
        Self {
            id,
            severity: entry.severity,
            message: message.into(),
            fingerprint,
            split: None,
            image: None,
            label: None,
            class_id: None,
            metrics: None,
            suggested_action: Some(entry.suggested_action.to_string()),
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_split(mut self, split: Split) -> Self {
        self.split = Some(split);
        self
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    pub fn with_label(mut self, label: Option<&str>) -> Self {
        self.label = label.map(str::to_string);
        self
    }

    pub fn with_class_id(mut self, class_id: i64) -> Self {
        self.class_id = Some(class_id);
        self
    }

    pub fn with_metrics(mut self, metrics: serde_json::Value) -> Self {
        self.metrics = Some(metrics);
        self
    }
}
