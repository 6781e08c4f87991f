//! YOLO label rows.

use serde::{Deserialize, Serialize};

/// One parsed annotation. Polygon rows also carry their vertex list; their
/// box fields are the polygon's bounding box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationRow {
    pub line: u32,
    pub class_id: i64,
    pub x_center: f64,
    pub y_center: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub polygon: Option<Vec<f64>>,
}

impl AnnotationRow {
    /// Every normalized value this row claims, for range checks.
    pub fn normalized_values(&self) -> Vec<f64> {
        match &self.polygon {
            Some(coords) => coords.clone(),
            None => vec![self.x_center, self.y_center, self.width, self.height],
        }
    }

    pub fn kind(&self) -> &'static str {
        if self.polygon.is_some() { "segment" } else { "bbox" }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowError {
    pub line: u32,
    pub raw: String,
    pub reason: String,
}

/// Label side of an index entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LabelState {
    /// No label file exists for the image.
    Missing,
    Parsed {
        rows: Vec<AnnotationRow>,
        errors: Vec<RowError>,
    },
    /// The label file exists but could not be read.
    Unreadable { reason: String },
}

impl LabelState {
    pub fn rows(&self) -> &[AnnotationRow] {
        match self {
            LabelState::Parsed { rows, .. } => rows,
            _ => &[],
        }
    }

    pub fn errors(&self) -> &[RowError] {
        match self {
            LabelState::Parsed { errors, .. } => errors,
            _ => &[],
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, LabelState::Missing)
    }
}

pub const REASON_NON_NUMERIC: &str = "non_numeric";
pub const REASON_TOKEN_COUNT: &str = "expected_5_tokens_or_valid_polygon";

/// Parse the text of a YOLO label file. Blank lines are skipped; bad rows are
/// collected rather than aborting the file.
pub fn parse_label_text(text: &str) -> LabelState {
    let mut rows = Vec::new();
    let mut errors = Vec::new();

    for (idx, raw) in text.lines().enumerate() {
        let line = (idx + 1) as u32;
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            continue;
        }

        match parse_row(line, trimmed) {
            Ok(row) => rows.push(row),
            Err(reason) => errors.push(RowError {
                line,
                raw: raw.to_string(),
                reason: reason.to_string(),
            }),
        }
    }

    LabelState::Parsed { rows, errors }
}

fn parse_row(line: u32, text: &str) -> Result<AnnotationRow, &'static str> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    let is_box = tokens.len() == 5;
    let is_polygon = tokens.len() >= 7 && tokens.len() % 2 == 1;
    if !is_box && !is_polygon {
        return Err(REASON_TOKEN_COUNT);
    }

    let class_id: i64 = tokens[0].parse().map_err(|_| REASON_NON_NUMERIC)?;
    let values = tokens[1..]
        .iter()
        .map(|t| t.parse::<f64>())
        .collect::<Result<Vec<f64>, _>>()
        .map_err(|_| REASON_NON_NUMERIC)?;

    if is_box {
        return Ok(AnnotationRow {
            line,
            class_id,
            x_center: values[0],
            y_center: values[1],
            width: values[2],
            height: values[3],
            polygon: None,
        });
    }

    let xs = values.iter().step_by(2).copied();
    let ys = values.iter().skip(1).step_by(2).copied();
    let (x_min, x_max) = min_max(xs);
    let (y_min, y_max) = min_max(ys);

    Ok(AnnotationRow {
        line,
        class_id,
        x_center: (x_min + x_max) / 2.0,
        y_center: (y_min + y_max) / 2.0,
        width: x_max - x_min,
        height: y_max - y_min,
        polygon: Some(values),
    })
}

fn min_max(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    })
}
