//! `data.yaml` resolution.

use std::path::{Component, Path, PathBuf};

use serde_yaml::Value;

use crate::error::AuditError;
use crate::split::Split;

/// Where each split's images and labels live.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetLayout {
    pub data_yaml: PathBuf,
    pub root: PathBuf,
    pub class_names: Vec<String>,
    pub splits: Vec<SplitLayout>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SplitLayout {
    pub split: Split,
    pub images_dir: PathBuf,
    pub labels_dir: PathBuf,
}

/// Read `data.yaml` and resolve the requested splits.
///
/// An empty `requested` slice means every split the file declares. Splits
/// not declared in the file are skipped; if none remain the layout is a
/// usage error. The file path is canonicalized first, so every resolved
/// directory is absolute.
pub fn load_layout(data_yaml: &Path, requested: &[Split]) -> Result<DatasetLayout, AuditError> {
    let cannot_read =
        |e: std::io::Error| AuditError::usage(format!("cannot read data.yaml {}: {e}", data_yaml.display()));
    let data_yaml = std::fs::canonicalize(data_yaml).map_err(cannot_read)?;
    let text = std::fs::read_to_string(&data_yaml).map_err(cannot_read)?;
    parse_layout(&data_yaml, &text, requested)
}

pub fn parse_layout(
    data_yaml: &Path,
    text: &str,
    requested: &[Split],
) -> Result<DatasetLayout, AuditError> {
    let doc: Value = serde_yaml::from_str(text)
        .map_err(|e| AuditError::usage(format!("invalid data.yaml: {e}")))?;
    let map = match &doc {
        Value::Mapping(map) => map,
        Value::Null => return Err(AuditError::usage("data.yaml is empty")),
        _ => return Err(AuditError::usage("data.yaml must be a mapping")),
    };

    let base = match data_yaml.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let root = match map.get("path") {
        None => normalize(base),
        Some(Value::String(hint)) => resolve(base, hint),
        Some(_) => return Err(AuditError::usage("data.yaml path must be a string")),
    };

    let class_names = resolve_names(map.get("names"))?;

    let wanted: &[Split] = if requested.is_empty() {
        &Split::ALL
    } else {
        requested
    };

    let mut splits = Vec::new();
    for split in Split::ALL.into_iter().filter(|s| wanted.contains(s)) {
        let images_dir = match map.get(split.as_str()) {
            None | Some(Value::Null) => continue,
            Some(Value::String(dir)) => resolve(&root, dir),
            Some(_) => {
                return Err(AuditError::usage(format!(
                    "data.yaml {split} must be a directory path string"
                )));
            }
        };
        let labels_dir = labels_dir_for(&images_dir);
        splits.push(SplitLayout {
            split,
            images_dir,
            labels_dir,
        });
    }

    if splits.is_empty() {
        return Err(AuditError::usage("no valid splits were resolved from data.yaml"));
    }

    Ok(DatasetLayout {
        data_yaml: data_yaml.to_path_buf(),
        root,
        class_names,
        splits,
    })
}

fn resolve(base: &Path, hint: &str) -> PathBuf {
    let path = Path::new(hint);
    if path.is_absolute() {
        normalize(path)
    } else {
        normalize(&base.join(path))
    }
}

/// Lexically drop `.` and fold `..` into its parent. An empty result is `.`.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        out
    }
}

/// YOLO convention: `.../images` pairs with the sibling `.../labels`.
fn labels_dir_for(images_dir: &Path) -> PathBuf {
    match images_dir.parent() {
        Some(parent) => parent.join("labels"),
        None => PathBuf::from("labels"),
    }
}

fn resolve_names(raw: Option<&Value>) -> Result<Vec<String>, AuditError> {
    match raw {
        Some(Value::Sequence(items)) => items
            .iter()
            .map(|v| match v {
                Value::String(s) => Ok(s.clone()),
                _ => Err(AuditError::usage("data.yaml names entries must be strings")),
            })
            .collect(),
        Some(Value::Mapping(map)) => {
            let mut indexed = Vec::with_capacity(map.len());
            for (key, value) in map {
                let idx = match key {
                    Value::Number(n) => n.as_u64(),
                    Value::String(s) => s.parse::<u64>().ok(),
                    _ => None,
                }
                .ok_or_else(|| AuditError::usage("data.yaml names keys must be numeric"))?;
                let Value::String(name) = value else {
                    return Err(AuditError::usage("data.yaml names values must be strings"));
                };
                indexed.push((idx, name.clone()));
            }
            indexed.sort_by_key(|(idx, _)| *idx);
            Ok(indexed.into_iter().map(|(_, name)| name).collect())
        }
        _ => Err(AuditError::usage("data.yaml names must be a list or mapping")),
    }
}
