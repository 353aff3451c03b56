//! Sidecar metadata resolution following the BIDS inheritance principle.
//!
//! A JSON sidecar applies to a data file when it sits in the data file's
//! directory or one of its ancestors up to the dataset root, shares the
//! suffix, and every entity it names carries the data file's value. Applicable
//! sidecars are merged from the dataset root downwards; within one directory
//! sidecars naming fewer entities are applied first.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::entities::parse_filename;
use crate::error::LayoutError;
use crate::types::{Entities, Metadata};

#[derive(Debug, Clone)]
struct Sidecar {
    entities: Entities,
    metadata: Metadata,
}

impl Sidecar {
    fn applies_to(&self, data: &Entities) -> bool {
        self.entities.suffix() == data.suffix()
            && self
                .entities
                .pairs()
                .all(|(key, value)| data.get(key) == Some(value))
    }
}

/// Parsed JSON sidecars of a dataset, keyed by directory.
#[derive(Debug, Default)]
pub struct SidecarIndex {
    by_dir: HashMap<PathBuf, Vec<Sidecar>>,
}

impl SidecarIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and register a sidecar. Files that are not BIDS-named are ignored.
    pub fn insert(&mut self, path: &Path) -> Result<(), LayoutError> {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return Ok(());
        };
        let Some(entities) = parse_filename(name) else {
            return Ok(());
        };
        let content = std::fs::read_to_string(path).map_err(|e| LayoutError::InvalidSidecar {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let metadata = parse_sidecar(path, &content)?;
        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        self.by_dir
            .entry(dir)
            .or_default()
            .push(Sidecar { entities, metadata });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.by_dir.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Merged metadata for the data file at `path` inside dataset `root`.
    pub fn resolve(&self, root: &Path, path: &Path, entities: &Entities) -> Metadata {
        let mut dirs: Vec<&Path> = path
            .ancestors()
            .skip(1)
            .take_while(|dir| dir.starts_with(root))
            .collect();
        dirs.reverse();

        let mut merged = Metadata::new();
        for dir in dirs {
            let Some(sidecars) = self.by_dir.get(dir) else {
                continue;
            };
            let mut applicable: Vec<&Sidecar> =
                sidecars.iter().filter(|s| s.applies_to(entities)).collect();
            applicable.sort_by_key(|s| s.entities.pairs().count());
            for sidecar in applicable {
                for (key, value) in &sidecar.metadata {
                    merged.insert(key.clone(), value.clone());
                }
            }
        }
        merged
    }
}

/// Parse sidecar content; the document must be a JSON object.
pub fn parse_sidecar(path: &Path, content: &str) -> Result<Metadata, LayoutError> {
    let value: serde_json::Value =
        serde_json::from_str(content).map_err(|e| LayoutError::InvalidSidecar {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
    match value {
        serde_json::Value::Object(map) => Ok(map),
        other => Err(LayoutError::InvalidSidecar {
            path: path.to_path_buf(),
            message: format!("expected a JSON object, found {other}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(path: &Path, content: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn test_inheritance_most_specific_wins() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let top = root.join("task-rest_bold.json");
        let subject = root.join("sub-01/func/sub-01_task-rest_bold.json");
        let run = root.join("sub-01/func/sub-01_task-rest_run-1_bold.json");
        let other = root.join("task-motor_bold.json");
        write(&top, r#"{"RepetitionTime": 2.0, "TaskName": "rest", "FlipAngle": 90}"#);
        write(&subject, r#"{"FlipAngle": 80}"#);
        write(&run, r#"{"EchoTime": 0.03}"#);
        write(&other, r#"{"TaskName": "motor"}"#);

        let mut index = SidecarIndex::new();
        for path in [&top, &subject, &run, &other] {
            index.insert(path).unwrap();
        }
        assert_eq!(index.len(), 4);

        let data = root.join("sub-01/func/sub-01_task-rest_run-1_bold.nii.gz");
        let entities = parse_filename("sub-01_task-rest_run-1_bold.nii.gz").unwrap();
        let metadata = index.resolve(root, &data, &entities);
        assert_eq!(metadata["RepetitionTime"], 2.0);
        assert_eq!(metadata["TaskName"], "rest");
        assert_eq!(metadata["FlipAngle"], 80);
        assert_eq!(metadata["EchoTime"], 0.03);

        let data = root.join("sub-01/func/sub-01_task-rest_run-2_bold.nii.gz");
        let entities = parse_filename("sub-01_task-rest_run-2_bold.nii.gz").unwrap();
        let metadata = index.resolve(root, &data, &entities);
        assert!(!metadata.contains_key("EchoTime"));
    }

    #[test]
    fn test_suffix_must_match() {
        let dir = tempfile::tempdir().unwrap();
        let sidecar = dir.path().join("task-rest_sbref.json");
        write(&sidecar, r#"{"EchoTime": 0.03}"#);
        let mut index = SidecarIndex::new();
        index.insert(&sidecar).unwrap();

        let data = dir.path().join("sub-01/func/sub-01_task-rest_bold.nii.gz");
        let entities = parse_filename("sub-01_task-rest_bold.nii.gz").unwrap();
        assert!(index.resolve(dir.path(), &data, &entities).is_empty());
    }

    #[test]
    fn test_invalid_sidecar() {
        let path = Path::new("sub-01_T1w.json");
        assert!(matches!(
            parse_sidecar(path, "{not json"),
            Err(LayoutError::InvalidSidecar { .. })
        ));
        assert!(matches!(
            parse_sidecar(path, "[1, 2]"),
            Err(LayoutError::InvalidSidecar { .. })
        ));
    }

    #[test]
    fn test_non_bids_json_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let description = dir.path().join("dataset_description.json");
        write(&description, r#"{"Name": "x"}"#);
        let mut index = SidecarIndex::new();
        index.insert(&description).unwrap();
        assert!(index.is_empty());
    }
}
