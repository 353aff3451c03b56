//! Fundamental types shared across the report pipeline.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::DescribeError;

/// Sidecar metadata of a scan: key to arbitrary JSON value.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Entities that are folded together when grouping acquisitions.
pub const MERGED_ENTITIES: [&str; 2] = ["run", "echo"];

/// BIDS entities of a scan file.
///
/// Key-value entities are kept in filename order using their short BIDS keys
/// (`sub`, `ses`, `task`, `run`, ...). Datatype, suffix and extension are
/// stored separately because they are not `key-value` pairs in a filename.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entities {
    pairs: Vec<(String, String)>,
    pub datatype: Option<String>,
    pub suffix: Option<String>,
    pub extension: Option<String>,
}

impl Entities {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a key-value entity.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn with_datatype(mut self, datatype: impl Into<String>) -> Self {
        self.datatype = Some(datatype.into());
        self
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = Some(extension.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.pairs.iter_mut().find(|(k, _)| *k == key) {
            Some(pair) => pair.1 = value,
            None => self.pairs.push((key, value)),
        }
    }

    /// Look up a key-value entity by its short key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Key-value entities in filename order.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn subject(&self) -> Option<&str> {
        self.get("sub")
    }

    pub fn session(&self) -> Option<&str> {
        self.get("ses")
    }

    pub fn task(&self) -> Option<&str> {
        self.get("task")
    }

    /// Run index, if the run entity is present and numeric.
    pub fn run(&self) -> Option<u32> {
        self.get("run").and_then(|r| r.parse().ok())
    }

    pub fn datatype(&self) -> &str {
        self.datatype.as_deref().unwrap_or("")
    }

    pub fn suffix(&self) -> &str {
        self.suffix.as_deref().unwrap_or("")
    }

    /// Stem shared by every member of an acquisition group: all key-value
    /// entities except run and echo, followed by the suffix.
    pub fn group_label(&self) -> String {
        let mut parts: Vec<String> = self
            .pairs
            .iter()
            .filter(|(k, _)| !MERGED_ENTITIES.contains(&k.as_str()))
            .map(|(k, v)| format!("{k}-{v}"))
            .collect();
        if let Some(suffix) = &self.suffix {
            parts.push(suffix.clone());
        }
        parts.join("_")
    }
}

/// Capability contract for a scan file handed to the pipeline.
pub trait ScanRecord {
    /// Location of the data file.
    fn path(&self) -> &Path;

    /// Parsed BIDS entities.
    fn entities(&self) -> &Entities;

    /// Sidecar metadata after inheritance has been resolved.
    fn metadata(&self) -> &Metadata;

    /// File name component of the path.
    fn filename(&self) -> String {
        self.path()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// A scan file with its entities and resolved sidecar metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanFile {
    pub path: PathBuf,
    pub entities: Entities,
    pub metadata: Metadata,
}

impl ScanFile {
    pub fn new(path: impl Into<PathBuf>, entities: Entities, metadata: Metadata) -> Self {
        Self {
            path: path.into(),
            entities,
            metadata,
        }
    }
}

impl ScanRecord for ScanFile {
    fn path(&self) -> &Path {
        &self.path
    }

    fn entities(&self) -> &Entities {
        &self.entities
    }

    fn metadata(&self) -> &Metadata {
        &self.metadata
    }
}

/// Stable textual identity of an acquisition group, e.g. `sub-01_task-rest_bold`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(String);

impl GroupId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for GroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered, non-empty set of scan records that describe one logical
/// acquisition (repeated runs and echoes are folded into the same group).
#[derive(Debug, Clone)]
pub struct AcquisitionGroup<R = ScanFile> {
    id: GroupId,
    members: Vec<R>,
}

impl<R: ScanRecord> AcquisitionGroup<R> {
    /// Build a group from its members in discovery order.
    ///
    /// Fails when `members` is empty or when a member's datatype or suffix
    /// differs from the first member's.
    pub fn new(members: Vec<R>) -> Result<Self, DescribeError> {
        let first = members
            .first()
            .ok_or_else(|| DescribeError::InvalidValue {
                field: "members".into(),
                group: "<empty>".into(),
                message: "an acquisition group needs at least one scan".into(),
            })?;
        let id = GroupId::new(first.entities().group_label());
        let (datatype, suffix) = (first.entities().datatype(), first.entities().suffix());
        if let Some(stray) = members
            .iter()
            .find(|m| m.entities().datatype() != datatype || m.entities().suffix() != suffix)
        {
            return Err(DescribeError::InvalidValue {
                field: "datatype".into(),
                group: id.to_string(),
                message: format!(
                    "{} does not share datatype '{}' and suffix '{}'",
                    stray.filename(),
                    datatype,
                    suffix
                ),
            });
        }
        Ok(Self { id, members })
    }

    pub fn id(&self) -> &GroupId {
        &self.id
    }

    /// First member; every group has one.
    pub fn first(&self) -> &R {
        &self.members[0]
    }

    pub fn members(&self) -> &[R] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Flat mapping from template slot name to value, built per acquisition group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DescriptionRecord(BTreeMap<String, serde_json::Value>);

impl DescriptionRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, slot: impl Into<String>, value: serde_json::Value) {
        self.0.insert(slot.into(), value);
    }

    pub fn get(&self, slot: &str) -> Option<&serde_json::Value> {
        self.0.get(slot)
    }

    pub fn get_str(&self, slot: &str) -> Option<&str> {
        self.0.get(slot).and_then(|v| v.as_str())
    }

    pub fn contains(&self, slot: &str) -> bool {
        self.0.contains_key(slot)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &serde_json::Value)> {
        self.0.iter()
    }

    /// Locale-free text form of a slot; `None` when absent or null.
    pub fn display(&self, slot: &str) -> Option<String> {
        match self.0.get(slot)? {
            serde_json::Value::Null => None,
            value => Some(display_value(value)),
        }
    }
}

impl From<BTreeMap<String, serde_json::Value>> for DescriptionRecord {
    fn from(map: BTreeMap<String, serde_json::Value>) -> Self {
        Self(map)
    }
}

/// Render a JSON value as plain text without locale-specific formatting.
pub fn display_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Array(items) => items
            .iter()
            .map(display_value)
            .collect::<Vec<_>>()
            .join(", "),
        serde_json::Value::Object(_) => value.to_string(),
    }
}

/// Imaging modality selected for an acquisition group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modality {
    Functional,
    Structural,
    Diffusion,
    FieldMap,
    Meg,
    Pet,
}

impl std::fmt::Display for Modality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Modality::Functional => write!(f, "functional"),
            Modality::Structural => write!(f, "structural"),
            Modality::Diffusion => write!(f, "diffusion"),
            Modality::FieldMap => write!(f, "field map"),
            Modality::Meg => write!(f, "MEG"),
            Modality::Pet => write!(f, "PET"),
        }
    }
}

/// Rendered paragraph for one acquisition group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSection {
    pub group: GroupId,
    pub modality: Modality,
    pub text: String,
}

/// Classification of a per-group problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    UnsupportedModality,
    MissingRequiredField,
    InvalidValue,
    Image,
    Io,
    Render,
}

impl DiagnosticKind {
    /// Unsupported modalities are warnings; every other kind is a failure.
    pub fn is_warning(&self) -> bool {
        matches!(self, DiagnosticKind::UnsupportedModality)
    }
}

/// A problem attributed to one acquisition group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupDiagnostic {
    pub group: GroupId,
    pub kind: DiagnosticKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub message: String,
}

impl From<&DescribeError> for GroupDiagnostic {
    fn from(err: &DescribeError) -> Self {
        let kind = match err {
            DescribeError::MissingRequiredField { .. } => DiagnosticKind::MissingRequiredField,
            DescribeError::UnsupportedModality { .. } => DiagnosticKind::UnsupportedModality,
            DescribeError::InvalidValue { .. } => DiagnosticKind::InvalidValue,
            DescribeError::Image { .. } => DiagnosticKind::Image,
            DescribeError::Io { .. } => DiagnosticKind::Io,
        };
        GroupDiagnostic {
            group: GroupId::new(err.group()),
            kind,
            field: err.field().map(str::to_string),
            message: match err {
                DescribeError::UnsupportedModality { reason, .. } => reason.clone(),
                other => other.to_string(),
            },
        }
    }
}
