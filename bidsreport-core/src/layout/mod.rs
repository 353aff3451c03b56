//! Dataset layout: discovery of scan files, sidecar resolution and grouping.
//!
//! [`BidsLayout`] indexes a BIDS dataset on disk once; afterwards it is a
//! read-only view shared by reference with every description builder.

pub mod entities;
pub mod sidecar;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use crate::config::ReportConfig;
use crate::error::LayoutError;
use crate::types::{AcquisitionGroup, ScanFile, ScanRecord};

pub use entities::{parse_filename, split_extension};
pub use sidecar::SidecarIndex;

/// Read-only query surface of an indexed dataset.
pub trait DatasetLayout {
    /// Every indexed data file in discovery order.
    fn records(&self) -> &[ScanFile];

    /// Data file whose name is exactly `name`.
    fn find_by_filename(&self, name: &str) -> Option<&ScanFile> {
        self.records().iter().find(|r| r.filename() == name)
    }
}

/// An indexed BIDS dataset.
#[derive(Debug, Clone)]
pub struct BidsLayout {
    root: PathBuf,
    records: Vec<ScanFile>,
}

impl BidsLayout {
    /// Index `root` with the default configuration.
    pub fn index(root: &Path) -> Result<Self, LayoutError> {
        Self::index_with(root, &ReportConfig::default())
    }

    /// Index `root`, honouring the configured data extensions and skipped directories.
    pub fn index_with(root: &Path, config: &ReportConfig) -> Result<Self, LayoutError> {
        if !root.is_dir() {
            return Err(LayoutError::RootNotFound {
                path: root.to_path_buf(),
            });
        }

        let mut sidecars = SidecarIndex::new();
        let mut data_files: Vec<PathBuf> = Vec::new();

        let walker = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !is_skipped(entry, &config.skip_dirs));
        for entry in walker {
            let entry = entry.map_err(|e| LayoutError::Walk {
                message: e.to_string(),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy();
            if name.ends_with(".json") {
                sidecars.insert(entry.path())?;
            } else if config
                .data_extensions
                .iter()
                .any(|ext| name.ends_with(ext.as_str()))
            {
                data_files.push(entry.path().to_path_buf());
            }
        }

        let mut records = Vec::with_capacity(data_files.len());
        for path in data_files {
            let Some(record) = scan_file(root, &path, &sidecars) else {
                tracing::debug!(path = %path.display(), "Skipping file with non-BIDS name");
                continue;
            };
            records.push(record);
        }

        tracing::debug!(
            root = %root.display(),
            files = records.len(),
            sidecars = sidecars.len(),
            "Indexed dataset"
        );
        Ok(Self {
            root: root.to_path_buf(),
            records,
        })
    }

    /// Build a layout from records that are already resolved.
    pub fn from_records(root: impl Into<PathBuf>, records: Vec<ScanFile>) -> Self {
        Self {
            root: root.into(),
            records,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Subject labels, sorted.
    pub fn subjects(&self) -> Vec<String> {
        self.records
            .iter()
            .filter_map(|r| r.entities.subject())
            .map(str::to_string)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Session labels, sorted, optionally restricted to one subject.
    pub fn sessions(&self, subject: Option<&str>) -> Vec<String> {
        self.records
            .iter()
            .filter(|r| subject.is_none_or(|s| r.entities.subject() == Some(s)))
            .filter_map(|r| r.entities.session())
            .map(str::to_string)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Data files matching the subject and session filters, in discovery order.
    pub fn data_files(&self, subject: Option<&str>, session: Option<&str>) -> Vec<ScanFile> {
        self.records
            .iter()
            .filter(|r| subject.is_none_or(|s| r.entities.subject() == Some(s)))
            .filter(|r| session.is_none_or(|s| r.entities.session() == Some(s)))
            .cloned()
            .collect()
    }
}

impl DatasetLayout for BidsLayout {
    fn records(&self) -> &[ScanFile] {
        &self.records
    }
}

fn is_skipped(entry: &DirEntry, skip_dirs: &[String]) -> bool {
    if entry.depth() == 0 {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    if name.starts_with('.') {
        return true;
    }
    entry.depth() == 1 && entry.file_type().is_dir() && skip_dirs.iter().any(|d| *d == name)
}

fn scan_file(root: &Path, path: &Path, sidecars: &SidecarIndex) -> Option<ScanFile> {
    let name = path.file_name()?.to_str()?;
    let mut entities = parse_filename(name)?;
    if let Some(parent) = path.parent().filter(|p| *p != root)
        && let Some(dir) = parent.file_name().and_then(|d| d.to_str())
        && !dir.starts_with("sub-")
        && !dir.starts_with("ses-")
    {
        entities.datatype = Some(dir.to_string());
    }
    let metadata = sidecars.resolve(root, path, &entities);
    Some(ScanFile::new(path, entities, metadata))
}

/// Group records that share every entity except run and echo.
///
/// Groups appear in the order of their first member, and members keep their
/// relative order.
pub fn group_associated<R: ScanRecord>(records: Vec<R>) -> Vec<AcquisitionGroup<R>> {
    let mut buckets: Vec<((String, String), Vec<R>)> = Vec::new();
    for record in records {
        let key = (
            record.entities().datatype().to_string(),
            record.entities().group_label(),
        );
        match buckets.iter_mut().find(|(k, _)| *k == key) {
            Some((_, members)) => members.push(record),
            None => buckets.push((key, vec![record])),
        }
    }
    buckets
        .into_iter()
        .filter_map(|(_, members)| AcquisitionGroup::new(members).ok())
        .collect()
}
