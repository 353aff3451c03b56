//! Description-record builders.
//!
//! Each builder turns one [`AcquisitionGroup`] into a flat
//! [`DescriptionRecord`] of template slots. Records are assembled by a
//! [`RecordBuilder`] in three layers applied in a fixed order:
//!
//! 1. sentinel defaults (`UNKNOWN`, `MANUFACTURER`, ...) for optional fields,
//! 2. raw sidecar metadata passed through unchanged,
//! 3. computed fields, which always win on key collision.
//!
//! Which metadata keys are mandatory and which fall back to a sentinel is
//! declared once per modality as a [`FieldSchema`].

mod anat;
mod common;
mod dwi;
mod fmap;
mod func;
mod meg;

pub use anat::describe_anat;
pub use common::{DEVICE_FIELDS, MRI_FIELDS, common_record, device_defaults};
pub use dwi::describe_dwi;
pub use fmap::{FMAP_FIELDS, describe_fmap};
pub use func::describe_func;
pub use meg::{describe_meg, describe_pet};

use serde_json::Value;

use crate::config::Vocabulary;
use crate::error::DescribeError;
use crate::image::{ImageGeometry, ImageReader};
use crate::layout::DatasetLayout;
use crate::types::{AcquisitionGroup, DescriptionRecord, Metadata, ScanRecord};

/// Optional metadata field copied into a slot, or replaced by a sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionalField {
    pub slot: &'static str,
    pub key: &'static str,
    pub sentinel: &'static str,
}

/// Required and optional metadata of one modality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSchema {
    pub required: &'static [&'static str],
    pub optional: &'static [OptionalField],
}

impl FieldSchema {
    /// Fail with the first required key absent from `metadata`.
    pub fn check_required(&self, group: &str, metadata: &Metadata) -> Result<(), DescribeError> {
        match self.required.iter().find(|key| !metadata.contains_key(**key)) {
            Some(key) => Err(DescribeError::MissingRequiredField {
                field: key.to_string(),
                group: group.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Put every optional field on the builder: the sentinel as default and the
    /// metadata value, when present, as a computed field.
    pub fn apply_optional(&self, builder: &mut RecordBuilder, metadata: &Metadata) {
        for field in self.optional {
            builder.sentinel(field.slot, field.sentinel);
            if let Some(value) = metadata.get(field.key).filter(|v| !v.is_null()) {
                builder.computed(field.slot, value.clone());
            }
        }
    }
}

/// Layered assembly of a [`DescriptionRecord`].
#[derive(Debug, Clone, Default)]
pub struct RecordBuilder {
    sentinels: DescriptionRecord,
    raw: Metadata,
    computed: DescriptionRecord,
}

impl RecordBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Default used when nothing later provides the slot.
    pub fn sentinel(&mut self, slot: &str, value: impl Into<Value>) -> &mut Self {
        self.sentinels.insert(slot, value.into());
        self
    }

    /// Pass raw metadata through under its own keys.
    pub fn raw(&mut self, metadata: &Metadata) -> &mut Self {
        for (key, value) in metadata {
            self.raw.insert(key.clone(), value.clone());
        }
        self
    }

    /// Derived value; takes precedence over raw and sentinel layers.
    pub fn computed(&mut self, slot: &str, value: impl Into<Value>) -> &mut Self {
        self.computed.insert(slot, value.into());
        self
    }

    pub fn build(self) -> DescriptionRecord {
        let mut record = self.sentinels;
        for (key, value) in self.raw {
            record.insert(key, value);
        }
        for (key, value) in self.computed.iter() {
            record.insert(key.clone(), value.clone());
        }
        record
    }
}

/// Read-only collaborators shared by every builder call.
#[derive(Clone, Copy)]
pub struct BuildContext<'a> {
    pub vocabulary: &'a Vocabulary,
    pub images: &'a dyn ImageReader,
    pub layout: &'a dyn DatasetLayout,
}

impl<'a> BuildContext<'a> {
    pub fn new(
        vocabulary: &'a Vocabulary,
        images: &'a dyn ImageReader,
        layout: &'a dyn DatasetLayout,
    ) -> Self {
        Self {
            vocabulary,
            images,
            layout,
        }
    }

    /// Geometry of one member, with failures attributed to the group.
    pub fn geometry<R: ScanRecord>(
        &self,
        group: &AcquisitionGroup<R>,
        record: &R,
    ) -> Result<ImageGeometry, DescribeError> {
        self.images
            .read(record.path())
            .map_err(|source| DescribeError::Image {
                group: group.id().to_string(),
                source,
            })
    }

    /// Geometry of every member, in member order.
    pub fn geometries<R: ScanRecord>(
        &self,
        group: &AcquisitionGroup<R>,
    ) -> Result<Vec<ImageGeometry>, DescribeError> {
        group
            .members()
            .iter()
            .map(|record| self.geometry(group, record))
            .collect()
    }
}

/// Numeric metadata value that must be present.
pub(crate) fn required_number(
    group: &str,
    metadata: &Metadata,
    key: &str,
) -> Result<f64, DescribeError> {
    let value = metadata
        .get(key)
        .ok_or_else(|| DescribeError::MissingRequiredField {
            field: key.to_string(),
            group: group.to_string(),
        })?;
    value.as_f64().ok_or_else(|| DescribeError::InvalidValue {
        field: key.to_string(),
        group: group.to_string(),
        message: format!("expected a number, found {value}"),
    })
}

/// `One run`, `Two runs`, ...
pub(crate) fn runs_text(count: usize) -> String {
    let noun = if count == 1 { "run" } else { "runs" };
    format!(
        "{} {noun}",
        crate::normalize::capitalize(&crate::normalize::number_to_words(count as u64))
    )
}

/// Suffix with a literal trailing `w` expanded: `T1w` becomes `T1-weighted`.
pub fn scan_type(suffix: &str) -> String {
    match suffix.strip_suffix('w') {
        Some(stem) => format!("{stem}-weighted"),
        None => suffix.to_string(),
    }
}
