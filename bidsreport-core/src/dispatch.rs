//! Modality classification and per-group dispatch.

use crate::describe::{self, BuildContext};
use crate::error::DescribeError;
use crate::types::{
    AcquisitionGroup, DescriptionRecord, GroupDiagnostic, GroupId, Modality, ScanRecord,
};

/// Datatypes that are recognised but have no MRI description yet.
pub const UNSUPPORTED_DATATYPES: [&str; 8] = [
    "eeg",
    "meg",
    "pet",
    "ieeg",
    "beh",
    "perf",
    "fnirs",
    "microscopy",
];

/// Why a group has no description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unsupported {
    /// A known BIDS datatype without a builder.
    Datatype(String),
    /// Anything else; carries the file name of the first member.
    File(String),
}

impl std::fmt::Display for Unsupported {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Unsupported::Datatype(datatype) => write!(f, "{datatype} not yet supported."),
            Unsupported::File(filename) => write!(f, "{filename} not yet supported."),
        }
    }
}

/// Pick the modality of a group from its first record.
pub fn classify<R: ScanRecord>(first: &R) -> Result<Modality, Unsupported> {
    let entities = first.entities();
    match (entities.datatype(), entities.suffix()) {
        ("func", _) => Ok(Modality::Functional),
        ("anat", suffix) if suffix.ends_with('w') => Ok(Modality::Structural),
        ("dwi", _) => Ok(Modality::Diffusion),
        ("fmap", "phasediff") => Ok(Modality::FieldMap),
        (datatype, _) if UNSUPPORTED_DATATYPES.contains(&datatype) => {
            Err(Unsupported::Datatype(datatype.to_string()))
        }
        _ => Err(Unsupported::File(first.filename())),
    }
}

/// Result of describing one acquisition group.
#[derive(Debug, Clone, PartialEq)]
pub enum GroupOutcome {
    Described {
        group: GroupId,
        modality: Modality,
        record: DescriptionRecord,
    },
    /// Modality without a builder; a warning, not a failure.
    Skipped(GroupDiagnostic),
    /// The builder failed for this group only.
    Failed(GroupDiagnostic),
}

impl GroupOutcome {
    pub fn diagnostic(&self) -> Option<&GroupDiagnostic> {
        match self {
            GroupOutcome::Described { .. } => None,
            GroupOutcome::Skipped(d) | GroupOutcome::Failed(d) => Some(d),
        }
    }
}

/// Classify a group and run the matching builder.
pub fn describe_group<R: ScanRecord>(
    group: &AcquisitionGroup<R>,
    ctx: &BuildContext<'_>,
) -> GroupOutcome {
    let modality = match classify(group.first()) {
        Ok(modality) => modality,
        Err(unsupported) => {
            tracing::warn!(group = %group.id(), "{unsupported}");
            let err = DescribeError::UnsupportedModality {
                group: group.id().to_string(),
                reason: unsupported.to_string(),
            };
            return GroupOutcome::Skipped(GroupDiagnostic::from(&err));
        }
    };

    let result = match modality {
        Modality::Functional => describe::describe_func(group, ctx),
        Modality::Structural => describe::describe_anat(group, ctx),
        Modality::Diffusion => describe::describe_dwi(group, ctx),
        Modality::FieldMap => describe::describe_fmap(group, ctx),
        Modality::Meg => describe::describe_meg(group, ctx),
        Modality::Pet => describe::describe_pet(group, ctx),
    };

    match result {
        Ok(record) => {
            tracing::debug!(group = %group.id(), %modality, slots = record.len(), "Described group");
            GroupOutcome::Described {
                group: group.id().clone(),
                modality,
                record,
            }
        }
        Err(err) => {
            tracing::warn!(group = %group.id(), error = %err, "Failed to describe group");
            GroupOutcome::Failed(GroupDiagnostic::from(&err))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Vocabulary;
    use crate::image::{FixedGeometryReader, ImageGeometry};
    use crate::layout::BidsLayout;
    use crate::types::{DiagnosticKind, Entities, Metadata, ScanFile};

    fn file(datatype: &str, suffix: &str, name: &str) -> ScanFile {
        ScanFile::new(
            format!("sub-01/{datatype}/{name}"),
            Entities::new()
                .with("sub", "01")
                .with_datatype(datatype)
                .with_suffix(suffix),
            Metadata::new(),
        )
    }

    #[test]
    fn test_classify_rules() {
        let cases = [
            ("func", "bold", Ok(Modality::Functional)),
            ("func", "sbref", Ok(Modality::Functional)),
            ("anat", "T1w", Ok(Modality::Structural)),
            ("anat", "T2w", Ok(Modality::Structural)),
            ("dwi", "dwi", Ok(Modality::Diffusion)),
            ("fmap", "phasediff", Ok(Modality::FieldMap)),
            ("meg", "meg", Err(Unsupported::Datatype("meg".into()))),
            ("pet", "pet", Err(Unsupported::Datatype("pet".into()))),
        ];
        for (datatype, suffix, expected) in cases {
            let f = file(datatype, suffix, &format!("sub-01_{suffix}.nii.gz"));
            assert_eq!(classify(&f), expected, "{datatype}/{suffix}");
        }
    }

    #[test]
    fn test_classify_falls_back_to_filename() {
        let flair = file("anat", "FLAIR", "sub-01_FLAIR.nii.gz");
        assert_eq!(
            classify(&flair),
            Err(Unsupported::File("sub-01_FLAIR.nii.gz".into()))
        );
        let epi = file("fmap", "epi", "sub-01_dir-AP_epi.nii.gz");
        assert_eq!(
            classify(&epi).unwrap_err().to_string(),
            "sub-01_dir-AP_epi.nii.gz not yet supported."
        );
    }

    #[test]
    fn test_describe_group_outcomes() {
        let vocab = Vocabulary::default();
        let images = FixedGeometryReader::new()
            .with_fallback(ImageGeometry::new(vec![256, 256, 176], vec![1.0, 1.0, 1.0]));
        let layout = BidsLayout::from_records("/data", vec![]);
        let ctx = BuildContext::new(&vocab, &images, &layout);

        let meg = AcquisitionGroup::new(vec![file("meg", "meg", "sub-01_meg.fif")]).unwrap();
        let outcome = describe_group(&meg, &ctx);
        assert!(matches!(outcome, GroupOutcome::Skipped(_)));
        let skipped = outcome.diagnostic().unwrap();
        assert_eq!(skipped.kind, DiagnosticKind::UnsupportedModality);
        assert_eq!(skipped.message, "meg not yet supported.");
        assert_eq!(skipped.group.as_str(), "sub-01_meg");
        assert_eq!(skipped.field, None);

        let t1 = AcquisitionGroup::new(vec![file("anat", "T1w", "sub-01_T1w.nii.gz")]).unwrap();
        let outcome = describe_group(&t1, &ctx);
        let diagnostic = match outcome {
            GroupOutcome::Failed(d) => d,
            other => panic!("expected failure, got {other:?}"),
        };
        assert_eq!(diagnostic.kind, DiagnosticKind::MissingRequiredField);
        assert_eq!(diagnostic.field.as_deref(), Some("RepetitionTime"));
        assert_eq!(diagnostic.group.as_str(), "sub-01_T1w");

        let mut good = file("anat", "T1w", "sub-01_T1w.nii.gz");
        good.metadata
            .insert("RepetitionTime".into(), serde_json::json!(2.3));
        let group = AcquisitionGroup::new(vec![good]).unwrap();
        assert!(matches!(
            describe_group(&group, &ctx),
            GroupOutcome::Described { modality: Modality::Structural, .. }
        ));
    }
}
