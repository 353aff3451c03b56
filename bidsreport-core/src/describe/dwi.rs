//! Diffusion description builder.

use super::common::{common_record, echo_time};
use super::{BuildContext, runs_text};
use crate::error::DescribeError;
use crate::normalize;
use crate::types::{AcquisitionGroup, DescriptionRecord, ScanRecord};

/// Describe a diffusion acquisition group.
///
/// b-values are read from the `.bval` file next to the first member. The
/// direction count is the size of the image's fourth axis, so a 3-D image is
/// rejected.
pub fn describe_dwi<R: ScanRecord>(
    group: &AcquisitionGroup<R>,
    ctx: &BuildContext<'_>,
) -> Result<DescriptionRecord, DescribeError> {
    let id = group.id().as_str();
    let first = group.first();
    let metadata = first.metadata();
    let (mut builder, geometry) = common_record(group, ctx)?;

    let dmri_dir = geometry.dim(3).ok_or_else(|| DescribeError::InvalidValue {
        field: "dmri_dir".into(),
        group: id.to_string(),
        message: format!("image has {} dimensions, expected 4", geometry.ndim()),
    })?;

    let bval_path =
        normalize::bval_path(first.path()).ok_or_else(|| DescribeError::InvalidValue {
            field: "bvals".into(),
            group: id.to_string(),
            message: format!("{} is not a NIfTI file", first.path().display()),
        })?;
    let bvals = normalize::bvals(&bval_path).map_err(|source| DescribeError::Io {
        group: id.to_string(),
        path: bval_path.clone(),
        source,
    })?;
    let nb_runs = normalize::run_count(&normalize::run_set(group.members()));

    builder
        .computed("echo_time", echo_time(group))
        .computed("nb_runs", nb_runs)
        .computed("nb_runs_text", runs_text(nb_runs))
        .computed("bvals", bvals)
        .computed("dmri_dir", dmri_dir)
        .computed("multiband_factor", normalize::multiband_factor(metadata))
        .computed("acceleration", normalize::acceleration(metadata));

    Ok(builder.build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Vocabulary;
    use crate::image::{FixedGeometryReader, ImageGeometry};
    use crate::layout::BidsLayout;
    use crate::types::{Entities, ScanFile};
    use serde_json::json;

    fn dwi_group(path: &std::path::Path) -> AcquisitionGroup {
        let file = ScanFile::new(
            path,
            Entities::new()
                .with("sub", "01")
                .with_datatype("dwi")
                .with_suffix("dwi"),
            json!({"RepetitionTime": 8.4, "EchoTime": 0.089})
                .as_object()
                .cloned()
                .unwrap(),
        );
        AcquisitionGroup::new(vec![file]).unwrap()
    }

    #[test]
    fn test_describe_dwi() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("sub-01_dwi.nii.gz");
        std::fs::write(dir.path().join("sub-01_dwi.bval"), "0 1000 1000 2000 0\n").unwrap();

        let group = dwi_group(&image);
        let vocab = Vocabulary::default();
        let images = FixedGeometryReader::new()
            .with_fallback(ImageGeometry::new(vec![96, 96, 60, 65], vec![2.0, 2.0, 2.0, 8.4]));
        let layout = BidsLayout::from_records(dir.path(), vec![]);
        let record = describe_dwi(&group, &BuildContext::new(&vocab, &images, &layout)).unwrap();

        assert_eq!(record.get_str("bvals"), Some("0, 1000, and 2000"));
        assert_eq!(record.get("dmri_dir"), Some(&json!(65)));
        assert_eq!(record.get("tr"), Some(&json!(8400)));
        assert_eq!(record.get_str("echo_time"), Some("89"));
        assert_eq!(record.get_str("acceleration"), Some("no acceleration"));
    }

    #[test]
    fn test_three_dimensional_image_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("sub-01_dwi.nii.gz");
        std::fs::write(dir.path().join("sub-01_dwi.bval"), "0 1000").unwrap();

        let group = dwi_group(&image);
        let vocab = Vocabulary::default();
        let images = FixedGeometryReader::new()
            .with_fallback(ImageGeometry::new(vec![96, 96, 60], vec![2.0, 2.0, 2.0]));
        let layout = BidsLayout::from_records(dir.path(), vec![]);
        let err = describe_dwi(&group, &BuildContext::new(&vocab, &images, &layout)).unwrap_err();
        assert!(matches!(err, DescribeError::InvalidValue { ref field, .. } if field == "dmri_dir"));
    }

    #[test]
    fn test_missing_bval_file() {
        let dir = tempfile::tempdir().unwrap();
        let group = dwi_group(&dir.path().join("sub-01_dwi.nii.gz"));
        let vocab = Vocabulary::default();
        let images = FixedGeometryReader::new()
            .with_fallback(ImageGeometry::new(vec![96, 96, 60, 65], vec![2.0, 2.0, 2.0, 8.4]));
        let layout = BidsLayout::from_records(dir.path(), vec![]);
        let err = describe_dwi(&group, &BuildContext::new(&vocab, &images, &layout)).unwrap_err();
        assert!(matches!(err, DescribeError::Io { .. }));
    }
}
