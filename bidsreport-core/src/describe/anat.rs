//! Structural description builder.

use super::common::{common_record, echo_time};
use super::{BuildContext, runs_text, scan_type};
use crate::error::DescribeError;
use crate::normalize;
use crate::types::{AcquisitionGroup, DescriptionRecord, ScanRecord};

/// Describe a structural (`*w`) acquisition group.
pub fn describe_anat<R: ScanRecord>(
    group: &AcquisitionGroup<R>,
    ctx: &BuildContext<'_>,
) -> Result<DescriptionRecord, DescribeError> {
    let metadata = group.first().metadata();
    let (mut builder, _) = common_record(group, ctx)?;
    let nb_runs = normalize::run_count(&normalize::run_set(group.members()));

    builder
        .computed("echo_time", echo_time(group))
        .computed("slice_order", normalize::slice_order(metadata))
        .computed("nb_runs", nb_runs)
        .computed("nb_runs_text", runs_text(nb_runs))
        .computed("multi_echo", normalize::multi_echo(group.members()))
        .computed("scan_type", scan_type(group.first().entities().suffix()));

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

    #[test]
    fn test_describe_t1w() {
        let file = ScanFile::new(
            "sub-01/anat/sub-01_T1w.nii.gz",
            Entities::new()
                .with("sub", "01")
                .with_datatype("anat")
                .with_suffix("T1w"),
            json!({"RepetitionTime": 2.3, "EchoTime": 0.00298, "FlipAngle": 9})
                .as_object()
                .cloned()
                .unwrap(),
        );
        let group = AcquisitionGroup::new(vec![file]).unwrap();
        let vocab = Vocabulary::default();
        let images = FixedGeometryReader::new()
            .with_fallback(ImageGeometry::new(vec![256, 256, 176], vec![1.0, 1.0, 1.0]));
        let layout = BidsLayout::from_records("/data", vec![]);
        let record = describe_anat(&group, &BuildContext::new(&vocab, &images, &layout)).unwrap();

        assert_eq!(record.get_str("scan_type"), Some("T1-weighted"));
        assert_eq!(record.get_str("echo_time"), Some("2.98"));
        assert_eq!(record.get_str("slice_order"), Some(""));
        assert_eq!(record.get_str("nb_runs_text"), Some("One run"));
        assert_eq!(record.get("nb_slices"), Some(&json!(176)));
        assert_eq!(record.get_str("multi_echo"), Some("single-echo"));
    }
}
