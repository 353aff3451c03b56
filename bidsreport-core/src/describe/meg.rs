//! Builders for modalities without voxel geometry.
//!
//! These skip the common MRI descriptor entirely: the record is the device
//! information with the raw metadata laid over it.

use super::BuildContext;
use super::common::device_defaults;
use super::RecordBuilder;
use crate::error::DescribeError;
use crate::types::{AcquisitionGroup, DescriptionRecord, ScanRecord};

fn passthrough<R: ScanRecord>(group: &AcquisitionGroup<R>) -> DescriptionRecord {
    let metadata = group.first().metadata();
    let mut device = RecordBuilder::new();
    device_defaults(&mut device, metadata);

    let mut builder = RecordBuilder::new();
    for (slot, value) in device.build().iter() {
        builder.sentinel(slot, value.clone());
    }
    builder.raw(metadata);
    builder.build()
}

/// Describe an MEG or EEG group.
pub fn describe_meg<R: ScanRecord>(
    group: &AcquisitionGroup<R>,
    _ctx: &BuildContext<'_>,
) -> Result<DescriptionRecord, DescribeError> {
    Ok(passthrough(group))
}

/// Describe a PET group.
pub fn describe_pet<R: ScanRecord>(
    group: &AcquisitionGroup<R>,
    _ctx: &BuildContext<'_>,
) -> Result<DescriptionRecord, DescribeError> {
    Ok(passthrough(group))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Vocabulary;
    use crate::image::FixedGeometryReader;
    use crate::layout::BidsLayout;
    use crate::types::{Entities, ScanFile};
    use serde_json::json;

    #[test]
    fn test_raw_metadata_wins_over_device_info() {
        let file = ScanFile::new(
            "sub-01/meg/sub-01_task-rest_meg.fif",
            Entities::new()
                .with("sub", "01")
                .with("task", "rest")
                .with_datatype("meg")
                .with_suffix("meg"),
            json!({
                "Manufacturer": "Elekta",
                "manufacturer": "raw",
                "SamplingFrequency": 1000
            })
            .as_object()
            .cloned()
            .unwrap(),
        );
        let group = AcquisitionGroup::new(vec![file]).unwrap();
        let vocab = Vocabulary::default();
        let images = FixedGeometryReader::new();
        let layout = BidsLayout::from_records("/data", vec![]);
        let record = describe_meg(&group, &BuildContext::new(&vocab, &images, &layout)).unwrap();

        assert_eq!(record.get_str("manufacturer"), Some("raw"));
        assert_eq!(record.get_str("model_name"), Some("MODEL"));
        assert_eq!(record.get("SamplingFrequency"), Some(&json!(1000)));
    }

    #[test]
    fn test_pet_needs_no_geometry() {
        let file = ScanFile::new(
            "sub-01/pet/sub-01_pet.nii.gz",
            Entities::new()
                .with("sub", "01")
                .with_datatype("pet")
                .with_suffix("pet"),
            json!({"TracerName": "FDG"}).as_object().cloned().unwrap(),
        );
        let group = AcquisitionGroup::new(vec![file]).unwrap();
        let vocab = Vocabulary::default();
        let images = FixedGeometryReader::new();
        let layout = BidsLayout::from_records("/data", vec![]);
        let record = describe_pet(&group, &BuildContext::new(&vocab, &images, &layout)).unwrap();
        assert_eq!(record.get_str("TracerName"), Some("FDG"));
        assert_eq!(record.get_str("manufacturer"), Some("MANUFACTURER"));
    }
}
