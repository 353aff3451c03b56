//! Base record shared by every MRI modality, plus device information.

use super::{BuildContext, FieldSchema, OptionalField, RecordBuilder, required_number};
use crate::error::DescribeError;
use crate::image::ImageGeometry;
use crate::normalize;
use crate::types::{AcquisitionGroup, ScanRecord};

/// Fields of the common MRI descriptor.
pub const MRI_FIELDS: FieldSchema = FieldSchema {
    required: &["RepetitionTime"],
    optional: &[
        OptionalField {
            slot: "field_strength",
            key: "MagneticFieldStrength",
            sentinel: normalize::UNKNOWN,
        },
        OptionalField {
            slot: "flip_angle",
            key: "FlipAngle",
            sentinel: normalize::UNKNOWN,
        },
    ],
};

/// Scanner make and model.
pub const DEVICE_FIELDS: FieldSchema = FieldSchema {
    required: &[],
    optional: &[
        OptionalField {
            slot: "manufacturer",
            key: "Manufacturer",
            sentinel: "MANUFACTURER",
        },
        OptionalField {
            slot: "model_name",
            key: "ManufacturersModelName",
            sentinel: "MODEL",
        },
    ],
};

/// Start a record for an MRI group from its first member.
///
/// Returns the builder with sentinel, raw and common computed layers in place,
/// together with the first member's geometry so callers do not read it twice.
pub fn common_record<R: ScanRecord>(
    group: &AcquisitionGroup<R>,
    ctx: &BuildContext<'_>,
) -> Result<(RecordBuilder, ImageGeometry), DescribeError> {
    let id = group.id().as_str();
    let first = group.first();
    let metadata = first.metadata();

    MRI_FIELDS.check_required(id, metadata)?;
    let tr = required_number(id, metadata, "RepetitionTime")?;
    let geometry = ctx.geometry(group, first)?;

    let nb_slices = match metadata.get("SliceTiming").and_then(|v| v.as_array()) {
        Some(times) => times.len(),
        None => geometry
            .dim(2)
            .ok_or_else(|| DescribeError::InvalidValue {
                field: "nb_slices".into(),
                group: id.to_string(),
                message: format!("image has {} dimensions, expected at least 3", geometry.ndim()),
            })?,
    };

    let mut builder = RecordBuilder::new();
    builder.raw(metadata);
    MRI_FIELDS.apply_optional(&mut builder, metadata);
    builder
        .computed("tr", normalize::numeric_value(normalize::milli(tr)))
        .computed("fov", normalize::field_of_view(&geometry))
        .computed("matrix_size", normalize::matrix_size(&geometry))
        .computed("voxel_size", normalize::voxel_size(&geometry))
        .computed(
            "variants",
            normalize::sequence_variants(metadata, ctx.vocabulary),
        )
        .computed("seqs", normalize::sequence_name(metadata, ctx.vocabulary))
        .computed("nb_slices", nb_slices);

    Ok((builder, geometry))
}

/// Device layer of a builder: sentinels, overridden by the metadata values.
pub fn device_defaults(builder: &mut RecordBuilder, metadata: &crate::types::Metadata) {
    DEVICE_FIELDS.apply_optional(builder, metadata);
}

/// Echo time slot in milliseconds, `UNKNOWN` when no member declares one.
pub(crate) fn echo_time<R: ScanRecord>(group: &AcquisitionGroup<R>) -> String {
    normalize::echo_time_ms(group.members()).unwrap_or_else(|| normalize::UNKNOWN.to_string())
}
