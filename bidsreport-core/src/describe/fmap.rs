//! Phase-difference field-map description builder.

use super::common::common_record;
use super::{BuildContext, FieldSchema};
use crate::error::DescribeError;
use crate::normalize;
use crate::types::{AcquisitionGroup, DescriptionRecord, ScanRecord};

/// Field-map metadata beyond the common descriptor.
pub const FMAP_FIELDS: FieldSchema = FieldSchema {
    required: &["PhaseEncodingDirection"],
    optional: &[],
};

/// Describe a `phasediff` field-map group.
///
/// Echo times are kept in seconds and taken from the first member. The
/// phase-encoding direction must be declared; an unknown code is reported
/// with a placeholder label.
pub fn describe_fmap<R: ScanRecord>(
    group: &AcquisitionGroup<R>,
    ctx: &BuildContext<'_>,
) -> Result<DescriptionRecord, DescribeError> {
    let id = group.id().as_str();
    let metadata = group.first().metadata();
    let (mut builder, _) = common_record(group, ctx)?;

    FMAP_FIELDS.check_required(id, metadata)?;
    let (te_1, te_2) = normalize::fieldmap_echo_times(metadata).map_err(|key| {
        DescribeError::MissingRequiredField {
            field: key.to_string(),
            group: id.to_string(),
        }
    })?;
    if group
        .members()
        .iter()
        .skip(1)
        .any(|member| normalize::fieldmap_echo_times(member.metadata()) != Ok((te_1, te_2)))
    {
        tracing::warn!(
            group = %group.id(),
            te_1,
            te_2,
            "Field-map runs declare different echo times; using the first run"
        );
    }
    let direction = metadata
        .get("PhaseEncodingDirection")
        .and_then(|v| v.as_str())
        .and_then(|code| ctx.vocabulary.direction(code))
        .unwrap_or(normalize::UNKNOWN_PHASE_ENCODING);

    let intended_for = normalize::intended_for_targets(metadata, ctx.layout);
    let intended_for_clause = if intended_for.is_empty() {
        String::new()
    } else {
        format!(" for the {intended_for}")
    };

    builder
        .computed("te_1", normalize::numeric_value(te_1))
        .computed("te_2", normalize::numeric_value(te_2))
        .computed("slice_order", normalize::slice_order(metadata))
        .computed("multiband_factor", normalize::multiband_factor(metadata))
        .computed("dir", direction)
        .computed("intended_for", intended_for)
        .computed("intended_for_clause", intended_for_clause);

    Ok(builder.build())
}
