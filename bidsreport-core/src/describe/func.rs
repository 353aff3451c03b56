//! Functional (BOLD) description builder.

use super::common::{common_record, device_defaults, echo_time};
use super::{BuildContext, required_number, runs_text, scan_type};
use crate::error::DescribeError;
use crate::normalize;
use crate::types::{AcquisitionGroup, DescriptionRecord, ScanRecord};

/// Describe a functional acquisition group.
///
/// The task name comes from the `TaskName` metadata when present and from the
/// `task` entity otherwise; a group with neither fails.
pub fn describe_func<R: ScanRecord>(
    group: &AcquisitionGroup<R>,
    ctx: &BuildContext<'_>,
) -> Result<DescriptionRecord, DescribeError> {
    let id = group.id().as_str();
    let first = group.first();
    let metadata = first.metadata();

    let (mut builder, _) = common_record(group, ctx)?;
    let tr = required_number(id, metadata, "RepetitionTime")?;
    let task_name = metadata
        .get("TaskName")
        .and_then(|v| v.as_str())
        .or(first.entities().task())
        .ok_or_else(|| DescribeError::MissingRequiredField {
            field: "TaskName".into(),
            group: id.to_string(),
        })?;
    let geometries = ctx.geometries(group)?;
    let runs = normalize::run_set(group.members());
    let nb_runs = normalize::run_count(&runs);

    device_defaults(&mut builder, metadata);
    builder
        .computed("echo_time", echo_time(group))
        .computed("slice_order", normalize::slice_order(metadata))
        .computed("multiband_factor", normalize::multiband_factor(metadata))
        .computed("inplane_accel", normalize::inplane_accel(metadata))
        .computed("acceleration", normalize::acceleration(metadata))
        .computed("nb_runs", nb_runs)
        .computed("nb_runs_text", runs_text(nb_runs))
        .computed("task_name", task_name)
        .computed("multi_echo", normalize::multi_echo(group.members()))
        .computed("nb_vols", normalize::volume_range(&geometries))
        .computed("total_vols", normalize::volume_count(&geometries))
        .computed("duration", normalize::duration(&geometries, tr))
        .computed("scan_type", scan_type(first.entities().suffix()));

    tracing::debug!(group = %group.id(), runs = nb_runs, "Described functional group");
    Ok(builder.build())
}
