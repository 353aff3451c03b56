//! Parameter normalizer.
//!
//! Pure functions turning raw sidecar metadata and image geometry into the
//! derived quantities quoted in a methods section. None of them fail on
//! missing optional metadata; they return empty text or `None` and leave the
//! sentinel policy to the description builders.

pub mod text;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::config::Vocabulary;
use crate::image::ImageGeometry;
use crate::layout::DatasetLayout;
use crate::types::{Metadata, ScanRecord};

pub use text::{
    capitalize, list_to_str, milli, num_to_str, number_to_words, numeric_value, ordinal_words,
};

/// Sentinel for absent optional metadata.
pub const UNKNOWN: &str = "UNKNOWN";
pub const UNKNOWN_SEQUENCE: &str = "UNKNOWN SEQUENCE";
pub const UNKNOWN_SEQUENCE_VARIANT: &str = "UNKNOWN SEQUENCE VARIANT";
pub const UNKNOWN_PHASE_ENCODING: &str = "UNKNOWN PHASE ENCODING";

fn number(metadata: &Metadata, key: &str) -> Option<f64> {
    metadata.get(key).and_then(|v| v.as_f64())
}

/// In-plane field of view in millimetres, e.g. `192x192`.
pub fn field_of_view(geometry: &ImageGeometry) -> String {
    geometry
        .shape
        .iter()
        .zip(&geometry.zooms)
        .take(2)
        .map(|(n, zoom)| num_to_str(*n as f64 * zoom))
        .collect::<Vec<_>>()
        .join("x")
}

/// In-plane matrix, e.g. `64x64`.
pub fn matrix_size(geometry: &ImageGeometry) -> String {
    geometry
        .shape
        .iter()
        .take(2)
        .map(|n| n.to_string())
        .collect::<Vec<_>>()
        .join("x")
}

/// Spatial voxel size in millimetres, e.g. `3x3x4`.
pub fn voxel_size(geometry: &ImageGeometry) -> String {
    geometry
        .zooms
        .iter()
        .take(3)
        .map(|z| num_to_str(*z))
        .collect::<Vec<_>>()
        .join("x")
}

/// Names of the `SequenceVariant` codes. Unknown codes keep a placeholder.
pub fn sequence_variants(metadata: &Metadata, vocabulary: &Vocabulary) -> String {
    let codes = metadata
        .get("SequenceVariant")
        .and_then(|v| v.as_str())
        .unwrap_or("");
    let mut names: Vec<&str> = Vec::new();
    for code in codes.split('_') {
        let name = vocabulary
            .variant(code)
            .unwrap_or(UNKNOWN_SEQUENCE_VARIANT);
        if !names.contains(&name) {
            names.push(name);
        }
    }
    list_to_str(&names)
}

/// Names of the `ScanningSequence` codes followed by the codes themselves,
/// e.g. `echo planar (EP)`.
pub fn sequence_name(metadata: &Metadata, vocabulary: &Vocabulary) -> String {
    let raw = metadata
        .get("ScanningSequence")
        .and_then(|v| v.as_str())
        .unwrap_or("");
    let codes: Vec<&str> = raw.split('_').filter(|c| !c.is_empty()).collect();
    let names: Vec<&str> = codes
        .iter()
        .filter_map(|code| vocabulary.sequence(code))
        .collect();
    if names.is_empty() {
        return UNKNOWN_SEQUENCE.to_string();
    }
    format!("{} ({})", list_to_str(&names), codes.join("/"))
}

fn echo_times<R: ScanRecord>(records: &[R]) -> Vec<f64> {
    let mut times: Vec<f64> = records
        .iter()
        .filter_map(|r| number(r.metadata(), "EchoTime"))
        .collect();
    times.sort_by(|a, b| a.total_cmp(b));
    times.dedup();
    times
}

/// Distinct echo times of the group in milliseconds, e.g. `15, 30, and 45`.
/// `None` when no member declares `EchoTime`.
pub fn echo_time_ms<R: ScanRecord>(records: &[R]) -> Option<String> {
    let times = echo_times(records);
    if times.is_empty() {
        return None;
    }
    let ms: Vec<String> = times.iter().map(|t| num_to_str(milli(*t))).collect();
    Some(list_to_str(&ms))
}

/// `multi-echo` when the group spans more than one echo time.
pub fn multi_echo<R: ScanRecord>(records: &[R]) -> &'static str {
    if echo_times(records).len() > 1 {
        "multi-echo"
    } else {
        "single-echo"
    }
}

/// Slice acquisition order inferred from slice timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliceOrder {
    SequentialAscending,
    SequentialDescending,
    InterleavedAscending,
    InterleavedDescending,
}

impl std::fmt::Display for SliceOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SliceOrder::SequentialAscending => write!(f, "sequential ascending"),
            SliceOrder::SequentialDescending => write!(f, "sequential descending"),
            SliceOrder::InterleavedAscending => write!(f, "interleaved ascending"),
            SliceOrder::InterleavedDescending => write!(f, "interleaved descending"),
        }
    }
}

/// Classify slice timing. Repeated times (simultaneous multiband slices) are
/// collapsed before the acquisition order is derived.
pub fn classify_slice_timing(slice_times: &[f64]) -> SliceOrder {
    let mut distinct: Vec<f64> = Vec::with_capacity(slice_times.len());
    for t in slice_times {
        if !distinct.contains(t) {
            distinct.push(*t);
        }
    }
    let mut order: Vec<usize> = (0..distinct.len()).collect();
    order.sort_by(|a, b| distinct[*a].total_cmp(&distinct[*b]));

    if order.iter().enumerate().all(|(i, o)| i == *o) {
        SliceOrder::SequentialAscending
    } else if order.iter().rev().enumerate().all(|(i, o)| i == *o) {
        SliceOrder::SequentialDescending
    } else if order[0] < order[1] {
        SliceOrder::InterleavedAscending
    } else {
        SliceOrder::InterleavedDescending
    }
}

/// ` in <order> order` when `SliceTiming` is present, else empty.
pub fn slice_order(metadata: &Metadata) -> String {
    let Some(times) = metadata.get("SliceTiming").and_then(|v| v.as_array()) else {
        return String::new();
    };
    let times: Vec<f64> = times.iter().filter_map(|t| t.as_f64()).collect();
    if times.is_empty() {
        return String::new();
    }
    format!(" in {} order", classify_slice_timing(&times))
}

/// `MB factor=N` when multiband acceleration was used.
pub fn multiband_factor(metadata: &Metadata) -> String {
    match number(metadata, "MultibandAccelerationFactor") {
        Some(factor) if factor > 1.0 => format!("MB factor={}", num_to_str(factor)),
        _ => String::new(),
    }
}

/// `in-plane acceleration factor=N` when parallel imaging was used.
pub fn inplane_accel(metadata: &Metadata) -> String {
    match number(metadata, "ParallelReductionFactorInPlane") {
        Some(factor) if factor > 1.0 => {
            format!("in-plane acceleration factor={}", num_to_str(factor))
        }
        _ => String::new(),
    }
}

/// Combined acceleration text, `no acceleration` when neither kind applies.
pub fn acceleration(metadata: &Metadata) -> String {
    let parts: Vec<String> = [multiband_factor(metadata), inplane_accel(metadata)]
        .into_iter()
        .filter(|p| !p.is_empty())
        .collect();
    if parts.is_empty() {
        "no acceleration".to_string()
    } else {
        list_to_str(&parts)
    }
}

/// Distinct run indices of the group; a record without a run counts as run 1.
pub fn run_set<R: ScanRecord>(records: &[R]) -> BTreeSet<u32> {
    records
        .iter()
        .map(|r| r.entities().run().unwrap_or(1))
        .collect()
}

pub fn run_count(runs: &BTreeSet<u32>) -> usize {
    runs.len()
}

/// Total number of volumes across all images.
pub fn volume_count(geometries: &[ImageGeometry]) -> usize {
    geometries.iter().map(ImageGeometry::volumes).sum()
}

fn volume_bounds(geometries: &[ImageGeometry]) -> Option<(usize, usize)> {
    let min = geometries.iter().map(ImageGeometry::volumes).min()?;
    let max = geometries.iter().map(ImageGeometry::volumes).max()?;
    Some((min, max))
}

/// Volumes per run: `N` when every image agrees, else `min-max`.
pub fn volume_range(geometries: &[ImageGeometry]) -> String {
    match volume_bounds(geometries) {
        Some((min, max)) if min == max => min.to_string(),
        Some((min, max)) => format!("{min}-{max}"),
        None => String::new(),
    }
}

fn run_length(volumes: usize, tr_seconds: f64) -> String {
    let seconds = (volumes as f64 * tr_seconds).ceil() as u64;
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

/// Run length as `m:ss`, or `m:ss-m:ss` when runs differ in length.
pub fn duration(geometries: &[ImageGeometry], tr_seconds: f64) -> String {
    match volume_bounds(geometries) {
        Some((min, max)) if min == max => run_length(min, tr_seconds),
        Some((min, max)) => format!(
            "{}-{}",
            run_length(min, tr_seconds),
            run_length(max, tr_seconds)
        ),
        None => String::new(),
    }
}

/// Path of the b-value file next to a diffusion image. Only a trailing
/// `.nii.gz` or `.nii` is replaced; other paths have no b-value file.
pub fn bval_path(path: &Path) -> Option<PathBuf> {
    let text = path.to_str()?;
    let stem = text
        .strip_suffix(".nii.gz")
        .or_else(|| text.strip_suffix(".nii"))?;
    Some(PathBuf::from(format!("{stem}.bval")))
}

/// Distinct b-values from a `.bval` file, ascending, e.g. `0, 1000, and 2000`.
pub fn bvals(path: &Path) -> std::io::Result<String> {
    let content = std::fs::read_to_string(path)?;
    parse_bvals(&content).map_err(|message| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("{}: {message}", path.display()),
        )
    })
}

/// Parse whitespace separated b-values into their English listing.
pub fn parse_bvals(content: &str) -> Result<String, String> {
    let mut values: Vec<f64> = Vec::new();
    for token in content.split_whitespace() {
        let value: f64 = token
            .parse()
            .map_err(|_| format!("'{token}' is not a b-value"))?;
        values.push(value.round());
    }
    values.sort_by(|a, b| a.total_cmp(b));
    values.dedup();
    let listed: Vec<String> = values.iter().map(|v| num_to_str(*v)).collect();
    Ok(list_to_str(&listed))
}

/// The two field-map echo times of one sidecar, in seconds and in declared
/// order: `EchoTime1` then `EchoTime2`. A plain `EchoTime` stands in for
/// whichever of the two is absent, but only once. The error names the key
/// left unresolved.
pub fn fieldmap_echo_times(metadata: &Metadata) -> Result<(f64, f64), &'static str> {
    let mut fallback = number(metadata, "EchoTime");
    let te_1 = match number(metadata, "EchoTime1") {
        Some(te) => te,
        None => fallback.take().ok_or("EchoTime1")?,
    };
    let te_2 = number(metadata, "EchoTime2")
        .or(fallback)
        .ok_or("EchoTime2")?;
    Ok((te_1, te_2))
}

/// Scans a field map corrects, e.g. `first and second runs of the rest BOLD scan`.
///
/// Targets come from the `IntendedFor` metadata (string or list) and are
/// resolved by file name through the layout. Unresolvable targets are skipped.
pub fn intended_for_targets(metadata: &Metadata, layout: &dyn DatasetLayout) -> String {
    let targets: Vec<&str> = match metadata.get("IntendedFor") {
        Some(serde_json::Value::String(s)) => vec![s.as_str()],
        Some(serde_json::Value::Array(items)) => items.iter().filter_map(|v| v.as_str()).collect(),
        _ => return String::new(),
    };

    // Scan label to run numbers, in first-appearance order.
    let mut scans: Vec<(String, BTreeSet<u32>)> = Vec::new();
    for target in targets {
        let name = target.rsplit('/').next().unwrap_or(target);
        let Some(scan) = layout.find_by_filename(name) else {
            tracing::warn!(intended_for = %target, "IntendedFor target not found in dataset");
            continue;
        };
        let entities = scan.entities();
        let kind = entities.suffix().to_uppercase();
        let label = if kind == "BOLD" {
            let task = scan
                .metadata()
                .get("TaskName")
                .and_then(|v| v.as_str())
                .or(entities.task())
                .unwrap_or("");
            format!("{task} {kind} scan")
        } else {
            format!("{kind} scan")
        };
        let run = entities.run().unwrap_or(1);
        match scans.iter_mut().find(|(l, _)| *l == label) {
            Some((_, runs)) => {
                runs.insert(run);
            }
            None => scans.push((label, BTreeSet::from([run]))),
        }
    }

    let phrases: Vec<String> = scans
        .iter()
        .map(|(label, runs)| {
            let ordinals: Vec<String> = runs.iter().map(|r| ordinal_words(u64::from(*r))).collect();
            let plural = if runs.len() > 1 { "s" } else { "" };
            format!("{} run{plural} of the {label}", list_to_str(&ordinals))
        })
        .collect();
    list_to_str(&phrases)
}
