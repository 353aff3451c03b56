//! Built-in fixed-format paragraphs.

use regex::Regex;
use std::sync::LazyLock;

use super::{ParagraphTemplate, Renderer};
use crate::error::RenderError;
use crate::types::DescriptionRecord;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z0-9_]+)\s*\}\}").expect("placeholder pattern is valid")
});

const ANAT: &str = "{{nb_runs_text}} of {{scan_type}} {{multi_echo}} {{variants}} {{seqs}} \
structural MRI data were collected ({{nb_slices}} slices{{slice_order}}; repetition time, \
TR={{tr}}ms; echo time, TE={{echo_time}}ms; flip angle, FA={{flip_angle}}°; field of view, \
FOV={{fov}}mm; matrix size={{matrix_size}}; voxel size={{voxel_size}}mm).";

const FUNC: &str = "{{nb_runs_text}} of {{task_name}} {{scan_type}} {{multi_echo}} {{variants}} \
{{seqs}} fMRI data were collected on a {{field_strength}}-Tesla {{manufacturer}} {{model_name}} scanner \
({{nb_slices}} slices{{slice_order}}; repetition time, TR={{tr}}ms; echo time, \
TE={{echo_time}}ms; flip angle, FA={{flip_angle}}°; field of view, FOV={{fov}}mm; matrix \
size={{matrix_size}}; voxel size={{voxel_size}}mm; {{acceleration}}). Each run was \
{{duration}} minutes in length, during which {{nb_vols}} functional volumes were acquired \
({{total_vols}} in total).";

const DWI: &str = "{{nb_runs_text}} of {{variants}} {{seqs}} diffusion-weighted (dMRI) data \
were collected ({{nb_slices}} slices; repetition time, TR={{tr}}ms; echo time, \
TE={{echo_time}}ms; flip angle, FA={{flip_angle}}°; field of view, FOV={{fov}}mm; matrix \
size={{matrix_size}}; voxel size={{voxel_size}}mm; b-values of {{bvals}} acquired; \
{{dmri_dir}} diffusion directions; {{acceleration}}).";

const FMAP: &str = "A {{variants}} {{seqs}} field map (phase encoding: {{dir}}; \
{{nb_slices}} slices{{slice_order}}; repetition time, TR={{tr}}ms; echo time 1 / 2, \
TE 1/2={{te_1}}s / {{te_2}}s; flip angle, FA={{flip_angle}}°; field of view, FOV={{fov}}mm; \
matrix size={{matrix_size}}; voxel size={{voxel_size}}mm) was \
acquired{{intended_for_clause}}.";

const MEEG: &str = "MEG data were acquired with a {{manufacturer}} {{model_name}} system.";

const PET: &str = "PET data were acquired on a {{manufacturer}} {{model_name}} scanner.";

/// Interpolates built-in paragraphs. Every referenced slot must be present
/// and non-null.
#[derive(Debug, Clone, Copy, Default)]
pub struct StrictRenderer;

impl StrictRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Paragraph source for `template`.
    pub fn paragraph(template: ParagraphTemplate) -> &'static str {
        match template {
            ParagraphTemplate::Anat => ANAT,
            ParagraphTemplate::Func => FUNC,
            ParagraphTemplate::Dwi => DWI,
            ParagraphTemplate::Fmap => FMAP,
            ParagraphTemplate::Meeg => MEEG,
            ParagraphTemplate::Pet => PET,
        }
    }
}

/// Slot names referenced by a paragraph, in order of first use.
pub fn placeholders(source: &str) -> Vec<&str> {
    let mut slots: Vec<&str> = Vec::new();
    for captures in PLACEHOLDER.captures_iter(source) {
        if let Some(slot) = captures.get(1).map(|m| m.as_str())
            && !slots.contains(&slot)
        {
            slots.push(slot);
        }
    }
    slots
}

impl Renderer for StrictRenderer {
    fn render(
        &self,
        template: ParagraphTemplate,
        record: &DescriptionRecord,
    ) -> Result<String, RenderError> {
        let source = Self::paragraph(template);
        let mut output = String::with_capacity(source.len() * 2);
        let mut last = 0;
        for captures in PLACEHOLDER.captures_iter(source) {
            let (Some(whole), Some(slot)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            let value = record
                .display(slot.as_str())
                .ok_or_else(|| RenderError::MissingSlot {
                    template: template.name().to_string(),
                    slot: slot.as_str().to_string(),
                })?;
            output.push_str(&source[last..whole.start()]);
            output.push_str(&value);
            last = whole.end();
        }
        output.push_str(&source[last..]);
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_placeholders() {
        assert_eq!(
            placeholders("{{a}} and {{ b }} then {{a}}"),
            vec!["a", "b"]
        );
        assert!(placeholders(MEEG).contains(&"model_name"));
    }

    #[test]
    fn test_render_meeg() {
        let mut record = DescriptionRecord::new();
        record.insert("manufacturer", json!("Elekta"));
        record.insert("model_name", json!("Neuromag"));
        let text = StrictRenderer::new()
            .render(ParagraphTemplate::Meeg, &record)
            .unwrap();
        assert_eq!(text, "MEG data were acquired with a Elekta Neuromag system.");
    }

    #[test]
    fn test_missing_slot_fails() {
        let mut record = DescriptionRecord::new();
        record.insert("manufacturer", json!("Siemens"));
        record.insert("model_name", serde_json::Value::Null);
        let err = StrictRenderer::new()
            .render(ParagraphTemplate::Pet, &record)
            .unwrap_err();
        assert!(matches!(
            err,
            RenderError::MissingSlot { ref template, ref slot } if template == "pet" && slot == "model_name"
        ));
    }

    #[test]
    fn test_numbers_are_locale_free() {
        let mut record = DescriptionRecord::new();
        for slot in placeholders(FMAP) {
            record.insert(slot, json!(""));
        }
        record.insert("tr", json!(12000));
        record.insert("te_1", json!(0.005));
        record.insert("te_2", json!(0.007));
        let text = StrictRenderer::new()
            .render(ParagraphTemplate::Fmap, &record)
            .unwrap();
        assert!(text.contains("TR=12000ms"));
        assert!(text.contains("TE 1/2=0.005s / 0.007s"));
        assert!(text.ends_with("mm) was acquired."));

        record.insert(
            "intended_for_clause",
            json!(" for the first run of the rest BOLD scan"),
        );
        let text = StrictRenderer::new()
            .render(ParagraphTemplate::Fmap, &record)
            .unwrap();
        assert!(text.ends_with("mm) was acquired for the first run of the rest BOLD scan."));
    }

    #[test]
    fn test_strategies_share_functional_slots() {
        let bundled = include_str!("../../templates/templates/func.hbs");
        let strict = placeholders(FUNC);
        for slot in ["variants", "seqs", "total_vols", "duration", "nb_vols", "task_name"] {
            assert!(strict.contains(&slot), "strict paragraph lacks {slot}");
            assert!(bundled.contains(slot), "bundled template lacks {slot}");
        }
    }
}
