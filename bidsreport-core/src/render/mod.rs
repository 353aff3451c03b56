//! Paragraph rendering.
//!
//! A [`Renderer`] turns a [`DescriptionRecord`] into one paragraph of prose.
//! Two strategies share the same slot names:
//!
//! - [`TemplateRenderer`] renders Handlebars templates and partials, bundled or
//!   from a directory, and lets absent or empty slots collapse conditional
//!   sections.
//! - [`StrictRenderer`] interpolates built-in paragraphs and fails on the first
//!   slot the record does not provide.
//!
//! Rendering is a pure function of the template and the record.

mod engine;
mod strict;

pub use engine::TemplateRenderer;
pub use strict::{StrictRenderer, placeholders};

use serde::{Deserialize, Serialize};

use crate::config::{RenderStrategy, ReportConfig};
use crate::error::RenderError;
use crate::types::{DescriptionRecord, Modality};

/// Paragraph template, one per modality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParagraphTemplate {
    Anat,
    Func,
    Dwi,
    Fmap,
    Meeg,
    Pet,
}

impl ParagraphTemplate {
    pub const ALL: [ParagraphTemplate; 6] = [
        ParagraphTemplate::Anat,
        ParagraphTemplate::Func,
        ParagraphTemplate::Dwi,
        ParagraphTemplate::Fmap,
        ParagraphTemplate::Meeg,
        ParagraphTemplate::Pet,
    ];

    /// Asset name, without the `.hbs` extension.
    pub fn name(&self) -> &'static str {
        match self {
            ParagraphTemplate::Anat => "anat",
            ParagraphTemplate::Func => "func",
            ParagraphTemplate::Dwi => "dwi",
            ParagraphTemplate::Fmap => "fmap",
            ParagraphTemplate::Meeg => "meeg",
            ParagraphTemplate::Pet => "pet",
        }
    }

    pub fn for_modality(modality: Modality) -> Self {
        match modality {
            Modality::Functional => ParagraphTemplate::Func,
            Modality::Structural => ParagraphTemplate::Anat,
            Modality::Diffusion => ParagraphTemplate::Dwi,
            Modality::FieldMap => ParagraphTemplate::Fmap,
            Modality::Meg => ParagraphTemplate::Meeg,
            Modality::Pet => ParagraphTemplate::Pet,
        }
    }
}

impl std::fmt::Display for ParagraphTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Turns a description record into a paragraph.
pub trait Renderer {
    fn render(
        &self,
        template: ParagraphTemplate,
        record: &DescriptionRecord,
    ) -> Result<String, RenderError>;
}

/// Renderer selected by the configuration.
pub fn renderer_for(config: &ReportConfig) -> Box<dyn Renderer> {
    match config.strategy {
        RenderStrategy::Template => match &config.templates_dir {
            Some(root) => Box::new(TemplateRenderer::new(root)),
            None => Box::new(TemplateRenderer::bundled()),
        },
        RenderStrategy::Strict => Box::new(StrictRenderer::new()),
    }
}

/// Collapse every whitespace run to one space and trim the ends.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
