//! Handlebars-backed renderer.

use handlebars::Handlebars;
use std::path::{Path, PathBuf};

use super::{ParagraphTemplate, Renderer, collapse_whitespace};
use crate::error::RenderError;
use crate::types::DescriptionRecord;

const EXTENSION: &str = "hbs";

const BUNDLED_PARTIALS: [(&str, &str); 4] = [
    (
        "acceleration",
        include_str!("../../templates/partials/acceleration.hbs"),
    ),
    ("device", include_str!("../../templates/partials/device.hbs")),
    ("geometry", include_str!("../../templates/partials/geometry.hbs")),
    ("timing", include_str!("../../templates/partials/timing.hbs")),
];

fn bundled_template(template: ParagraphTemplate) -> &'static str {
    match template {
        ParagraphTemplate::Anat => include_str!("../../templates/templates/anat.hbs"),
        ParagraphTemplate::Func => include_str!("../../templates/templates/func.hbs"),
        ParagraphTemplate::Dwi => include_str!("../../templates/templates/dwi.hbs"),
        ParagraphTemplate::Fmap => include_str!("../../templates/templates/fmap.hbs"),
        ParagraphTemplate::Meeg => include_str!("../../templates/templates/meeg.hbs"),
        ParagraphTemplate::Pet => include_str!("../../templates/templates/pet.hbs"),
    }
}

#[derive(Debug, Clone)]
enum Assets {
    Bundled,
    Dir(PathBuf),
}

/// Renders one Handlebars template per paragraph with a set of shared
/// partials.
///
/// The assets are either compiled into the binary or read from
/// `<root>/templates/<name>.hbs` and `<root>/partials/*.hbs` on every call,
/// partials registered under their file stem. HTML escaping is off and strict
/// mode is off, so a slot that is absent, empty or `false` renders as nothing
/// and makes `{{#if}}` sections disappear.
#[derive(Debug, Clone)]
pub struct TemplateRenderer {
    assets: Assets,
}

impl TemplateRenderer {
    /// Renderer over a template directory on disk.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            assets: Assets::Dir(root.into()),
        }
    }

    /// Renderer over the templates shipped inside the binary.
    pub fn bundled() -> Self {
        Self {
            assets: Assets::Bundled,
        }
    }

    /// Template directory, `None` for the bundled assets.
    pub fn root(&self) -> Option<&Path> {
        match &self.assets {
            Assets::Bundled => None,
            Assets::Dir(root) => Some(root),
        }
    }

    pub fn template_path(root: &Path, template: ParagraphTemplate) -> PathBuf {
        root.join("templates")
            .join(format!("{}.{EXTENSION}", template.name()))
    }

    fn source(&self, template: ParagraphTemplate) -> Result<String, RenderError> {
        match &self.assets {
            Assets::Bundled => Ok(bundled_template(template).to_string()),
            Assets::Dir(root) => {
                let path = Self::template_path(root, template);
                std::fs::read_to_string(&path)
                    .map_err(|_| RenderError::TemplateNotFound { path: path.clone() })
            }
        }
    }

    fn partials(&self, template: ParagraphTemplate) -> Result<Vec<(String, String)>, RenderError> {
        let root = match &self.assets {
            Assets::Bundled => {
                return Ok(BUNDLED_PARTIALS
                    .iter()
                    .map(|(name, content)| (name.to_string(), content.to_string()))
                    .collect());
            }
            Assets::Dir(root) => root,
        };

        let dir = root.join("partials");
        let entries = std::fs::read_dir(&dir)
            .map_err(|_| RenderError::PartialsNotFound { path: dir.clone() })?;
        let mut paths: Vec<PathBuf> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == EXTENSION))
            .collect();
        paths.sort();

        let mut partials = Vec::with_capacity(paths.len());
        for path in paths {
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let content = std::fs::read_to_string(&path).map_err(|e| RenderError::Engine {
                template: template.name().to_string(),
                message: format!("failed to read partial {}: {e}", path.display()),
            })?;
            partials.push((name.to_string(), content));
        }
        Ok(partials)
    }

    fn registry(&self, template: ParagraphTemplate) -> Result<Handlebars<'static>, RenderError> {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(false);
        handlebars.register_escape_fn(handlebars::no_escape);

        for (name, content) in self.partials(template)? {
            handlebars
                .register_partial(&name, content.trim_end())
                .map_err(|e| RenderError::Engine {
                    template: template.name().to_string(),
                    message: format!("invalid partial '{name}': {e}"),
                })?;
        }
        Ok(handlebars)
    }
}

impl Renderer for TemplateRenderer {
    fn render(
        &self,
        template: ParagraphTemplate,
        record: &DescriptionRecord,
    ) -> Result<String, RenderError> {
        let source = self.source(template)?;
        let handlebars = self.registry(template)?;
        let rendered = handlebars
            .render_template(&source, record)
            .map_err(|e| RenderError::Engine {
                template: template.name().to_string(),
                message: e.to_string(),
            })?;
        Ok(collapse_whitespace(&rendered))
    }
}
