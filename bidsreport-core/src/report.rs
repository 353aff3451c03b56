//! Report aggregation.
//!
//! [`ReportGenerator`] drives grouping, description and rendering across a
//! batch of scan records. Per-group failures never escape a batch: they are
//! collected as [`GroupDiagnostic`]s next to the sections that did render.

use serde::{Deserialize, Serialize};

use crate::config::{ReportConfig, Vocabulary};
use crate::describe::BuildContext;
use crate::dispatch::{GroupOutcome, describe_group};
use crate::error::{LayoutError, ReportError};
use crate::image::{ImageReader, NiftiReader};
use crate::layout::{BidsLayout, group_associated};
use crate::render::{ParagraphTemplate, Renderer, renderer_for};
use crate::types::{DiagnosticKind, GroupDiagnostic, Metadata, ReportSection, ScanRecord};

/// Sentence describing the DICOM to NIfTI conversion.
pub fn conversion_sentence(metadata: &Metadata) -> String {
    let software = metadata.get("ConversionSoftware").and_then(|v| v.as_str());
    let version = metadata
        .get("ConversionSoftwareVersion")
        .and_then(|v| v.as_str());
    match (software, version) {
        (Some(software), Some(version)) => {
            format!("Dicoms were converted to NIfTI-1 format using {software} ({version}).")
        }
        (Some(software), None) => format!("Dicoms were converted to NIfTI-1 format using {software}."),
        _ => "Dicoms were converted to NIfTI-1 format.".to_string(),
    }
}

/// Attribution sentence naming this library and its version.
pub fn footer() -> String {
    format!(
        "This section was (in part) generated automatically using bidsreport {}.",
        env!("CARGO_PKG_VERSION")
    )
}

/// Rendered sections of one batch, in group order, with diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub sections: Vec<ReportSection>,
    pub diagnostics: Vec<GroupDiagnostic>,
    pub conversion: String,
    pub footer: String,
}

impl Report {
    /// Skipped groups.
    pub fn warnings(&self) -> impl Iterator<Item = &GroupDiagnostic> {
        self.diagnostics.iter().filter(|d| d.kind.is_warning())
    }

    /// Groups whose description or rendering failed.
    pub fn failures(&self) -> impl Iterator<Item = &GroupDiagnostic> {
        self.diagnostics.iter().filter(|d| !d.kind.is_warning())
    }

    /// Sections, conversion sentence and footer separated by blank lines.
    pub fn text(&self) -> String {
        self.sections
            .iter()
            .map(|s| s.text.as_str())
            .chain([self.conversion.as_str(), self.footer.as_str()])
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Multiset of assembled descriptions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptionCounter {
    entries: Vec<(String, usize)>,
}

impl DescriptionCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, description: String) {
        match self.entries.iter_mut().find(|(d, _)| *d == description) {
            Some((_, count)) => *count += 1,
            None => self.entries.push((description, 1)),
        }
    }

    /// Count of `description`, zero when never seen.
    pub fn count(&self, description: &str) -> usize {
        self.entries
            .iter()
            .find(|(d, _)| d == description)
            .map_or(0, |(_, c)| *c)
    }

    /// Entries by descending count; ties keep first-appearance order.
    pub fn ranked(&self) -> Vec<(&str, usize)> {
        let mut ranked: Vec<(&str, usize)> =
            self.entries.iter().map(|(d, c)| (d.as_str(), *c)).collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked
    }

    pub fn most_common(&self) -> Option<&str> {
        self.ranked().first().map(|(d, _)| *d)
    }

    /// Number of reports counted.
    pub fn total(&self) -> usize {
        self.entries.iter().map(|(_, c)| c).sum()
    }

    /// Number of distinct descriptions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Report for one subject and, when the dataset has sessions, one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectReport {
    pub subject: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,
    pub report: Report,
}

/// Drives report generation over an indexed dataset.
pub struct ReportGenerator {
    layout: BidsLayout,
    vocabulary: Vocabulary,
    renderer: Box<dyn Renderer>,
    images: Box<dyn ImageReader>,
}

impl ReportGenerator {
    pub fn new(
        layout: BidsLayout,
        vocabulary: Vocabulary,
        renderer: Box<dyn Renderer>,
        images: Box<dyn ImageReader>,
    ) -> Self {
        Self {
            layout,
            vocabulary,
            renderer,
            images,
        }
    }

    /// Generator with the configured vocabulary and renderer reading NIfTI headers.
    pub fn from_config(layout: BidsLayout, config: &ReportConfig) -> Result<Self, ReportError> {
        let vocabulary = config.load_vocabulary()?;
        Ok(Self::new(
            layout,
            vocabulary,
            renderer_for(config),
            Box::new(NiftiReader::new()),
        ))
    }

    pub fn with_renderer(mut self, renderer: Box<dyn Renderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn with_image_reader(mut self, images: Box<dyn ImageReader>) -> Self {
        self.images = images;
        self
    }

    pub fn layout(&self) -> &BidsLayout {
        &self.layout
    }

    /// Group, describe and render a batch of records.
    ///
    /// Sections keep the order of their groups. Skipped and failed groups are
    /// reported as diagnostics in the same order. The conversion sentence is
    /// built from the first record's metadata.
    pub fn generate_from_records<R: ScanRecord>(&self, records: Vec<R>) -> Report {
        let conversion = records
            .first()
            .map(|r| conversion_sentence(r.metadata()))
            .unwrap_or_else(|| conversion_sentence(&Metadata::new()));
        let ctx = BuildContext::new(&self.vocabulary, self.images.as_ref(), &self.layout);

        let mut sections = Vec::new();
        let mut diagnostics = Vec::new();
        for group in group_associated(records) {
            match describe_group(&group, &ctx) {
                GroupOutcome::Described {
                    group,
                    modality,
                    record,
                } => {
                    let template = ParagraphTemplate::for_modality(modality);
                    match self.renderer.render(template, &record) {
                        Ok(text) => sections.push(ReportSection {
                            group,
                            modality,
                            text,
                        }),
                        Err(err) => {
                            tracing::warn!(group = %group, error = %err, "Failed to render group");
                            diagnostics.push(GroupDiagnostic {
                                group,
                                kind: DiagnosticKind::Render,
                                field: err.slot().map(str::to_string),
                                message: err.to_string(),
                            });
                        }
                    }
                }
                GroupOutcome::Skipped(diagnostic) | GroupOutcome::Failed(diagnostic) => {
                    diagnostics.push(diagnostic);
                }
            }
        }

        Report {
            sections,
            diagnostics,
            conversion,
            footer: footer(),
        }
    }

    /// One report per subject and session.
    ///
    /// `subject` and `session` restrict the selection; without them every
    /// subject and every session of that subject is reported.
    pub fn generate_reports(
        &self,
        subject: Option<&str>,
        session: Option<&str>,
    ) -> Result<Vec<SubjectReport>, ReportError> {
        let subjects = match subject {
            Some(label) => {
                if !self.layout.subjects().iter().any(|s| s == label) {
                    return Err(LayoutError::SubjectNotFound {
                        label: label.to_string(),
                    }
                    .into());
                }
                vec![label.to_string()]
            }
            None => self.layout.subjects(),
        };

        let mut reports = Vec::new();
        for subject in subjects {
            let sessions: Vec<Option<String>> = match session {
                Some(label) => vec![Some(label.to_string())],
                None => {
                    let sessions = self.layout.sessions(Some(&subject));
                    if sessions.is_empty() {
                        vec![None]
                    } else {
                        sessions.into_iter().map(Some).collect()
                    }
                }
            };
            for session in sessions {
                let files = self.layout.data_files(Some(&subject), session.as_deref());
                if files.is_empty() {
                    tracing::debug!(subject = %subject, session = ?session, "No data files");
                    continue;
                }
                let report = self.generate_from_records(files);
                tracing::info!(
                    subject = %subject,
                    session = ?session,
                    sections = report.sections.len(),
                    diagnostics = report.diagnostics.len(),
                    "Generated report"
                );
                reports.push(SubjectReport {
                    subject: subject.clone(),
                    session,
                    report,
                });
            }
        }
        Ok(reports)
    }

    /// Count identical assembled descriptions across subjects and sessions.
    pub fn generate(
        &self,
        subject: Option<&str>,
        session: Option<&str>,
    ) -> Result<DescriptionCounter, ReportError> {
        let mut counter = DescriptionCounter::new();
        for subject_report in self.generate_reports(subject, session)? {
            counter.add(subject_report.report.text());
        }
        Ok(counter)
    }
}
