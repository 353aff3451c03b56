//! Report run: configuration, indexing, generation and output files.

use anyhow::Context;
use serde::Serialize;
use std::path::{Path, PathBuf};

use bidsreport_core::{
    BidsLayout, ConfigOverrides, DescriptionCounter, GroupDiagnostic, ReportConfig,
    ReportGenerator, SubjectReport,
};

use crate::Cli;

const WRAP_WIDTH: usize = 88;

/// Outcome of reporting one participant.
#[derive(Debug, Clone)]
pub struct ParticipantSummary {
    pub participant: String,
    pub reports: usize,
    pub distinct: usize,
    pub warnings: usize,
    pub failures: usize,
    pub report_path: Option<PathBuf>,
    pub diagnostics_path: Option<PathBuf>,
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
struct DiagnosticsFile<'a> {
    participant: &'a str,
    reports: Vec<DiagnosticsEntry<'a>>,
}

#[derive(Debug, Serialize)]
struct DiagnosticsEntry<'a> {
    session: Option<&'a str>,
    diagnostics: &'a [GroupDiagnostic],
}

/// Effective configuration for the dataset with command-line overrides applied.
pub fn resolve_config(cli: &Cli) -> anyhow::Result<ReportConfig> {
    let overrides = ConfigOverrides {
        strategy: cli.strategy,
        templates_dir: cli.templates.clone(),
        vocabulary: cli.vocabulary.clone(),
    };
    bidsreport_core::load_config(Some(&cli.bids_dir), Some(&overrides))
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))
}

/// Generate and write reports for every requested participant.
pub fn run(cli: &Cli, config: &ReportConfig) -> anyhow::Result<Vec<ParticipantSummary>> {
    let layout = BidsLayout::index_with(&cli.bids_dir, config)
        .with_context(|| format!("Failed to index dataset {}", cli.bids_dir.display()))?;

    let participants = if cli.participant_label.is_empty() {
        let first = layout
            .subjects()
            .into_iter()
            .next()
            .with_context(|| format!("No subjects found in {}", cli.bids_dir.display()))?;
        vec![first]
    } else {
        cli.participant_label
            .iter()
            .map(|label| label.trim_start_matches("sub-").to_string())
            .collect()
    };

    let generator =
        ReportGenerator::from_config(layout, config).context("Failed to set up report generation")?;

    std::fs::create_dir_all(&cli.output_dir).with_context(|| {
        format!(
            "Failed to create output directory {}",
            cli.output_dir.display()
        )
    })?;

    let mut summaries = Vec::with_capacity(participants.len());
    for participant in &participants {
        let reports = generator
            .generate_reports(Some(participant), cli.session.as_deref())
            .with_context(|| format!("Failed to generate reports for sub-{participant}"))?;
        summaries.push(write_participant(
            participant,
            &reports,
            &cli.output_dir,
            cli.json,
        )?);
    }
    Ok(summaries)
}

/// Write the most common description, and diagnostics when requested.
pub fn write_participant(
    participant: &str,
    reports: &[SubjectReport],
    output_dir: &Path,
    json: bool,
) -> anyhow::Result<ParticipantSummary> {
    let mut counter = DescriptionCounter::new();
    for subject_report in reports {
        counter.add(subject_report.report.text());
    }

    let description = counter.most_common().map(str::to_string);
    let report_path = match &description {
        Some(text) => {
            let path = output_dir.join(format!("sub-{participant}_report.md"));
            std::fs::write(&path, format!("{text}\n"))
                .with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!(participant, path = %path.display(), "Wrote report");
            Some(path)
        }
        None => {
            tracing::warn!(participant, "No reportable data files");
            None
        }
    };

    let diagnostics_path = if json {
        let file = DiagnosticsFile {
            participant,
            reports: reports
                .iter()
                .map(|r| DiagnosticsEntry {
                    session: r.session.as_deref(),
                    diagnostics: &r.report.diagnostics,
                })
                .collect(),
        };
        let path = output_dir.join(format!("sub-{participant}_diagnostics.json"));
        let content = serde_json::to_string_pretty(&file)?;
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Some(path)
    } else {
        None
    };

    Ok(ParticipantSummary {
        participant: participant.to_string(),
        reports: counter.total(),
        distinct: counter.len(),
        warnings: reports.iter().map(|r| r.report.warnings().count()).sum(),
        failures: reports.iter().map(|r| r.report.failures().count()).sum(),
        report_path,
        diagnostics_path,
        description,
    })
}

pub fn print_summary(summary: &ParticipantSummary) {
    println!(
        "sub-{}: {} report(s), {} distinct, {} skipped group(s), {} failed group(s)",
        summary.participant, summary.reports, summary.distinct, summary.warnings, summary.failures
    );
    if let Some(path) = &summary.report_path {
        println!("  Report: {}", path.display());
    }
    if let Some(path) = &summary.diagnostics_path {
        println!("  Diagnostics: {}", path.display());
    }
    if let Some(text) = &summary.description {
        println!();
        for paragraph in text.split("\n\n") {
            println!("{}\n", textwrap::fill(paragraph, WRAP_WIDTH));
        }
    }
}
