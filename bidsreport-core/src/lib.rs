//! # bidsreport core
//!
//! Generates publication-style methods paragraphs from a BIDS dataset.
//! Provides dataset indexing, NIfTI header reading, acquisition grouping,
//! per-modality description builders, paragraph rendering and report
//! aggregation.

pub mod config;
pub mod describe;
pub mod dispatch;
pub mod error;
pub mod image;
pub mod layout;
pub mod normalize;
pub mod render;
pub mod report;
pub mod types;

// Re-export commonly used types at the crate root.
pub use config::{ConfigOverrides, RenderStrategy, ReportConfig, Vocabulary, load_config};
pub use describe::BuildContext;
pub use dispatch::{GroupOutcome, describe_group};
pub use error::{ConfigError, DescribeError, ImageError, LayoutError, RenderError, ReportError, Result};
pub use image::{FixedGeometryReader, ImageGeometry, ImageReader, NiftiReader};
pub use layout::{BidsLayout, DatasetLayout, group_associated};
pub use render::{ParagraphTemplate, Renderer, StrictRenderer, TemplateRenderer};
pub use report::{DescriptionCounter, Report, ReportGenerator, SubjectReport};
pub use types::{
    AcquisitionGroup, DescriptionRecord, DiagnosticKind, Entities, GroupDiagnostic, GroupId,
    Metadata, Modality, ReportSection, ScanFile, ScanRecord,
};
