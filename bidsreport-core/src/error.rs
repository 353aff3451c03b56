//! Error types for the bidsreport core.
//!
//! Uses `thiserror` for public API error types with structured error variants
//! covering configuration, dataset layout, image geometry, description
//! building, and rendering.

use std::path::PathBuf;

/// Top-level error type for the bidsreport core library.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Layout error: {0}")]
    Layout(#[from] LayoutError),

    #[error("Image error: {0}")]
    Image(#[from] ImageError),

    #[error("Description error: {0}")]
    Describe(#[from] DescribeError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors from the configuration system.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Configuration parse error: {message}")]
    ParseError { message: String },
}

/// Errors from dataset indexing and sidecar loading.
#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    #[error("Dataset root not found: {path}")]
    RootNotFound { path: PathBuf },

    #[error("Failed to walk dataset: {message}")]
    Walk { message: String },

    #[error("Invalid sidecar {path}: {message}")]
    InvalidSidecar { path: PathBuf, message: String },

    #[error("Subject not found: sub-{label}")]
    SubjectNotFound { label: String },
}

/// Errors from reading image geometry.
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("Failed to open image {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Not a NIfTI-1 image: {path}")]
    NotNifti { path: PathBuf },

    #[error("Image header of {path} is invalid: {message}")]
    InvalidHeader { path: PathBuf, message: String },

    #[error("No geometry registered for {path}")]
    Unknown { path: PathBuf },
}

/// Errors raised while building a description record for one acquisition group.
///
/// Every variant carries the identity of the group so that the aggregator can
/// attribute the failure without extra bookkeeping.
#[derive(Debug, thiserror::Error)]
pub enum DescribeError {
    #[error("Missing required field '{field}' in group {group}")]
    MissingRequiredField { field: String, group: String },

    #[error("Unsupported modality in group {group}: {reason}")]
    UnsupportedModality { group: String, reason: String },

    #[error("Invalid value for '{field}' in group {group}: {message}")]
    InvalidValue {
        field: String,
        group: String,
        message: String,
    },

    #[error("Image geometry unavailable for group {group}: {source}")]
    Image {
        group: String,
        #[source]
        source: ImageError,
    },

    #[error("Failed to read {path} for group {group}: {source}")]
    Io {
        group: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl DescribeError {
    /// Identity of the acquisition group the error belongs to.
    pub fn group(&self) -> &str {
        match self {
            Self::MissingRequiredField { group, .. }
            | Self::UnsupportedModality { group, .. }
            | Self::InvalidValue { group, .. }
            | Self::Image { group, .. }
            | Self::Io { group, .. } => group,
        }
    }

    /// The metadata field at fault, when there is one.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::MissingRequiredField { field, .. } | Self::InvalidValue { field, .. } => {
                Some(field)
            }
            _ => None,
        }
    }
}

/// Errors from paragraph rendering.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Template not found: {path}")]
    TemplateNotFound { path: PathBuf },

    #[error("Partial directory not found: {path}")]
    PartialsNotFound { path: PathBuf },

    #[error("Template '{template}' references missing slot '{slot}'")]
    MissingSlot { template: String, slot: String },

    #[error("Template '{template}' failed to render: {message}")]
    Engine { template: String, message: String },
}

impl RenderError {
    /// The record slot at fault, when there is one.
    pub fn slot(&self) -> Option<&str> {
        match self {
            Self::MissingSlot { slot, .. } => Some(slot),
            _ => None,
        }
    }
}

/// A type alias for results using the top-level `ReportError`.
pub type Result<T> = std::result::Result<T, ReportError>;
