//! Configuration system for bidsreport.
//!
//! Uses `figment` for layered configuration: defaults -> user config file ->
//! dataset config file -> environment -> CLI overrides. Configuration is loaded
//! from `~/.config/bidsreport/config.toml` and/or `<dataset>/.bidsreport/config.toml`.
//!
//! The acquisition [`Vocabulary`] (phase-encoding directions, sequence and
//! sequence-variant names) is kept separate: it is a JSON table that is loaded
//! once per run and shared read-only by every description builder.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Top-level configuration for report generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Which renderer turns description records into paragraphs.
    pub strategy: RenderStrategy,
    /// Root holding `templates/` and `partials/`. Defaults to the bundled assets.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub templates_dir: Option<PathBuf>,
    /// Converters JSON replacing the built-in vocabulary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vocabulary: Option<PathBuf>,
    /// File extensions treated as data files when indexing a dataset.
    pub data_extensions: Vec<String>,
    /// Top-level directories never indexed. Hidden directories are always skipped.
    pub skip_dirs: Vec<String>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            strategy: RenderStrategy::default(),
            templates_dir: None,
            vocabulary: None,
            data_extensions: [
                ".nii.gz", ".nii", ".fif", ".edf", ".bdf", ".vhdr", ".set", ".snirf",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            skip_dirs: ["derivatives", "code", "sourcedata"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl ReportConfig {
    /// Load the configured vocabulary, or the built-in one when none is set.
    pub fn load_vocabulary(&self) -> Result<Vocabulary, ConfigError> {
        match &self.vocabulary {
            Some(path) => Vocabulary::load(path),
            None => Ok(Vocabulary::default()),
        }
    }
}

/// Rendering strategy for paragraphs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderStrategy {
    /// Handlebars templates loaded from disk, tolerant of absent fields.
    #[default]
    Template,
    /// Built-in fixed paragraphs that fail on any missing slot.
    Strict,
}

impl std::fmt::Display for RenderStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenderStrategy::Template => write!(f, "template"),
            RenderStrategy::Strict => write!(f, "strict"),
        }
    }
}

impl std::str::FromStr for RenderStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "template" => Ok(RenderStrategy::Template),
            "strict" => Ok(RenderStrategy::Strict),
            other => Err(ConfigError::Invalid {
                message: format!("unknown render strategy '{other}'"),
            }),
        }
    }
}

/// Command-line overrides. Only fields that are set take part in the merge.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<RenderStrategy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub templates_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vocabulary: Option<PathBuf>,
}

/// Load configuration by merging defaults, config files, and environment variables.
pub fn load_config(
    dataset: Option<&Path>,
    overrides: Option<&ConfigOverrides>,
) -> Result<ReportConfig, Box<figment::Error>> {
    let mut figment = Figment::from(Serialized::defaults(ReportConfig::default()));

    // User-level config
    if let Some(config_dir) = directories::ProjectDirs::from("org", "bids", "bidsreport") {
        let user_config = config_dir.config_dir().join("config.toml");
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    // Dataset-level config
    if let Some(root) = dataset {
        let dataset_config = root.join(".bidsreport").join("config.toml");
        if dataset_config.exists() {
            figment = figment.merge(Toml::file(&dataset_config));
        }
    }

    // Environment variables (BIDSREPORT_STRATEGY, BIDSREPORT_TEMPLATES_DIR, etc.)
    figment = figment.merge(Env::prefixed("BIDSREPORT_").split("__"));

    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    figment.extract().map_err(Box::new)
}

/// Immutable lookup tables translating scanner codes into prose.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vocabulary {
    /// Phase-encoding direction code (`j-`) to label.
    pub dir: BTreeMap<String, String>,
    /// Scanning-sequence code (`EP`) to name.
    pub seq: BTreeMap<String, String>,
    /// Sequence-variant code (`SK`) to name.
    pub seqvar: BTreeMap<String, String>,
}

/// Converters document compiled into the binary.
pub const BUNDLED_CONVERTERS: &str = include_str!("../config/converters.json");

impl Default for Vocabulary {
    fn default() -> Self {
        Self::from_json(BUNDLED_CONVERTERS).expect("bundled converters.json is valid")
    }
}

impl Vocabulary {
    /// Parse a converters document (`{"dir": {...}, "seq": {...}, "seqvar": {...}}`).
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })
    }

    /// Load a converters document from disk.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ParseError {
            message: format!("{}: {e}", path.display()),
        })?;
        Self::from_json(&content)
    }

    pub fn direction(&self, code: &str) -> Option<&str> {
        self.dir.get(code).map(String::as_str)
    }

    pub fn sequence(&self, code: &str) -> Option<&str> {
        self.seq.get(code).map(String::as_str)
    }

    pub fn variant(&self, code: &str) -> Option<&str> {
        self.seqvar.get(code).map(String::as_str)
    }
}
