//! Configuration types for the scan export pipeline.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ExportError;
use crate::schema::values;

/// One recognized species: the value stored in sample records and the label
/// used in run-log messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeciesEntry {
    pub name: String,
    pub label: String,
}

/// Species the warehouse records, keyed by exact (case-sensitive) name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpeciesRegistry {
    entries: Vec<SpeciesEntry>,
}

fn default_species() -> Vec<SpeciesEntry> {
    [
        ("white-tailed deer", "White-tailed Deer"),
        ("mule deer", "Mule Deer"),
        ("black-tailed deer", "Black-tailed Deer"),
        ("elk", "Elk"),
        ("moose", "Moose"),
        ("caribou", "Caribou"),
        ("reindeer", "Reindeer"),
        ("red deer", "Red Deer"),
        ("sika deer", "Sika Deer"),
        ("fallow deer", "Fallow Deer"),
        ("roe deer", "Roe Deer"),
        ("muntjac", "Muntjac"),
        ("sambar deer", "Sambar Deer"),
        ("axis deer", "Axis Deer"),
        ("rusa deer", "Rusa Deer"),
        ("water deer", "Water Deer"),
        ("pere david's deer", "Pere David's Deer"),
        ("unknown", "Unknown Species"),
    ]
    .into_iter()
    .map(|(name, label)| SpeciesEntry {
        name: name.to_string(),
        label: label.to_string(),
    })
    .collect()
}

impl Default for SpeciesRegistry {
    fn default() -> Self {
        Self {
            entries: default_species(),
        }
    }
}

impl SpeciesRegistry {
    /// Display label for a registered species name.
    pub fn label(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.label.as_str())
    }

    pub fn entries(&self) -> &[SpeciesEntry] {
        &self.entries
    }

    pub fn is_all_species(selection: &str) -> bool {
        selection.trim().eq_ignore_ascii_case(values::ALL_SPECIES)
    }
}

/// Main pipeline configuration.
///
/// File names are resolved against `data_dir`; outputs go to `output_dir`
/// when set, otherwise to `data_dir`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default)]
    pub output_dir: Option<PathBuf>,

    #[serde(default = "default_params_file")]
    pub params_file: String,

    #[serde(default = "default_sample_file")]
    pub sample_file: String,

    #[serde(default = "default_params_json_file")]
    pub params_json_file: String,

    #[serde(default = "default_sample_ndjson_file")]
    pub sample_ndjson_file: String,

    /// Relative to `data_dir`.
    #[serde(default = "default_run_log_file")]
    pub run_log_file: String,

    /// Relative to `data_dir`.
    #[serde(default = "default_execution_log_file")]
    pub execution_log_file: String,

    #[serde(default = "default_attachments_file")]
    pub attachments_file: String,

    #[serde(default)]
    pub species: SpeciesRegistry,
}

fn default_data_dir() -> PathBuf {
    if cfg!(windows) {
        PathBuf::from("data")
    } else {
        PathBuf::from("/data")
    }
}

fn default_params_file() -> String {
    "params.csv".to_string()
}

fn default_sample_file() -> String {
    "sample.csv".to_string()
}

fn default_params_json_file() -> String {
    "params.json".to_string()
}

fn default_sample_ndjson_file() -> String {
    "sample.ndJson".to_string()
}

fn default_run_log_file() -> String {
    "attachments/info.html".to_string()
}

fn default_execution_log_file() -> String {
    "attachments/execution_log.log".to_string()
}

fn default_attachments_file() -> String {
    "attachments.json".to_string()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            output_dir: None,
            params_file: default_params_file(),
            sample_file: default_sample_file(),
            params_json_file: default_params_json_file(),
            sample_ndjson_file: default_sample_ndjson_file(),
            run_log_file: default_run_log_file(),
            execution_log_file: default_execution_log_file(),
            attachments_file: default_attachments_file(),
            species: SpeciesRegistry::default(),
        }
    }
}

impl PipelineConfig {
    /// Defaults rooted at `data_dir`.
    pub fn with_data_dir<P: Into<PathBuf>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    /// Load configuration from a YAML file.
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self, ExportError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ExportError::Config(format!("cannot read '{}': {e}", path.display()))
        })?;
        let config: PipelineConfig = serde_yaml::from_str(&content)
            .map_err(|e| ExportError::Config(format!("invalid '{}': {e}", path.display())))?;
        Ok(config)
    }

    pub fn params_path(&self) -> PathBuf {
        self.data_dir.join(&self.params_file)
    }

    pub fn sample_path(&self) -> PathBuf {
        self.data_dir.join(&self.sample_file)
    }

    pub fn params_json_path(&self) -> PathBuf {
        self.data_dir.join(&self.params_json_file)
    }

    pub fn sample_ndjson_path(&self) -> PathBuf {
        self.data_dir.join(&self.sample_ndjson_file)
    }

    pub fn run_log_path(&self) -> PathBuf {
        self.data_dir.join(&self.run_log_file)
    }

    pub fn execution_log_path(&self) -> PathBuf {
        self.data_dir.join(&self.execution_log_file)
    }

    pub fn attachments_path(&self) -> PathBuf {
        self.data_dir.join(&self.attachments_file)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.clone())
    }
}
