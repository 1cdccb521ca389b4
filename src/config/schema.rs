//! Configuration schema types for `atlas.toml`
//!
//! Defines the job tables of a batch run and their validation rules.

use crate::downscale::validate_scale;
use crate::frames::DEFAULT_PREFIX;
use crate::output::PageFormat;
use crate::pager::{PackMode, DEFAULT_MAX_DIM};
use crate::spritesheet::DEFAULT_SHEET_MAX_DIM;
use crate::strips::DEFAULT_METADATA_NAME;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Config file name looked up by discovery.
pub const CONFIG_FILE_NAME: &str = "atlas.toml";

/// Complete `atlas.toml` configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AtlasConfig {
    #[serde(default)]
    pub defaults: DefaultsConfig,
    #[serde(default)]
    pub pack: Vec<PackJob>,
    #[serde(default)]
    pub downscale: Vec<DownscaleJob>,
    #[serde(default)]
    pub sheet: Vec<SheetJob>,
    #[serde(default)]
    pub strips: Vec<StripsJob>,
}

/// Values used by jobs that do not set their own
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Maximum page width/height
    #[serde(default = "default_max_dim")]
    pub max_dim: u32,
    /// Page and index prefix
    #[serde(default = "default_prefix")]
    pub prefix: String,
    #[serde(default)]
    pub format: PageFormat,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self { max_dim: default_max_dim(), prefix: default_prefix(), format: PageFormat::default() }
    }
}

fn default_max_dim() -> u32 {
    DEFAULT_MAX_DIM
}

fn default_prefix() -> String {
    DEFAULT_PREFIX.to_string()
}

fn default_scale() -> f64 {
    0.5
}

fn default_sheet_max_dim() -> u32 {
    DEFAULT_SHEET_MAX_DIM
}

fn default_metadata() -> String {
    DEFAULT_METADATA_NAME.to_string()
}

/// `[[pack]]`: multi-page atlases for each matched folder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackJob {
    /// Folder glob patterns, relative to the config file
    pub folders: Vec<String>,
    #[serde(default)]
    pub mode: PackMode,
    #[serde(default)]
    pub delete_old_single: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_dim: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<PageFormat>,
}

/// `[[downscale]]`: reduced variants of already paged folders
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownscaleJob {
    pub folders: Vec<String>,
    #[serde(default = "default_scale")]
    pub scale: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<PageFormat>,
}

/// `[[sheet]]`: one single sheet per matched folder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetJob {
    pub folders: Vec<String>,
    /// Sheets are written as `<out_dir>/<folder name>.<ext>`; without it,
    /// as `<folder>/<prefix>.<ext>`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub out_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cols: Option<u32>,
    #[serde(default = "default_sheet_max_dim")]
    pub max_dim: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<PageFormat>,
}

/// `[[strips]]`: horizontal strips for every animation under a root
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StripsJob {
    pub input_root: PathBuf,
    pub output_root: PathBuf,
    #[serde(default = "default_metadata")]
    pub metadata: String,
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    /// Path to the invalid field (e.g., "pack[0].folders")
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: '{}' {}", CONFIG_FILE_NAME, self.field, self.message)
    }
}

impl AtlasConfig {
    /// Total number of job entries.
    pub fn job_count(&self) -> usize {
        self.pack.len() + self.downscale.len() + self.sheet.len() + self.strips.len()
    }

    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();
        let mut push = |field: String, message: &str| {
            errors.push(ConfigValidationError { field, message: message.to_string() });
        };

        if self.defaults.max_dim == 0 {
            push("defaults.max_dim".to_string(), "must be a positive integer");
        }
        if self.defaults.prefix.is_empty() {
            push("defaults.prefix".to_string(), "must be a non-empty string");
        }

        for (i, job) in self.pack.iter().enumerate() {
            if job.folders.is_empty() {
                push(format!("pack[{}].folders", i), "must contain at least one glob pattern");
            }
            if job.max_dim == Some(0) {
                push(format!("pack[{}].max_dim", i), "must be a positive integer");
            }
            if job.prefix.as_deref() == Some("") {
                push(format!("pack[{}].prefix", i), "must be a non-empty string");
            }
        }

        for (i, job) in self.downscale.iter().enumerate() {
            if job.folders.is_empty() {
                push(format!("downscale[{}].folders", i), "must contain at least one glob pattern");
            }
            if validate_scale(job.scale).is_err() {
                push(format!("downscale[{}].scale", i), "must be in (0, 1]");
            }
            if job.label.as_deref() == Some("") {
                push(format!("downscale[{}].label", i), "must be a non-empty string");
            }
        }

        for (i, job) in self.sheet.iter().enumerate() {
            if job.folders.is_empty() {
                push(format!("sheet[{}].folders", i), "must contain at least one glob pattern");
            }
            if job.max_dim == 0 {
                push(format!("sheet[{}].max_dim", i), "must be a positive integer");
            }
            if job.cols == Some(0) {
                push(format!("sheet[{}].cols", i), "must be a positive integer");
            }
            if job.frame_size == Some(0) {
                push(format!("sheet[{}].frame_size", i), "must be a positive integer");
            }
        }

        for (i, job) in self.strips.iter().enumerate() {
            if job.metadata.is_empty() {
                push(format!("strips[{}].metadata", i), "must be a non-empty file name");
            }
        }

        errors
    }
}
