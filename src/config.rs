// src/config.rs - Run configuration for the cut-out refinement pipeline

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{RefineError, Result};
use crate::params::{MAX_BRUSH_SIZE, MAX_FEATHER, MIN_BRUSH_SIZE};

/// Configuration for cutout_refine
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    pub input_path: String,
    /// File or directory holding the segmentation output for `input_path`
    pub mask_path: String,
    pub output_dir: String,

    /// Longest side of the working mask used by morphology and feathering
    #[serde(default = "default_working_max_dimension")]
    pub working_max_dimension: u32,

    #[serde(default)]
    pub shift: i32,

    #[serde(default)]
    pub feather: u32,

    #[serde(default = "default_brush_size")]
    pub brush_size: u32,

    #[serde(default = "default_model_name")]
    pub model_name: String,

    #[serde(default = "default_parallel")]
    pub use_parallel: bool,

    #[serde(default = "default_output_suffix")]
    pub output_suffix: String,

    #[serde(default = "default_write_summary")]
    pub write_summary: bool,
}

fn default_working_max_dimension() -> u32 {
    500
}

fn default_brush_size() -> u32 {
    50
}

fn default_model_name() -> String {
    "medium".to_string()
}

fn default_parallel() -> bool {
    true
}

fn default_output_suffix() -> String {
    "_cutout".to_string()
}

fn default_write_summary() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_path: "./input".to_string(),
            mask_path: "./masks".to_string(),
            output_dir: "./output".to_string(),
            working_max_dimension: default_working_max_dimension(),
            shift: 0,
            feather: 0,
            brush_size: default_brush_size(),
            model_name: default_model_name(),
            use_parallel: default_parallel(),
            output_suffix: default_output_suffix(),
            write_summary: default_write_summary(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            RefineError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;

        Self::from_toml_str(&content).map_err(|source| RefineError::ConfigLoad {
            source,
            path: path.to_path_buf(),
        })
    }

    pub fn from_toml_str(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Validate parameter ranges. Paths are checked by the caller, which
    /// knows whether it needs a file or a directory.
    pub fn validate(&self) -> Result<()> {
        if self.working_max_dimension == 0 {
            return Err(RefineError::Config(
                "working_max_dimension must be > 0".to_string(),
            ));
        }

        if self.feather > MAX_FEATHER {
            return Err(RefineError::Config(format!(
                "feather must be between 0 and {}",
                MAX_FEATHER
            )));
        }

        if !(MIN_BRUSH_SIZE..=MAX_BRUSH_SIZE).contains(&self.brush_size) {
            return Err(RefineError::Config(format!(
                "brush_size must be between {} and {}",
                MIN_BRUSH_SIZE, MAX_BRUSH_SIZE
            )));
        }

        if self.model_name.trim().is_empty() {
            return Err(RefineError::Config("model_name must not be empty".to_string()));
        }

        Ok(())
    }

    /// Create the output directory if it doesn't exist
    pub fn ensure_output_dir(&self) -> Result<PathBuf> {
        let dir = PathBuf::from(&self.output_dir);
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| {
            RefineError::Config(format!("Failed to serialize config: {}", e))
        })?;

        fs::write(path, content)?;

        Ok(())
    }
}
