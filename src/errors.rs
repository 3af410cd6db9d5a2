use thiserror::Error;
use std::io;
use std::path::PathBuf;

/// Custom error types for cutout_refine
#[derive(Error, Debug)]
pub enum RefineError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to load configuration from {path}: {source}")]
    ConfigLoad {
        source: toml::de::Error,
        path: PathBuf,
    },

    #[error("Segmentation failed: {0}")]
    Segmentation(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("CSV output error: {0}")]
    CsvOutput(#[from] csv::Error),

    #[error("Invalid input path: {0}")]
    InvalidPath(PathBuf),
}

/// Type alias for Result with our custom error type
pub type Result<T> = std::result::Result<T, RefineError>;
