use thiserror::Error;
use std::io;
use std::path::PathBuf;

/// Custom error types for floor plan boundary extraction
#[derive(Error, Debug)]
pub enum BoundaryError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Image decoding error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to load configuration from {path}: {source}")]
    ConfigLoad {
        source: toml::de::Error,
        path: PathBuf,
    },

    #[error("Invalid image dimensions: {width}x{height}")]
    InvalidDimensions {
        width: u32,
        height: u32,
    },

    #[error("Pixel buffer holds {actual} bytes, expected {expected}")]
    PixelBufferSize {
        expected: usize,
        actual: usize,
    },

    #[error("Contrast enhancement error: {0}")]
    Enhancement(String),

    #[error("Detection strategy error: {0}")]
    Strategy(String),

    #[error("JSON output error: {0}")]
    JsonOutput(#[from] serde_json::Error),

    #[error("CSV output error: {0}")]
    CsvOutput(#[from] csv::Error),

    #[error("Invalid input path: {0}")]
    InvalidPath(PathBuf),

    #[error("Boundary extraction was cancelled")]
    Cancelled,
}

/// Type alias for Result with our custom error type
pub type Result<T> = std::result::Result<T, BoundaryError>;
