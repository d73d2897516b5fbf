//! Error types for the medkit_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for medkit_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// The extraction service returned something we could not use
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// No medicine in the inventory matches the given name
    #[error("Medicine not found: {0}")]
    MedicineNotFound(String),

    /// Latitude/longitude out of range or not finite
    #[error("Invalid coordinate: {0}")]
    InvalidCoordinate(String),
}
