use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProcessingError>;

#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Acquisition failed: {message}")]
    Acquisition { message: String },

    #[error("Durable write to {} failed: {message}", path.display())]
    DurableWrite { path: PathBuf, message: String },

    #[error("Database load/query error: {0}")]
    Load(#[from] rusqlite::Error),

    #[error("Query rejected: {0}")]
    InvalidQuery(String),

    #[error("Choropleth rendering error: {0}")]
    Render(String),

    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Settings error: {0}")]
    Settings(#[from] config::ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Invalid coordinate format: {0}")]
    InvalidCoordinate(String),

    #[error("Missing required data: {0}")]
    MissingData(String),

    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    #[error("Processing cancelled by user")]
    Cancelled,
}

impl ProcessingError {
    pub fn durable_write(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        Self::DurableWrite {
            path: path.into(),
            message: err.to_string(),
        }
    }
}
