use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    // Configuration errors
    #[error("Config file not found at {path}. A template has been created - edit it to add your analysis API key and restart.")]
    ConfigNotFound { path: PathBuf },

    #[error("Invalid config: {message}")]
    ConfigInvalid { message: String },

    #[error("Missing required config field: {field}")]
    ConfigMissingField { field: String },

    #[error("Failed to parse config file: {0}")]
    ConfigParseError(#[from] toml::de::Error),

    // Analysis errors
    #[error("Analysis provider {provider} failed: {reason}")]
    AnalysisProviderFailed { provider: String, reason: String },

    #[error("Malformed analysis payload: {reason}")]
    MalformedAnalysis { reason: String },

    // Cache errors
    #[error("Cache database error: {0}")]
    CacheError(#[from] tokio_rusqlite::Error),

    #[error("SQLite error: {0}")]
    SqliteError(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    // Network errors
    #[error("Network request failed: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Network middleware failed: {0}")]
    MiddlewareError(#[from] reqwest_middleware::Error),

    // IO errors
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
