//! Error types for Polyphon

use thiserror::Error;

/// Engine error type
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Unknown bus \"{bus}\" referenced by {referenced_by}")]
    UnknownBus { bus: String, referenced_by: String },

    #[error("No bus named \"master\" in bus definition list")]
    MissingMasterBus,

    #[error("Duplicate bus \"{0}\"")]
    DuplicateBus(String),

    #[error("Loader error: {0}")]
    Loader(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias
pub type EngineResult<T> = Result<T, EngineError>;
