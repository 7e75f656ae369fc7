use thiserror::Error;

#[derive(Error, Debug)]
pub enum FnoError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("Artifact error at '{path}': {message}")]
    Artifact { path: String, message: String },

    #[error("Linear algebra error: {0}")]
    LinAlg(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type FnoResult<T> = Result<T, FnoError>;
